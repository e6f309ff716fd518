// sfwbot: NSFW image moderation for a subreddit
//
// This is the library root. The binary's subcommands map onto the pipeline
// stages; everything else supports them.

pub mod config;
pub mod images;
pub mod lists;
pub mod output;
pub mod pipeline;
pub mod reddit;
pub mod results;
pub mod status;
