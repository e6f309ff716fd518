use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use sfwbot::config::Config;
use sfwbot::lists::KnownLists;

/// sfwbot: NSFW image moderation for a subreddit.
///
/// `fetch` downloads the images new submissions link to, an external
/// classifier scores them, and `quarantine` acts on the scores.
#[derive(Parser)]
#[command(name = "sfwbot", version, about)]
struct Cli {
    /// Config file (TOML or INI). Defaults to ./sfwbot.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download images linked from the newest submissions
    Fetch {
        /// Subreddit to download images from (default: bot.subreddit)
        subreddit: Option<String>,

        /// Directory to hold image files (default: bot.image_dir)
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Maximum number of new submissions to check in a batch (default: 10)
        #[arg(long)]
        submission_limit: Option<u32>,
    },

    /// Quarantine submissions whose classifier score is over the threshold
    Quarantine {
        /// Subreddit the submissions belong to (default: bot.subreddit)
        subreddit: Option<String>,

        /// Directory holding images and classifier .result files (default: bot.image_dir)
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Minimum NSFW probability to cause a quarantine (default: 0.3)
        #[arg(long)]
        nsfw_threshold: Option<f64>,

        /// Log what would happen without touching Reddit or the lists
        #[arg(long)]
        dry_run: bool,
    },

    /// Show list sizes and what is waiting in the image directory
    Status {
        /// Directory holding images and classifier .result files (default: bot.image_dir)
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("sfwbot=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch {
            subreddit,
            image_dir,
            submission_limit,
        } => {
            config.require_reddit()?;
            let subreddit = config.subreddit(subreddit)?;
            let image_dir = config.image_dir(image_dir)?;
            let limit = submission_limit.unwrap_or(config.bot.submission_limit);
            if limit == 0 {
                anyhow::bail!("--submission-limit must be at least 1");
            }

            let lists = KnownLists::load(&config.bot.quarantine_list, &config.bot.safe_list)?;
            let api = sfwbot::reddit::client::RedditClient::new(
                &config.reddit,
                config.request_timeout(),
            )?;
            let fetcher = sfwbot::images::download::ImageFetcher::new(
                &config.reddit.user_agent,
                config.request_timeout(),
            )?;

            info!(subreddit = subreddit.as_str(), limit = limit, "Fetching new submissions");

            let summary = sfwbot::pipeline::fetch::run(
                &api,
                &fetcher,
                &lists,
                &subreddit,
                limit,
                &image_dir,
            )
            .await?;

            sfwbot::output::terminal::display_fetch_summary(&subreddit, &summary);
        }

        Commands::Quarantine {
            subreddit,
            image_dir,
            nsfw_threshold,
            dry_run,
        } => {
            config.require_reddit()?;
            let subreddit = config.subreddit(subreddit)?;
            let image_dir = config.image_dir(image_dir)?;
            let threshold = nsfw_threshold.unwrap_or(config.bot.nsfw_threshold);
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!("--nsfw-threshold must be between 0 and 1, got {threshold}");
            }

            let mut lists =
                KnownLists::load(&config.bot.quarantine_list, &config.bot.safe_list)?;
            let api = sfwbot::reddit::client::RedditClient::new(
                &config.reddit,
                config.request_timeout(),
            )?;

            if dry_run {
                println!("{}", "Dry run: nothing will be changed.".yellow());
            }
            info!(
                subreddit = subreddit.as_str(),
                threshold = threshold,
                dir = %image_dir.display(),
                "Checking classifier results"
            );

            let summary = sfwbot::pipeline::quarantine::run(
                &api,
                &mut lists,
                &subreddit,
                &image_dir,
                threshold,
                dry_run,
            )
            .await?;

            sfwbot::output::terminal::display_quarantine_summary(&subreddit, &summary);
        }

        Commands::Status { image_dir } => {
            let image_dir = image_dir.or_else(|| config.bot.image_dir.clone());
            let lists = KnownLists::load(&config.bot.quarantine_list, &config.bot.safe_list)?;
            sfwbot::status::show(&lists, image_dir.as_deref())?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_image_dir_is_never_taken_as_subreddit() {
        let cli = Cli::try_parse_from(["sfwbot", "fetch", "--image-dir", "./images"]).unwrap();
        match cli.command {
            Commands::Fetch {
                subreddit,
                image_dir,
                ..
            } => {
                assert_eq!(subreddit, None);
                assert_eq!(image_dir, Some(PathBuf::from("./images")));
            }
            _ => panic!("expected fetch"),
        }

        // A second positional is refused rather than silently shifted.
        assert!(Cli::try_parse_from(["sfwbot", "quarantine", "pics", "./images"]).is_err());
    }
}
