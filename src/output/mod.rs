// Output formatting: colored terminal summaries for each command.

pub mod terminal;
