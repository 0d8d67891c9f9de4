use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run every probe once against a URL and print the report
    Check {
        url: String,

        /// Count case-insensitive occurrences of this text in the page body
        #[arg(short, long)]
        keyword: Option<String>,
    },
    /// Register the jobs file and run the scheduler until interrupted
    Watch,
}
