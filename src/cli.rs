use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "infinite-wiki")]
#[command(about = "A terminal wiki reader that opens every followed link as a new level below its page")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the interactive TUI (default)
    Run {
        /// Page to open first (defaults to the configured start page)
        url: Option<String>,
    },
    /// Run a headless test script
    Test {
        /// Path to the script file
        script: String,
        /// Serve pages from HTML files in this directory instead of the network
        #[arg(long)]
        fixtures: Option<String>,
        /// Maximum seconds to wait for fetches to settle
        #[arg(long, default_value = "5")]
        settle_timeout: u64,
        /// Log to stderr
        #[arg(short, long)]
        verbose: bool,
        /// Write screenshots instead of comparing against them
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the title, text and links extracted from a page
    Extract {
        /// Url or local HTML file
        target: String,
    },
}
