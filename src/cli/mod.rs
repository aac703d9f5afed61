//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "creatorscan",
    version,
    author = "neur0map",
    about = "Find creators whose audiences write real comments",
    long_about = "creatorscan scores the comment sections of posts found for a keyword, keeps the \
                  creators whose posts draw text-rich engagement, then analyzes each of those \
                  creators' own posts and writes per-post and per-creator tables."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/creatorscan/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the two-phase pipeline against a recorded crawl
    Run {
        /// JSON fixture to replay
        #[arg(short, long, value_name = "FILE")]
        fixture: PathBuf,

        /// Keyword to search for (overrides config)
        #[arg(short, long)]
        keyword: Option<String>,

        /// Profile to apply (e.g., "strict")
        #[arg(short, long)]
        profile: Option<String>,

        /// Number of concurrent source sessions (overrides config)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory for the CSV tables (overrides config paths)
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Classify comment texts as text, emoji or mixed
    Classify {
        /// Comment texts
        #[arg(required = true)]
        texts: Vec<String>,
    },

    /// Score a file of comments (one per line) as a single post
    Analyze {
        /// Comment file
        file: PathBuf,

        /// Minimum comments for a pass (overrides config)
        #[arg(long)]
        min_comments: Option<usize>,

        /// Minimum text-based percentage for a pass (overrides config)
        #[arg(long)]
        min_text_pct: Option<f64>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Inspect saved run records
    Runs {
        #[command(subcommand)]
        action: RunsAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum RunsAction {
    /// List runs, newest first
    List {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one run
    Show {
        /// Run ID or unique ID prefix
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Profile to apply before showing
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "creatorscan",
            "--verbose",
            "run",
            "--fixture",
            "crawl.json",
            "--workers",
            "4",
            "-k",
            "travel",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Run {
                fixture,
                keyword,
                workers,
                profile,
                output_dir,
            } => {
                assert_eq!(fixture, PathBuf::from("crawl.json"));
                assert_eq!(keyword.as_deref(), Some("travel"));
                assert_eq!(workers, Some(4));
                assert!(profile.is_none());
                assert!(output_dir.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_classify_requires_text() {
        assert!(Cli::try_parse_from(["creatorscan", "classify"]).is_err());
    }
}
