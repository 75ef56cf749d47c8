//! Command-line interface, built on clap derive.

use clap::{Parser, Subcommand};

/// evsync: extracts event details from free-text sheet rows and syncs them
/// to a calendar.
#[derive(Debug, Parser)]
#[command(name = "evsync", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Ceiling on record-loops before the run is declared stuck.
    #[arg(long, global = true)]
    pub max_loops: Option<u32>,

    /// Print the full step-by-step message log after the run.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every pending sheet row end to end.
    Run,

    /// Show how many sheet rows are waiting to be processed.
    Status,

    /// List the next events on the calendar.
    Upcoming {
        /// Maximum number of events to list.
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },

    /// Write the column headers to the sheet (one-time setup).
    InitSheet,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_run_subcommand() {
        let cli = Cli::parse_from(["evsync", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert!(!cli.verbose);
        assert!(cli.max_loops.is_none());
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from(["evsync", "--max-loops", "5", "--verbose", "run"]);
        assert!(cli.verbose);
        assert_eq!(cli.max_loops, Some(5));
    }

    #[test]
    fn cli_parses_upcoming_limit() {
        let cli = Cli::parse_from(["evsync", "upcoming", "--limit", "3"]);
        match cli.command {
            Command::Upcoming { limit } => assert_eq!(limit, 3),
            _ => panic!("expected Upcoming command"),
        }
    }

    #[test]
    fn cli_upcoming_limit_defaults_to_ten() {
        let cli = Cli::parse_from(["evsync", "upcoming"]);
        match cli.command {
            Command::Upcoming { limit } => assert_eq!(limit, 10),
            _ => panic!("expected Upcoming command"),
        }
    }

    #[test]
    fn cli_parses_init_sheet() {
        let cli = Cli::parse_from(["evsync", "init-sheet"]);
        assert!(matches!(cli.command, Command::InitSheet));
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
