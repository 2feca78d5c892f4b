//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rw_core::Mode;

/// Activity-aware work/rest reminder.
///
/// Tracks keyboard and pointer activity and tells you when to take a break.
/// Several instances can share one activity clock through a collector.
#[derive(Debug, Parser)]
#[command(name = "restwatch", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the scheduler.
    ///
    /// Reads commands from stdin, one per line: `rest`, `cancel`,
    /// `durations <work> <rest>`, `mode <fascist|friendly>`.
    Run(RunArgs),

    /// Serve a shared collector.
    Serve {
        /// Address to listen on (defaults to the configured collector).
        #[arg(long)]
        listen: Option<String>,
    },

    /// Show the collector's shared clock.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Record activity on the collector.
    Tick,

    /// Publish work/rest durations to the collector.
    Put {
        /// Work interval in minutes.
        #[arg(long)]
        work: f64,

        /// Rest interval in minutes.
        #[arg(long)]
        rest: f64,
    },
}

/// Overrides for `run`.
#[derive(Debug, Clone, Default, Args)]
pub struct RunArgs {
    /// Work interval in minutes.
    #[arg(short, long)]
    pub work: Option<f64>,

    /// Rest interval in minutes.
    #[arg(short, long)]
    pub rest: Option<f64>,

    /// Whether rests can be cancelled (fascist or friendly).
    #[arg(long)]
    pub mode: Option<Mode>,

    /// Collector address (`host:port`).
    #[arg(long)]
    pub collector: Option<String>,

    /// Don't use or start a collector server.
    #[arg(long)]
    pub standalone: bool,
}

impl RunArgs {
    /// Whether the user asked for specific durations on the command line.
    pub const fn sets_durations(&self) -> bool {
        self.work.is_some() || self.rest.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_overrides() {
        let cli = Cli::parse_from([
            "restwatch", "run", "-w", "25", "-r", "5", "--mode", "friendly", "--standalone",
        ]);
        let Some(Commands::Run(args)) = cli.command else {
            panic!("expected run: {cli:?}");
        };
        assert_eq!(args.work, Some(25.0));
        assert_eq!(args.rest, Some(5.0));
        assert_eq!(args.mode, Some(Mode::Friendly));
        assert!(args.standalone);
        assert!(args.sets_durations());
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = Cli::try_parse_from(["restwatch", "run", "--mode", "lenient"]).unwrap_err();
        assert!(err.to_string().contains("unknown mode: lenient"));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["restwatch", "status", "--json", "-v", "-c", "/tmp/rw.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/rw.toml")));
        assert!(matches!(cli.command, Some(Commands::Status { json: true })));
    }
}
