//! CLI interface for Soma

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Body and hand movement to MIDI control changes
#[derive(Parser)]
#[command(name = "soma")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch a recorded detector session through the mapping table
    Run {
        /// Configuration file path
        #[arg(short, long, default_value = "soma.yaml")]
        config: PathBuf,

        /// JSON-lines recording of detector output
        #[arg(short, long)]
        replay: PathBuf,

        /// Start the recording over when it ends
        #[arg(long = "loop")]
        looping: bool,

        /// Stop after this many frames
        #[arg(long)]
        max_ticks: Option<u64>,

        /// Print every control message
        #[arg(short, long)]
        print: bool,

        /// Don't open a MIDI output port
        #[arg(long)]
        no_midi: bool,
    },

    /// Dispatch a recording with a live terminal view of controller values
    Monitor {
        /// Configuration file path
        #[arg(short, long, default_value = "soma.yaml")]
        config: PathBuf,

        /// JSON-lines recording of detector output
        #[arg(short, long)]
        replay: PathBuf,

        /// Start the recording over when it ends
        #[arg(long = "loop")]
        looping: bool,

        /// Don't open a MIDI output port
        #[arg(long)]
        no_midi: bool,
    },

    /// Validate a configuration file
    Check {
        /// Configuration file path
        #[arg(short, long, default_value = "soma.yaml")]
        config: PathBuf,
    },

    /// List available MIDI output ports
    Ports,

    /// Generate an example configuration file
    Init,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "soma", "run", "--replay", "session.jsonl", "--loop", "--max-ticks", "120", "--no-midi",
        ])
        .unwrap();

        match cli.command {
            Commands::Run {
                config,
                replay,
                looping,
                max_ticks,
                print,
                no_midi,
            } => {
                assert_eq!(config, PathBuf::from("soma.yaml"));
                assert_eq!(replay, PathBuf::from("session.jsonl"));
                assert!(looping);
                assert_eq!(max_ticks, Some(120));
                assert!(!print);
                assert!(no_midi);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_requires_replay() {
        assert!(Cli::try_parse_from(["soma", "run"]).is_err());
    }
}
