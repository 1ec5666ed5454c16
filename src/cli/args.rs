//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Replay list, table and tree store scripts and inspect their notifications
#[derive(Parser, Debug)]
#[command(name = "nodestore")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file to use instead of the global one
    #[arg(short, long, global = true, env = "NODESTORE_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a script against a fresh store
    Replay {
        /// Script file (TOML)
        #[arg(value_hint = ValueHint::FilePath)]
        script: PathBuf,
        /// Only print the final structure
        #[arg(short, long)]
        quiet: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged config
    Show,

    /// Print config template
    Template,

    /// Show config paths
    Path,

    /// Write the template to the global config path
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}
