//! Command-line arguments for `stepscript`, declared with clap's derive API.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Top-level arguments. `--verbose` and `--config` apply to every subcommand.
#[derive(Debug, Parser)]
#[command(
    name = "stepscript",
    version,
    about = "Builds and checks the syntax trees of StepScript procedures and commands."
)]
pub struct StepArgs {
    /// Raise log verbosity (-v for debug, -vv for trace). STEPSCRIPT_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file. Defaults to ./stepscript.yaml when present.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build and print the syntax tree of a script.
    Ast {
        /// The path to the script file.
        #[arg(required = true)]
        file: PathBuf,
        /// Print the tree as JSON instead of an outline.
        #[arg(long)]
        json: bool,
    },
    /// Check every `.ns` script under a path and report diagnostics.
    Check {
        /// A script file or a directory to search recursively.
        #[arg(default_value = ".")]
        path: PathBuf,
    },
    /// Print the rule-event stream the parser produces for a script.
    Events {
        /// The path to the script file.
        #[arg(required = true)]
        file: PathBuf,
        /// Print the stream as JSON.
        #[arg(long)]
        json: bool,
    },
}
