//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Flatten nested key-value trees and inspect hierarchical group/dataset stores
#[derive(Parser, Debug)]
#[command(name = "nestkit")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory whose .nestkit.toml is read (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a store as a tree
    Show {
        /// Store directory
        #[arg(value_hint = ValueHint::DirPath)]
        store: PathBuf,
    },

    /// Print a store as flat `key = value` lines
    Flatten {
        /// Store directory
        #[arg(value_hint = ValueHint::DirPath)]
        store: PathBuf,
        /// Keep only leaf names (must be unique across the store)
        #[arg(long)]
        flat_names: bool,
        /// Separator between path segments
        #[arg(short, long)]
        separator: Option<String>,
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
    /// Show effective settings
    Show,
    /// Print a config template
    Template,
    /// Show config file locations
    Path,
}
