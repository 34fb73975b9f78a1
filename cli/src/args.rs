//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Read and edit JSON/YAML documents by address
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Address segment delimiter (overrides settings and RFX_DELIMITER)
    #[arg(short, long, global = true)]
    pub delimiter: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "pretty")]
    pub format: Format,

    /// Print stored values without substituting $r{..} / $e{..} references
    #[arg(long, global = true)]
    pub raw: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the value at an address (the whole document when omitted)
    #[command(visible_alias = "g")]
    Get {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
        address: Option<String>,
    },

    /// Write a value at an address. VALUE is parsed as JSON, falling back
    /// to a plain string
    #[command(visible_alias = "s")]
    Set {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
        address: String,
        value: String,

        /// Rewrite FILE instead of printing the result
        #[arg(short, long)]
        in_place: bool,
    },

    /// Remove the entry at an address
    #[command(visible_alias = "d")]
    Delete {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
        address: String,

        /// Rewrite FILE instead of printing the result
        #[arg(short, long)]
        in_place: bool,
    },

    /// List mapping keys or sequence indices at an address
    #[command(visible_alias = "k")]
    Keys {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        file: PathBuf,
        address: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Compact JSON
    Json,
    /// JSON indented by four spaces
    Pretty,
    Yaml,
}
