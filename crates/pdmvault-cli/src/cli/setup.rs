use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "pdmvault",
    bin_name = "pdmvault",
    version,
    disable_help_subcommand = true
)]
#[command(about = "Versioned vault for design documents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault root directory
    #[arg(long, global = true, env = "PDMVAULT_ROOT", help_heading = "Options")]
    pub vault: Option<PathBuf>,

    /// Identity recorded as lock holder (defaults to $USER)
    #[arg(long, global = true, help_heading = "Options")]
    pub user: Option<String>,

    /// Extra configuration file, read before the vault and user config
    #[arg(long, global = true, help_heading = "Options")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true, help_heading = "Options")]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the vault tables in the vault root
    Init,

    /// Import a file as a new item
    Import {
        file: PathBuf,

        /// Vault directory to import into
        #[arg(short, long, default_value = "")]
        dir: String,

        /// Short description of the first version
        #[arg(short, long, default_value = "Initial import")]
        message: String,

        /// Additional description lines
        #[arg(long = "detail")]
        details: Vec<String>,
    },

    /// Check an item out for editing
    Checkout { item: String },

    /// Check an item in, optionally storing a new version first
    Checkin {
        item: String,

        /// File holding the new version
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long, default_value = "")]
        message: String,

        #[arg(long = "detail")]
        details: Vec<String>,
    },

    /// Show who has an item checked out
    Status { item: String },

    /// Release someone else's lock
    Unlock { item: String },

    /// Rename an item
    Rename { old: String, new: String },

    /// Print the number of the item with this name
    Resolve { name: String },

    /// List a vault directory
    #[command(alias = "ls")]
    List {
        #[arg(default_value = "")]
        dir: String,

        /// Hide plain files
        #[arg(long)]
        documents_only: bool,

        /// Show legacy revision files
        #[arg(long)]
        show_superseded: bool,

        #[arg(long)]
        json: bool,
    },

    /// Delete superseded versions in a directory
    Purge {
        #[arg(default_value = "")]
        dir: String,

        /// Actually delete; otherwise only report what would go
        #[arg(short, long)]
        yes: bool,
    },

    /// Show an item's versions
    History {
        item: String,

        #[arg(long)]
        json: bool,
    },

    /// Show document properties of an item's latest version
    Inspect {
        item: String,

        #[arg(long)]
        json: bool,
    },

    /// Copy a version out of the vault
    Export {
        item: String,

        /// Destination directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Version number, latest if omitted
        #[arg(long)]
        version: Option<u32>,
    },

    /// Move an item to another vault directory
    #[command(name = "move")]
    Move { item: String, dir: String },

    /// Remove an item; its number is never reused
    Remove { name: String },

    /// Create a vault directory
    Mkdir { dir: String },

    /// Reconcile the catalog with the containers on disk
    Doctor,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_checkin_with_file() {
        let cli = Cli::try_parse_from([
            "pdmvault", "checkin", "7", "--file", "part.FCStd", "-m", "fix hole",
        ])
        .unwrap();
        match cli.command {
            Commands::Checkin { item, file, message, .. } => {
                assert_eq!(item, "7");
                assert_eq!(file, Some(PathBuf::from("part.FCStd")));
                assert_eq!(message, "fix hole");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
