use clap::{Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "keepsafe",
    about = "Local encrypted credential vault",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Store a new credential. Without --password or --generate the password is read from stdin.
    Add {
        website: String,
        username: String,
        #[arg(long, conflicts_with = "generate")]
        password: Option<String>,
        /// Generate a random password instead of supplying one.
        #[arg(long)]
        generate: bool,
        /// Length of the generated password.
        #[arg(long, requires = "generate")]
        length: Option<usize>,
    },
    /// List stored credentials (passwords stay encrypted).
    List {
        /// Only show entries whose website or username contains this text.
        #[arg(short, long)]
        query: Option<String>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Decrypt and print the password of one credential.
    Reveal { id: i64 },
    /// Delete a credential (no-op if it does not exist).
    Delete { id: i64 },
    /// Print a random password without storing it.
    Generate {
        #[arg(short, long)]
        length: Option<usize>,
    },
    /// Round-trip a probe credential through the key, cipher and store.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
