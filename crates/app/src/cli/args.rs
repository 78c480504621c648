pub use clap::Parser;

use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sealdrop", version)]
#[command(about = "Send a file sealed to the recipient's public key as one pasteable payload")]
pub struct Args {
    /// Path to the sealdrop config directory (defaults to ~/.sealdrop)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
