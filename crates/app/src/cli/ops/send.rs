use std::path::{Path, PathBuf};

use clap::Args;

use common::session::send::{self, SendError};

use crate::interactive;

#[derive(Args, Debug, Clone)]
pub struct SendFile {
    /// File to send (asked for interactively when omitted)
    pub file: Option<PathBuf>,

    /// Path to recipient's public key file (skips manual paste)
    #[arg(short = 'k', long = "pubkey")]
    pub pubkey: Option<PathBuf>,

    /// Save the payload to a file instead of printing it (default name: payload.abp)
    #[arg(short, long, num_args = 0..=1)]
    pub output: Option<Option<PathBuf>>,

    /// Run in headless mode (requires -k and a file argument)
    #[arg(short = 'H', long)]
    pub headless: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SendFileError {
    #[error("error reading public key file {path}: {source}")]
    ReadPublicKey {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file argument required in headless mode")]
    MissingFile,

    #[error("public key (-k) required in headless mode")]
    MissingPublicKey,

    #[error("error running headless send: {0}")]
    Headless(#[from] SendError),

    #[error("error saving payload to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("send task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Interactive(#[from] anyhow::Error),
}

impl SendFile {
    /// Where the payload goes, if not to stdout
    fn output_path(&self, default_name: &str) -> Option<PathBuf> {
        self.output
            .as_ref()
            .map(|output| output.clone().unwrap_or_else(|| PathBuf::from(default_name)))
    }
}

fn read_public_key(path: &Path) -> Result<String, SendFileError> {
    std::fs::read_to_string(path).map_err(|source| SendFileError::ReadPublicKey {
        path: path.to_path_buf(),
        source,
    })
}

#[async_trait::async_trait]
impl crate::cli::op::Op for SendFile {
    type Error = SendFileError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let public_key = self.pubkey.as_deref().map(read_public_key).transpose()?;
        let output = self.output_path(&ctx.config.payload_file_name);

        let payload = if self.headless {
            let file = self.file.clone().ok_or(SendFileError::MissingFile)?;
            let public_key = public_key.ok_or(SendFileError::MissingPublicKey)?;
            let output = output.clone();
            tokio::task::spawn_blocking(move || {
                send::run_headless(&file, &public_key, output.as_deref())
            })
            .await??
        } else {
            let payload = interactive::send::run(self.file.clone(), public_key).await?;
            if let Some(path) = &output {
                std::fs::write(path, &payload).map_err(|source| SendFileError::Write {
                    path: path.clone(),
                    source,
                })?;
            }
            payload
        };

        match output {
            Some(path) => Ok(format!("Payload saved to {}", path.display())),
            None => Ok(payload),
        }
    }
}
