use std::path::{Path, PathBuf};

use clap::Args;

use common::session::receive::{self, ReceiveError};
use common::session::ReceiveOptions;
use zeroize::Zeroizing;

use crate::interactive;

#[derive(Args, Debug, Clone)]
pub struct ReceiveFile {
    /// Path to private key (a session key pair is generated when omitted)
    #[arg(short = 'k', long = "privkey")]
    pub privkey: Option<PathBuf>,

    /// Path to input payload file
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Delete payload file after successful decryption
    #[arg(short = 'd', long = "delete")]
    pub delete: bool,

    /// Run in headless mode (requires -k and -i)
    #[arg(short = 'H', long)]
    pub headless: bool,

    /// Directory to write the decrypted file into (defaults to the working directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiveFileError {
    #[error("error reading {what} file {path}: {source}")]
    Read {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("private key (-k) required in headless mode")]
    MissingPrivateKey,

    #[error("input payload (-i) required in headless mode")]
    MissingPayload,

    #[error("error running headless receive: {0}")]
    Headless(#[from] ReceiveError),

    #[error("receive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Interactive(#[from] anyhow::Error),
}

fn read_file(what: &'static str, path: &Path) -> Result<Vec<u8>, ReceiveFileError> {
    std::fs::read(path).map_err(|source| ReceiveFileError::Read {
        what,
        path: path.to_path_buf(),
        source,
    })
}

fn read_private_key(path: &Path) -> Result<Zeroizing<Vec<u8>>, ReceiveFileError> {
    read_file("private key", path).map(Zeroizing::new)
}

/// Read a payload file, treating one with nothing but whitespace as absent
fn read_payload(path: &Path) -> Result<Option<String>, ReceiveFileError> {
    let bytes = read_file("payload", path)?;
    let payload = String::from_utf8_lossy(&bytes).into_owned();
    Ok(Some(payload).filter(|payload| !payload.trim().is_empty()))
}

fn saved_message(path: &Path) -> String {
    format!("File saved successfully: {}", path.display())
}

#[async_trait::async_trait]
impl crate::cli::op::Op for ReceiveFile {
    type Error = ReceiveFileError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let private_key_pem = self.privkey.as_deref().map(read_private_key).transpose()?;
        let payload = self
            .input
            .as_deref()
            .map(read_payload)
            .transpose()?
            .flatten();

        let output_dir = self
            .output_dir
            .clone()
            .or_else(|| ctx.config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));

        if self.headless {
            let private_key_pem = private_key_pem.ok_or(ReceiveFileError::MissingPrivateKey)?;
            let payload = payload.ok_or(ReceiveFileError::MissingPayload)?;
            let delete = self.input.clone().filter(|_| self.delete);

            let report = tokio::task::spawn_blocking(move || {
                receive::run_headless(&private_key_pem, &payload, &output_dir, delete.as_deref())
            })
            .await??;

            let mut lines = vec![saved_message(&report.saved.path)];
            match report.removal {
                Some(Ok(_)) => lines.push("Payload file deleted.".to_string()),
                Some(Err(e)) => lines.push(format!("Warning: Failed to delete payload file: {}", e)),
                None => {}
            }
            return Ok(lines.join("\n"));
        }

        let options = ReceiveOptions {
            private_key_pem,
            payload,
            payload_path: self.input.clone(),
            delete_payload: self.delete,
            output_dir,
        };
        let session = interactive::receive::run(options).await?;

        let mut lines = Vec::new();
        if let Some(saved) = session.saved_file() {
            lines.push(saved_message(&saved.path));
        }
        if session.removed_payload().is_some() {
            lines.push("Payload file deleted.".to_string());
        }
        if let Some(failure) = session.removal_error() {
            lines.push(format!("Warning: {}", failure.detail));
        }
        Ok(lines.join("\n"))
    }
}
