use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Args;

use common::crypto::{KeyError, KeyPair};

use crate::state::{PRIVATE_KEY_FILE_NAME, PUBLIC_KEY_FILE_NAME};

#[derive(Args, Debug, Clone)]
pub struct Keygen {
    /// Directory to save the generated keys
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum KeygenError {
    #[error("error generating keys: {0}")]
    Key(#[from] KeyError),

    #[error("error writing {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("key generation task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Write `contents` to `path` with the given unix mode
///
/// The mode is applied even when the file already existed.
fn write_key_file(path: &Path, contents: &[u8], mode: u32) -> Result<(), KeygenError> {
    let write_err = |source: std::io::Error| KeygenError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
        options.mode(mode);
        let mut file = options.open(path).map_err(write_err)?;
        file.set_permissions(fs::Permissions::from_mode(mode))
            .map_err(write_err)?;
        file.write_all(contents).map_err(write_err)?;
    }
    #[cfg(not(unix))]
    {
        let _ = mode;
        let mut file = options.open(path).map_err(write_err)?;
        file.write_all(contents).map_err(write_err)?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Keygen {
    type Error = KeygenError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        eprintln!("Generating RSA key pair...");
        let key_pair = tokio::task::spawn_blocking(KeyPair::generate).await??;

        let private_pem = key_pair.private.to_pem()?;
        let private_path = self.output.join(PRIVATE_KEY_FILE_NAME);
        write_key_file(&private_path, private_pem.as_bytes(), 0o600)?;
        tracing::debug!(path = %private_path.display(), "private key written");

        let public_encoded = key_pair.public.encode()?;
        let public_path = self.output.join(PUBLIC_KEY_FILE_NAME);
        write_key_file(&public_path, public_encoded.as_bytes(), 0o644)?;
        tracing::debug!(path = %public_path.display(), "public key written");

        Ok(format!(
            "Private key saved to: {}\nPublic key saved to: {}",
            private_path.display(),
            public_path.display()
        ))
    }
}
