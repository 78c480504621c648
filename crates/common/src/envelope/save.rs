use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::{open_envelope, EnvelopeError};
use crate::crypto::PrivateKey;
use crate::metadata::FileMetadata;

/// Where an opened envelope landed on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub metadata: FileMetadata,
}

/// Reduce a sender supplied name to a single path component
///
/// Only the final component survives, whichever separator the sender's
/// platform used. Names that would resolve to the directory itself or its
/// parent are rejected.
pub fn sanitize_file_name(name: &str) -> Result<String, EnvelopeError> {
    let base = name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    match base {
        "" | "." | ".." => Err(EnvelopeError::InvalidFileName(name.to_string())),
        base => Ok(base.to_string()),
    }
}

/// Write decrypted content into `dir` under the sanitized metadata name
///
/// The content goes to a temporary file in `dir` first and is renamed into
/// place, so a failed write never leaves a partial file behind. An existing
/// file of the same name is replaced.
pub fn save_plaintext(
    dir: &Path,
    metadata: &FileMetadata,
    plaintext: &[u8],
) -> Result<PathBuf, EnvelopeError> {
    let name = sanitize_file_name(&metadata.name)?;
    let target = dir.join(name);
    let write_err = |source: std::io::Error| EnvelopeError::Write {
        path: target.clone(),
        source,
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(write_err)?;
    staged.write_all(plaintext).map_err(write_err)?;
    staged.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        staged
            .as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(write_err)?;
    }

    staged
        .persist(&target)
        .map_err(|err| write_err(err.error))?;

    tracing::debug!(path = %target.display(), size = plaintext.len(), "saved decrypted file");
    Ok(target)
}

/// Open a payload and save its content into `dir`
///
/// Nothing is written unless the payload authenticates.
pub fn open_and_save(
    payload: &str,
    private_key: &PrivateKey,
    dir: &Path,
) -> Result<SavedFile, EnvelopeError> {
    let (plaintext, metadata) = open_envelope(payload, private_key)?;
    let path = save_plaintext(dir, &metadata, &plaintext)?;
    Ok(SavedFile { path, metadata })
}
