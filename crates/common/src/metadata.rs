use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("path has no file name: {0}")]
    NoFileName(PathBuf),
}

impl MetadataError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Io
    }

    fn io(path: &Path, source: io::Error) -> Self {
        MetadataError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What the recipient learns about a file before and after decrypting it
///
/// `hash` is the lowercase hex SHA-256 of the original (unencrypted) content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: u64,
    pub hash: String,
}

/// Compute [`FileMetadata`] for an open file
///
/// The size comes from the file's stat and the hash from a full read of the
/// stream. The read position is reset to the start both before and after
/// hashing, so the same handle can be handed straight to the cipher.
pub fn extract_metadata(file: &mut File, path: &Path) -> Result<FileMetadata, MetadataError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| MetadataError::NoFileName(path.to_path_buf()))?;

    let size = file.metadata().map_err(|e| MetadataError::io(path, e))?.len();
    let hash = hash_stream(file).map_err(|e| MetadataError::io(path, e))?;

    Ok(FileMetadata { name, size, hash })
}

/// Hex SHA-256 of everything readable from `reader`, leaving it rewound
pub fn hash_stream<R: Read + Seek>(reader: &mut R) -> io::Result<String> {
    reader.seek(SeekFrom::Start(0))?;
    let mut hasher = Sha256::new();
    io::copy(reader, &mut hasher)?;
    reader.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Hex SHA-256 of an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// A file opened for sending
///
/// Cheap to clone; every clone shares the same read-only handle. Two readers
/// use it in sequence (hashing, then encryption) and each holds the lock only
/// for the duration of its own read, rewinding before it lets go.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    handle: Arc<Mutex<File>>,
}

impl SourceFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MetadataError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            handle: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn metadata(&self) -> Result<FileMetadata, MetadataError> {
        let mut file = self.handle.lock();
        extract_metadata(&mut file, &self.path)
    }

    /// Read the whole file from the start
    ///
    /// Files are encrypted in one shot, so the content is held in memory.
    pub fn read_all(&self) -> Result<Vec<u8>, MetadataError> {
        let mut file = self.handle.lock();
        let mut data = Vec::new();
        file.seek(SeekFrom::Start(0))
            .and_then(|_| file.read_to_end(&mut data))
            .and_then(|_| file.seek(SeekFrom::Start(0)))
            .map_err(|e| MetadataError::io(&self.path, e))?;
        Ok(data)
    }
}
