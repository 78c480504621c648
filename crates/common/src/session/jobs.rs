//! Background task dispatcher for session operations
//!
//! Everything a session does that may block (file IO, RSA key generation,
//! sealing and opening envelopes) is described as a [`Task`]. The event loop
//! hands tasks to the [`Dispatcher`], which runs them on the tokio blocking pool
//! and posts exactly one [`TaskEvent`] back per task. The loop owns the single
//! [`EventReceiver`] and feeds each event into its session's `update`.

use std::fmt;
use std::path::PathBuf;

use crate::crypto::{KeyPair, PrivateKey, PublicKey};
use crate::envelope::{build_envelope, open_and_save, SavedFile};
use crate::error::ErrorKind;
use crate::metadata::{FileMetadata, SourceFile};

/// Blocking units of work a session can request
#[derive(Clone)]
pub enum Task {
    /// Open the file selected for sending
    OpenFile { path: PathBuf },
    /// Stat and hash an opened file
    ExtractMetadata { source: SourceFile },
    /// Decode the recipient's public key, then seal the file for them
    BuildEnvelope {
        source: SourceFile,
        metadata: FileMetadata,
        public_key: String,
    },
    /// Generate an ephemeral key pair for a receive session
    GenerateKeyPair,
    /// Open a payload and write the recovered file into `output_dir`
    OpenEnvelope {
        payload: String,
        private_key: PrivateKey,
        output_dir: PathBuf,
    },
    /// Delete a consumed payload file
    RemovePayload { path: PathBuf },
}

// payloads and keys stay out of logs
impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::OpenFile { path } => f.debug_struct("OpenFile").field("path", path).finish(),
            Task::ExtractMetadata { source } => f
                .debug_struct("ExtractMetadata")
                .field("path", &source.path())
                .finish(),
            Task::BuildEnvelope {
                source, metadata, ..
            } => f
                .debug_struct("BuildEnvelope")
                .field("path", &source.path())
                .field("metadata", metadata)
                .finish_non_exhaustive(),
            Task::GenerateKeyPair => f.write_str("GenerateKeyPair"),
            Task::OpenEnvelope {
                payload,
                output_dir,
                ..
            } => f
                .debug_struct("OpenEnvelope")
                .field("payload_len", &payload.len())
                .field("output_dir", output_dir)
                .finish_non_exhaustive(),
            Task::RemovePayload { path } => f
                .debug_struct("RemovePayload")
                .field("path", path)
                .finish(),
        }
    }
}

/// The single outcome of a [`Task`]
#[derive(Debug, Clone)]
pub enum TaskEvent {
    KeyGenerated {
        key_pair: KeyPair,
        /// base64 PEM form, ready to hand to a sender
        encoded_public_key: String,
    },
    FileOpened(SourceFile),
    MetadataExtracted(FileMetadata),
    EnvelopeBuilt(String),
    EnvelopeOpened(SavedFile),
    PayloadRemoved(PathBuf),
    Failed(TaskFailure),
}

/// A failed task, reduced to what a session needs to recover and report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub kind: ErrorKind,
    pub detail: String,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.detail)
    }
}

impl TaskFailure {
    pub fn new(kind: ErrorKind, detail: impl fmt::Display) -> Self {
        Self {
            kind,
            detail: detail.to_string(),
        }
    }

    /// Whether running the same task again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Resource | ErrorKind::Io)
    }
}

impl Task {
    pub fn name(&self) -> &'static str {
        match self {
            Task::OpenFile { .. } => "open_file",
            Task::ExtractMetadata { .. } => "extract_metadata",
            Task::BuildEnvelope { .. } => "build_envelope",
            Task::GenerateKeyPair => "generate_key_pair",
            Task::OpenEnvelope { .. } => "open_envelope",
            Task::RemovePayload { .. } => "remove_payload",
        }
    }

    /// Run the task to completion on the current thread
    pub fn run(self) -> TaskEvent {
        let name = self.name();
        let event = match self {
            Task::OpenFile { path } => SourceFile::open(&path)
                .map(TaskEvent::FileOpened)
                .map_err(|e| TaskFailure::new(e.kind(), e)),

            Task::ExtractMetadata { source } => source
                .metadata()
                .map(TaskEvent::MetadataExtracted)
                .map_err(|e| TaskFailure::new(e.kind(), e)),

            Task::BuildEnvelope {
                source,
                metadata,
                public_key,
            } => build(&source, metadata, &public_key).map(TaskEvent::EnvelopeBuilt),

            Task::GenerateKeyPair => generate().map(|(key_pair, encoded_public_key)| {
                TaskEvent::KeyGenerated {
                    key_pair,
                    encoded_public_key,
                }
            }),

            Task::OpenEnvelope {
                payload,
                private_key,
                output_dir,
            } => open_and_save(&payload, &private_key, &output_dir)
                .map(TaskEvent::EnvelopeOpened)
                .map_err(|e| TaskFailure::new(e.kind(), e)),

            Task::RemovePayload { path } => std::fs::remove_file(&path)
                .map(|_| TaskEvent::PayloadRemoved(path.clone()))
                .map_err(|e| {
                    TaskFailure::new(
                        ErrorKind::Io,
                        format!("failed to delete payload {}: {}", path.display(), e),
                    )
                }),
        };

        match event {
            Ok(event) => {
                tracing::debug!(task = name, "task finished");
                event
            }
            Err(failure) => {
                tracing::debug!(task = name, kind = %failure.kind, "task failed: {}", failure.detail);
                TaskEvent::Failed(failure)
            }
        }
    }
}

fn build(
    source: &SourceFile,
    metadata: FileMetadata,
    public_key: &str,
) -> Result<String, TaskFailure> {
    let recipient = PublicKey::decode(public_key)
        .map_err(|e| TaskFailure::new(e.kind(), format!("error decoding public key: {}", e)))?;
    let plaintext = source
        .read_all()
        .map_err(|e| TaskFailure::new(e.kind(), e))?;
    build_envelope(metadata, &recipient, &plaintext)
        .map_err(|e| TaskFailure::new(e.kind(), format!("error encrypting file: {}", e)))
}

fn generate() -> Result<(KeyPair, String), TaskFailure> {
    let key_pair = KeyPair::generate().map_err(|e| TaskFailure::new(e.kind(), e))?;
    let encoded = key_pair
        .public
        .encode()
        .map_err(|e| TaskFailure::new(e.kind(), e))?;
    Ok((key_pair, encoded))
}

/// Runs tasks off the event loop
///
/// A lightweight handle that can be cloned freely. Must be used from within a
/// tokio runtime.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    tx: flume::Sender<TaskEvent>,
}

impl Dispatcher {
    /// Create a new dispatcher and event receiver pair
    ///
    /// The dispatcher can be cloned and shared, while the receiver belongs to
    /// the event loop.
    pub fn new() -> (Self, EventReceiver) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, EventReceiver { rx })
    }

    /// Run `task` on the blocking pool and post its event when done
    pub fn dispatch(&self, task: Task) {
        tracing::debug!(task = ?task, "dispatching task");
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let event = task.run();
            if tx.send(event).is_err() {
                tracing::debug!("event receiver dropped, discarding task event");
            }
        });
    }
}

/// Event receiver owned by the event loop
#[derive(Debug)]
pub struct EventReceiver {
    rx: flume::Receiver<TaskEvent>,
}

impl EventReceiver {
    /// Wait for the next task event
    ///
    /// Returns None once every dispatcher handle has been dropped.
    pub async fn recv(&self) -> Option<TaskEvent> {
        self.rx.recv_async().await.ok()
    }

    /// Take an event if one is ready
    pub fn try_recv(&self) -> Option<TaskEvent> {
        self.rx.try_recv().ok()
    }
}
