//! Sender session
//!
//! Drives a file from selection to a finished payload:
//!
//! ```text
//! AwaitingFile -> ReadyingFile -> AwaitingPublicKey -> ReadyingPublicKey -> ReadyToSend
//! ```
//!
//! [`SendSession::update`] is pure: it consumes the session and one
//! [`SendInput`] and returns the next session plus at most one [`Task`] to
//! dispatch. Failures roll the session back to the step whose input was bad
//! and keep the error around for display.

use std::path::{Path, PathBuf};

use super::jobs::{Task, TaskEvent, TaskFailure};
use crate::crypto::{KeyError, PublicKey};
use crate::envelope::{build_envelope, EnvelopeError};
use crate::error::ErrorKind;
use crate::metadata::{FileMetadata, MetadataError, SourceFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStep {
    AwaitingFile,
    ReadyingFile,
    AwaitingPublicKey,
    ReadyingPublicKey,
    ReadyToSend,
}

/// Everything that can move a send session forward
#[derive(Debug, Clone)]
pub enum SendInput {
    /// The user picked a file
    SelectFile(PathBuf),
    /// The user submitted the recipient's public key
    SubmitPublicKey(String),
    /// A dispatched task finished
    Task(TaskEvent),
}

impl From<TaskEvent> for SendInput {
    fn from(event: TaskEvent) -> Self {
        SendInput::Task(event)
    }
}

#[derive(Debug, Clone)]
pub struct SendSession {
    step: SendStep,
    selected_file: Option<PathBuf>,
    source: Option<SourceFile>,
    metadata: Option<FileMetadata>,
    public_key: Option<String>,
    // supplied up front, submitted as soon as metadata is ready
    pending_public_key: Option<String>,
    payload: Option<String>,
    error: Option<TaskFailure>,
}

impl SendSession {
    /// Start a session, optionally with the file and public key already known
    ///
    /// A file supplied here is opened right away; the returned task must be
    /// dispatched by the caller.
    pub fn start(file: Option<PathBuf>, public_key: Option<String>) -> (Self, Option<Task>) {
        let session = Self {
            step: SendStep::AwaitingFile,
            selected_file: None,
            source: None,
            metadata: None,
            public_key: None,
            pending_public_key: public_key.filter(|key| !key.trim().is_empty()),
            payload: None,
            error: None,
        };

        match file {
            Some(path) => session.update(SendInput::SelectFile(path)),
            None => (session, None),
        }
    }

    pub fn step(&self) -> SendStep {
        self.step
    }

    pub fn selected_file(&self) -> Option<&Path> {
        self.selected_file.as_deref()
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        self.metadata.as_ref()
    }

    /// The submitted public key while it is being used
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// The finished payload, once the session reached `ReadyToSend`
    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    /// The most recent failure, cleared by the next successful step
    pub fn error(&self) -> Option<&TaskFailure> {
        self.error.as_ref()
    }

    pub fn is_done(&self) -> bool {
        self.step == SendStep::ReadyToSend
    }

    /// Whether the session is waiting on a dispatched task
    pub fn is_busy(&self) -> bool {
        match self.step {
            SendStep::AwaitingFile => self.selected_file.is_some(),
            SendStep::ReadyingFile | SendStep::ReadyingPublicKey => true,
            SendStep::AwaitingPublicKey | SendStep::ReadyToSend => false,
        }
    }

    pub fn update(mut self, input: SendInput) -> (Self, Option<Task>) {
        match (self.step, input) {
            // an open is already in flight while a selection is held
            (SendStep::AwaitingFile, SendInput::SelectFile(path)) if self.selected_file.is_none() => {
                tracing::debug!(path = %path.display(), "opening file");
                self.selected_file = Some(path.clone());
                self.error = None;
                (self, Some(Task::OpenFile { path }))
            }
            (SendStep::AwaitingFile, SendInput::Task(TaskEvent::FileOpened(source)))
                if self.selected_file.is_some() =>
            {
                self.source = Some(source.clone());
                self.step = SendStep::ReadyingFile;
                (self, Some(Task::ExtractMetadata { source }))
            }
            (SendStep::AwaitingFile, SendInput::Task(TaskEvent::Failed(failure)))
                if self.selected_file.is_some() =>
            {
                tracing::debug!("could not open file: {}", failure);
                self.selected_file = None;
                self.error = Some(failure);
                (self, None)
            }

            (SendStep::ReadyingFile, SendInput::Task(TaskEvent::MetadataExtracted(metadata))) => {
                tracing::debug!(name = %metadata.name, size = metadata.size, "metadata ready");
                self.metadata = Some(metadata);
                self.error = None;
                self.step = SendStep::AwaitingPublicKey;
                match self.pending_public_key.take() {
                    Some(key) => self.update(SendInput::SubmitPublicKey(key)),
                    None => (self, None),
                }
            }
            (SendStep::ReadyingFile, SendInput::Task(TaskEvent::Failed(failure))) => {
                tracing::debug!("could not extract metadata: {}", failure);
                self.selected_file = None;
                self.source = None;
                self.metadata = None;
                self.error = Some(failure);
                self.step = SendStep::AwaitingFile;
                (self, None)
            }

            (SendStep::AwaitingPublicKey, SendInput::SubmitPublicKey(key)) => {
                let (Some(source), Some(metadata)) = (self.source.clone(), self.metadata.clone())
                else {
                    return (self, None);
                };
                self.public_key = Some(key.clone());
                self.step = SendStep::ReadyingPublicKey;
                let task = Task::BuildEnvelope {
                    source,
                    metadata,
                    public_key: key,
                };
                (self, Some(task))
            }

            (SendStep::ReadyingPublicKey, SendInput::Task(TaskEvent::EnvelopeBuilt(payload))) => {
                tracing::debug!(payload_len = payload.len(), "payload ready");
                self.payload = Some(payload);
                self.error = None;
                self.step = SendStep::ReadyToSend;
                (self, None)
            }
            (SendStep::ReadyingPublicKey, SendInput::Task(TaskEvent::Failed(failure))) => {
                tracing::debug!("could not build payload: {}", failure);
                self.public_key = None;
                self.error = Some(failure);
                self.step = SendStep::AwaitingPublicKey;
                (self, None)
            }

            (step, _) => {
                tracing::trace!(?step, "ignoring input");
                (self, None)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("error opening file: {0}")]
    Open(#[source] MetadataError),
    #[error("error extracting metadata: {0}")]
    Metadata(#[source] MetadataError),
    #[error("error decoding public key: {0}")]
    PublicKey(#[source] KeyError),
    #[error("error encrypting file: {0}")]
    Envelope(#[source] EnvelopeError),
    #[error("error saving payload to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SendError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SendError::Open(err) | SendError::Metadata(err) => err.kind(),
            SendError::PublicKey(err) => err.kind(),
            SendError::Envelope(err) => err.kind(),
            SendError::Write { .. } => ErrorKind::Io,
        }
    }
}

/// Seal `file` for `public_key` in one go
///
/// Writes the payload to `output` when given and returns it either way. The
/// first failure aborts the run.
pub fn run_headless(
    file: &Path,
    public_key: &str,
    output: Option<&Path>,
) -> Result<String, SendError> {
    let source = SourceFile::open(file).map_err(SendError::Open)?;
    let metadata = source.metadata().map_err(SendError::Metadata)?;
    let recipient = PublicKey::decode(public_key).map_err(SendError::PublicKey)?;
    let plaintext = source.read_all().map_err(SendError::Open)?;
    let payload =
        build_envelope(metadata, &recipient, &plaintext).map_err(SendError::Envelope)?;

    if let Some(path) = output {
        std::fs::write(path, &payload).map_err(|source| SendError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "payload saved");
    }

    Ok(payload)
}
