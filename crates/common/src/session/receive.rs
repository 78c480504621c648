//! Receiver session
//!
//! ```text
//! GeneratingKey -> AwaitingPayload -> Decrypting -> Success
//! ```
//!
//! A receiver either brings its own private key or gets an ephemeral key pair
//! generated for the session. The encoded public key is handed to the sender,
//! the payload comes back, and the recovered file is written to the output
//! directory.

use std::fmt;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::jobs::{Task, TaskEvent, TaskFailure};
use crate::crypto::{KeyError, KeyPair, PrivateKey};
use crate::envelope::{open_and_save, EnvelopeError, SavedFile};
use crate::error::ErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStep {
    GeneratingKey,
    AwaitingPayload,
    Decrypting,
    Success,
}

/// Everything that can move a receive session forward
#[derive(Debug, Clone)]
pub enum ReceiveInput {
    /// The user submitted a payload
    SubmitPayload(String),
    /// Try key generation again after it failed
    Retry,
    /// A dispatched task finished
    Task(TaskEvent),
}

impl From<TaskEvent> for ReceiveInput {
    fn from(event: TaskEvent) -> Self {
        ReceiveInput::Task(event)
    }
}

/// What a receive session starts from
#[derive(Clone, Default)]
pub struct ReceiveOptions {
    /// PEM encoded private key; a fresh pair is generated when absent or invalid
    pub private_key_pem: Option<Zeroizing<Vec<u8>>>,
    /// A payload already read from disk
    pub payload: Option<String>,
    /// Where `payload` was read from
    pub payload_path: Option<PathBuf>,
    /// Delete `payload_path` once its payload was opened
    pub delete_payload: bool,
    pub output_dir: PathBuf,
}

// the key PEM stays out of logs
impl fmt::Debug for ReceiveOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReceiveOptions")
            .field("has_private_key", &self.private_key_pem.is_some())
            .field("payload_len", &self.payload.as_ref().map(String::len))
            .field("payload_path", &self.payload_path)
            .field("delete_payload", &self.delete_payload)
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ReceiveSession {
    step: ReceiveStep,
    key_pair: Option<KeyPair>,
    encoded_public_key: Option<String>,
    payload: Option<String>,
    // the held payload is the content of `payload_path`
    payload_from_file: bool,
    payload_path: Option<PathBuf>,
    delete_payload: bool,
    output_dir: PathBuf,
    saved: Option<SavedFile>,
    removal_pending: bool,
    removed_payload: Option<PathBuf>,
    removal_error: Option<TaskFailure>,
    warning: Option<String>,
    error: Option<TaskFailure>,
}

impl ReceiveSession {
    /// Start a session
    ///
    /// A supplied private key is decoded here. If it does not decode, the
    /// session falls back to generating a key pair and keeps a warning for
    /// display. With both a usable key and a payload, decryption starts
    /// immediately.
    pub fn start(options: ReceiveOptions) -> (Self, Option<Task>) {
        let ReceiveOptions {
            private_key_pem,
            payload,
            payload_path,
            delete_payload,
            output_dir,
        } = options;

        let payload = payload.filter(|payload| !payload.trim().is_empty());
        let mut session = Self {
            step: ReceiveStep::GeneratingKey,
            key_pair: None,
            encoded_public_key: None,
            payload_from_file: payload.is_some() && payload_path.is_some(),
            payload,
            payload_path,
            delete_payload,
            output_dir,
            saved: None,
            removal_pending: false,
            removed_payload: None,
            removal_error: None,
            warning: None,
            error: None,
        };

        if let Some(pem) = private_key_pem {
            match load_key_pair(&pem) {
                Ok((key_pair, encoded)) => {
                    session.key_pair = Some(key_pair);
                    session.encoded_public_key = Some(encoded);
                    session.step = ReceiveStep::AwaitingPayload;
                }
                Err(err) => {
                    tracing::warn!("invalid private key provided, generating a new one: {}", err);
                    session.warning = Some(format!(
                        "Invalid private key provided: {}. Generating new key...",
                        err
                    ));
                }
            }
        }

        match session.step {
            ReceiveStep::GeneratingKey => (session, Some(Task::GenerateKeyPair)),
            _ => match session.payload.clone() {
                Some(payload) => session.decrypt(payload),
                None => (session, None),
            },
        }
    }

    pub fn step(&self) -> ReceiveStep {
        self.step
    }

    /// The base64 public key to hand to the sender
    pub fn public_key(&self) -> Option<&str> {
        self.encoded_public_key.as_deref()
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    /// A payload held but not yet submitted, such as one read from disk while
    /// the session key was still being generated
    pub fn draft_payload(&self) -> Option<&str> {
        match self.step {
            ReceiveStep::GeneratingKey | ReceiveStep::AwaitingPayload => self.payload.as_deref(),
            _ => None,
        }
    }

    pub fn saved_file(&self) -> Option<&SavedFile> {
        self.saved.as_ref()
    }

    pub fn removed_payload(&self) -> Option<&Path> {
        self.removed_payload.as_deref()
    }

    pub fn removal_error(&self) -> Option<&TaskFailure> {
        self.removal_error.as_ref()
    }

    /// A non-fatal problem noticed at start
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    /// The most recent failure, cleared by the next successful step
    pub fn error(&self) -> Option<&TaskFailure> {
        self.error.as_ref()
    }

    /// Whether a key generation failure is waiting for a [`ReceiveInput::Retry`]
    pub fn can_retry(&self) -> bool {
        self.step == ReceiveStep::GeneratingKey && self.error.is_some()
    }

    /// Whether the session is waiting on a dispatched task
    pub fn is_busy(&self) -> bool {
        match self.step {
            ReceiveStep::GeneratingKey => self.error.is_none(),
            ReceiveStep::AwaitingPayload => false,
            ReceiveStep::Decrypting => true,
            ReceiveStep::Success => self.removal_pending,
        }
    }

    pub fn is_done(&self) -> bool {
        self.step == ReceiveStep::Success && !self.removal_pending
    }

    fn decrypt(mut self, payload: String) -> (Self, Option<Task>) {
        let Some(private_key) = self.key_pair.as_ref().map(|pair| pair.private.clone()) else {
            return (self, None);
        };
        let task = Task::OpenEnvelope {
            payload: payload.clone(),
            private_key,
            output_dir: self.output_dir.clone(),
        };
        tracing::debug!(payload_len = payload.len(), "decrypting payload");
        self.payload = Some(payload);
        self.error = None;
        self.step = ReceiveStep::Decrypting;
        (self, Some(task))
    }

    pub fn update(mut self, input: ReceiveInput) -> (Self, Option<Task>) {
        match (self.step, input) {
            (
                ReceiveStep::GeneratingKey,
                ReceiveInput::Task(TaskEvent::KeyGenerated {
                    key_pair,
                    encoded_public_key,
                }),
            ) => {
                tracing::debug!(bits = key_pair.public.bits(), "session key pair ready");
                self.key_pair = Some(key_pair);
                self.encoded_public_key = Some(encoded_public_key);
                self.error = None;
                self.step = ReceiveStep::AwaitingPayload;
                (self, None)
            }
            (ReceiveStep::GeneratingKey, ReceiveInput::Task(TaskEvent::Failed(failure))) => {
                tracing::debug!("key generation failed: {}", failure);
                self.key_pair = None;
                self.encoded_public_key = None;
                self.error = Some(failure);
                (self, None)
            }
            (ReceiveStep::GeneratingKey, ReceiveInput::Retry) if self.error.is_some() => {
                tracing::debug!("retrying key generation");
                self.error = None;
                (self, Some(Task::GenerateKeyPair))
            }

            (ReceiveStep::AwaitingPayload, ReceiveInput::SubmitPayload(payload))
                if !payload.trim().is_empty() =>
            {
                if self.payload.as_deref() != Some(payload.as_str()) {
                    self.payload_from_file = false;
                }
                self.decrypt(payload)
            }

            (ReceiveStep::Decrypting, ReceiveInput::Task(TaskEvent::EnvelopeOpened(saved))) => {
                tracing::debug!(path = %saved.path.display(), "file saved");
                self.saved = Some(saved);
                self.error = None;
                self.step = ReceiveStep::Success;

                let removal = match (&self.payload_path, self.delete_payload) {
                    (Some(path), true) if self.payload_from_file => Some(path.clone()),
                    _ => None,
                };
                match removal {
                    Some(path) => {
                        self.removal_pending = true;
                        (self, Some(Task::RemovePayload { path }))
                    }
                    None => (self, None),
                }
            }
            (ReceiveStep::Decrypting, ReceiveInput::Task(TaskEvent::Failed(failure))) => {
                tracing::debug!("could not open payload: {}", failure);
                self.payload = None;
                self.payload_from_file = false;
                self.error = Some(failure);
                self.step = ReceiveStep::AwaitingPayload;
                (self, None)
            }

            (ReceiveStep::Success, ReceiveInput::Task(TaskEvent::PayloadRemoved(path)))
                if self.removal_pending =>
            {
                tracing::debug!(path = %path.display(), "payload deleted");
                self.removal_pending = false;
                self.removed_payload = Some(path);
                (self, None)
            }
            (ReceiveStep::Success, ReceiveInput::Task(TaskEvent::Failed(failure)))
                if self.removal_pending =>
            {
                tracing::warn!("failed to delete payload: {}", failure);
                self.removal_pending = false;
                self.removal_error = Some(failure);
                (self, None)
            }

            (step, _) => {
                tracing::trace!(?step, "ignoring input");
                (self, None)
            }
        }
    }
}

fn load_key_pair(pem: &[u8]) -> Result<(KeyPair, String), KeyError> {
    let key_pair = KeyPair::from_private(PrivateKey::from_pem(pem)?);
    let encoded = key_pair.public.encode()?;
    Ok((key_pair, encoded))
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("error decoding private key: {0}")]
    PrivateKey(#[source] KeyError),
    #[error("error processing payload: {0}")]
    Payload(#[source] EnvelopeError),
}

impl ReceiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReceiveError::PrivateKey(err) => err.kind(),
            ReceiveError::Payload(err) => err.kind(),
        }
    }
}

/// Result of a headless receive
#[derive(Debug)]
pub struct ReceiveReport {
    pub saved: SavedFile,
    /// Set when deletion of the payload file was requested
    pub removal: Option<std::io::Result<PathBuf>>,
}

/// Decode the key, open the payload and save the file in one go
///
/// Deleting the payload is best effort: a failure is reported in the
/// [`ReceiveReport`] and does not fail the run.
pub fn run_headless(
    private_key_pem: &[u8],
    payload: &str,
    output_dir: &Path,
    delete_payload: Option<&Path>,
) -> Result<ReceiveReport, ReceiveError> {
    let private_key = PrivateKey::from_pem(private_key_pem).map_err(ReceiveError::PrivateKey)?;
    let saved = open_and_save(payload, &private_key, output_dir).map_err(ReceiveError::Payload)?;
    tracing::debug!(path = %saved.path.display(), "file saved");

    let removal = delete_payload.map(|path| {
        std::fs::remove_file(path)
            .map(|_| path.to_path_buf())
            .inspect_err(|err| tracing::warn!("failed to delete payload file: {}", err))
    });

    Ok(ReceiveReport { saved, removal })
}
