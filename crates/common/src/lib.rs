/**
 * Cryptographic types and operations.
 *  - RSA-2048 key pairs for wrapping symmetric keys
 *  - AES-256-GCM content encryption
 */
pub mod crypto;
/**
 * The transport payload: a base64 wrapped JSON
 *  object carrying the wrapped key, nonce, ciphertext
 *  and the metadata of the file it protects.
 */
pub mod envelope;
/**
 * Error classification shared by every module,
 *  used by the sessions to decide how to recover.
 */
pub mod error;
/**
 * Size and content hash of a file about to be sent.
 */
pub mod metadata;
/**
 * Sender and receiver state machines, plus the
 *  dispatcher that runs their blocking work off
 *  the event loop.
 */
pub mod session;

pub use error::ErrorKind;

pub mod prelude {
    pub use crate::crypto::{KeyPair, Nonce, PrivateKey, PublicKey, SymmetricKey};
    pub use crate::envelope::{build_envelope, open_envelope, Envelope, EnvelopeError};
    pub use crate::error::ErrorKind;
    pub use crate::metadata::{extract_metadata, FileMetadata};
    pub use crate::session::{
        Dispatcher, EventReceiver, ReceiveInput, ReceiveOptions, ReceiveSession, ReceiveStep,
        SendInput, SendSession, SendStep, Task, TaskEvent, TaskFailure,
    };
}
