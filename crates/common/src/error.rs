use std::fmt;

/// Broad class of a failure, independent of which module raised it.
///
/// Sessions use this to decide which state to fall back to, and the CLI
/// uses it to word its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed base64, JSON, hex, PEM or a field of the wrong length.
    /// Always recoverable by asking for the input again.
    Format,
    /// The input parsed but failed a cryptographic check: OAEP unwrap,
    /// GCM authentication, a non-RSA key or a content hash mismatch.
    Crypto,
    /// Opening, reading, writing or removing a file failed.
    Io,
    /// The system could not provide randomness or generate a key.
    Resource,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Format => "format error",
            ErrorKind::Crypto => "cryptographic error",
            ErrorKind::Io => "I/O error",
            ErrorKind::Resource => "resource error",
        };
        f.write_str(label)
    }
}
