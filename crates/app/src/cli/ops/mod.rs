pub mod keygen;
pub mod receive;
pub mod send;

pub use keygen::Keygen;
pub use receive::ReceiveFile;
pub use send::SendFile;
