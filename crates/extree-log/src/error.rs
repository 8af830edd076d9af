use thiserror::Error;

/// Result type local to extree-log.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("log storage error: {0}")]
    Storage(String),

    #[error("unsupported codec: {0}")]
    CodecUnsupported(&'static str),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("checksum mismatch in segment at offset {offset}")]
    ChecksumMismatch { offset: u64 },

    #[error("corrupt log: {0}")]
    Corrupt(String),

    #[error("replay error: {0}")]
    Replay(String),
}
