/// Errors produced by the digest engine and its encoding helpers.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Sha256Error {
    /// Input that cannot be turned into a byte sequence, or a resume state
    /// that does not sit on a block boundary.
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    /// Appending `additional` bytes to a message of `message_len` bytes would
    /// overflow the 64-bit bit-length field.
    #[error("message too long: {message_len} + {additional} bytes exceeds 2^64 - 1 bits")]
    MessageTooLong { message_len: u64, additional: u64 },

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid base64: {0}")]
    InvalidBase64(String),
}

impl Sha256Error {
    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Sha256Error>;
