mod compress;
pub mod constants;
mod digest;
mod encoding;
mod error;
mod sha256;

pub use compress::compress_blocks;
pub use digest::Digest;
pub use encoding::{base64_decode, base64_encode, hex_decode, hex_encode};
pub use error::{Result, Sha256Error};
pub use sha256::{md_padding, Sha256, TextEncoding, MAX_MESSAGE_LEN};
