use std::fmt;
use std::str::FromStr;

use crate::constants::DIGEST_LEN;
use crate::encoding::{base64_encode, hex_decode, hex_encode};
use crate::error::{Result, Sha256Error};

/// A finished SHA-256 value: the big-endian serialisation of the final hash
/// state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; DIGEST_LEN]);

impl Digest {
    pub(crate) fn from_state(state: &[u32; 8]) -> Self {
        let mut bytes = [0u8; DIGEST_LEN];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(state) {
            chunk.copy_from_slice(&word.to_be_bytes());
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    pub fn to_base64(&self) -> String {
        base64_encode(&self.0)
    }

    /// Split the digest back into the eight chaining words it was serialised
    /// from. Feeding these to [`crate::Sha256::from_state`] continues the
    /// hash past the padded message.
    pub fn to_state(&self) -> [u32; 8] {
        std::array::from_fn(|i| {
            let b = &self.0[4 * i..4 * i + 4];
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        })
    }
}

impl From<[u8; DIGEST_LEN]> for Digest {
    fn from(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }
}

impl From<Digest> for [u8; DIGEST_LEN] {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for Digest {
    fn eq(&self, other: &[u8]) -> bool {
        self.0.as_slice() == other
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = Sha256Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex_decode(s)?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|b: Vec<u8>| {
            Sha256Error::InvalidHex(format!("expected {DIGEST_LEN} bytes, got {}", b.len()))
        })?;
        Ok(Self(bytes))
    }
}
