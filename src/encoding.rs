/// Hex and base64 helpers for moving digests in and out of text.
use crate::error::{Result, Sha256Error};

const BASE64_CHARS: &[u8] =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/".as_bytes();

pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn hex_decode(hex: &str) -> Result<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(Sha256Error::InvalidHex(format!(
            "odd number of characters ({})",
            hex.len()
        )));
    }
    if let Some(c) = hex.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(Sha256Error::InvalidHex(format!("unknown hex char '{c}'")));
    }
    hex.as_bytes()
        .chunks_exact(2)
        .map(|pair| {
            // Both characters are ASCII hex digits, checked above.
            let s = std::str::from_utf8(pair).map_err(|e| Sha256Error::InvalidHex(e.to_string()))?;
            u8::from_str_radix(s, 16).map_err(|e| Sha256Error::InvalidHex(e.to_string()))
        })
        .collect()
}

pub fn base64_encode(bytes: &[u8]) -> String {
    let encode_len = bytes.len().div_ceil(3) * 4;
    let mut b64 = String::with_capacity(encode_len);
    for bit_idx in BitIter::new(bytes) {
        b64.push(BASE64_CHARS[bit_idx as usize] as char);
    }
    for _ in 0..((bytes.len() * 2) % 3) {
        b64.push('=');
    }
    b64
}

pub fn base64_decode(s: &str) -> Result<Vec<u8>> {
    let trimmed = s.trim_end_matches('=');
    if s.len() - trimmed.len() > 2 {
        return Err(Sha256Error::InvalidBase64("too much padding".to_string()));
    }
    if trimmed.len() % 4 == 1 {
        return Err(Sha256Error::InvalidBase64(format!(
            "truncated input of {} chars",
            trimmed.len()
        )));
    }

    let mut bytes = Vec::with_capacity(trimmed.len() * 3 / 4);
    let mut acc: u32 = 0;
    let mut n_bits = 0;
    for c in trimmed.bytes() {
        acc = (acc << 6) | u32::from(char_to_base64_index(c)?);
        n_bits += 6;
        if n_bits >= 8 {
            n_bits -= 8;
            bytes.push((acc >> n_bits) as u8);
            acc &= (1 << n_bits) - 1;
        }
    }
    Ok(bytes)
}

fn char_to_base64_index(c: u8) -> Result<u8> {
    match c {
        b'A'..=b'Z' => Ok(c - b'A'),
        b'a'..=b'z' => Ok(c - b'a' + 26),
        b'0'..=b'9' => Ok(c - b'0' + 52),
        b'+' => Ok(62),
        b'/' => Ok(63),
        _ => Err(Sha256Error::InvalidBase64(format!(
            "unknown base64 char '{}'",
            c as char
        ))),
    }
}

/// Walks a byte slice six bits at a time.
struct BitIter<'a> {
    bytes: &'a [u8],
    /// Current bit position in the entire byte stream
    bit_pos: usize,
}

impl<'a> BitIter<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, bit_pos: 0 }
    }
}

impl Iterator for BitIter<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        let byte_idx = self.bit_pos / 8;
        let bit_offset = self.bit_pos % 8;
        if byte_idx >= self.bytes.len() {
            return None;
        }

        self.bit_pos += 6;

        // Work out contribution from the current byte.
        if bit_offset == 0 {
            return Some(self.bytes[byte_idx] >> 2);
        }
        let byte_mask = 0b11111100 >> bit_offset;
        let masked_current_byte = self.bytes[byte_idx] & byte_mask;
        let from_byte = masked_current_byte << (bit_offset - 2);

        // Work out contribution from next byte.
        if bit_offset > 2 && byte_idx + 1 < self.bytes.len() {
            let from_next_byte = self.bytes[byte_idx + 1] >> (10 - bit_offset);
            return Some(from_byte | from_next_byte);
        }
        Some(from_byte)
    }
}
