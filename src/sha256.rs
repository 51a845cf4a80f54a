use std::io;
use std::str::FromStr;

use crate::compress::compress_blocks;
use crate::constants::{BLOCK_LEN, INITIAL_STATE, LENGTH_FIELD_LEN, PADDING};
use crate::digest::Digest;
use crate::error::{Result, Sha256Error};

/// Longest message, in bytes, whose bit length still fits the 64-bit
/// length field.
pub const MAX_MESSAGE_LEN: u64 = u64::MAX / 8;

/// How text handed to [`Sha256::update_text`] becomes bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per char. Chars above U+00FF are rejected.
    #[default]
    Binary,
    Utf8,
}

impl FromStr for TextEncoding {
    type Err = Sha256Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "binary" => Ok(Self::Binary),
            "utf8" | "utf-8" => Ok(Self::Utf8),
            other => Err(Sha256Error::invalid_argument(format!(
                "unknown text encoding '{other}'"
            ))),
        }
    }
}

/// Incremental SHA-256 hasher.
///
/// Bytes may be fed in pieces of any size; full blocks are compressed as
/// soon as they are available and at most one partial block is held back.
/// [`Sha256::digest`] takes a snapshot without finishing the stream, so the
/// same handle can keep absorbing input afterwards.
#[derive(Debug, Clone)]
pub struct Sha256 {
    state: [u32; 8],
    buffer: [u8; BLOCK_LEN],
    buffer_len: usize,
    message_len: u64,
    schedule: [u32; 64],
}

impl Sha256 {
    pub fn new() -> Self {
        Self {
            state: INITIAL_STATE,
            buffer: [0u8; BLOCK_LEN],
            buffer_len: 0,
            message_len: 0,
            schedule: [0u32; 64],
        }
    }

    /// Resume hashing from a chaining value reached after `message_len`
    /// bytes. `message_len` must be a whole number of blocks since a bare
    /// state carries no buffered tail.
    pub fn from_state(state: [u32; 8], message_len: u64) -> Result<Self> {
        if message_len % BLOCK_LEN as u64 != 0 {
            return Err(Sha256Error::invalid_argument(format!(
                "resume length {message_len} is not a multiple of {BLOCK_LEN}"
            )));
        }
        if message_len > MAX_MESSAGE_LEN {
            return Err(Sha256Error::MessageTooLong {
                message_len,
                additional: 0,
            });
        }
        log::trace!("resuming sha256 state after {message_len} bytes");
        Ok(Self {
            state,
            message_len,
            ..Self::new()
        })
    }

    pub fn digest_message(message: &[u8]) -> Result<Digest> {
        let mut hasher = Self::new();
        hasher.update(message)?;
        Ok(hasher.digest())
    }

    /// Reset to the initial state, discarding everything absorbed so far.
    pub fn start(&mut self) -> &mut Self {
        log::trace!("resetting sha256 after {} bytes", self.message_len);
        self.state = INITIAL_STATE;
        self.buffer_len = 0;
        self.message_len = 0;
        self
    }

    /// Absorb raw bytes. Fails only if the total length would no longer fit
    /// the length field, in which case the handle is left unchanged.
    pub fn update(&mut self, data: &[u8]) -> Result<&mut Self> {
        self.message_len = checked_message_len(self.message_len, data.len())?;
        self.absorb(data);
        Ok(self)
    }

    pub fn update_text(&mut self, text: &str, encoding: TextEncoding) -> Result<&mut Self> {
        match encoding {
            TextEncoding::Utf8 => self.update(text.as_bytes()),
            TextEncoding::Binary => {
                let bytes = text
                    .chars()
                    .enumerate()
                    .map(|(i, c)| {
                        u8::try_from(c).map_err(|_| {
                            log::debug!("rejecting binary text: {c:?} at char {i}");
                            Sha256Error::invalid_argument(format!(
                                "char {c:?} at position {i} does not fit in one byte"
                            ))
                        })
                    })
                    .collect::<Result<Vec<u8>>>()?;
                self.update(&bytes)
            }
        }
    }

    /// Digest of everything absorbed so far. The handle is not modified.
    pub fn digest(&self) -> Digest {
        let mut state = self.state;
        let mut schedule = [0u32; 64];

        let mut tail = [0u8; 2 * BLOCK_LEN];
        let mut end = self.buffer_len;
        tail[..end].copy_from_slice(&self.buffer[..end]);

        let pad_len = padding_len(self.message_len);
        tail[end..end + pad_len].copy_from_slice(&PADDING[..pad_len]);
        end += pad_len;

        // message_len never exceeds MAX_MESSAGE_LEN, so this cannot overflow.
        let bit_len = self.message_len << 3;
        tail[end..end + LENGTH_FIELD_LEN].copy_from_slice(&bit_len.to_be_bytes());
        end += LENGTH_FIELD_LEN;

        compress_blocks(&mut state, &mut schedule, &tail[..end]);
        Digest::from_state(&state)
    }

    /// Independent handle with the same progress as this one.
    pub fn copy(&self) -> Self {
        log::trace!("copying sha256 after {} bytes", self.message_len);
        self.clone()
    }

    /// Number of message bytes absorbed, padding excluded.
    pub fn message_len(&self) -> u64 {
        self.message_len
    }

    fn absorb(&mut self, mut data: &[u8]) {
        let mut blocks = 0;

        if self.buffer_len > 0 {
            let to_copy = (BLOCK_LEN - self.buffer_len).min(data.len());
            self.buffer[self.buffer_len..self.buffer_len + to_copy]
                .copy_from_slice(&data[..to_copy]);
            self.buffer_len += to_copy;
            data = &data[to_copy..];

            if self.buffer_len < BLOCK_LEN {
                return;
            }
            compress_blocks(&mut self.state, &mut self.schedule, &self.buffer);
            self.buffer_len = 0;
            blocks += 1;
        }

        let consumed = compress_blocks(&mut self.state, &mut self.schedule, data);
        blocks += consumed / BLOCK_LEN;

        let tail = &data[consumed..];
        self.buffer[..tail.len()].copy_from_slice(tail);
        self.buffer_len = tail.len();

        log::trace!(
            "compressed {blocks} blocks, {} bytes buffered",
            self.buffer_len
        );
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        Self::new()
    }
}

impl io::Write for Sha256 {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The bytes appended to a message of `message_len` bytes before its final
/// compression: `0x80`, zeros up to 56 mod 64, then the bit length as a
/// big-endian `u64`.
pub fn md_padding(message_len: u64) -> Result<Vec<u8>> {
    checked_message_len(message_len, 0)?;
    let mut padding = PADDING[..padding_len(message_len)].to_vec();
    padding.extend_from_slice(&(message_len << 3).to_be_bytes());
    Ok(padding)
}

/// Number of pad bytes (excluding the length field) for a message of
/// `message_len` bytes. Always between 1 and 64.
fn padding_len(message_len: u64) -> usize {
    let buffered = (message_len % BLOCK_LEN as u64) as usize;
    BLOCK_LEN - (buffered + LENGTH_FIELD_LEN) % BLOCK_LEN
}

fn checked_message_len(message_len: u64, additional: usize) -> Result<u64> {
    let additional = additional as u64;
    message_len
        .checked_add(additional)
        .filter(|&len| len <= MAX_MESSAGE_LEN)
        .ok_or_else(|| {
            log::debug!("rejecting {additional} bytes after {message_len}: bit length overflows");
            Sha256Error::MessageTooLong {
                message_len,
                additional,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::base64_decode;

    use rand::{rngs::StdRng, Rng, SeedableRng};
    use rstest::rstest;

    fn hex_digest(hasher: &Sha256) -> String {
        hasher.digest().to_hex()
    }

    #[rstest]
    #[case("", "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=")]
    #[case("abc", "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=")]
    #[case(
        "We all live in a yellow submarine.",
        "YIJExmRkEr9V0Q4jsQNKi+Bo7XhIpJNg/+ph2vkTyDI="
    )]
    #[case(&"012345".repeat(127), "ZeVat0eeGoWR07JInXRX5gYwrIJXK3m86PBbMku0RBw=")]
    fn digest_returns_expected_hash(#[case] input: &str, #[case] expected: &str) {
        let mut hasher = Sha256::default();
        hasher.update(input.as_bytes()).unwrap();
        let digest = hasher.digest();

        let expected_bytes = base64_decode(expected).unwrap();
        assert_eq!(digest.as_bytes().as_slice(), expected_bytes.as_slice());
    }

    #[rstest]
    #[case(0, "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    #[case(1, "ca978112ca1bbdcafac231b39a23dc4da786eff8147c4e72b9807785afee48bb")]
    #[case(55, "9f4390f8d30c2dd92ec9f095b65e2b9ae9b0a925a5258e241c9f1e910f734318")]
    #[case(56, "b35439a4ac6f0948b6d6f9e3c6af0f5f590ce20f1bde7090ef7970686ec6738a")]
    #[case(57, "f13b2d724659eb3bf47f2dd6af1accc87b81f09f59f2b75e5c0bed6589dfe8c6")]
    #[case(63, "7d3e74a05d7db15bce4ad9ec0658ea98e3f06eeecf16b4c6fff2da457ddc2f34")]
    #[case(64, "ffe054fe7ae0cb6dc65c3af9b61d5209f439851db43d0ba5997337df154668eb")]
    #[case(65, "635361c48bb9eab14198e76ea8ab7f1a41685d6ad62aa9146d301d4f17eb0ae0")]
    #[case(119, "31eba51c313a5c08226adf18d4a359cfdfd8d2e816b13f4af952f7ea6584dcfb")]
    #[case(120, "2f3d335432c70b580af0e8e1b3674a7c020d683aa5f73aaaedfdc55af904c21c")]
    #[case(121, "e9615320128cc7a3d6078e9af05603188e5ccbf0d07d8b735d3df5e8e0c1281f")]
    #[case(128, "6836cf13bac400e9105071cd6af47084dfacad4e5e302c94bfed24e013afb73e")]
    fn boundary_lengths_match_reference(#[case] len: usize, #[case] expected: &str) {
        let mut hasher = Sha256::new();
        hasher.update(&vec![b'a'; len]).unwrap();

        assert_eq!(hex_digest(&hasher), expected);
    }

    #[rstest]
    #[case(0, 56)]
    #[case(1, 55)]
    #[case(55, 1)]
    #[case(56, 64)]
    #[case(63, 57)]
    #[case(64, 56)]
    #[case(120, 64)]
    fn padding_always_has_at_least_one_byte(#[case] message_len: u64, #[case] pad_len: usize) {
        assert_eq!(padding_len(message_len), pad_len);
        assert_eq!((message_len as usize + pad_len + LENGTH_FIELD_LEN) % BLOCK_LEN, 0);
    }

    #[test]
    fn md_padding_ends_in_big_endian_bit_length() {
        let padding = md_padding(3).unwrap();

        assert_eq!(padding.len(), 61);
        assert_eq!(padding[0], 0x80);
        assert!(padding[1..53].iter().all(|&b| b == 0));
        assert_eq!(padding[53..], [0, 0, 0, 0, 0, 0, 0, 24]);
    }

    #[test]
    fn digest_does_not_disturb_the_stream() {
        let mut hasher = Sha256::new();
        hasher.update(b"ab").unwrap();

        let first = hasher.digest();
        let second = hasher.digest();
        assert_eq!(first, second);

        hasher.update(b"c").unwrap();
        assert_eq!(
            hex_digest(&hasher),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn copy_is_independent_of_source() {
        let mut original = Sha256::new();
        original.update(&[7u8; 100]).unwrap();

        let mut copied = original.copy();
        copied.update(b"only in the copy").unwrap();

        assert_eq!(original.message_len(), 100);
        assert_eq!(copied.message_len(), 116);
        assert_ne!(original.digest(), copied.digest());
    }

    #[test]
    fn start_resets_to_empty_message() {
        let mut hasher = Sha256::new();
        hasher.update(b"some discarded prefix").unwrap();

        hasher.start().update(b"abc").unwrap();

        assert_eq!(hasher.message_len(), 3);
        assert_eq!(hasher.digest(), Sha256::digest_message(b"abc").unwrap());
    }

    #[test]
    fn updates_can_be_chained() {
        let mut hasher = Sha256::new();
        hasher.update(b"a").unwrap().update(b"").unwrap().update(b"bc").unwrap();

        assert_eq!(hasher.digest(), Sha256::digest_message(b"abc").unwrap());
    }

    #[test]
    fn random_partitions_match_single_update() {
        let mut rng = StdRng::seed_from_u64(101);
        let message: Vec<u8> = (0..1000).map(|_| rng.gen()).collect();
        let expected = Sha256::digest_message(&message).unwrap();

        for _ in 0..50 {
            let mut hasher = Sha256::new();
            let mut rest = message.as_slice();
            while !rest.is_empty() {
                let n = rng.gen_range(0..=rest.len().min(150));
                let (piece, tail) = rest.split_at(n);
                hasher.update(piece).unwrap();
                rest = tail;
            }
            assert_eq!(hasher.digest(), expected);
        }
    }

    #[rstest]
    #[case(
        "héllo wörld €",
        TextEncoding::Utf8,
        "a3260bb658a2bce4e8e8b9cd613904a51582e107bd16c453b5530bd56be4937a"
    )]
    #[case(
        "héllo wörld",
        TextEncoding::Binary,
        "12d616370ce8314b1af15dec5dd3657c827b146290171fe61689372b1ca21397"
    )]
    fn text_is_encoded_before_hashing(
        #[case] text: &str,
        #[case] encoding: TextEncoding,
        #[case] expected: &str,
    ) {
        let mut hasher = Sha256::new();
        hasher.update_text(text, encoding).unwrap();

        assert_eq!(hex_digest(&hasher), expected);
    }

    #[test]
    fn binary_text_rejects_wide_chars_and_keeps_state() {
        let mut hasher = Sha256::new();
        hasher.update(b"abc").unwrap();

        let err = hasher.update_text("a€", TextEncoding::Binary).unwrap_err();

        assert!(matches!(err, Sha256Error::InvalidArgument { .. }));
        assert_eq!(hasher.message_len(), 3);
    }

    #[rstest]
    #[case("raw", TextEncoding::Binary)]
    #[case("binary", TextEncoding::Binary)]
    #[case("utf8", TextEncoding::Utf8)]
    #[case("UTF-8", TextEncoding::Utf8)]
    fn text_encoding_parses_known_names(#[case] name: &str, #[case] expected: TextEncoding) {
        assert_eq!(name.parse::<TextEncoding>().unwrap(), expected);
    }

    #[test]
    fn unknown_text_encoding_is_invalid_argument() {
        assert!(matches!(
            "latin9".parse::<TextEncoding>(),
            Err(Sha256Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn overlong_message_is_rejected_without_mutation() {
        let mut hasher = Sha256::from_state(INITIAL_STATE, MAX_MESSAGE_LEN - 63).unwrap();
        let before = hasher.digest();

        let err = hasher.update(&[0u8; 64]).unwrap_err();

        assert_eq!(
            err,
            Sha256Error::MessageTooLong {
                message_len: MAX_MESSAGE_LEN - 63,
                additional: 64,
            }
        );
        assert_eq!(hasher.digest(), before);
    }

    #[test]
    fn resume_requires_block_aligned_length() {
        assert!(matches!(
            Sha256::from_state(INITIAL_STATE, 10),
            Err(Sha256Error::InvalidArgument { .. })
        ));
    }

    #[test]
    fn resumed_state_extends_padded_message() {
        let secret_prefixed = b"secret key || original message";
        let suffix = b";admin=true";
        let mac = Sha256::digest_message(secret_prefixed).unwrap();

        let glue = md_padding(secret_prefixed.len() as u64).unwrap();
        let padded_len = (secret_prefixed.len() + glue.len()) as u64;
        let mut forged = Sha256::from_state(mac.to_state(), padded_len).unwrap();
        forged.update(suffix).unwrap();

        let full = [secret_prefixed.as_slice(), &glue, suffix].concat();
        assert_eq!(forged.digest(), Sha256::digest_message(&full).unwrap());
    }

    #[test]
    fn io_copy_feeds_the_hasher() {
        let message = b"The quick brown fox jumps over the lazy dog".repeat(10);
        let mut hasher = Sha256::new();

        io::copy(&mut message.as_slice(), &mut hasher).unwrap();

        assert_eq!(hasher.digest(), Sha256::digest_message(&message).unwrap());
    }
}
