use crate::constants::{BLOCK_LEN, ROUND_CONSTANTS};

/// Run the SHA-256 compression function over every complete block in
/// `bytes`, folding each into `state`.
///
/// `schedule` is scratch space for the message schedule and is overwritten
/// for each block. Returns the number of bytes consumed, always a multiple of
/// [`BLOCK_LEN`]; any trailing partial block is left for the caller.
pub fn compress_blocks(state: &mut [u32; 8], schedule: &mut [u32; 64], bytes: &[u8]) -> usize {
    let mut blocks = bytes.chunks_exact(BLOCK_LEN);
    for block in blocks.by_ref() {
        compress_block(state, schedule, block);
    }
    bytes.len() - blocks.remainder().len()
}

fn compress_block(state: &mut [u32; 8], w: &mut [u32; 64], block: &[u8]) {
    for (word, bytes) in w.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }
    for i in 16..64 {
        w[i] = small_sigma1(w[i - 2])
            .wrapping_add(w[i - 7])
            .wrapping_add(small_sigma0(w[i - 15]))
            .wrapping_add(w[i - 16]);
    }

    let [mut a, mut b, mut c, mut d, mut e, mut f, mut g, mut h] = *state;

    for (&k, &word) in ROUND_CONSTANTS.iter().zip(w.iter()) {
        let temp1 = h
            .wrapping_add(big_sigma1(e))
            .wrapping_add(ch(e, f, g))
            .wrapping_add(k)
            .wrapping_add(word);
        let temp2 = big_sigma0(a).wrapping_add(maj(a, b, c));

        h = g;
        g = f;
        f = e;
        e = d.wrapping_add(temp1);
        d = c;
        c = b;
        b = a;
        a = temp1.wrapping_add(temp2);
    }

    for (word, val) in state.iter_mut().zip([a, b, c, d, e, f, g, h]) {
        *word = word.wrapping_add(val);
    }
}

fn small_sigma0(x: u32) -> u32 {
    x.rotate_right(7) ^ x.rotate_right(18) ^ (x >> 3)
}

fn small_sigma1(x: u32) -> u32 {
    x.rotate_right(17) ^ x.rotate_right(19) ^ (x >> 10)
}

fn big_sigma0(a: u32) -> u32 {
    a.rotate_right(2) ^ a.rotate_right(13) ^ a.rotate_right(22)
}

fn big_sigma1(e: u32) -> u32 {
    e.rotate_right(6) ^ e.rotate_right(11) ^ e.rotate_right(25)
}

fn ch(e: u32, f: u32, g: u32) -> u32 {
    g ^ (e & (f ^ g))
}

fn maj(a: u32, b: u32, c: u32) -> u32 {
    (a & b) | (c & (a ^ b))
}
