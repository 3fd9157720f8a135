//! Dependency-free ULID generation.
//!
//! 26-character Crockford Base32 over 128 bits: a 48-bit big-endian
//! millisecond timestamp, a 16-bit sequence that resets each new
//! millisecond and bumps on same-millisecond collisions, and 80 bits of
//! OS randomness. The (timestamp, sequence) pair lives under a
//! process-wide mutex so ids stay unique within one millisecond.

use std::time::{SystemTime, UNIX_EPOCH};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;

const CROCKFORD: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

static STATE: Lazy<Mutex<(u64, u16)>> = Lazy::new(|| Mutex::new((0, 0)));

/// Generates a fresh ULID.
pub fn generate_ulid() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before epoch")
        .as_millis() as u64;

    let seq = {
        let mut state = STATE.lock();
        if state.0 == ts {
            state.1 = state.1.wrapping_add(1);
        } else {
            *state = (ts, 0);
        }
        state.1
    };

    let mut b = [0u8; 16];
    // 48-bit big-endian timestamp.
    b[0] = (ts >> 40) as u8;
    b[1] = (ts >> 32) as u8;
    b[2] = (ts >> 24) as u8;
    b[3] = (ts >> 16) as u8;
    b[4] = (ts >> 8) as u8;
    b[5] = ts as u8;
    // Cryptographic randomness for the tail, then the sequence overwrites
    // bytes 6-7 to guarantee same-millisecond uniqueness.
    OsRng.fill_bytes(&mut b[6..]);
    b[6..8].copy_from_slice(&seq.to_be_bytes());

    encode(b)
}

/// Crockford Base32 encoding of 128 bits into 26 characters.
fn encode(b: [u8; 16]) -> String {
    let v = u128::from_be_bytes(b);
    let mut out = [0u8; 26];
    for (i, slot) in out.iter_mut().enumerate() {
        let shift = 5 * (25 - i);
        *slot = CROCKFORD[((v >> shift) & 0x1f) as usize];
    }
    String::from_utf8(out.to_vec()).expect("crockford output is ascii")
}
