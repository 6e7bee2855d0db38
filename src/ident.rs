//! Deterministic entity keys
//!
//! Entities get stable, content-derived names usable as cache and storage
//! keys across tenants. A key is derived either from an externally supplied
//! identifier (namespace + local name) or from a set of characteristic
//! literal values, hashed to 32 bits and encoded over a fixed alphabet.
//!
//! The encoding alphabet deliberately omits `x`: it is the pad character,
//! so a padded key can never collide with an unpadded one. Collisions at
//! the 32-bit birthday bound are possible and are the caller's concern.

use serde::{Deserialize, Serialize};

/// Fixed length of every generated key.
pub const KEY_LENGTH: usize = 12;

const PAD: char = 'x';
const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwyz0123456789_";

/// A fixed-length, deterministic, printable entity key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey(String);

impl EntityKey {
    /// Derive a key from an existing resource identifier.
    ///
    /// Namespace and local name are concatenated and run through a fast
    /// non-cryptographic 32-bit hash.
    pub fn from_identifier(namespace: &str, local_name: &str) -> Self {
        let mut buf = String::with_capacity(namespace.len() + local_name.len());
        buf.push_str(namespace);
        buf.push_str(local_name);
        Self(encode(u64::from(fnv1a_32(buf.as_bytes()))))
    }

    /// Derive a key from characteristic content values.
    ///
    /// Values are concatenated in argument order and checksummed, so the
    /// same values in a different order produce a different key.
    pub fn from_content<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let joined: String = values.into_iter().collect();
        Self(encode(u64::from(crc32c(joined.as_bytes()))))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encode a non-negative integer over the alphabet, most significant digit
/// first, right-padded to [`KEY_LENGTH`].
///
/// A 32-bit input needs at most 7 digits in base 36, so the truncation
/// branch is unreachable today; it caps the length should the input width
/// ever grow.
fn encode(mut number: u64) -> String {
    let base = ALPHABET.len() as u64;
    let mut digits = Vec::new();
    loop {
        digits.push(ALPHABET[(number % base) as usize] as char);
        number /= base;
        if number == 0 {
            break;
        }
    }
    digits.reverse();

    let mut key: String = digits.into_iter().collect();
    if key.len() > KEY_LENGTH {
        key.truncate(KEY_LENGTH);
    }
    while key.len() < KEY_LENGTH {
        key.push(PAD);
    }
    key
}

/// FNV-1a, 32-bit.
fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 0x811c_9dc5;
    for &b in bytes {
        hash ^= u32::from(b);
        hash = hash.wrapping_mul(16_777_619);
    }
    hash
}

/// CRC-32C (Castagnoli), bitwise.
fn crc32c(bytes: &[u8]) -> u32 {
    let mut crc: u32 = !0;
    for &b in bytes {
        crc ^= u32::from(b);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0x82f6_3b78 & mask);
        }
    }
    !crc
}
