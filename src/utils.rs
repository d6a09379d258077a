use std::io::Cursor;

use rand::distr::{Alphanumeric, SampleString};
use sha1::{Digest, Sha1};

pub fn sha1(payload: &str) -> String {
    let hash = Sha1::digest(payload);
    base16ct::lower::encode_string(&hash)
}

/// 32-bit Murmur3 (x86 variant, seed 0) of the given text.
pub fn murmur3(payload: &str) -> u32 {
    // Reading from an in-memory cursor cannot fail.
    murmur3::murmur3_32(&mut Cursor::new(payload.as_bytes()), 0).unwrap_or_default()
}

pub fn random_seed() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 32)
}
