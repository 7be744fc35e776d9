//! Checkout code minting.
//!
//! Codes are the 16-character prefix of
//! `BASE32(timestamp_micros "-" counter "-" 8 random bytes)`, opaque to
//! clients. Sixteen base32 characters cover only the first ten bytes of
//! the input, which is the leading digits of the microsecond timestamp:
//! distinctness comes from the clock at second resolution, and the
//! counter and random tail lie past the truncation boundary.

use std::sync::atomic::{AtomicI64, Ordering};

use base32::Alphabet;
use chrono::Utc;
use rand::RngCore;

pub const CODE_LENGTH: usize = 16;

static MINT_COUNTER: AtomicI64 = AtomicI64::new(0);

pub fn generate_code() -> String {
    let timestamp = Utc::now().timestamp_micros();
    let count = MINT_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;

    let mut random = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut random);

    encode_code(timestamp, count, &random)
}

fn encode_code(timestamp_micros: i64, count: i64, random: &[u8; 8]) -> String {
    let mut raw = format!("{timestamp_micros}-{count}-").into_bytes();
    raw.extend_from_slice(random);

    let mut encoded = base32::encode(Alphabet::Rfc4648 { padding: false }, &raw);
    encoded.truncate(CODE_LENGTH);
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_length() {
        assert_eq!(generate_code().len(), CODE_LENGTH);
    }

    #[test]
    fn test_code_alphabet() {
        // RFC 4648 base32: A-Z and 2-7
        for _ in 0..100 {
            let code = generate_code();
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)),
                "unexpected character in code {code}"
            );
        }
    }

    #[test]
    fn test_codes_differ_across_seconds() {
        let random = [0u8; 8];
        let earlier = encode_code(1_722_500_000_000_000, 1, &random);
        let later = encode_code(1_722_500_001_000_000, 2, &random);
        assert_ne!(earlier, later);
    }

    #[test]
    fn test_truncation_keeps_only_the_timestamp_prefix() {
        // 16 base32 chars encode exactly 10 input bytes, so two codes
        // minted within the same second are identical regardless of
        // counter and randomness.
        let first = encode_code(1_722_500_000_000_000, 1, &[0u8; 8]);
        let second = encode_code(1_722_500_000_999_999, 999, &[0xFF; 8]);
        assert_eq!(first, second);
    }
}
