//! Symbol and time-bucket encoding helpers
//!
//! Currency keys are stored on chain as zero-padded fixed-length byte strings.
//! Record ids and key comparisons depend on the exact byte layout, so encoding
//! and decoding here are byte-for-byte.

use std::num::NonZeroU64;

use alloy::primitives::{Bytes, FixedBytes};
use lazy_static::lazy_static;

use crate::models::rate::{CurrencyKey, Granularity};

/// Default length of an encoded symbol (bytes32)
pub const SYMBOL_LENGTH: usize = 32;

pub const DAY_SECONDS: NonZeroU64 = NonZeroU64::new(86_400).unwrap();
pub const FIFTEEN_MINUTE_SECONDS: NonZeroU64 = NonZeroU64::new(900).unwrap();

lazy_static! {
    pub static ref SUSD_32: Bytes = encode_symbol("sUSD", 32);
    pub static ref SUSD_4: Bytes = encode_symbol("sUSD", 4);
}

/// Encode `text` into exactly `length` bytes
///
/// Shorter input is right-padded with zeros; longer input is truncated.
pub fn encode_symbol(text: &str, length: usize) -> Bytes {
    let source = text.as_bytes();
    let mut bytes = vec![0u8; length];
    let copied = source.len().min(length);
    bytes[..copied].copy_from_slice(&source[..copied]);
    Bytes::from(bytes)
}

/// Encode `text` as a bytes32 currency key
pub fn currency_key(text: &str) -> CurrencyKey {
    FixedBytes::from_slice(&encode_symbol(text, SYMBOL_LENGTH))
}

/// String form of an encoded symbol: every byte decoded, trailing NULs trimmed
///
/// Leading and interior NULs are kept. An all-zero key decodes to the empty string.
pub fn symbol_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\0')
        .to_string()
}

/// `floor(timestamp / bucket_size)` as a decimal string
pub fn bucket_id(timestamp: u64, bucket_size: NonZeroU64) -> String {
    (timestamp / bucket_size.get()).to_string()
}

impl Granularity {
    pub fn bucket_seconds(&self) -> NonZeroU64 {
        match self {
            Granularity::Daily => DAY_SECONDS,
            Granularity::FifteenMinute => FIFTEEN_MINUTE_SECONDS,
        }
    }

    /// Bucket id of `timestamp` at this granularity
    pub fn bucket_id(&self, timestamp: u64) -> String {
        bucket_id(timestamp, self.bucket_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_symbol_pads_with_zeros() {
        let encoded = encode_symbol("SNX", 32);
        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[..3], b"SNX");
        assert!(encoded[3..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_encode_symbol_truncates() {
        let encoded = encode_symbol("ExchangeRates", 4);
        assert_eq!(&encoded[..], b"Exch");
    }

    #[test]
    fn test_susd_constants() {
        assert_eq!(SUSD_32.len(), 32);
        assert_eq!(&SUSD_32[..4], b"sUSD");
        assert_eq!(&SUSD_4[..], b"sUSD");
    }

    #[test]
    fn test_symbol_round_trip() {
        let key = currency_key("sETH");
        assert_eq!(symbol_to_string(key.as_slice()), "sETH");
    }

    #[test]
    fn test_symbol_to_string_empty_key() {
        assert_eq!(symbol_to_string(FixedBytes::<32>::ZERO.as_slice()), "");
    }

    #[test]
    fn test_symbol_to_string_keeps_interior_zeros() {
        let mut raw = [0u8; 8];
        raw[..2].copy_from_slice(b"ab");
        raw[3] = b'c';
        assert_eq!(symbol_to_string(&raw), "ab\0c");
    }

    #[test]
    fn test_symbol_to_string_keeps_leading_zero() {
        let mut raw = [0u8; 32];
        raw[1..4].copy_from_slice(b"SNX");
        assert_eq!(symbol_to_string(&raw), "\0SNX");
    }

    #[test]
    fn test_bucket_boundaries() {
        assert_eq!(bucket_id(899, FIFTEEN_MINUTE_SECONDS), "0");
        assert_eq!(bucket_id(900, FIFTEEN_MINUTE_SECONDS), "1");
        assert_eq!(bucket_id(86_399, DAY_SECONDS), "0");
        assert_eq!(bucket_id(86_400, DAY_SECONDS), "1");
    }

    #[test]
    fn test_granularity_bucket_id() {
        let ts = 1_600_000_000;
        assert_eq!(Granularity::Daily.bucket_id(ts), "18518");
        assert_eq!(Granularity::FifteenMinute.bucket_id(ts), "1777777");
    }
}
