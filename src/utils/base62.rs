//! Base-62 encoding of counter values into short ids.
//!
//! The alphabet is digits, then uppercase, then lowercase, so ids sort the
//! same way their numeric values do when they have equal length.

/// Ordered symbol set; a symbol's index is its digit value.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

const BASE: u64 = ALPHABET.len() as u64;

/// `u64::MAX` needs 11 base-62 digits.
const MAX_LEN: usize = 11;

/// Canonical ids shadowed by static routes. They are never issued.
pub const RESERVED_IDS: &[&str] = &["health"];

/// Whether `id` must be skipped when issuing ids.
pub fn is_reserved(id: &str) -> bool {
    RESERVED_IDS.contains(&id)
}

/// Encodes `n` most-significant digit first.
///
/// `encode(0)` returns `"0"` so ids are never empty.
///
/// # Examples
///
/// ```
/// use url_shortener::utils::base62::encode;
///
/// assert_eq!(encode(3256), "qW");
/// assert_eq!(encode(0), "0");
/// ```
pub fn encode(mut n: u64) -> String {
    if n == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::with_capacity(MAX_LEN);
    while n > 0 {
        digits.push(ALPHABET[(n % BASE) as usize]);
        n /= BASE;
    }
    digits.reverse();

    // Every byte comes from ALPHABET, which is ASCII.
    digits.into_iter().map(char::from).collect()
}

/// Decodes a canonical id back to its value.
///
/// Returns `None` for empty input, symbols outside the alphabet, leading
/// zeros (which `encode` never produces) and values above `u64::MAX`.
pub fn decode(id: &str) -> Option<u64> {
    let bytes = id.as_bytes();
    if bytes.is_empty() || bytes.len() > MAX_LEN {
        return None;
    }
    if bytes.len() > 1 && bytes[0] == ALPHABET[0] {
        return None;
    }

    bytes.iter().try_fold(0u64, |acc, &b| {
        let digit = digit_value(b)?;
        acc.checked_mul(BASE)?.checked_add(digit)
    })
}

fn digit_value(b: u8) -> Option<u64> {
    let v = match b {
        b'0'..=b'9' => b - b'0',
        b'A'..=b'Z' => b - b'A' + 10,
        b'a'..=b'z' => b - b'a' + 36,
        _ => return None,
    };
    Some(u64::from(v))
}
