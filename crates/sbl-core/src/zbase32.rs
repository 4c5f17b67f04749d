//! zbase32: Zooko's human-oriented base-32 encoding.
//!
//! <https://philzimmermann.com/docs/human-oriented-base-32-encoding.txt>,
//! itself a relabeling of the RFC 3548 base-32 alphabet. Encoded output is
//! grouped into hyphenated 5-character chunks for readability and is safe
//! to embed in a URL.

use crate::error::SblError;

const ALPHABET: &[u8; 32] = b"ybndrfg8ejkmcpqxot1uwisza345h769";

fn reverse_lookup(c: u8) -> Option<u32> {
    ALPHABET.iter().position(|&a| a == c).map(|p| p as u32)
}

/// Encodes `data` as lowercase zbase32, grouped into `-`-separated 5-char
/// chunks.
pub fn encode(data: &[u8]) -> String {
    let mut nbits: i32 = 0;
    let mut v: u32 = 0;
    let mut i = 0usize;
    let mut raw = String::new();
    loop {
        if nbits < 5 && i < data.len() {
            v |= (data[i] as u32) << nbits;
            i += 1;
            nbits += 8;
        }
        if nbits <= 0 {
            break;
        }
        raw.push(ALPHABET[(v & 0x1F) as usize] as char);
        v >>= 5;
        nbits -= 5;
    }
    let chars: Vec<char> = raw.chars().collect();
    chars
        .chunks(5)
        .map(|chunk| chunk.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("-")
}

/// Decodes a zbase32 string, ignoring `-` separators and accepting either
/// case. Rejects input whose trailing bits don't collapse to a whole
/// number of bytes (i.e. not an integral encoding of some byte string).
pub fn decode(s: &str) -> Result<Vec<u8>, SblError> {
    let cleaned: Vec<u8> = s
        .chars()
        .filter(|&c| c != '-')
        .map(|c| c.to_ascii_lowercase() as u8)
        .collect();
    let mut out = Vec::new();
    let mut nbits: i32 = 0;
    let mut v: u32 = 0;
    let mut i = 0usize;
    loop {
        while nbits < 8 && i < cleaned.len() {
            let digit = reverse_lookup(cleaned[i]).ok_or_else(|| {
                SblError::InvalidEncoding(format!("'{}' is not a zbase32 character", cleaned[i] as char))
            })?;
            v |= digit << nbits;
            i += 1;
            nbits += 5;
        }
        if nbits < 8 {
            if v != 0 {
                return Err(SblError::InvalidEncoding("trailing bits are not all zero".into()));
            }
            break;
        }
        out.push((v & 0xFF) as u8);
        v >>= 8;
        nbits -= 8;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_vectors() {
        assert_eq!(encode(&[0x00]), "yy");
        assert_eq!(encode(b"foo"), "c3zs6");
    }

    #[test]
    fn round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let encoded = encode(data);
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn decode_is_case_insensitive_and_ignores_hyphens() {
        let encoded = encode(b"foo");
        let upper = encoded.to_uppercase();
        assert_eq!(decode(&upper).unwrap(), decode(&encoded).unwrap());
    }

    #[test]
    fn rejects_invalid_character() {
        assert!(decode("!!!!!").is_err());
    }
}
