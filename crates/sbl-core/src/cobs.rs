//! Consistent Overhead Byte Stuffing framing.
//!
//! <http://www.stuartcheshire.org/papers/COBSforToN.pdf>. Encodes a byte
//! string with no embedded zero bytes, so the wire format can use `0x00` as
//! an unambiguous frame delimiter. [`encode_zpe`]/[`decode_zpe`] add the
//! "zero-pair elision" extension, which folds a run that ends with two
//! consecutive zero bytes into a single code byte instead of two.
//!
//! The reference implementation also has a `dec_fast` variant, a
//! preallocating rewrite meant for a language with expensive per-call
//! allocation; there is no equivalent overhead to amortize in this runtime
//! so only the straightforward decoder below is provided.

use crate::error::SblError;

/// Standard COBS encoding.
pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 254 + 2);
    let mut buf = data.to_vec();
    buf.push(0); // fake zero
    while !buf.is_empty() {
        let i = buf.iter().position(|&b| b == 0).expect("fake zero guarantees a match");
        if i >= 254 {
            out.push(255);
            out.extend_from_slice(&buf[..254]);
            buf.drain(..254);
            if buf == [0] {
                break;
            }
        } else {
            out.push((i + 1) as u8);
            out.extend_from_slice(&buf[..i]);
            buf.drain(..=i);
        }
    }
    out
}

/// Standard COBS decoding. The "fast" preallocating decoder from the
/// reference implementation is deliberately not ported.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, SblError> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;
    while !rest.is_empty() {
        let code = rest[0] as usize;
        if code == 0 {
            return Err(SblError::InvalidEncoding("zero code byte in COBS frame".into()));
        }
        if code > rest.len() {
            return Err(SblError::InvalidEncoding("COBS code byte overruns frame".into()));
        }
        let seg = &rest[1..code];
        rest = &rest[code..];
        out.extend_from_slice(seg);
        if code == 255 && rest.is_empty() {
            out.push(0);
        } else if code < 255 {
            out.push(0);
        }
    }
    if out.pop() != Some(0) {
        return Err(SblError::InvalidEncoding("COBS frame missing trailing fake zero".into()));
    }
    Ok(out)
}

/// COBS with zero-pair elision: a run of up to 30 nonzero bytes followed by
/// two consecutive zero bytes is coded as a single `0xE1..=0xFF` byte
/// instead of spending a whole extra code byte on the second zero.
pub fn encode_zpe(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 0xDF + 2);
    let mut buf = data.to_vec();
    buf.push(0);
    while !buf.is_empty() {
        let i = buf.iter().position(|&b| b == 0).expect("fake zero guarantees a match");
        if i >= 0xDF {
            out.push(0xE0);
            out.extend_from_slice(&buf[..0xDF]);
            buf.drain(..0xDF);
        } else if buf.len() >= i + 2 && buf[i + 1] == 0 && i <= 30 {
            out.push((i + 0xE1) as u8);
            out.extend_from_slice(&buf[..i]);
            buf.drain(..i + 2);
        } else {
            out.push((i + 1) as u8);
            out.extend_from_slice(&buf[..i]);
            buf.drain(..=i);
        }
    }
    out
}

/// Decodes a zero-pair-elided COBS frame.
pub fn decode_zpe(data: &[u8]) -> Result<Vec<u8>, SblError> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;
    while !rest.is_empty() {
        let code = rest[0] as usize;
        if code == 0 {
            return Err(SblError::InvalidEncoding("zero code byte in COBS/ZPE frame".into()));
        }
        if code < 0xE0 {
            if code > rest.len() {
                return Err(SblError::InvalidEncoding("COBS/ZPE code byte overruns frame".into()));
            }
            out.extend_from_slice(&rest[1..code]);
            out.push(0);
            rest = &rest[code..];
        } else if code == 0xE0 {
            if code > rest.len() {
                return Err(SblError::InvalidEncoding("COBS/ZPE code byte overruns frame".into()));
            }
            out.extend_from_slice(&rest[1..code]);
            rest = &rest[code..];
        } else {
            let span = code - 0xE0;
            if span > rest.len() {
                return Err(SblError::InvalidEncoding("COBS/ZPE code byte overruns frame".into()));
            }
            out.extend_from_slice(&rest[1..span]);
            out.push(0);
            out.push(0);
            rest = &rest[span..];
        }
    }
    if out.pop() != Some(0) {
        return Err(SblError::InvalidEncoding("COBS/ZPE frame missing trailing fake zero".into()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_vectors() {
        assert_eq!(encode(b""), vec![0x01]);
        assert_eq!(encode(&[0x00]), vec![0x01, 0x01]);
        assert_eq!(encode(&[0x11, 0x22, 0x00, 0x33]), vec![0x03, 0x11, 0x22, 0x02, 0x33]);
    }

    #[test]
    fn round_trips_arbitrary_data() {
        let data = b"\x00\x01the quick\x00brown\x00\x00fox\x00";
        let encoded = encode(data);
        assert!(!encoded.contains(&0));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn round_trips_long_run_without_zero() {
        let data = vec![0xAAu8; 600];
        let encoded = encode(&data);
        assert!(!encoded.contains(&0));
        assert_eq!(decode(&encoded).unwrap(), data);
    }

    #[test]
    fn zpe_round_trips() {
        let data = b"abc\x00\x00def\x00ghi";
        let encoded = encode_zpe(data);
        assert!(!encoded.contains(&0));
        assert_eq!(decode_zpe(&encoded).unwrap(), data);
    }

    #[test]
    fn zpe_is_no_larger_than_plain_cobs_on_zero_pairs() {
        let data = b"\x00\x00\x00\x00\x00\x00";
        assert!(encode_zpe(data).len() <= encode(data).len());
    }

    #[test]
    fn decode_rejects_zero_code_byte() {
        assert!(decode(&[0x00, 0x01]).is_err());
    }
}
