//! The 512-byte signature block prefixed to a signed firmware image.
//!
//! Layout (after the leading 64-byte Ed25519 signature):
//!
//! ```text
//! code_len: u32 LE | date: u64 LE | sha512(code): [u8;64] | code_type: u8
//! | what: up to 163 bytes (ASCII, NUL-terminated, 0xFF-padded)
//! | embedded cert chain: 208 bytes
//! ```
//!
//! totalling `512 - 64 = 448` signed bytes, with the whole 512-byte block
//! followed immediately by the code it covers.

use crate::cert::{self, CHAIN_SIZE};
use crate::error::SblError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};

pub const SIG_BLOCK_SIZE: usize = 512;
pub const SIG_SIZE: usize = 64;
pub const HASH_SIZE: usize = 64;
pub const MAX_WHAT_SIZE: usize = 163;

/// The `CODE_TYPE_*` byte embedded in the signature block, inferred from
/// the trailing 5 bytes of the `what` string (`" EFI\0"`, `" MFI\0"`,
/// `" AFI\0"`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeType {
    UnknownOrEfi,
    Mfi,
    Afi,
}

impl CodeType {
    fn from_byte(b: u8) -> Option<Self> {
        match b {
            0 => Some(CodeType::UnknownOrEfi),
            1 => Some(CodeType::Mfi),
            2 => Some(CodeType::Afi),
            _ => None,
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            CodeType::UnknownOrEfi => 0,
            CodeType::Mfi => 1,
            CodeType::Afi => 2,
        }
    }

    fn from_what_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b" EFI\0" => Some(CodeType::UnknownOrEfi),
            b" MFI\0" => Some(CodeType::Mfi),
            b" AFI\0" => Some(CodeType::Afi),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CodeType::UnknownOrEfi => "unknown/efi",
            CodeType::Mfi => "mfi",
            CodeType::Afi => "afi",
        }
    }
}

/// Validates a `what` string: printable ASCII (`0x20..=0x7e`), NUL terminated.
fn decode_what(data: &[u8]) -> Result<String, SblError> {
    if data.last() != Some(&0) {
        return Err(SblError::InvalidEncoding("missing null terminator in what string".into()));
    }
    if data[..data.len() - 1].iter().any(|&b| !(0x20..=0x7e).contains(&b)) {
        return Err(SblError::InvalidEncoding("bad character in what string".into()));
    }
    Ok(String::from_utf8_lossy(data).into_owned())
}

/// Extracts the first NUL-terminated `@(#)`-prefixed "what" string from
/// `code`, including its trailing NUL byte.
pub fn extract_what(code: &[u8]) -> Result<String, SblError> {
    const MARKER: &[u8] = b"@(#)";
    let marker_at = code
        .windows(MARKER.len())
        .position(|w| w == MARKER)
        .ok_or_else(|| SblError::InvalidEncoding("missing what string marker".into()))?;
    let rest = &code[marker_at + MARKER.len()..];
    let nul_at = rest
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| SblError::InvalidEncoding("unterminated what string".into()))?;
    decode_what(&rest[..=nul_at])
}

/// Builds a 512-byte signature block over `code` and returns it prepended
/// to a copy of `code` (ready to write out as the signed image).
pub fn build(code: &[u8], chain: &[u8; CHAIN_SIZE], signing_key: &SigningKey, date: u64) -> Result<Vec<u8>, SblError> {
    let what = extract_what(code)?;
    if what.len() > MAX_WHAT_SIZE {
        return Err(SblError::InvalidInput(format!("code version string too long: {what:?}")));
    }
    if what.len() < 5 {
        return Err(SblError::InvalidInput(format!("code version string too short: {what:?}")));
    }
    let code_type = CodeType::from_what_tag(what.as_bytes()[what.len() - 5..].as_ref())
        .ok_or_else(|| SblError::InvalidInput("invalid code type suffix in what string".into()))?;

    let code_hash = Sha512::digest(code);
    let code_n = code.len() as u32;

    let mut sigdata = Vec::with_capacity(SIG_BLOCK_SIZE - SIG_SIZE);
    sigdata.extend_from_slice(&code_n.to_le_bytes());
    sigdata.extend_from_slice(&date.to_le_bytes());
    sigdata.extend_from_slice(&code_hash);
    sigdata.push(code_type.to_byte());
    sigdata.extend_from_slice(what.as_bytes());

    let pad = SIG_BLOCK_SIZE as isize - sigdata.len() as isize - chain.len() as isize - SIG_SIZE as isize;
    if pad < 0 {
        return Err(SblError::InvalidInput("signature block overflow".into()));
    }
    sigdata.extend(std::iter::repeat(0xFFu8).take(pad as usize));
    sigdata.extend_from_slice(chain);
    debug_assert_eq!(sigdata.len(), SIG_BLOCK_SIZE - SIG_SIZE);

    let sig: Signature = signing_key.sign(&sigdata);
    signing_key
        .verifying_key()
        .verify(&sigdata, &sig)
        .map_err(|_| SblError::VerificationFailure("unable to validate code signature".into()))?;

    let mut out = Vec::with_capacity(SIG_BLOCK_SIZE + code.len());
    out.extend_from_slice(&sig.to_bytes());
    out.extend_from_slice(&sigdata);
    out.extend_from_slice(code);
    Ok(out)
}

/// The facts a successful [`verify`] establishes about a signed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedImage {
    pub what: String,
    pub code_type: CodeType,
    pub code_len: u32,
    pub hash: [u8; HASH_SIZE],
    pub date: u64,
}

/// Verifies a signed image against `root_pk`: walks the embedded two-level
/// certificate chain, verifies the code signature under the resulting
/// leaf key, and cross-checks the code length, hash, `what` string and
/// date recorded in the signature block against the actual code body.
pub fn verify(signed: &[u8], root_pk: &VerifyingKey) -> Result<VerifiedImage, SblError> {
    verify_steps(signed, root_pk).map(|(image, _)| image)
}

/// Same as [`verify`], but also returns the intermediate certificate link
/// (cert1's public key and date), for `sbl verify --debug`'s per-cert
/// diagnostic (spec.md §9 "Supplemented features" item 5).
pub fn verify_steps(signed: &[u8], root_pk: &VerifyingKey) -> Result<(VerifiedImage, cert::ChainStep), SblError> {
    if signed.len() < SIG_BLOCK_SIZE {
        return Err(SblError::InvalidInput("image shorter than the signature block".into()));
    }
    let (sig_block, code) = signed.split_at(SIG_BLOCK_SIZE);
    let code_what = extract_what(code)?;
    let code_hash = Sha512::digest(code);
    let code_n = code.len() as u32;

    let (sig_bytes, rest) = sig_block.split_at(SIG_SIZE);
    let sig = Signature::from_slice(sig_bytes)
        .map_err(|e| SblError::VerificationFailure(format!("malformed signature: {e}")))?;

    let mut chain = [0u8; CHAIN_SIZE];
    chain.copy_from_slice(&rest[rest.len() - CHAIN_SIZE..]);
    if chain.iter().all(|&b| b == 0xFF) {
        return Err(SblError::VerificationFailure("no sigblock present".into()));
    }
    let (cert1, pk, pk_date) = cert::verify_chain_steps(&chain, root_pk)?;

    pk.verify(rest, &sig)
        .map_err(|_| SblError::VerificationFailure("unable to validate code signature".into()))?;

    let body = &rest[..rest.len() - CHAIN_SIZE];
    let (body, sig_what_field) = body.split_at(body.len() - MAX_WHAT_SIZE);
    let (body, code_type_byte) = body.split_at(body.len() - 1);
    let (header, code_hash2) = body.split_at(body.len() - HASH_SIZE);

    let code_n2 = u32::from_le_bytes(header[0..4].try_into().unwrap());
    let date = u64::from_le_bytes(header[4..12].try_into().unwrap());

    if code_n != code_n2 {
        return Err(SblError::VerificationFailure("code length mismatch".into()));
    }

    let nul_at = sig_what_field
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| SblError::VerificationFailure("invalid what string".into()))?;
    let sig_what = decode_what(&sig_what_field[..=nul_at])?;
    if sig_what != code_what {
        return Err(SblError::VerificationFailure(
            "signature what and code what don't match".into(),
        ));
    }

    if code_hash.as_slice() != code_hash2 {
        return Err(SblError::VerificationFailure("code hash mismatch".into()));
    }
    if pk_date > date {
        return Err(SblError::VerificationFailure(
            "certificate dates later than signature date".into(),
        ));
    }
    let code_type = CodeType::from_byte(code_type_byte[0])
        .ok_or_else(|| SblError::VerificationFailure("invalid code type".into()))?;

    let mut hash = [0u8; HASH_SIZE];
    hash.copy_from_slice(&code_hash);
    Ok((
        VerifiedImage {
            what: sig_what.trim_end_matches('\0').to_string(),
            code_type,
            code_len: code_n,
            hash,
            date,
        },
        cert1,
    ))
}

/// SHA-512 over `code` (optionally the `code` argument already includes
/// the signature block, for a "whole file" hash rather than just the
/// signed payload).
pub fn image_hash(code: &[u8]) -> [u8; HASH_SIZE] {
    let mut out = [0u8; HASH_SIZE];
    out.copy_from_slice(&Sha512::digest(code));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    fn sample_code() -> Vec<u8> {
        let mut code = b"int main() {}\0@(#)demo-1.0.0 EFI\0".to_vec();
        code.extend_from_slice(&[0xAAu8; 64]);
        code
    }

    fn chained_keys() -> (SigningKey, SigningKey, [u8; CHAIN_SIZE]) {
        let root = keypair();
        let leaf = keypair();
        let leaf_cert = cert::build_cert(&root, &leaf.verifying_key().to_bytes(), 100, &[]);
        let wrapped = cert::self_wrap(&leaf, &leaf_cert, 100);
        let mut chain = [0u8; CHAIN_SIZE];
        chain.copy_from_slice(&wrapped);
        (root, leaf, chain)
    }

    #[test]
    fn build_then_verify_round_trips() {
        let (root, leaf, chain) = chained_keys();
        let code = sample_code();
        let signed = build(&code, &chain, &leaf, 200).unwrap();
        assert_eq!(signed.len(), SIG_BLOCK_SIZE + code.len());

        let verified = verify(&signed, &root.verifying_key()).unwrap();
        assert_eq!(verified.code_len, code.len() as u32);
        assert_eq!(verified.code_type, CodeType::UnknownOrEfi);
        assert_eq!(verified.what, "demo-1.0.0 EFI");
    }

    #[test]
    fn tampered_code_fails_verification() {
        let (root, leaf, chain) = chained_keys();
        let code = sample_code();
        let mut signed = build(&code, &chain, &leaf, 200).unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0xFF;
        assert!(verify(&signed, &root.verifying_key()).is_err());
    }

    #[test]
    fn rejects_missing_what_string() {
        let (_, leaf, chain) = chained_keys();
        let code = b"no marker here".to_vec();
        assert!(build(&code, &chain, &leaf, 1).is_err());
    }

    #[test]
    fn reports_unsigned_image_distinctly() {
        let (root, _leaf, _chain) = chained_keys();
        let mut unsigned = vec![0xFFu8; SIG_BLOCK_SIZE];
        unsigned.extend_from_slice(b"payload");
        let err = verify(&unsigned, &root.verifying_key()).unwrap_err();
        assert!(err.to_string().contains("no sigblock present"));
    }
}
