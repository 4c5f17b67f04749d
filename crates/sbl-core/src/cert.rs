//! Ed25519 certificate chain.
//!
//! A certificate is `signature(64) || date(8, little-endian) || public_key(32)`,
//! optionally followed by a parent certificate's bytes (the "chain"). The
//! signature covers everything after it, so a chained certificate's
//! signature also covers its embedded parent.
//!
//! The signature block format (`sigblock.rs`) always embeds exactly two
//! certificate levels (208 bytes). A deployment with only one real level
//! of certification (the root certifies the signing key directly) gets
//! there with [`self_wrap`]: the signing key re-certifies its own public
//! key, embedding the root-issued certificate as the chain, so the
//! resulting 208-byte blob still carries two verifiable links.

use crate::error::SblError;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

pub const CERT_SIZE: usize = 104;
pub const CHAIN_SIZE: usize = CERT_SIZE * 2;
const SIG_SIZE: usize = 64;
const PK_SIZE: usize = 32;

/// Builds a certificate: `signing_key` certifies `subject_pk` as valid from
/// `date` onward, with `parent_chain` (possibly empty) appended as the
/// embedded parent certificate.
pub fn build_cert(signing_key: &SigningKey, subject_pk: &[u8; PK_SIZE], date: u64, parent_chain: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(8 + PK_SIZE + parent_chain.len());
    body.extend_from_slice(&date.to_le_bytes());
    body.extend_from_slice(subject_pk);
    body.extend_from_slice(parent_chain);
    let sig: Signature = signing_key.sign(&body);
    let mut cert = Vec::with_capacity(SIG_SIZE + body.len());
    cert.extend_from_slice(&sig.to_bytes());
    cert.extend_from_slice(&body);
    cert
}

/// Re-certifies `signing_key`'s own public key, embedding `issued_cert` (the
/// certificate the root issued for that key) as the chain. Used to produce
/// a two-level, 208-byte chain when there is only one real certification
/// step.
pub fn self_wrap(signing_key: &SigningKey, issued_cert: &[u8], date: u64) -> Vec<u8> {
    let pk = signing_key.verifying_key().to_bytes();
    build_cert(signing_key, &pk, date, issued_cert)
}

/// Verifies one certificate link: `cert`'s leading 64-byte signature over
/// the rest of `cert`, under `pk`. The certified date must not precede
/// `min_date` (the issuer's own certified date), enforcing that no link
/// in the chain claims to predate its issuer. Returns the certified public
/// key and date.
pub fn verify_link(cert: &[u8], pk: &VerifyingKey, min_date: u64) -> Result<(VerifyingKey, u64), SblError> {
    if cert.len() < SIG_SIZE + 8 + PK_SIZE {
        return Err(SblError::VerificationFailure("certificate too short".into()));
    }
    let (sig_bytes, body) = cert.split_at(SIG_SIZE);
    let sig = Signature::from_slice(sig_bytes)
        .map_err(|e| SblError::VerificationFailure(format!("malformed certificate signature: {e}")))?;
    pk.verify(body, &sig)
        .map_err(|_| SblError::VerificationFailure("unable to validate certificate signature".into()))?;

    let date = u64::from_le_bytes(body[0..8].try_into().unwrap());
    let new_pk_bytes: [u8; PK_SIZE] = body[8..8 + PK_SIZE].try_into().unwrap();
    let new_pk = VerifyingKey::from_bytes(&new_pk_bytes)
        .map_err(|e| SblError::VerificationFailure(format!("invalid certified public key: {e}")))?;
    if date < min_date {
        return Err(SblError::VerificationFailure(
            "certificate date earlier than signer's date".into(),
        ));
    }
    Ok((new_pk, date))
}

/// Verifies an embedded two-level certificate chain against `root_pk`,
/// returning the signing public key and date that ultimately signs the
/// code image.
pub fn verify_chain(chain: &[u8; CHAIN_SIZE], root_pk: &VerifyingKey) -> Result<(VerifyingKey, u64), SblError> {
    let (_, pk2, date2) = verify_chain_steps(chain, root_pk)?;
    Ok((pk2, date2))
}

/// Per-link result of [`verify_chain_steps`], named after the field the CLI's
/// `--debug` diagnostic (spec.md §4.G step 3/4) prints them under.
#[derive(Debug, Clone, Copy)]
pub struct ChainStep {
    pub pk: VerifyingKey,
    pub date: u64,
}

/// Same as [`verify_chain`], but also returns the intermediate (cert1) link,
/// for `sbl verify --debug`'s per-cert date/pk diagnostic (spec.md §9
/// "Supplemented features" item 5).
pub fn verify_chain_steps(
    chain: &[u8; CHAIN_SIZE],
    root_pk: &VerifyingKey,
) -> Result<(ChainStep, VerifyingKey, u64), SblError> {
    let primary = &chain[CERT_SIZE..CHAIN_SIZE];
    let secondary = &chain[..];
    let (pk1, date1) = verify_link(primary, root_pk, 0)?;
    let (pk2, date2) = verify_link(secondary, &pk1, date1)?;
    Ok((ChainStep { pk: pk1, date: date1 }, pk2, date2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn keypair() -> SigningKey {
        SigningKey::generate(&mut OsRng)
    }

    #[test]
    fn two_level_chain_verifies() {
        let root = keypair();
        let l1 = keypair();
        let l2 = keypair();

        let l1_cert = build_cert(&root, &l1.verifying_key().to_bytes(), 1000, &[]);
        let l2_cert = build_cert(&l1, &l2.verifying_key().to_bytes(), 1100, &l1_cert);

        let mut chain = [0u8; CHAIN_SIZE];
        chain.copy_from_slice(&l2_cert);
        let (pk, date) = verify_chain(&chain, &root.verifying_key()).unwrap();
        assert_eq!(pk, l2.verifying_key());
        assert_eq!(date, 1100);
    }

    #[test]
    fn self_wrapped_single_level_chain_verifies() {
        let root = keypair();
        let leaf = keypair();

        let leaf_cert = build_cert(&root, &leaf.verifying_key().to_bytes(), 500, &[]);
        let wrapped = self_wrap(&leaf, &leaf_cert, 500);

        let mut chain = [0u8; CHAIN_SIZE];
        chain.copy_from_slice(&wrapped);
        let (pk, date) = verify_chain(&chain, &root.verifying_key()).unwrap();
        assert_eq!(pk, leaf.verifying_key());
        assert_eq!(date, 500);
    }

    #[test]
    fn rejects_date_regression() {
        let root = keypair();
        let l1 = keypair();
        let l2 = keypair();

        let l1_cert = build_cert(&root, &l1.verifying_key().to_bytes(), 2000, &[]);
        // l2 claims an earlier date than its issuer l1.
        let l2_cert = build_cert(&l1, &l2.verifying_key().to_bytes(), 1000, &l1_cert);

        let mut chain = [0u8; CHAIN_SIZE];
        chain.copy_from_slice(&l2_cert);
        assert!(verify_chain(&chain, &root.verifying_key()).is_err());
    }

    #[test]
    fn rejects_wrong_root() {
        let root = keypair();
        let wrong_root = keypair();
        let l1 = keypair();

        let l1_cert = build_cert(&root, &l1.verifying_key().to_bytes(), 1, &[]);
        let wrapped = self_wrap(&l1, &l1_cert, 1);
        let mut chain = [0u8; CHAIN_SIZE];
        chain.copy_from_slice(&wrapped);
        assert!(verify_chain(&chain, &wrong_root.verifying_key()).is_err());
    }
}
