pub mod certgen;
pub mod config;
pub mod keygen;
pub mod resplit;
pub mod sign;
pub mod verify;
pub mod verifykey;

use anyhow::{Context, Result};
use ed25519_dalek::SigningKey;
use sbl_core::{envelope, Gf2Field, Point};
use std::path::Path;

use crate::keystore::KeyStore;

/// Generates a fresh Ed25519 signing key whose 32-byte seed is also a
/// valid nonzero element of the signing field (spec.md §4.B forbids
/// splitting a zero secret). A freshly generated seed is zero with
/// negligible probability; the loop exists purely so that impossibility
/// is enforced rather than assumed.
pub fn generate_nonzero_key() -> (SigningKey, sbl_core::Gf2Element) {
    let gf = Gf2Field::key_field();
    loop {
        let key = SigningKey::generate(&mut rand::rngs::OsRng);
        if let Ok(secret) = gf.element_from_bytes_be(&key.to_bytes()) {
            if !secret.is_zero() {
                return (key, secret);
            }
        }
    }
}

/// Splits `secret` into `(k, n)` shares, persists them and the
/// corresponding public key under `store` as `name.share.<x>`/`name.pub`,
/// and prints each full share (including its passphrase) once so the
/// operator can hand it to its holder — the persisted copy omits the
/// passphrase per spec.md §6's file-at-rest format.
pub fn split_and_store(
    store: &KeyStore,
    name: &str,
    signing_key: &SigningKey,
    secret: &sbl_core::Gf2Element,
    k: usize,
    n: usize,
) -> Result<()> {
    let gf = Gf2Field::key_field();
    let points = sbl_core::sss::split(&gf, secret, k, n)?;
    store.create()?;
    for point in &points {
        persist_share(store, name, point)?;
    }
    let pk = signing_key.verifying_key().to_bytes();
    crate::keystore::write_pubkey(&store.pub_path(name), &pk)?;
    println!(
        "wrote {} (fingerprint {})",
        store.pub_path(name).display(),
        crate::keystore::fingerprint(&pk)
    );
    Ok(())
}

fn persist_share(store: &KeyStore, name: &str, point: &Point) -> Result<()> {
    let x = *point
        .x
        .to_bytes_be(1)
        .first()
        .context("share x coordinate out of range")?;
    let full_text = envelope::encode_share(point, None)?;
    println!("share {name}.share.{x}: {full_text}");
    let at_rest = at_rest_form(&full_text)?;
    std::fs::write(store.share_path(name, x), at_rest)
        .with_context(|| format!("writing {}", store.share_path(name, x).display()))?;
    Ok(())
}

/// Strips the trailing passphrase field from an encoded share, per
/// spec.md §6's file-at-rest format (`"<x>:zbase32(...)"`, no passphrase).
pub fn at_rest_form(full_text: &str) -> Result<String> {
    let mut parts = full_text.splitn(3, ':');
    let x = parts.next().context("malformed share")?;
    let blob = parts.next().context("malformed share")?;
    Ok(format!("{x}:{blob}"))
}

/// Writes an exported (not keystore-managed) share/pubkey pair under
/// `prefix` in the current directory, for handing individual shares
/// directly to their holders without a shared `.sbl/` store.
pub fn export_shares(prefix: &str, signing_key: &SigningKey, points: &[Point]) -> Result<()> {
    for point in points {
        let x = *point
            .x
            .to_bytes_be(1)
            .first()
            .context("share x coordinate out of range")?;
        let text = envelope::encode_share(point, None)?;
        let path = Path::new(".").join(format!("{prefix}.share.{x}.txt"));
        std::fs::write(&path, &text).with_context(|| format!("writing {}", path.display()))?;
        println!("wrote {}", path.display());
    }
    let pk = signing_key.verifying_key().to_bytes();
    let pub_path = Path::new(".").join(format!("{prefix}.pub"));
    crate::keystore::write_pubkey(&pub_path, &pk)?;
    println!("wrote {} (fingerprint {})", pub_path.display(), crate::keystore::fingerprint(&pk));
    Ok(())
}
