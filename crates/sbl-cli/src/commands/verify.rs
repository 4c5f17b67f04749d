//! `sbl verify` (spec.md §6, §4.G "Verify").

use crate::codec::load_flat;
use crate::keystore;
use anyhow::Result;
use ed25519_dalek::VerifyingKey;
use std::path::Path;

pub fn run(root: &Path, debug: bool, code: &Path) -> Result<()> {
    let root_pk_bytes = keystore::read_pubkey(root)?;
    let root_pk = VerifyingKey::from_bytes(&root_pk_bytes)?;
    let image = load_flat(code)?;

    let (verified, cert1) = sbl_core::sigblock::verify_steps(&image, &root_pk)?;
    if debug {
        eprintln!("debug: cert1 pk={} date={}", hex::encode(cert1.pk.to_bytes()), cert1.date);
    }
    println!(
        "OK: {} ({}, {} bytes, signed {})",
        verified.what,
        verified.code_type.label(),
        verified.code_len,
        verified.date
    );
    Ok(())
}
