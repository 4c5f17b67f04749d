//! `sbl sign` (spec.md §6, §4.G "Build (signing)").

use crate::codec::load_flat;
use crate::date::parse_date;
use crate::keystore;
use crate::shares::reconstruct_signing_key;
use anyhow::{bail, Result};
use ed25519_dalek::SigningKey;
use sbl_core::{cert, sigblock, CERT_SIZE, CHAIN_SIZE};
use std::path::Path;

/// Expands a 104- or 208-byte certificate into the 208-byte chain the
/// sigblock embeds. A lone 104-byte cert means `signing_key` was
/// certified directly by the root with no intermediate level; per
/// spec.md §9's Open Question, the second slot is filled by having
/// `signing_key` re-certify its own public key over the supplied cert
/// (`cert::self_wrap`), not a byte-for-byte duplicate.
fn build_chain(signing_key: &SigningKey, cert_bytes: &[u8], date: u64) -> Result<[u8; CHAIN_SIZE]> {
    let mut out = [0u8; CHAIN_SIZE];
    match cert_bytes.len() {
        CHAIN_SIZE => out.copy_from_slice(cert_bytes),
        CERT_SIZE => out.copy_from_slice(&cert::self_wrap(signing_key, cert_bytes, date)),
        other => bail!("certificate must be {CERT_SIZE} or {CHAIN_SIZE} bytes, got {other}"),
    }
    Ok(out)
}

pub fn run(key: &[String], code: &Path, cert_path: &Path, date: Option<&str>, out: &Path) -> Result<()> {
    let signing_key = reconstruct_signing_key(key)?;
    let code_bytes = load_flat(code)?;
    let cert_bytes = keystore::read_cert(cert_path)?;
    let date = parse_date(date)?;
    let chain = build_chain(&signing_key, &cert_bytes, date)?;

    let signed = sigblock::build(&code_bytes, &chain, &signing_key, date)?;
    crate::codec::write_flat(out, &signed)?;
    log::info!("signed {} ({} bytes of code)", code.display(), code_bytes.len());
    println!("wrote {} ({} bytes)", out.display(), signed.len());
    Ok(())
}
