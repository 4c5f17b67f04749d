//! `sbl verifykey` (spec.md §6): checks that a set of shares reconstructs
//! a given public key, the caller's "outer integrity check" for a join
//! that spec.md §4.B otherwise leaves undefined on a bad quorum.

use crate::keystore;
use crate::shares::reconstruct_signing_key;
use anyhow::{bail, Result};
use std::path::Path;

pub fn run(key: &[String], pub_key: &Path) -> Result<()> {
    let signing_key = reconstruct_signing_key(key)?;
    let expected = keystore::read_pubkey(pub_key)?;
    let got = signing_key.verifying_key().to_bytes();
    if got != expected {
        bail!(
            "shares reconstruct {}, expected {}",
            hex::encode(got),
            hex::encode(expected)
        );
    }
    println!("OK: shares reconstruct {} (fingerprint {})", hex::encode(got), keystore::fingerprint(&got));
    Ok(())
}
