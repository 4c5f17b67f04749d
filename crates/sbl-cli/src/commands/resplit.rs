//! `sbl resplit` (spec.md §6): reconstruct an existing key from shares and
//! re-shard it under a (possibly new) quorum.

use crate::codec::parse_split;
use crate::commands::split_and_store;
use crate::keystore::KeyStore;
use crate::shares::reconstruct_signing_key;
use anyhow::Result;
use sbl_core::Gf2Field;
use std::path::Path;

pub fn run(split: &str, key: &[String], name: Option<&str>, sbl: Option<&Path>) -> Result<()> {
    let (k, n) = parse_split(split)?;
    let name = name.unwrap_or("root");
    let signing_key = reconstruct_signing_key(key)?;
    let gf = Gf2Field::key_field();
    let secret = gf.element_from_bytes_be(&signing_key.to_bytes())?;

    let store = KeyStore::resolve(sbl)?;
    split_and_store(&store, name, &signing_key, &secret, k, n)
}
