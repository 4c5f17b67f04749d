//! `sbl keygen` (spec.md §6).

use crate::codec::parse_split;
use crate::commands::{export_shares, generate_nonzero_key, split_and_store};
use crate::keystore::KeyStore;
use anyhow::Result;
use sbl_core::{envelope, Gf2Field};
use std::path::Path;

pub fn run(split: &str, test: bool, export_prefix: Option<&str>, name: Option<&str>, sbl: Option<&Path>) -> Result<()> {
    let (k, n) = parse_split(split)?;
    let name = name.unwrap_or("root");
    let (signing_key, secret) = generate_nonzero_key();

    if test {
        let pk = signing_key.verifying_key().to_bytes();
        println!("public key: {} ({})", hex::encode(pk), crate::keystore::fingerprint(&pk));
        let gf = Gf2Field::key_field();
        let points = sbl_core::sss::split(&gf, &secret, k, n)?;
        for point in &points {
            println!("share: {}", envelope::encode_share(point, None)?);
        }
        return Ok(());
    }

    if let Some(prefix) = export_prefix {
        let gf = Gf2Field::key_field();
        let points = sbl_core::sss::split(&gf, &secret, k, n)?;
        return export_shares(prefix, &signing_key, &points);
    }

    let store = KeyStore::resolve(sbl)?;
    split_and_store(&store, name, &signing_key, &secret, k, n)
}
