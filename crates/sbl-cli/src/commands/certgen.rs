//! `sbl certgen` (spec.md §6, §4.G "certificate chain"): signs a child
//! public key, producing a 104-byte certificate (or 208 bytes when
//! `--chain` embeds an existing parent).

use crate::date::parse_date;
use crate::keystore;
use crate::shares::reconstruct_signing_key;
use anyhow::Result;
use sbl_core::cert;
use std::path::Path;

pub fn run(key: &[String], pub_key: &Path, chain: Option<&Path>, date: Option<&str>, file: Option<&Path>) -> Result<()> {
    let signing_key = reconstruct_signing_key(key)?;
    let subject_pk = keystore::read_pubkey(pub_key)?;
    let date = parse_date(date)?;

    let parent = match chain {
        Some(path) => keystore::read_cert(path)?,
        None => Vec::new(),
    };
    let cert_bytes = cert::build_cert(&signing_key, &subject_pk, date, &parent);

    match file {
        Some(path) => {
            keystore::write_cert(path, &cert_bytes)?;
            println!("wrote {} (fingerprint {})", path.display(), keystore::fingerprint(&cert_bytes));
        }
        None => println!("{}", hex::encode(&cert_bytes)),
    }
    Ok(())
}
