//! Loads Shamir shares supplied on the command line and reconstructs the
//! Ed25519 signing key they protect (spec.md §4.B, §4.D, §6 CLI surface).
//!
//! Passphrase prompting itself is an explicit external collaborator
//! (spec.md §1); this module's only responsibility here is noticing that a
//! share's passphrase wasn't already embedded (the file-at-rest form omits
//! it, spec.md §6) and asking for it via `rpassword`.

use anyhow::{bail, Context, Result};
use ed25519_dalek::SigningKey;
use sbl_core::{envelope, sss, Gf2Element, Gf2Field, Point};
use std::path::Path;

/// Resolves one `--key` argument to complete `x:blob:passphrase` share
/// text: if it names an existing file, read it (prompting for the
/// passphrase when the file omitted one); otherwise the argument itself is
/// taken as already-complete share text (useful for scripting/tests).
fn load_share_text(arg: &str) -> Result<String> {
    let path = Path::new(arg);
    let raw = if path.is_file() {
        std::fs::read_to_string(path)
            .with_context(|| format!("reading share {}", path.display()))?
            .trim()
            .to_string()
    } else {
        arg.trim().to_string()
    };
    if raw.matches(':').count() >= 2 {
        return Ok(raw);
    }
    let passphrase = rpassword::prompt_password(format!("passphrase for {arg}: "))
        .context("reading passphrase from the terminal")?;
    Ok(format!("{raw}:{passphrase}"))
}

/// Decodes every `--key` argument into a [`Point`]. Does not check that
/// the shares form a valid quorum of the *same* split (spec.md §4.B: join
/// is total, the caller supplies any outer integrity check) — `verifykey`
/// is that check for this CLI.
pub fn load_points(gf: &Gf2Field, key_args: &[String]) -> Result<Vec<Point>> {
    if key_args.is_empty() {
        bail!("at least one --key share is required");
    }
    key_args
        .iter()
        .map(|arg| {
            let text = load_share_text(arg)?;
            envelope::decode_share(gf, &text).with_context(|| format!("decoding share {arg}"))
        })
        .collect()
}

/// Loads `key_args` and reconstructs the 32-byte Ed25519 seed they
/// protect, as the signing key it seeds.
pub fn reconstruct_signing_key(key_args: &[String]) -> Result<SigningKey> {
    let gf = Gf2Field::key_field();
    let points = load_points(&gf, key_args)?;
    let secret: Gf2Element = sss::join(&gf, &points)?;
    let seed: [u8; 32] = secret
        .to_bytes_be(32)
        .try_into()
        .map_err(|_| anyhow::anyhow!("reconstructed secret is not 32 bytes"))?;
    Ok(SigningKey::from_bytes(&seed))
}
