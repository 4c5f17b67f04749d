//! `.sbl/` keystore resolution and the on-disk share/pubkey/cert file
//! formats (spec.md §6, §9 "global `.sbl/` directory search").
//!
//! Modeled as a resolver that produces a validated [`KeyStore`] handle
//! rather than process-wide mutable state: every command resolves its own
//! handle up front and passes it down, per spec.md §9's design note.

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
fn check_mode(dir: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(dir).with_context(|| format!("reading {}", dir.display()))?;
    let mode = meta.permissions().mode() & 0o777;
    if mode != 0o700 {
        bail!(
            "{} must have mode 0700 (found {mode:o}); refusing to touch key material there",
            dir.display()
        );
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_mode(_dir: &Path) -> Result<()> {
    Ok(())
}

/// A validated `.sbl/` directory handle.
pub struct KeyStore {
    dir: PathBuf,
}

impl KeyStore {
    /// Resolves the store directory: an explicit `--sbl PATH` wins;
    /// otherwise an existing `.sbl/` is searched for starting at the
    /// current directory and walking up, then under the user's home
    /// directory (`~/.sbl`); if none of those exist, `./.sbl` is used as
    /// the default location a later [`KeyStore::create`] will make real.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let dir = match explicit {
            Some(p) => p.to_path_buf(),
            None => find_upward(".sbl")
                .or_else(home_sbl)
                .unwrap_or_else(|| PathBuf::from(".sbl")),
        };
        if dir.exists() {
            check_mode(&dir)?;
        }
        Ok(KeyStore { dir })
    }

    /// Creates the store directory at mode 0700 if it doesn't exist yet;
    /// re-checks the mode either way before returning.
    pub fn create(&self) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir).with_context(|| format!("creating {}", self.dir.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))?;
            }
            log::info!("created keystore at {}", self.dir.display());
        }
        check_mode(&self.dir)
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn share_path(&self, name: &str, x: u8) -> PathBuf {
        self.dir.join(format!("{name}.share.{x}"))
    }

    pub fn pub_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.pub"))
    }

    pub fn cert_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.cert"))
    }
}

fn find_upward(name: &str) -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        let candidate = dir.join(name);
        if candidate.is_dir() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

fn home_sbl() -> Option<PathBuf> {
    let candidate = dirs::home_dir()?.join(".sbl");
    candidate.is_dir().then_some(candidate)
}

/// Writes `bytes` to `path` via a same-directory temp file plus rename, so
/// a reader never observes a partially written key file.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).with_context(|| format!("creating temp file in {}", dir.display()))?;
    use std::io::Write;
    tmp.write_all(bytes).with_context(|| format!("writing {}", path.display()))?;
    tmp.persist(path).with_context(|| format!("installing {}", path.display()))?;
    Ok(())
}

/// Writes a public key as lowercase hex (spec.md §6 "Public key at rest").
pub fn write_pubkey(path: &Path, pk: &[u8; 32]) -> Result<()> {
    write_atomic(path, format!("{}\n", hex::encode(pk)).as_bytes())
}

pub fn read_pubkey(path: &Path) -> Result<[u8; 32]> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let bytes = hex::decode(text.trim()).with_context(|| format!("{} is not valid hex", path.display()))?;
    bytes
        .try_into()
        .map_err(|_| anyhow::anyhow!("{} is not a 32-byte public key", path.display()))
}

/// Writes a certificate (104 or 208 bytes) as lowercase hex (spec.md §6
/// "Certificate at rest").
pub fn write_cert(path: &Path, cert: &[u8]) -> Result<()> {
    write_atomic(path, format!("{}\n", hex::encode(cert)).as_bytes())
}

/// A human-checkable SHA-256 fingerprint of a public key or certificate,
/// printed alongside the full hex encoding so an operator can confirm a
/// key over a phone call without reading out 64 hex digits.
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

pub fn read_cert(path: &Path) -> Result<Vec<u8>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let bytes = hex::decode(text.trim()).with_context(|| format!("{} is not valid hex", path.display()))?;
    if bytes.len() != sbl_core::CERT_SIZE && bytes.len() != sbl_core::CHAIN_SIZE {
        bail!(
            "{} is {} bytes, expected a {}- or {}-byte certificate",
            path.display(),
            bytes.len(),
            sbl_core::CERT_SIZE,
            sbl_core::CHAIN_SIZE
        );
    }
    Ok(bytes)
}
