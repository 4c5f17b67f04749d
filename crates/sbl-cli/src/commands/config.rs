//! `sbl config` (spec.md §6): embeds a root public key and a memory-map
//! config (manufacturing-data and application-image size budgets) into a
//! bootloader image, or reads one back and verifies it (`-v`).
//!
//! spec.md doesn't pin the exact on-image layout of this config beyond
//! "embed a root PK and memory-map config" and the `ConfigurationError`
//! cases ("already-configured bootloader", "memory map overflows flash
//! budget"). This module resolves that open question the same way
//! `sigblock` resolves its own "no sigblock present" signal (spec.md
//! §4.G): a marker string locates the block, and an all-`0xFF` block
//! means "not yet configured" — see DESIGN.md.

use anyhow::{bail, Context, Result};
use std::path::Path;

/// Mirrors the `@(#)` "what" string convention (spec.md §3) so a hex
/// editor or `strings` run over a bootloader image shows this block the
/// same way it shows the firmware version string.
const CONFIG_MARKER: &[u8] = b"@(#)SBLCFG\0";
const ROOT_PK_SIZE: usize = 32;
const CONFIG_BODY_SIZE: usize = ROOT_PK_SIZE + 4 + 4;

fn find_config_block(image: &[u8]) -> Result<usize> {
    let at = image
        .windows(CONFIG_MARKER.len())
        .position(|w| w == CONFIG_MARKER)
        .context("missing config marker in bootloader image")?;
    let start = at + CONFIG_MARKER.len();
    if start + CONFIG_BODY_SIZE > image.len() {
        bail!("config block at offset {start} runs past the end of the image");
    }
    Ok(start)
}

struct Config {
    root_pk: [u8; ROOT_PK_SIZE],
    manu_data_size: u32,
    max_app_size: u32,
}

fn decode_config(block: &[u8]) -> Option<Config> {
    if block.iter().all(|&b| b == 0xFF) {
        return None;
    }
    let mut root_pk = [0u8; ROOT_PK_SIZE];
    root_pk.copy_from_slice(&block[..ROOT_PK_SIZE]);
    let manu_data_size = u32::from_le_bytes(block[ROOT_PK_SIZE..ROOT_PK_SIZE + 4].try_into().unwrap());
    let max_app_size = u32::from_le_bytes(block[ROOT_PK_SIZE + 4..ROOT_PK_SIZE + 8].try_into().unwrap());
    Some(Config { root_pk, manu_data_size, max_app_size })
}

pub fn run(root: &Path, manu_data_size: u32, max_app_size: u32, verify: bool, code: &Path) -> Result<()> {
    let mut image = std::fs::read(code).with_context(|| format!("reading {}", code.display()))?;
    let start = find_config_block(&image)?;
    let block = &image[start..start + CONFIG_BODY_SIZE];

    if verify {
        let config = decode_config(block).context("bootloader image is not configured")?;
        let root_pk = crate::keystore::read_pubkey(root)?;
        if config.root_pk != root_pk {
            bail!(
                "embedded root key {} does not match {}",
                hex::encode(config.root_pk),
                hex::encode(root_pk)
            );
        }
        println!(
            "OK: root={} manu_data_size={} max_app_size={}",
            hex::encode(config.root_pk),
            config.manu_data_size,
            config.max_app_size
        );
        return Ok(());
    }

    if decode_config(block).is_some() {
        bail!("bootloader image at {} is already configured", code.display());
    }
    let budget = image.len();
    let used = start + CONFIG_BODY_SIZE + manu_data_size as usize + max_app_size as usize;
    if used > budget {
        bail!("memory map ({used} bytes) overflows the flash budget ({budget} bytes)");
    }

    let root_pk = crate::keystore::read_pubkey(root)?;
    let mut new_block = Vec::with_capacity(CONFIG_BODY_SIZE);
    new_block.extend_from_slice(&root_pk);
    new_block.extend_from_slice(&manu_data_size.to_le_bytes());
    new_block.extend_from_slice(&max_app_size.to_le_bytes());
    image[start..start + CONFIG_BODY_SIZE].copy_from_slice(&new_block);
    std::fs::write(code, &image).with_context(|| format!("writing {}", code.display()))?;
    println!("configured {} (root={})", code.display(), hex::encode(root_pk));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> Vec<u8> {
        let mut image = b"bootloader stub ".to_vec();
        image.extend_from_slice(CONFIG_MARKER);
        image.extend(std::iter::repeat(0xFFu8).take(CONFIG_BODY_SIZE));
        image.extend(std::iter::repeat(0u8).take(256));
        image
    }

    #[test]
    fn finds_unconfigured_block() {
        let image = sample_image();
        let start = find_config_block(&image).unwrap();
        assert!(decode_config(&image[start..start + CONFIG_BODY_SIZE]).is_none());
    }

    #[test]
    fn missing_marker_is_an_error() {
        assert!(find_config_block(b"no marker here").is_err());
    }
}
