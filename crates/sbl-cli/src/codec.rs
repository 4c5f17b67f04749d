//! Loads a firmware file as a flat byte buffer, accepting either a raw
//! binary or an Intel-HEX text file (spec.md §2 "F loads it", §6 "Signed
//! Intel-HEX image").
//!
//! A `.hex`/`.ihex` file is recognized by extension. Non-contiguous
//! segments are bridged with `0xFF` (the flash-erased-byte convention
//! this format already uses for sigblock padding, spec.md §3) so the
//! result is always one flat buffer starting at the lowest segment
//! address — an Open Question this CLI resolves for itself (see
//! DESIGN.md); sigblock construction only ever needs the flat bytes, not
//! the original segmentation.

use anyhow::{bail, Context, Result};
use std::path::Path;

fn is_hex_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("hex") | Some("ihex")
    )
}

/// Loads `path` as a flat byte buffer, decoding Intel HEX if the
/// extension calls for it.
pub fn load_flat(path: &Path) -> Result<Vec<u8>> {
    if is_hex_path(path) {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let (_ss, segments) = sbl_core::ihex::loads(&text).with_context(|| format!("parsing {}", path.display()))?;
        Ok(flatten(&segments))
    } else {
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))
    }
}

fn flatten(segments: &[sbl_core::ihex::Segment]) -> Vec<u8> {
    if segments.is_empty() {
        return Vec::new();
    }
    let base = segments[0].0;
    let mut out = Vec::new();
    for (addr, data) in segments {
        let gap = (*addr - base) as usize - out.len();
        out.extend(std::iter::repeat(0xFFu8).take(gap));
        out.extend_from_slice(data);
    }
    out
}

/// Writes `bytes` to `path`, encoding as Intel HEX if the extension calls
/// for it (a single segment starting at address 0, start address 0).
pub fn write_flat(path: &Path, bytes: &[u8]) -> Result<()> {
    if is_hex_path(path) {
        let segments = vec![(0u32, bytes.to_vec())];
        let text = sbl_core::ihex::dump(0, &segments);
        std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    } else {
        std::fs::write(path, bytes).with_context(|| format!("writing {}", path.display()))
    }
}

/// Parses `"K,N"` into a `(k, n)` quorum pair.
pub fn parse_split(s: &str) -> Result<(usize, usize)> {
    let (k, n) = s
        .split_once(',')
        .ok_or_else(|| anyhow::anyhow!("--split must be K,N (got {s:?})"))?;
    let k: usize = k.trim().parse().with_context(|| format!("bad quorum {k:?}"))?;
    let n: usize = n.trim().parse().with_context(|| format!("bad share count {n:?}"))?;
    if k == 0 || k > n {
        bail!("quorum {k} must be between 1 and the share count {n}");
    }
    Ok((k, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_split() {
        assert_eq!(parse_split("3,5").unwrap(), (3, 5));
        assert!(parse_split("0,5").is_err());
        assert!(parse_split("6,5").is_err());
        assert!(parse_split("garbage").is_err());
    }

    #[test]
    fn flattens_contiguous_segments() {
        let segments = vec![(0u32, vec![1, 2, 3]), (3u32, vec![4, 5])];
        assert_eq!(flatten(&segments), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn flattens_with_gap_padding() {
        let segments = vec![(0u32, vec![1, 2]), (4u32, vec![9])];
        assert_eq!(flatten(&segments), vec![1, 2, 0xFF, 0xFF, 9]);
    }
}
