//! Core primitives for the SBL secure-boot signing chain: GF(2^m) binary
//! field arithmetic, Shamir secret sharing over that field, zbase32
//! encoding, passphrase-protected share envelopes, COBS/ZPE framing,
//! Intel HEX, the two-level Ed25519 certificate chain and the 512-byte
//! signature block format that ties them all together.

pub mod cert;
pub mod cobs;
pub mod envelope;
pub mod error;
pub mod field;
pub mod ihex;
pub mod sigblock;
pub mod sss;
pub mod wordlist;
pub mod zbase32;

pub use cert::{build_cert, self_wrap, verify_chain, verify_chain_steps, verify_link, ChainStep, CERT_SIZE, CHAIN_SIZE};
pub use error::SblError;
pub use field::{Gf2Element, Gf2Field};
pub use sigblock::{CodeType, VerifiedImage, SIG_BLOCK_SIZE};
pub use sss::Point;
