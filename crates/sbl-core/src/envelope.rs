//! Passphrase-protected share envelopes.
//!
//! Each Shamir share (an `(x, y)` point, §B) is wrapped for human handling
//! as `x:zbase32(salt || nonce || ciphertext || tag):passphrase`: the `y`
//! coordinate is encrypted under a key derived from an 8-word diceware
//! passphrase (`wordlist.rs`) via scrypt, with the share's `x` coordinate,
//! the salt and the passphrase itself authenticated as associated data so
//! a share can't be silently relabeled or paired with the wrong passphrase.

use crate::error::SblError;
use crate::field::Gf2Field;
use crate::sss::Point;
use crate::wordlist;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::RngCore;
use scrypt::Params;
use secrecy::{ExposeSecret, Secret};
use zeroize::Zeroize;

const SALT_SIZE: usize = 32;
const NONCE_SIZE: usize = 24;
const KEY_SIZE: usize = 32;
const Y_SIZE: usize = 32;

/// scrypt parameters matching libsodium's `OPSLIMIT_INTERACTIVE` /
/// `MEMLIMIT_INTERACTIVE` scrypt tuning (`N = 2^14`, `r = 8`, `p = 1`).
fn interactive_params() -> Params {
    Params::new(14, 8, 1, KEY_SIZE).expect("static scrypt parameters are valid")
}

/// Derives the share's AEAD key, wrapped in [`Secret`] so it is zeroized
/// on drop and only readable through an explicit [`ExposeSecret::expose_secret`]
/// call at the point of use.
fn derive_key(passphrase: &str, salt: &[u8]) -> Result<Secret<[u8; KEY_SIZE]>, SblError> {
    let mut key = [0u8; KEY_SIZE];
    scrypt::scrypt(passphrase.as_bytes(), salt, &interactive_params(), &mut key)
        .map_err(|e| SblError::ConfigurationError(format!("scrypt key derivation failed: {e}")))?;
    let secret = Secret::new(key);
    key.zeroize();
    Ok(secret)
}

fn aad(x: u8, salt: &[u8], passphrase: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + salt.len() + passphrase.len());
    out.push(x);
    out.extend_from_slice(salt);
    out.extend_from_slice(passphrase.as_bytes());
    out
}

/// Encodes one Shamir point into a passphrase-protected share string. If
/// `passphrase` is `None`, a fresh diceware passphrase is generated.
pub fn encode_share(point: &Point, passphrase: Option<String>) -> Result<String, SblError> {
    let x_byte = point
        .x
        .to_bytes_be(1)
        .first()
        .copied()
        .ok_or_else(|| SblError::InvalidInput("share x coordinate out of range".into()))?;
    let pp = passphrase.unwrap_or_else(wordlist::passphrase);

    let mut salt = [0u8; SALT_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    let key = derive_key(&pp, &salt)?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = XNonce::from_slice(&nonce_bytes);

    let mut msg = point.y.to_bytes_le(Y_SIZE);
    let associated_data = aad(x_byte, &salt, &pp);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.expose_secret()));
    let ct = cipher
        .encrypt(nonce, Payload { msg: &msg, aad: &associated_data })
        .map_err(|_| SblError::ConfigurationError("share encryption failed".into()))?;
    msg.zeroize();

    let mut blob = Vec::with_capacity(SALT_SIZE + NONCE_SIZE + ct.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ct);

    Ok(format!("{}:{}:{}", x_byte, crate::zbase32::encode(&blob), pp))
}

/// Decodes a share string produced by [`encode_share`], deriving the key
/// from the embedded salt and the caller-supplied passphrase.
pub fn decode_share(gf: &Gf2Field, share: &str) -> Result<Point, SblError> {
    let mut parts = share.splitn(3, ':');
    let x_str = parts.next().ok_or_else(|| SblError::InvalidInput("malformed share".into()))?;
    let blob_str = parts.next().ok_or_else(|| SblError::InvalidInput("malformed share".into()))?;
    let pp = parts.next().ok_or_else(|| SblError::InvalidInput("malformed share".into()))?;

    let x_byte: u8 = x_str
        .parse()
        .map_err(|_| SblError::InvalidInput(format!("invalid share index {x_str:?}")))?;
    let blob = crate::zbase32::decode(blob_str)?;
    if blob.len() < SALT_SIZE + NONCE_SIZE {
        return Err(SblError::InvalidInput("share ciphertext too short".into()));
    }
    let (salt, rest) = blob.split_at(SALT_SIZE);
    let (nonce_bytes, ct) = rest.split_at(NONCE_SIZE);

    let key = derive_key(pp, salt)?;
    let nonce = XNonce::from_slice(nonce_bytes);
    let associated_data = aad(x_byte, salt, pp);
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key.expose_secret()));
    let mut msg = cipher
        .decrypt(nonce, Payload { msg: ct, aad: &associated_data })
        .map_err(|_| SblError::BadPassphrase)?;

    let x = gf.element_u64(x_byte as u64)?;
    let y = gf.element_from_bytes_le(&msg)?;
    msg.zeroize();
    Ok(Point { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Gf2Field {
        Gf2Field::new(&[256, 10, 5, 2, 0])
    }

    #[test]
    fn round_trips_with_explicit_passphrase() {
        let gf = field();
        let point = Point {
            x: gf.element_u64(3).unwrap(),
            y: gf.element_u64(0x1234_5678_9abc).unwrap(),
        };
        let encoded = encode_share(&point, Some("correct-horse-battery-staple".into())).unwrap();
        let decoded = decode_share(&gf, &encoded).unwrap();
        assert_eq!(decoded, point);
    }

    #[test]
    fn round_trips_with_generated_passphrase() {
        let gf = field();
        let point = Point {
            x: gf.element_u64(1).unwrap(),
            y: gf.random(),
        };
        let encoded = encode_share(&point, None).unwrap();
        assert_eq!(encoded.split(':').count(), 3);
        let decoded = decode_share(&gf, &encoded).unwrap();
        assert_eq!(decoded, point);
    }

    #[test]
    fn wrong_passphrase_fails() {
        let gf = field();
        let point = Point {
            x: gf.element_u64(2).unwrap(),
            y: gf.element_u64(42).unwrap(),
        };
        let encoded = encode_share(&point, Some("right-passphrase".into())).unwrap();
        let (x_and_blob, _) = encoded.rsplit_once(':').unwrap();
        let tampered = format!("{x_and_blob}:wrong-passphrase");
        assert!(matches!(decode_share(&gf, &tampered), Err(SblError::BadPassphrase)));
    }
}
