//! Known-answer checks for the codecs and crypto primitives in `sbl-core`.
//!
//! Each check is a fixed vector with a fixed expected output; a mismatch
//! bails out immediately rather than accumulating failures, so the first
//! broken primitive is also the last line printed.

use anyhow::{bail, Result};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use sbl_core::{cert, cobs, field::Gf2Field, ihex, sigblock, sss, zbase32};

fn check_zbase32() -> Result<()> {
    if zbase32::encode(&[0x00]) != "yy" {
        bail!("zbase32::encode(0x00) mismatch");
    }
    if zbase32::encode(b"foo") != "c3zs6" {
        bail!("zbase32::encode(\"foo\") mismatch");
    }
    if zbase32::decode("yy")? != vec![0x00] {
        bail!("zbase32::decode(\"yy\") mismatch");
    }
    if zbase32::decode("c3zs6")? != b"foo" {
        bail!("zbase32::decode(\"c3zs6\") mismatch");
    }
    println!("zbase32: OK");
    Ok(())
}

fn check_cobs() -> Result<()> {
    if cobs::encode(&[]) != vec![0x01] {
        bail!("cobs::encode(\"\") mismatch");
    }
    if cobs::encode(&[0x00]) != vec![0x01, 0x01] {
        bail!("cobs::encode([0x00]) mismatch");
    }
    if cobs::encode(&[0x11, 0x22, 0x00, 0x33]) != vec![0x03, 0x11, 0x22, 0x02, 0x33] {
        bail!("cobs::encode([0x11,0x22,0x00,0x33]) mismatch");
    }
    println!("cobs: OK");
    Ok(())
}

fn check_field() -> Result<()> {
    let gf = Gf2Field::new(&[8, 4, 3, 1, 0]);
    let a = gf.element_u64(0x53)?;
    let b = gf.element_u64(0xCA)?;
    let product = gf.mul(&a, &b);
    if product != gf.one() {
        bail!("mul(0x53, 0xCA) != 1");
    }
    let inv = gf.inverse(&a)?;
    if inv != b {
        bail!("inverse(0x53) != 0xCA");
    }
    println!("field: OK");
    Ok(())
}

fn check_sss() -> Result<()> {
    let gf = Gf2Field::key_field();
    let secret = gf.element_from_bytes_be(&[0x42; 32])?;
    let points = sss::split(&gf, &secret, 3, 5)?;

    let subset = |xs: &[usize]| -> Vec<sbl_core::Point> { xs.iter().map(|&i| points[i - 1].clone()).collect() };

    if sss::join(&gf, &subset(&[1, 3, 5]))? != secret {
        bail!("join({{1,3,5}}) did not reconstruct the secret");
    }
    if sss::join(&gf, &subset(&[2, 4, 5]))? != secret {
        bail!("join({{2,4,5}}) did not reconstruct the secret");
    }
    if sss::join(&gf, &subset(&[1, 2]))? == secret {
        bail!("join of only 2 of 3 shares should not reconstruct the secret");
    }
    println!("sss: OK");
    Ok(())
}

fn check_sign_verify() -> Result<()> {
    let root = SigningKey::generate(&mut OsRng);
    let leaf = SigningKey::generate(&mut OsRng);
    let leaf_cert = cert::build_cert(&root, &leaf.verifying_key().to_bytes(), 1000, &[]);
    let chain: [u8; cert::CHAIN_SIZE] = cert::self_wrap(&leaf, &leaf_cert, 1000)
        .try_into()
        .map_err(|_| anyhow::anyhow!("self_wrap did not produce a full chain"))?;

    let mut payload = vec![0xABu8; 4096];
    let marker = b"@(#)sbl-kat AFI\0";
    payload[4096 - marker.len()..].copy_from_slice(marker);

    let signed = sigblock::build(&payload, &chain, &leaf, 1000)?;
    sigblock::verify(&signed, &root.verifying_key())?;

    let mut tampered = signed.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0xFF;
    if sigblock::verify(&tampered, &root.verifying_key()).is_ok() {
        bail!("verify should have rejected a single flipped payload byte");
    }

    sigblock::verify(&signed, &root.verifying_key())?;
    println!("sign/verify: OK");
    Ok(())
}

fn check_ihex() -> Result<()> {
    let line = ":10010000214601360121470136007EFE09D2190140";
    let (_ss, segments) = ihex::loads(line)?;
    if segments.len() != 1 || segments[0].0 != 0x0100 || segments[0].1.len() != 16 {
        bail!("Intel-HEX record did not decode to the expected address/length");
    }

    let mut corrupted = line.as_bytes().to_vec();
    *corrupted.last_mut().unwrap() ^= 0x01;
    let corrupted = String::from_utf8(corrupted)?;
    if ihex::loads(&corrupted).is_ok() {
        bail!("corrupting the checksum byte should have failed to load");
    }
    println!("ihex: OK");
    Ok(())
}

fn main() -> Result<()> {
    check_zbase32()?;
    check_cobs()?;
    check_field()?;
    check_sss()?;
    check_sign_verify()?;
    check_ihex()?;
    println!("KAT OK");
    Ok(())
}
