//! GF(2^m) binary extension field arithmetic.
//!
//! Elements are bit polynomials reduced modulo an irreducible polynomial of
//! degree `m`, supplied as the list of exponents that have a nonzero
//! coefficient (e.g. `[256, 10, 5, 2, 0]` for `x^256 + x^10 + x^5 + x^2 + 1`).
//! Values are stored as little-endian `u64` limb vectors since `m` can exceed
//! 128 bits (the Shamir layer above uses `m = 256`).

use crate::error::SblError;
use rand_core::RngCore;

fn trim(a: &mut Vec<u64>) {
    while a.len() > 1 && *a.last().unwrap() == 0 {
        a.pop();
    }
}

fn is_zero(a: &[u64]) -> bool {
    a.iter().all(|&limb| limb == 0)
}

/// Index of the highest set bit, or -1 if `a` is zero.
fn degree(a: &[u64]) -> i64 {
    for (i, &limb) in a.iter().enumerate().rev() {
        if limb != 0 {
            return (i as i64) * 64 + (63 - limb.leading_zeros() as i64);
        }
    }
    -1
}

fn test_bit(a: &[u64], i: i64) -> bool {
    if i < 0 {
        return false;
    }
    let (limb, bit) = ((i / 64) as usize, i % 64);
    limb < a.len() && (a[limb] >> bit) & 1 == 1
}

fn set_bit(a: &mut Vec<u64>, i: i64) {
    let (limb, bit) = ((i / 64) as usize, (i % 64) as u32);
    if a.len() <= limb {
        a.resize(limb + 1, 0);
    }
    a[limb] |= 1u64 << bit;
}

fn shl1(a: &mut Vec<u64>) {
    let mut carry = 0u64;
    for limb in a.iter_mut() {
        let next_carry = *limb >> 63;
        *limb = (*limb << 1) | carry;
        carry = next_carry;
    }
    if carry != 0 {
        a.push(carry);
    }
}

/// `a << n` (new vector).
fn shl(a: &[u64], n: i64) -> Vec<u64> {
    if n == 0 || is_zero(a) {
        return a.to_vec();
    }
    let mut out = vec![0u64; a.len() + (n as usize) / 64 + 1];
    for i in 0..(a.len() * 64) as i64 {
        if test_bit(a, i) {
            set_bit(&mut out, i + n);
        }
    }
    trim(&mut out);
    out
}

fn xor_assign(a: &mut Vec<u64>, b: &[u64]) {
    if a.len() < b.len() {
        a.resize(b.len(), 0);
    }
    for (i, &limb) in b.iter().enumerate() {
        a[i] ^= limb;
    }
    trim(a);
}

fn from_u64(v: u64) -> Vec<u64> {
    vec![v]
}

/// The binary extension field `GF(2^m)`, described by the exponents of its
/// irreducible reduction polynomial.
#[derive(Clone, Debug)]
pub struct Gf2Field {
    /// Exponents of the reduction polynomial, descending (e.g. `[256,10,5,2,0]`).
    poly: Vec<u32>,
    /// Bit pattern of the reduction polynomial itself (`sum 2^x`).
    p: Vec<u64>,
    /// `2^m`, the field's cardinality.
    n: Vec<u64>,
    /// Degree of the field.
    m: u32,
}

/// An element of a [`Gf2Field`]. Carries no reference to its field; callers
/// combine elements through the field that produced them, mirroring the
/// way a reduction polynomial is a property of the *operation*, not the
/// bit pattern, at this API boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gf2Element(Vec<u64>);

impl Gf2Element {
    pub fn is_zero(&self) -> bool {
        is_zero(&self.0)
    }

    /// Big-endian byte encoding, padded/truncated to `len` bytes.
    pub fn to_bytes_be(&self, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        for i in 0..len {
            let bit_base = (i * 8) as i64;
            let mut byte = 0u8;
            for b in 0..8 {
                if test_bit(&self.0, bit_base + b as i64) {
                    byte |= 1 << b;
                }
            }
            out[len - 1 - i] = byte;
        }
        out
    }

    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        let mut limbs = vec![0u64; (bytes.len() + 7) / 8];
        for (i, &byte) in bytes.iter().rev().enumerate() {
            for b in 0..8 {
                if (byte >> b) & 1 == 1 {
                    set_bit(&mut limbs, (i * 8 + b) as i64);
                }
            }
        }
        trim(&mut limbs);
        Gf2Element(limbs)
    }

    /// Little-endian byte encoding, padded/truncated to `len` bytes.
    pub fn to_bytes_le(&self, len: usize) -> Vec<u8> {
        let mut out = self.to_bytes_be(len);
        out.reverse();
        out
    }

    pub fn from_bytes_le(bytes: &[u8]) -> Self {
        let reversed: Vec<u8> = bytes.iter().rev().copied().collect();
        Self::from_bytes_be(&reversed)
    }
}

/// Exponents of the reduction polynomial used for the 32-byte signing
/// keys this crate splits (`x^256 + x^10 + x^5 + x^2 + 1`, spec.md §8
/// scenario 4).
pub const KEY_FIELD_POLY: [u32; 5] = [256, 10, 5, 2, 0];

impl Gf2Field {
    /// The `GF(2^256)` field the Shamir and share-envelope layers split
    /// 32-byte signing keys over.
    pub fn key_field() -> Self {
        Gf2Field::new(&KEY_FIELD_POLY)
    }

    /// Builds a field from the exponents of its reduction polynomial.
    /// `poly` must include the leading term (the field's degree) and the
    /// constant term `0`.
    pub fn new(poly: &[u32]) -> Self {
        let m = *poly.iter().max().expect("reduction polynomial is empty");
        let mut sorted = poly.to_vec();
        sorted.sort_unstable();
        sorted.reverse();
        let mut p = vec![0u64; 0];
        for &x in &sorted {
            set_bit(&mut p, x as i64);
        }
        trim(&mut p);
        let mut n = vec![0u64; 0];
        set_bit(&mut n, m as i64);
        trim(&mut n);
        Gf2Field { poly: sorted, p, n, m }
    }

    pub fn degree(&self) -> u32 {
        self.m
    }

    /// Validates and wraps a raw integer value as an element of this field.
    /// Mirrors the source construction invariant: `v` must be `< 2^m`, with
    /// the single exception of the reduction polynomial's own bit pattern,
    /// which `inverse()` needs internally as a sentinel.
    pub fn element(&self, v: &[u64]) -> Result<Gf2Element, SblError> {
        let mut v = v.to_vec();
        trim(&mut v);
        if degree(&v) >= self.m as i64 && v != self.p {
            return Err(SblError::InvalidOperation(format!(
                "value of degree {} is not a member of GF(2^{})",
                degree(&v),
                self.m
            )));
        }
        Ok(Gf2Element(v))
    }

    pub fn element_u64(&self, v: u64) -> Result<Gf2Element, SblError> {
        self.element(&from_u64(v))
    }

    /// Validates a big-endian byte string as an element of this field.
    pub fn element_from_bytes_be(&self, bytes: &[u8]) -> Result<Gf2Element, SblError> {
        let candidate = Gf2Element::from_bytes_be(bytes);
        self.element(&candidate.0)
    }

    /// Validates a little-endian byte string as an element of this field.
    pub fn element_from_bytes_le(&self, bytes: &[u8]) -> Result<Gf2Element, SblError> {
        let candidate = Gf2Element::from_bytes_le(bytes);
        self.element(&candidate.0)
    }

    pub fn zero(&self) -> Gf2Element {
        Gf2Element(vec![0])
    }

    pub fn one(&self) -> Gf2Element {
        Gf2Element(vec![1])
    }

    fn p_element(&self) -> Gf2Element {
        Gf2Element(self.p.clone())
    }

    pub fn add(&self, a: &Gf2Element, b: &Gf2Element) -> Gf2Element {
        let mut out = a.0.clone();
        xor_assign(&mut out, &b.0);
        Gf2Element(out)
    }

    /// Addition and subtraction coincide in characteristic 2.
    pub fn sub(&self, a: &Gf2Element, b: &Gf2Element) -> Gf2Element {
        self.add(a, b)
    }

    /// Schoolbook double-and-reduce multiplication, bit by bit over `a`.
    pub fn mul(&self, a: &Gf2Element, b: &Gf2Element) -> Gf2Element {
        let mut c: Vec<u64> = vec![0];
        let mut bb = b.0.clone();
        // poly[0] is the field's degree (highest exponent), matching the
        // original loop bound `range(self.gf.poly[0])`.
        for j in 0..self.poly[0] {
            if test_bit(&a.0, j as i64) {
                xor_assign(&mut c, &bb);
            }
            shl1(&mut bb);
            if test_bit(&bb, self.m as i64) {
                xor_assign(&mut bb, &self.p);
            }
        }
        Gf2Element(c)
    }

    /// Polynomial long division: returns `(quotient, remainder)` such that
    /// `a == quotient * b + remainder` (XOR-addition).
    pub fn divmod(&self, a: &Gf2Element, b: &Gf2Element) -> Result<(Gf2Element, Gf2Element), SblError> {
        if b.is_zero() {
            return Err(SblError::InvalidOperation("division by zero element".into()));
        }
        let mut na = degree(&a.0);
        let nb = degree(&b.0);
        let mut r: Vec<u64> = vec![0];
        let mut rem = a.0.clone();
        while na >= nb {
            if test_bit(&rem, na) {
                set_bit(&mut r, na - nb);
                let shifted = shl(&b.0, na - nb);
                xor_assign(&mut rem, &shifted);
            }
            na -= 1;
        }
        trim(&mut r);
        trim(&mut rem);
        Ok((Gf2Element(r), Gf2Element(rem)))
    }

    pub fn inverse(&self, a: &Gf2Element) -> Result<Gf2Element, SblError> {
        if a.is_zero() {
            return Err(SblError::InvalidOperation("zero element has no inverse".into()));
        }
        let (_, _, x) = self.egcd(&self.p_element(), a)?;
        Ok(x)
    }

    pub fn div(&self, a: &Gf2Element, b: &Gf2Element) -> Result<Gf2Element, SblError> {
        Ok(self.mul(a, &self.inverse(b)?))
    }

    /// Extended Euclidean algorithm over field polynomials: returns
    /// `(gcd, x, y)` with `gcd == x*a + y*b`.
    fn egcd(&self, a: &Gf2Element, b: &Gf2Element) -> Result<(Gf2Element, Gf2Element, Gf2Element), SblError> {
        if a.is_zero() {
            return Ok((b.clone(), self.zero(), self.one()));
        }
        let (d, m) = self.divmod(b, a)?;
        let (g, y, x) = self.egcd(&m, a)?;
        let dy = self.mul(&d, &y);
        Ok((g, self.sub(&x, &dy), y))
    }

    /// Draws a uniformly random element of the field via rejection-free
    /// sampling of `m` bits (the field's cardinality is always a power of
    /// two, so no rejection is needed).
    pub fn random(&self) -> Gf2Element {
        let mut rng = rand::rngs::OsRng;
        let nlimbs = (self.m as usize + 63) / 64;
        let mut limbs = vec![0u64; nlimbs.max(1)];
        for limb in limbs.iter_mut() {
            *limb = rng.next_u64();
        }
        let rem_bits = self.m % 64;
        if rem_bits != 0 {
            let mask = (1u64 << rem_bits) - 1;
            if let Some(top) = limbs.last_mut() {
                *top &= mask;
            }
        }
        trim(&mut limbs);
        Gf2Element(limbs)
    }
}

impl PartialEq for Gf2Field {
    fn eq(&self, other: &Self) -> bool {
        self.p == other.p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gf8() -> Gf2Field {
        // x^8 + x^4 + x^3 + x + 1, the AES field, as a small cross-check.
        Gf2Field::new(&[8, 4, 3, 1, 0])
    }

    #[test]
    fn mul_matches_known_answer() {
        let gf = gf8();
        let a = gf.element_u64(0x53).unwrap();
        let b = gf.element_u64(0xCA).unwrap();
        let c = gf.mul(&a, &b);
        assert_eq!(c, gf.element_u64(0x01).unwrap());
    }

    #[test]
    fn add_is_involution() {
        let gf = gf8();
        let a = gf.element_u64(0x7a).unwrap();
        let b = gf.element_u64(0x21).unwrap();
        let sum = gf.add(&a, &b);
        assert_eq!(gf.add(&sum, &b), a);
    }

    #[test]
    fn inverse_round_trips() {
        let gf = gf8();
        let a = gf.element_u64(0x9d).unwrap();
        let inv = gf.inverse(&a).unwrap();
        assert_eq!(gf.mul(&a, &inv), gf.one());
    }

    #[test]
    fn rejects_out_of_field_value() {
        let gf = gf8();
        assert!(gf.element_u64(0x1_00).is_err());
    }

    #[test]
    fn gf256_round_trip_bytes() {
        let gf = Gf2Field::new(&[256, 10, 5, 2, 0]);
        let a = gf.random();
        let bytes = a.to_bytes_be(32);
        let back = Gf2Element::from_bytes_be(&bytes);
        assert_eq!(a, back);
    }

    #[test]
    fn gf256_inverse() {
        let gf = Gf2Field::new(&[256, 10, 5, 2, 0]);
        let a = gf.element_u64(0xdead_beef).unwrap();
        let inv = gf.inverse(&a).unwrap();
        assert_eq!(gf.mul(&a, &inv), gf.one());
    }
}
