//! Shamir's secret sharing over a [`Gf2Field`].
//!
//! Splits a nonzero field element into `n` `(x, y)` points on a random
//! degree `k-1` polynomial whose constant term is the secret; any `k` of
//! the `n` points reconstruct it via Lagrange interpolation at `x = 0`.
//!
//! This module does not detect an insufficient or incorrect quorum: given
//! fewer than `k` points, or points from two different splits, `join` still
//! returns *a* value, just not the original secret. Callers that need that
//! guarantee should MAC the secret before splitting and check the MAC after
//! joining.

use crate::error::SblError;
use crate::field::{Gf2Element, Gf2Field};

/// One point `(x, y)` of a split polynomial.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: Gf2Element,
    pub y: Gf2Element,
}

/// Draws a random degree `k-1` polynomial with constant term `secret`,
/// resampling if the leading coefficient would be zero (which would make
/// the polynomial's true degree lower than requested).
fn random_poly(gf: &Gf2Field, secret: &Gf2Element, k: usize) -> Result<Vec<Gf2Element>, SblError> {
    if secret.is_zero() {
        return Err(SblError::InvalidSecret("secret must not be zero".into()));
    }
    loop {
        let mut p = Vec::with_capacity(k);
        p.push(secret.clone());
        for _ in 1..k {
            p.push(gf.random());
        }
        if !p.last().unwrap().is_zero() {
            return Ok(p);
        }
    }
}

/// Horner's method evaluation of `p` at `x`.
fn eval_poly(gf: &Gf2Field, x: &Gf2Element, p: &[Gf2Element]) -> Gf2Element {
    let mut r = gf.zero();
    for c in p.iter().rev() {
        r = gf.add(&gf.mul(&r, x), c);
    }
    r
}

/// Lagrange basis polynomial `i`, evaluated at `x`.
fn lp_i(gf: &Gf2Field, x: &Gf2Element, xi: &Gf2Element, others: &[Gf2Element]) -> Result<Gf2Element, SblError> {
    let mut num = gf.one();
    let mut den = gf.one();
    for xj in others {
        num = gf.mul(&num, &gf.sub(x, xj));
        den = gf.mul(&den, &gf.sub(xi, xj));
    }
    Ok(gf.mul(&num, &gf.inverse(&den)?))
}

fn lagrange(gf: &Gf2Field, x: &Gf2Element, points: &[Point]) -> Result<Gf2Element, SblError> {
    let mut f = gf.zero();
    for (i, p) in points.iter().enumerate() {
        let others: Vec<Gf2Element> = points
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, pt)| pt.x.clone())
            .collect();
        let li = lp_i(gf, x, &p.x, &others)?;
        f = gf.add(&f, &gf.mul(&p.y, &li));
    }
    Ok(f)
}

/// Splits `secret` into `n` points with a reconstruction quorum of `k`.
/// `x` coordinates are `1..=n` (never `0`, which is reserved for the
/// reconstructed secret).
pub fn split(gf: &Gf2Field, secret: &Gf2Element, k: usize, n: usize) -> Result<Vec<Point>, SblError> {
    if k == 0 || k > n {
        return Err(SblError::InvalidInput(format!(
            "quorum {k} must be between 1 and the share count {n}"
        )));
    }
    let poly = random_poly(gf, secret, k)?;
    (1..=n as u64)
        .map(|v| {
            let x = gf.element_u64(v)?;
            let y = eval_poly(gf, &x, &poly);
            Ok(Point { x, y })
        })
        .collect()
}

/// Reconstructs the secret from `k` or more points. Does not verify that
/// the points come from the same split or that `k` is sufficient.
pub fn join(gf: &Gf2Field, points: &[Point]) -> Result<Gf2Element, SblError> {
    if points.is_empty() {
        return Err(SblError::InvalidInput("no points to join".into()));
    }
    lagrange(gf, &gf.zero(), points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> Gf2Field {
        Gf2Field::new(&[256, 10, 5, 2, 0])
    }

    #[test]
    fn split_and_join_recovers_secret() {
        let gf = field();
        let secret = gf.element_u64(0xdead_beef_cafe).unwrap();
        let points = split(&gf, &secret, 3, 5).unwrap();
        let recovered = join(&gf, &points[0..3]).unwrap();
        assert_eq!(recovered, secret);

        let recovered_other_quorum = join(&gf, &points[2..5]).unwrap();
        assert_eq!(recovered_other_quorum, secret);
    }

    #[test]
    fn more_than_quorum_still_works() {
        let gf = field();
        let secret = gf.element_u64(42).unwrap();
        let points = split(&gf, &secret, 2, 5).unwrap();
        let recovered = join(&gf, &points).unwrap();
        assert_eq!(recovered, secret);
    }

    #[test]
    fn rejects_zero_secret() {
        let gf = field();
        let zero = gf.zero();
        assert!(split(&gf, &zero, 2, 3).is_err());
    }

    #[test]
    fn rejects_quorum_above_share_count() {
        let gf = field();
        let secret = gf.element_u64(7).unwrap();
        assert!(split(&gf, &secret, 6, 5).is_err());
    }
}
