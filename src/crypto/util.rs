// Copyright 2018 The Exonum Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Scalar-vector and polynomial helpers for range proofs.

use curve25519_dalek::scalar::Scalar;
use zeroize::Zeroize;

/// Degree-1 vector polynomial `l(X) = a + b·X` with scalar-vector
/// coefficients.
pub struct VecPoly1(pub Vec<Scalar>, pub Vec<Scalar>);

/// Degree-2 scalar polynomial `t(X) = t0 + t1·X + t2·X²`.
pub struct Poly2(pub Scalar, pub Scalar, pub Scalar);

impl VecPoly1 {
    pub fn zero(n: usize) -> Self {
        VecPoly1(vec![Scalar::ZERO; n], vec![Scalar::ZERO; n])
    }

    /// Computes the degree-2 polynomial `⟨l(X), r(X)⟩`.
    ///
    /// Uses Karatsuba's trick: the middle coefficient is computed as
    /// `t1 = ⟨l0 + l1, r0 + r1⟩ - t0 - t2`.
    pub fn inner_product(&self, rhs: &VecPoly1) -> Poly2 {
        let l = self;
        let r = rhs;

        let t0 = inner_product(&l.0, &r.0);
        let t2 = inner_product(&l.1, &r.1);

        let l0_plus_l1 = add_vec(&l.0, &l.1);
        let r0_plus_r1 = add_vec(&r.0, &r.1);

        let t1 = inner_product(&l0_plus_l1, &r0_plus_r1) - t0 - t2;

        Poly2(t0, t1, t2)
    }

    pub fn eval(&self, x: Scalar) -> Vec<Scalar> {
        (0..self.0.len()).map(|i| self.0[i] + x * self.1[i]).collect()
    }
}

impl Poly2 {
    pub fn eval(&self, x: Scalar) -> Scalar {
        self.0 + x * (self.1 + x * self.2)
    }
}

impl Drop for VecPoly1 {
    fn drop(&mut self) {
        self.0.zeroize();
        self.1.zeroize();
    }
}

/// Computes the inner product `⟨a, b⟩ = Σ aᵢ·bᵢ`.
///
/// # Panics
///
/// Panics if the vector lengths differ.
pub fn inner_product(a: &[Scalar], b: &[Scalar]) -> Scalar {
    assert_eq!(a.len(), b.len(), "inner product of unequal-length vectors");
    a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
}

/// Computes the element-wise sum of two scalar vectors.
pub fn add_vec(a: &[Scalar], b: &[Scalar]) -> Vec<Scalar> {
    assert_eq!(a.len(), b.len(), "sum of unequal-length vectors");
    a.iter().zip(b.iter()).map(|(a, b)| a + b).collect()
}

/// Iterator over the powers `1, x, x², …` of a scalar.
pub struct ScalarExp {
    x: Scalar,
    next_exp_x: Scalar,
}

impl Iterator for ScalarExp {
    type Item = Scalar;

    fn next(&mut self) -> Option<Scalar> {
        let exp_x = self.next_exp_x;
        self.next_exp_x *= self.x;
        Some(exp_x)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (usize::MAX, None)
    }
}

/// Returns an unbounded iterator over the powers of `x`, starting at `x⁰`.
pub fn exp_iter(x: Scalar) -> ScalarExp {
    ScalarExp {
        x,
        next_exp_x: Scalar::ONE,
    }
}

/// Computes `Σ_{i<n} xⁱ`.
pub fn sum_of_powers(x: &Scalar, n: usize) -> Scalar {
    exp_iter(*x).take(n).sum()
}

/// Given `data` with `len >= 32`, returns the first 32 bytes.
pub fn read32(data: &[u8]) -> [u8; 32] {
    let mut buf = [0_u8; 32];
    buf.copy_from_slice(&data[..32]);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalars(values: &[u64]) -> Vec<Scalar> {
        values.iter().map(|&v| Scalar::from(v)).collect()
    }

    #[test]
    fn inner_product_matches_direct_computation() {
        let a = scalars(&[1, 2, 3, 4]);
        let b = scalars(&[2, 3, 4, 5]);
        assert_eq!(inner_product(&a, &b), Scalar::from(40_u64));
    }

    #[test]
    fn vec_poly_inner_product_matches_evaluation() {
        let l = VecPoly1(scalars(&[1, 2]), scalars(&[3, 4]));
        let r = VecPoly1(scalars(&[5, 6]), scalars(&[7, 8]));
        let t = l.inner_product(&r);

        let x = Scalar::from(10_u64);
        assert_eq!(t.eval(x), inner_product(&l.eval(x), &r.eval(x)));
    }

    #[test]
    fn power_sums() {
        let x = Scalar::from(3_u64);
        // 1 + 3 + 9 + 27
        assert_eq!(sum_of_powers(&x, 4), Scalar::from(40_u64));
        let powers: Vec<_> = exp_iter(x).take(3).collect();
        assert_eq!(powers, scalars(&[1, 3, 9]));
    }
}
