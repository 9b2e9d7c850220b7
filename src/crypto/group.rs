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

//! Group and scalar primitives shared by all proofs.
//!
//! We use the [Ristretto group] built on top of Curve25519. The group has
//! prime order, so every point that deserializes successfully is a member of
//! the prime-order group; torsion and small-subgroup encodings cannot be
//! constructed. Scalars are integers modulo the group order and use the
//! constant-time arithmetic of the `curve25519-dalek` crate.
//!
//! [Ristretto group]: https://ristretto.group/

use byteorder::{ByteOrder, LittleEndian};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::MultiscalarMul,
};
use rand_core::{CryptoRng, RngCore};
use sha2::Sha512;

use std::iter;

use crate::errors::Error;

/// Domain-separation string from which all generators except `g` are derived.
///
/// This string is a protocol constant: changing it (or the derivation scheme
/// below) is a protocol break, since provers and verifiers must agree on the
/// generators bit-for-bit.
pub const GENERATORS_DOMAIN: &[u8] = b"confidential-transfer/generators/v1";

/// Maximum bit width of committed values supported by the default generators.
pub const MAX_RANGE_BITS: usize = 64;

lazy_static! {
    /// Process-wide generator set with [`MAX_RANGE_BITS`] capacity.
    static ref GENERATORS: Generators = Generators::new(MAX_RANGE_BITS);
}

/// Returns the process-wide generator set.
pub fn generators() -> &'static Generators {
    &GENERATORS
}

/// Samples a uniformly random scalar from a cryptographic RNG.
///
/// The scalar is produced by reducing 64 uniform bytes modulo the group
/// order, so the distribution is uniform over the full scalar field.
pub fn random_scalar<R: RngCore + CryptoRng>(rng: &mut R) -> Scalar {
    let mut bytes = [0_u8; 64];
    rng.fill_bytes(&mut bytes);
    Scalar::from_bytes_mod_order_wide(&bytes)
}

/// Parses a scalar from its canonical 32-byte little-endian encoding.
///
/// Rejects slices of the wrong length and non-canonical encodings
/// (i.e., integers not reduced modulo the group order).
pub fn scalar_from_slice(slice: &[u8]) -> Result<Scalar, Error> {
    if slice.len() != 32 {
        return Err(Error::InvalidEncoding);
    }
    let mut bytes = [0_u8; 32];
    bytes.copy_from_slice(slice);
    Option::from(Scalar::from_canonical_bytes(bytes)).ok_or(Error::InvalidEncoding)
}

/// Parses a group element from its canonical 32-byte encoding.
///
/// Rejects slices of the wrong length and any encoding that does not decode
/// into the prime-order group.
pub fn point_from_slice(slice: &[u8]) -> Result<RistrettoPoint, Error> {
    if slice.len() != 32 {
        return Err(Error::InvalidEncoding);
    }
    let mut bytes = [0_u8; 32];
    bytes.copy_from_slice(slice);
    CompressedRistretto(bytes)
        .decompress()
        .ok_or(Error::NotInPrimeSubgroup)
}

/// Generators for Pedersen commitments and range proofs.
///
/// The pair `(g, h)` is used for value commitments `v·g + r·h`; the vectors
/// `G` and `H` are used for the vector commitments inside range proofs and
/// the inner-product argument. `g` is the Ristretto basepoint; `h` and every
/// vector element are derived from [`GENERATORS_DOMAIN`] with a hash-to-group
/// routine, so no party knows discrete-log relations between any of them, and
/// any two parties derive identical vectors.
#[derive(Debug, Clone)]
pub struct Generators {
    /// Base for committed values.
    pub g: RistrettoPoint,
    /// Base for blinding factors.
    pub h: RistrettoPoint,
    g_vec: Vec<RistrettoPoint>,
    h_vec: Vec<RistrettoPoint>,
}

impl Generators {
    /// Creates a generator set supporting range proofs up to `capacity` bits.
    pub fn new(capacity: usize) -> Self {
        Generators {
            g: RISTRETTO_BASEPOINT_POINT,
            h: derive_generator(b"h", 0),
            g_vec: (0..capacity)
                .map(|i| derive_generator(b"G", i as u32))
                .collect(),
            h_vec: (0..capacity)
                .map(|i| derive_generator(b"H", i as u32))
                .collect(),
        }
    }

    /// Number of vector generators, i.e. the maximum supported bit width.
    pub fn capacity(&self) -> usize {
        self.g_vec.len()
    }

    /// First `n` generators of the `G` vector.
    pub(crate) fn g_iter(&self, n: usize) -> impl Iterator<Item = &RistrettoPoint> {
        self.g_vec.iter().take(n)
    }

    /// First `n` generators of the `H` vector.
    pub(crate) fn h_iter(&self, n: usize) -> impl Iterator<Item = &RistrettoPoint> {
        self.h_vec.iter().take(n)
    }

    /// Computes the Pedersen commitment `value·g + blinding·h`.
    ///
    /// Uses a constant-time multiscalar multiplication, as both arguments are
    /// secret on the prover side.
    pub fn commit(&self, value: Scalar, blinding: Scalar) -> RistrettoPoint {
        RistrettoPoint::multiscalar_mul(
            iter::once(&value).chain(iter::once(&blinding)),
            iter::once(&self.g).chain(iter::once(&self.h)),
        )
    }
}

/// Derives a single generator from the protocol domain string, a role label
/// and an index.
fn derive_generator(label: &[u8], index: u32) -> RistrettoPoint {
    let mut input = Vec::with_capacity(GENERATORS_DOMAIN.len() + 1 + label.len() + 4);
    input.extend_from_slice(GENERATORS_DOMAIN);
    input.push(b'/');
    input.extend_from_slice(label);
    let mut index_bytes = [0_u8; 4];
    LittleEndian::write_u32(&mut index_bytes, index);
    input.extend_from_slice(&index_bytes);
    RistrettoPoint::hash_from_bytes::<Sha512>(&input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::traits::Identity;
    use rand::thread_rng;

    use std::collections::HashSet;

    #[test]
    fn scalar_arithmetic_laws() {
        let mut rng = thread_rng();
        let (a, b, c) = (
            random_scalar(&mut rng),
            random_scalar(&mut rng),
            random_scalar(&mut rng),
        );

        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a * b, b * a);
        assert_eq!(a * (b + c), a * b + a * c);
        if a != Scalar::ZERO {
            assert_eq!(a * a.invert(), Scalar::ONE);
        }
    }

    #[test]
    fn point_arithmetic_laws() {
        let mut rng = thread_rng();
        let gens = generators();
        let p = gens.g * random_scalar(&mut rng);
        let q = gens.h * random_scalar(&mut rng);
        let r = gens.g * random_scalar(&mut rng);

        assert_eq!((p + q) + r, p + (q + r));
        assert_eq!(p + (-p), RistrettoPoint::identity());
    }

    #[test]
    fn scalar_roundtrip_and_rejection() {
        let mut rng = thread_rng();
        let s = random_scalar(&mut rng);
        assert_eq!(scalar_from_slice(s.as_bytes()).expect("canonical"), s);

        // A value >= the group order is non-canonical.
        let non_canonical = [0xff_u8; 32];
        assert_eq!(
            scalar_from_slice(&non_canonical),
            Err(Error::InvalidEncoding)
        );
        assert_eq!(scalar_from_slice(&[0_u8; 16]), Err(Error::InvalidEncoding));
    }

    #[test]
    fn point_roundtrip_and_rejection() {
        let mut rng = thread_rng();
        let p = generators().g * random_scalar(&mut rng);
        let bytes = p.compress().to_bytes();
        assert_eq!(point_from_slice(&bytes).expect("canonical"), p);

        // Most 32-byte strings are not valid Ristretto encodings; this one
        // is rejected deterministically (it is a non-canonical field element).
        let invalid = [0xff_u8; 32];
        assert_eq!(point_from_slice(&invalid), Err(Error::NotInPrimeSubgroup));
        assert_eq!(point_from_slice(&[1_u8; 7]), Err(Error::InvalidEncoding));
    }

    #[test]
    fn generators_are_deterministic_and_distinct() {
        let gens = Generators::new(MAX_RANGE_BITS);
        let other = Generators::new(MAX_RANGE_BITS);
        assert_eq!(gens.h, other.h);

        let mut encodings = HashSet::new();
        encodings.insert(gens.g.compress().to_bytes());
        encodings.insert(gens.h.compress().to_bytes());
        for point in gens.g_iter(MAX_RANGE_BITS).chain(gens.h_iter(MAX_RANGE_BITS)) {
            encodings.insert(point.compress().to_bytes());
        }
        assert_eq!(encodings.len(), 2 + 2 * MAX_RANGE_BITS);
    }
}
