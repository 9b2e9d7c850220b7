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

//! Pedersen commitments and their openings.

use byteorder::{ByteOrder, LittleEndian};
use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar};
use rand::thread_rng;
use zeroize::Zeroize;

use std::ops;

use crate::{
    crypto::group::{generators, point_from_slice, random_scalar, scalar_from_slice},
    errors::Error,
};

/// Pedersen commitment to an integer value.
///
/// # Theory
///
/// A [Pedersen commitment] has the form (in the additive notation)
///
/// ```text
/// Comm(x; r) = xG + rH,
/// ```
///
/// where
///
/// - `G` and `H` are two generators in a prime-order group `Q`, with unknown
///   discrete logarithm relationships among them (i.e., nobody knows `k`
///   such as `G = kH`)
/// - `x` is the committed value (it’s a residue class modulo the group order
///   `|Q|`, but we may *essentially* treat it as an integer)
/// - `r` is the blinding factor (also a residue class modulo the group order
///   `|Q|`). Usually, it’s chosen randomly from a cryptographically secure RNG.
///
/// `Q`, `G` and `H` are public parameters of the scheme shared among all
/// commitments, while `x` and `r` are private. `(x, r)` is called an
/// *opening* to the commitment; knowing the opening, it’s easy to check
/// if it corresponds to the given commitment.
///
/// Under common security assumptions, a Pedersen commitment is
///
/// - *perfectly hiding* (a party not knowing `x` and `r` cannot find them out
///   from `Comm(..)`), and
/// - *computationally binding* (a party cannot produce `(x', r') != (x, r)`
///   such that they will open to the same commitment).
///
/// # Commitment arithmetic
///
/// It is possible to add and subtract Pedersen commitments, and to multiply
/// a commitment by a scalar; the result is a commitment to the sum /
/// difference / multiple of the corresponding values. This homomorphism is
/// what allows checking the balance equation of a transfer over commitments
/// alone.
///
/// # Implementation details
///
/// We use a [Ristretto group] built on top of Curve25519 as `Q`. The
/// generators are the deterministic set from [`generators()`]; see the
/// `group` module for their derivation.
///
/// # Examples
///
/// ```
/// # use confidential_transfer::crypto::Commitment;
/// let (mut commitment, mut opening) = Commitment::new(42);
/// assert_eq!(opening.value, 42);
/// assert_eq!(commitment, Commitment::from_opening(&opening));
///
/// let (other_commitment, other_opening) = Commitment::new(23);
/// commitment -= other_commitment;
/// opening -= other_opening;
/// assert_eq!(opening.value, 19);
/// assert_eq!(commitment, Commitment::from_opening(&opening));
/// ```
///
/// [Pedersen commitment]: https://en.wikipedia.org/wiki/Commitment_scheme
/// [Ristretto group]: https://ristretto.group/
/// [`generators()`]: crate::crypto::generators()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Commitment {
    pub(crate) inner: RistrettoPoint,
}

impl Commitment {
    /// Size of the byte representation of the commitment (i.e., a compressed
    /// Ristretto point).
    pub const BYTE_LEN: usize = 32;

    /// Creates a commitment with a randomly chosen blinding.
    ///
    /// # Return value
    ///
    /// Returns the created commitment and the corresponding opening for it.
    pub fn new(value: u64) -> (Self, Opening) {
        let blinding = random_scalar(&mut thread_rng());
        let opening = Opening::new(value, blinding);
        (Self::from_opening(&opening), opening)
    }

    /// Creates a commitment from the given opening.
    pub fn from_opening(opening: &Opening) -> Self {
        let inner = generators().commit(Scalar::from(opening.value), opening.blinding);
        Commitment { inner }
    }

    /// Creates a commitment with no blinding factor.
    ///
    /// **Warning.** The commitments created in this way are not hiding. Use
    /// them only if you know what you’re doing.
    pub fn with_no_blinding(value: u64) -> Self {
        Self::from_opening(&Opening::new(value, Scalar::ZERO))
    }

    /// Attempts to deserialize a commitment from a byte slice.
    ///
    /// Fails with [`Error::InvalidEncoding`] on a wrong-length slice and with
    /// [`Error::NotInPrimeSubgroup`] on an encoding that does not decode into
    /// the prime-order group.
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        point_from_slice(slice).map(|inner| Commitment { inner })
    }

    /// Serializes this commitment to bytes.
    ///
    /// # Implementation details
    ///
    /// The commitment is serialized as a single compressed Ristretto point
    /// (i.e., 32 bytes). A collaborating system that stores commitments in a
    /// wider fixed field (e.g., 64 bytes) is expected to zero-pad this
    /// canonical encoding; the core never produces a padded form itself.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.compress().as_bytes().to_vec()
    }

    /// Verifies if this commitment corresponds to the provided opening.
    pub fn verify(&self, opening: &Opening) -> bool {
        *self == Self::from_opening(opening)
    }
}

impl ops::Add for Commitment {
    type Output = Commitment;

    fn add(self, rhs: Self) -> Commitment {
        Commitment {
            inner: self.inner + rhs.inner,
        }
    }
}

impl<'a, 'b> ops::Add<&'b Commitment> for &'a Commitment {
    type Output = Commitment;

    fn add(self, rhs: &'b Commitment) -> Commitment {
        Commitment {
            inner: self.inner + rhs.inner,
        }
    }
}

impl ops::Sub for Commitment {
    type Output = Commitment;

    fn sub(self, rhs: Self) -> Commitment {
        Commitment {
            inner: self.inner - rhs.inner,
        }
    }
}

impl<'a, 'b> ops::Sub<&'b Commitment> for &'a Commitment {
    type Output = Commitment;

    fn sub(self, rhs: &'b Commitment) -> Commitment {
        Commitment {
            inner: self.inner - rhs.inner,
        }
    }
}

impl ops::SubAssign for Commitment {
    fn sub_assign(&mut self, rhs: Self) {
        self.inner -= rhs.inner;
    }
}

impl ops::Mul<Scalar> for Commitment {
    type Output = Commitment;

    fn mul(self, rhs: Scalar) -> Commitment {
        Commitment {
            inner: self.inner * rhs,
        }
    }
}

#[test]
fn commitment_arithmetic() {
    let (comm1, opening1) = Commitment::new(100);
    let (comm2, opening2) = Commitment::new(200);
    assert!((comm1 + comm2).verify(&(opening1 + opening2)));

    let (comm1, opening1) = Commitment::new(1234);
    let (comm2, opening2) = Commitment::new(234);
    assert!((comm1 - comm2).verify(&(&opening1 - &opening2)));

    let tripled = comm1 * Scalar::from(3_u64);
    let opening = Opening::new(
        opening1.value * 3,
        opening1.blinding * Scalar::from(3_u64),
    );
    assert!(tripled.verify(&opening));
}

#[test]
fn commitments_to_same_value_with_different_blindings_differ() {
    let (comm1, _) = Commitment::new(42);
    let (comm2, _) = Commitment::new(42);
    assert_ne!(comm1, comm2);
}

/// Opening for a Pedersen commitment.
///
/// # Theory
///
/// See [`Commitment`] docs for details on Pedersen commitments and their
/// openings.
///
/// # Arithmetic
///
/// Akin to `Commitment`s, openings can be added and subtracted. If an
/// over/underflow occurs when adding or subtracting committed values, a panic
/// is raised.
///
/// # Implementation details
///
/// Although the committed value `x` is generally a scalar in the used
/// prime-order group, we restrict it to `u64`. The conversion is
/// straightforward. The blinding factor is wiped from memory when the opening
/// is dropped; blindings never appear in any emitted proof bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opening {
    /// Committed value.
    pub value: u64,
    pub(crate) blinding: Scalar,
}

impl Opening {
    /// Size of a serialized opening.
    const BYTE_SIZE: usize = 40;

    /// Creates an opening from the given value and blinding factor.
    pub fn new(value: u64, blinding: Scalar) -> Self {
        Opening { value, blinding }
    }

    /// Creates an opening with a randomly chosen blinding.
    pub fn with_random_blinding(value: u64) -> Self {
        Opening::new(value, random_scalar(&mut thread_rng()))
    }

    /// Creates an opening with a zero blinding factor.
    #[doc(hidden)] // useful mostly in tests
    pub fn with_no_blinding(value: u64) -> Self {
        Opening::new(value, Scalar::ZERO)
    }

    /// Attempts to deserialize an opening from a slice.
    pub fn from_slice(slice: &[u8]) -> Result<Self, Error> {
        if slice.len() != Self::BYTE_SIZE {
            return Err(Error::InvalidEncoding);
        }

        Ok(Opening {
            value: LittleEndian::read_u64(&slice[..8]),
            blinding: scalar_from_slice(&slice[8..])?,
        })
    }

    /// Serializes this opening to bytes.
    ///
    /// # Implementation details
    ///
    /// Serialization consists of a committed value (8 bytes, little-endian)
    /// and a Ristretto scalar (32 bytes). The serialized form contains the
    /// blinding; it is intended solely for out-of-band delivery to the party
    /// that must track the committed balance.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = [0_u8; Self::BYTE_SIZE];
        LittleEndian::write_u64(&mut bytes[0..8], self.value);
        bytes[8..].copy_from_slice(self.blinding.as_bytes());
        bytes.to_vec()
    }
}

impl Drop for Opening {
    fn drop(&mut self) {
        self.blinding.zeroize();
    }
}

impl ops::Add for Opening {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Opening {
            value: self.value.checked_add(rhs.value).expect("integer overflow"),
            blinding: self.blinding + rhs.blinding,
        }
    }
}

impl<'a, 'b> ops::Add<&'b Opening> for &'a Opening {
    type Output = Opening;

    fn add(self, rhs: &'b Opening) -> Opening {
        Opening {
            value: self.value.checked_add(rhs.value).expect("integer overflow"),
            blinding: self.blinding + rhs.blinding,
        }
    }
}

impl ops::AddAssign for Opening {
    fn add_assign(&mut self, rhs: Self) {
        self.value = self.value.checked_add(rhs.value).expect("integer overflow");
        self.blinding += rhs.blinding;
    }
}

impl ops::Sub for Opening {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Opening {
            value: self
                .value
                .checked_sub(rhs.value)
                .expect("integer underflow"),
            blinding: self.blinding - rhs.blinding,
        }
    }
}

impl<'a, 'b> ops::Sub<&'b Opening> for &'a Opening {
    type Output = Opening;

    fn sub(self, rhs: &'b Opening) -> Opening {
        Opening {
            value: self
                .value
                .checked_sub(rhs.value)
                .expect("integer underflow"),
            blinding: self.blinding - rhs.blinding,
        }
    }
}

impl ops::SubAssign for Opening {
    fn sub_assign(&mut self, rhs: Self) {
        self.value = self
            .value
            .checked_sub(rhs.value)
            .expect("integer underflow");
        self.blinding -= rhs.blinding;
    }
}

#[test]
fn opening_roundtrip() {
    let opening = Opening::with_random_blinding(123_456);
    let restored = Opening::from_slice(&opening.to_bytes()).expect("deserialize");
    assert_eq!(opening, restored);

    assert_eq!(
        Opening::from_slice(&[0_u8; 39]),
        Err(Error::InvalidEncoding)
    );
}

#[test]
fn commitment_homomorphism_over_openings() {
    let (comm1, opening1) = Commitment::new(10);
    let (comm2, opening2) = Commitment::new(20);
    let sum_opening = &opening1 + &opening2;
    assert_eq!(sum_opening.value, 30);
    assert_eq!(comm1 + comm2, Commitment::from_opening(&sum_opening));
}
