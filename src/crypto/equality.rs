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

//! Schnorr-style proof that two commitments hide the same value.
//!
//! # Theory
//!
//! If `C₁ = v·g + r₁·h` and `C₂ = v·g + r₂·h` hide the same value, their
//! difference `C₁ − C₂ = (r₁ − r₂)·h` is a multiple of `h` alone. Knowledge
//! of the discrete logarithm `Δ = r₁ − r₂` of `C₁ − C₂` to the base `h` is
//! therefore a proof that the value parts cancel; it is shown with a
//! standard Schnorr proof made non-interactive via the transcript.
//!
//! The same argument proves sum equalities: for commitments `C`, `C′`, `C″`,
//! the statement `C` hides the sum of the values in `C′` and `C″` is the
//! statement that `C − (C′ + C″)` hides zero.

#![allow(non_snake_case)]

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::{Identity, VartimeMultiscalarMul},
};
use merlin::Transcript;
use rand::thread_rng;
use rand_core::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::{
    crypto::{
        group::{generators, random_scalar},
        proofs::{Commitment, Opening},
        transcript::TranscriptProtocol,
    },
    errors::Error,
};

/// Proof that two commitments hide the same value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EqualityProof {
    /// Commitment to the Schnorr nonce, `A = k·h`.
    pub(crate) A: CompressedRistretto,
    /// Schnorr response, `z = k + c·(r₁ − r₂)`.
    pub(crate) z: Scalar,
}

impl EqualityProof {
    /// Creates a proof that `first` and `second` hide the same value, using
    /// the process-wide RNG.
    pub fn prove(
        transcript: &mut Transcript,
        first: &Opening,
        second: &Opening,
    ) -> Result<EqualityProof, Error> {
        Self::prove_with_rng(transcript, first, second, &mut thread_rng())
    }

    /// Creates a proof that `first` and `second` hide the same value.
    ///
    /// Fails with [`Error::InvalidArgument`] if the openings disagree on the
    /// value: a proof for such a statement would never verify.
    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        transcript: &mut Transcript,
        first: &Opening,
        second: &Opening,
        rng: &mut R,
    ) -> Result<EqualityProof, Error> {
        if first.value != second.value {
            return Err(Error::InvalidArgument("openings hide different values"));
        }

        let first_commitment = Commitment::from_opening(first);
        let second_commitment = Commitment::from_opening(second);
        let delta = first.blinding - second.blinding;

        transcript.equality_domain_sep();
        transcript.append_point(b"C_1", &first_commitment.inner.compress());
        transcript.append_point(b"C_2", &second_commitment.inner.compress());

        let mut k = random_scalar(rng);
        let A = (generators().h * k).compress();
        transcript.append_point(b"A", &A);

        let c = transcript.challenge_scalar(b"c");
        let z = k + c * delta;
        k.zeroize();

        Ok(EqualityProof { A, z })
    }

    /// Verifies that `first` and `second` hide the same value.
    ///
    /// Checks `z·h == A + c·(C₁ − C₂)` in a single multiscalar evaluation,
    /// with a constant-time comparison of the result against the identity.
    pub fn verify(
        &self,
        transcript: &mut Transcript,
        first: &Commitment,
        second: &Commitment,
    ) -> Result<(), Error> {
        transcript.equality_domain_sep();
        transcript.append_point(b"C_1", &first.inner.compress());
        transcript.append_point(b"C_2", &second.inner.compress());
        transcript.validate_and_append_point(b"A", &self.A)?;

        let c = transcript.challenge_scalar(b"c");

        let A = self.A.decompress().ok_or(Error::NotInPrimeSubgroup)?;
        let difference = first.inner - second.inner;

        // z·h − A − c·(C₁ − C₂) must be the identity.
        let check = RistrettoPoint::vartime_multiscalar_mul(
            &[self.z, -Scalar::ONE, -c],
            &[generators().h, A, difference],
        );

        if bool::from(check.ct_eq(&RistrettoPoint::identity())) {
            Ok(())
        } else {
            Err(Error::EqualityProofFailed)
        }
    }
}
