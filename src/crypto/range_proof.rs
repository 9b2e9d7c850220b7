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

//! Bulletproofs range proof for a single committed value.
//!
//! # Theory
//!
//! [Bulletproofs] provide an efficient scheme for proving that a committed
//! value belongs to the interval `[0, 2^n)`. The scheme is non-interactive,
//! succinct (`O(log n)` group elements), and zero-knowledge: the verifier
//! learns nothing about the committed value besides the range.
//!
//! The prover commits to the bit decomposition of the value (`A`), blinds it
//! (`S`), builds a degree-2 polynomial `t(X)` whose constant coefficient
//! encodes the bit constraints under the challenges `y`, `z` (`T_1`, `T_2`),
//! and compresses the final vector check into an [inner-product argument].
//! All intermediate commitments are bound to the transcript, which makes the
//! proof non-malleable.
//!
//! [Bulletproofs]: https://eprint.iacr.org/2017/1066.pdf
//! [inner-product argument]: super::inner_product::InnerProductProof

#![allow(non_snake_case)]

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::{IsIdentity, MultiscalarMul, VartimeMultiscalarMul},
};
use merlin::Transcript;
use rand::thread_rng;
use rand_core::{CryptoRng, RngCore};
use subtle::{Choice, ConditionallySelectable};
use zeroize::Zeroize;

use std::iter;

use crate::{
    crypto::{
        group::{generators, random_scalar},
        inner_product::InnerProductProof,
        proofs::{Commitment, Opening},
        transcript::TranscriptProtocol,
        util::{self, VecPoly1},
    },
    errors::Error,
};

/// Bit widths accepted for range proofs.
pub const SUPPORTED_BITS: [usize; 4] = [8, 16, 32, 64];

/// Range proof for a single value in the range `[0, 2^n)`, `n ∈ {8,16,32,64}`.
///
/// # Examples
///
/// ```
/// # use confidential_transfer::crypto::{Commitment, Opening, RangeProof};
/// # use merlin::Transcript;
/// let opening = Opening::with_random_blinding(42_000_000);
/// let mut transcript = Transcript::new(b"doctest");
/// let (proof, commitment) =
///     RangeProof::prove(&mut transcript, &opening, 32).unwrap();
///
/// let mut transcript = Transcript::new(b"doctest");
/// assert!(proof.verify(&mut transcript, &commitment).is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeProof {
    /// Commitment to the bits of the value.
    pub(crate) A: CompressedRistretto,
    /// Commitment to the blinding vectors.
    pub(crate) S: CompressedRistretto,
    /// Commitment to the `t_1` coefficient of `t(X)`.
    pub(crate) T_1: CompressedRistretto,
    /// Commitment to the `t_2` coefficient of `t(X)`.
    pub(crate) T_2: CompressedRistretto,
    /// Blinding factor of the synthetic commitment to `t(x)`.
    pub(crate) tau_x: Scalar,
    /// Blinding factor of the synthetic commitment to the inner product.
    pub(crate) mu: Scalar,
    /// Evaluation of `t(X)` at the challenge point `x`.
    pub(crate) t_hat: Scalar,
    /// Inner-product argument for the committed vectors `l(x)`, `r(x)`.
    pub(crate) ipp_proof: InnerProductProof,
    /// Bit width of the proved range.
    pub(crate) bits: u8,
}

impl RangeProof {
    /// Creates a range proof for the value in `opening`, using the
    /// process-wide RNG.
    ///
    /// The transcript may already carry context (e.g. the statement of a
    /// composite proof); the resulting proof is then bound to that context.
    ///
    /// # Return value
    ///
    /// Returns the proof together with the commitment the proof is about.
    pub fn prove(
        transcript: &mut Transcript,
        opening: &Opening,
        n: usize,
    ) -> Result<(RangeProof, Commitment), Error> {
        Self::prove_with_rng(transcript, opening, n, &mut thread_rng())
    }

    /// Creates a range proof using the provided RNG.
    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        transcript: &mut Transcript,
        opening: &Opening,
        n: usize,
        rng: &mut R,
    ) -> Result<(RangeProof, Commitment), Error> {
        let gens = generators();
        if !SUPPORTED_BITS.contains(&n) {
            return Err(Error::InvalidArgument("unsupported range bit width"));
        }
        if n > gens.capacity() {
            return Err(Error::InvalidArgument("bit width exceeds generator capacity"));
        }
        let v = opening.value;
        if n < 64 && (v >> n) != 0 {
            return Err(Error::InvalidArgument("value is wider than the proved range"));
        }

        transcript.rangeproof_domain_sep(n as u64);

        let V = Commitment::from_opening(opening);
        transcript.append_point(b"V", &V.inner.compress());

        // A = α·h + ⟨a_L, G⟩ + ⟨a_R, H⟩. Since a_L is the bit vector of `v`
        // and a_R = a_L - 1, each term is either G_i or -H_i; the bit is
        // selected in constant time.
        let mut a_blinding = random_scalar(rng);
        let mut A = gens.h * a_blinding;
        for (i, (G_i, H_i)) in gens.g_iter(n).zip(gens.h_iter(n)).enumerate() {
            let v_i = Choice::from(((v >> i) & 1) as u8);
            let mut point = -H_i;
            point.conditional_assign(G_i, v_i);
            A += point;
        }

        let mut s_blinding = random_scalar(rng);
        let mut s_L: Vec<Scalar> = (0..n).map(|_| random_scalar(rng)).collect();
        let mut s_R: Vec<Scalar> = (0..n).map(|_| random_scalar(rng)).collect();

        // S = ρ·h + ⟨s_L, G⟩ + ⟨s_R, H⟩.
        let S = RistrettoPoint::multiscalar_mul(
            iter::once(&s_blinding).chain(s_L.iter()).chain(s_R.iter()),
            iter::once(&gens.h).chain(gens.g_iter(n)).chain(gens.h_iter(n)),
        );

        transcript.append_point(b"A", &A.compress());
        transcript.append_point(b"S", &S.compress());

        let y = transcript.challenge_scalar(b"y");
        let z = transcript.challenge_scalar(b"z");
        let zz = z * z;

        // l(X) = (a_L - z·1) + s_L·X
        // r(X) = y^n ∘ (a_R + z·1 + s_R·X) + z²·2^n
        let mut l_poly = VecPoly1::zero(n);
        let mut r_poly = VecPoly1::zero(n);
        let mut exp_y = Scalar::ONE;
        let mut exp_2 = Scalar::ONE;
        for i in 0..n {
            let a_L_i = Scalar::from((v >> i) & 1);
            let a_R_i = a_L_i - Scalar::ONE;

            l_poly.0[i] = a_L_i - z;
            l_poly.1[i] = s_L[i];
            r_poly.0[i] = exp_y * (a_R_i + z) + zz * exp_2;
            r_poly.1[i] = exp_y * s_R[i];

            exp_y *= y;
            exp_2 = exp_2 + exp_2;
        }

        let t_poly = l_poly.inner_product(&r_poly);

        let mut t_1_blinding = random_scalar(rng);
        let mut t_2_blinding = random_scalar(rng);
        let T_1 = gens.commit(t_poly.1, t_1_blinding);
        let T_2 = gens.commit(t_poly.2, t_2_blinding);

        transcript.append_point(b"T_1", &T_1.compress());
        transcript.append_point(b"T_2", &T_2.compress());

        let x = transcript.challenge_scalar(b"x");

        let tau_x = t_1_blinding * x + t_2_blinding * x * x + zz * opening.blinding;
        let mu = a_blinding + s_blinding * x;
        let t_hat = t_poly.eval(x);

        transcript.append_scalar(b"tau_x", &tau_x);
        transcript.append_scalar(b"mu", &mu);
        transcript.append_scalar(b"t_hat", &t_hat);

        // Challenge combining the scalar and vector statements for the
        // inner-product argument.
        let w = transcript.challenge_scalar(b"w");
        let Q = gens.g * w;

        let l_vec = l_poly.eval(x);
        let r_vec = r_poly.eval(x);
        let G_factors: Vec<Scalar> = iter::repeat(Scalar::ONE).take(n).collect();
        let H_factors: Vec<Scalar> = util::exp_iter(y.invert()).take(n).collect();

        let ipp_proof = InnerProductProof::create(
            transcript,
            &Q,
            &G_factors,
            &H_factors,
            gens.g_iter(n).cloned().collect(),
            gens.h_iter(n).cloned().collect(),
            l_vec,
            r_vec,
        );

        a_blinding.zeroize();
        s_blinding.zeroize();
        t_1_blinding.zeroize();
        t_2_blinding.zeroize();
        s_L.zeroize();
        s_R.zeroize();

        let proof = RangeProof {
            A: A.compress(),
            S: S.compress(),
            T_1: T_1.compress(),
            T_2: T_2.compress(),
            tau_x,
            mu,
            t_hat,
            ipp_proof,
            bits: n as u8,
        };
        Ok((proof, V))
    }

    /// Bit width of the proved range.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Verifies this proof with respect to the given committed value, using
    /// the process-wide RNG for statement batching.
    pub fn verify(
        &self,
        transcript: &mut Transcript,
        commitment: &Commitment,
    ) -> Result<(), Error> {
        self.verify_with_rng(transcript, commitment, &mut thread_rng())
    }

    /// Verifies this proof with respect to the given committed value.
    ///
    /// The check replays the transcript to recover all challenges, then
    /// collapses the commitment identity and the inner-product argument into
    /// a single multiscalar multiplication; `c` is a random scalar batching
    /// the two statements. The RNG is only used for `c` and never touches
    /// secret data.
    pub fn verify_with_rng<R: RngCore + CryptoRng>(
        &self,
        transcript: &mut Transcript,
        commitment: &Commitment,
        rng: &mut R,
    ) -> Result<(), Error> {
        let gens = generators();
        let n = self.bits as usize;
        if !SUPPORTED_BITS.contains(&n) || n > gens.capacity() {
            return Err(Error::InvalidArgument("unsupported range bit width"));
        }

        transcript.rangeproof_domain_sep(n as u64);
        transcript.append_point(b"V", &commitment.inner.compress());
        transcript.validate_and_append_point(b"A", &self.A)?;
        transcript.validate_and_append_point(b"S", &self.S)?;

        let y = transcript.challenge_scalar(b"y");
        let z = transcript.challenge_scalar(b"z");
        let zz = z * z;
        let minus_z = -z;

        transcript.validate_and_append_point(b"T_1", &self.T_1)?;
        transcript.validate_and_append_point(b"T_2", &self.T_2)?;

        let x = transcript.challenge_scalar(b"x");

        transcript.append_scalar(b"tau_x", &self.tau_x);
        transcript.append_scalar(b"mu", &self.mu);
        transcript.append_scalar(b"t_hat", &self.t_hat);

        let w = transcript.challenge_scalar(b"w");

        // Random batching scalar; public, so a vartime RNG draw is fine.
        let c = random_scalar(rng);

        let (u_sq, u_inv_sq, s) = self.ipp_proof.verification_scalars(n, transcript)?;
        let s_inv = s.iter().rev();

        let a = self.ipp_proof.a;
        let b = self.ipp_proof.b;

        let powers_of_2: Vec<Scalar> = util::exp_iter(Scalar::from(2_u64)).take(n).collect();
        let g = s.iter().map(|s_i| minus_z - a * s_i);
        let h = s_inv
            .zip(util::exp_iter(y.invert()))
            .zip(powers_of_2.iter())
            .map(|((s_i_inv, exp_y_inv), exp_2)| z + exp_y_inv * (zz * exp_2 - b * s_i_inv));

        let basepoint_scalar = w * (self.t_hat - a * b) + c * (delta(n, &y, &z) - self.t_hat);

        let mega_check = RistrettoPoint::optional_multiscalar_mul(
            iter::once(Scalar::ONE)
                .chain(iter::once(x))
                .chain(iter::once(c * x))
                .chain(iter::once(c * x * x))
                .chain(u_sq.iter().cloned())
                .chain(u_inv_sq.iter().cloned())
                .chain(iter::once(-self.mu - c * self.tau_x))
                .chain(iter::once(basepoint_scalar))
                .chain(g)
                .chain(h)
                .chain(iter::once(c * zz)),
            iter::once(self.A.decompress())
                .chain(iter::once(self.S.decompress()))
                .chain(iter::once(self.T_1.decompress()))
                .chain(iter::once(self.T_2.decompress()))
                .chain(self.ipp_proof.L_vec.iter().map(|L| L.decompress()))
                .chain(self.ipp_proof.R_vec.iter().map(|R| R.decompress()))
                .chain(iter::once(Some(gens.h)))
                .chain(iter::once(Some(gens.g)))
                .chain(gens.g_iter(n).map(|&p| Some(p)))
                .chain(gens.h_iter(n).map(|&p| Some(p)))
                .chain(iter::once(Some(commitment.inner))),
        )
        .ok_or(Error::NotInPrimeSubgroup)?;

        if mega_check.is_identity() {
            Ok(())
        } else {
            Err(Error::RangeProofFailed)
        }
    }
}

/// Computes `δ(y, z) = (z - z²)·⟨1, yⁿ⟩ - z³·⟨1, 2ⁿ⟩`.
fn delta(n: usize, y: &Scalar, z: &Scalar) -> Scalar {
    let sum_y = util::sum_of_powers(y, n);
    let sum_2 = util::sum_of_powers(&Scalar::from(2_u64), n);

    (z - z * z) * sum_y - z * z * z * sum_2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prove_and_verify_helper(value: u64, n: usize) {
        let opening = Opening::with_random_blinding(value);

        let mut transcript = Transcript::new(b"range proof test");
        let (proof, commitment) =
            RangeProof::prove(&mut transcript, &opening, n).expect("prove");

        let mut transcript = Transcript::new(b"range proof test");
        proof
            .verify(&mut transcript, &commitment)
            .expect("proof verifies");
    }

    #[test]
    fn values_at_range_bounds_prove_and_verify() {
        for &n in &SUPPORTED_BITS {
            prove_and_verify_helper(0, n);
            let max = if n == 64 { u64::MAX } else { (1 << n) - 1 };
            prove_and_verify_helper(max, n);
        }
    }

    #[test]
    fn random_values_prove_and_verify() {
        use rand::Rng;

        let mut rng = thread_rng();
        for _ in 0..3 {
            prove_and_verify_helper(u64::from(rng.gen::<u8>()), 8);
            prove_and_verify_helper(rng.gen::<u64>(), 64);
        }
    }

    #[test]
    fn value_wider_than_range_is_rejected_by_prover() {
        let opening = Opening::with_random_blinding(256);
        let mut transcript = Transcript::new(b"range proof test");
        assert!(matches!(
            RangeProof::prove(&mut transcript, &opening, 8),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn unsupported_bit_width_is_rejected() {
        let opening = Opening::with_random_blinding(1);
        let mut transcript = Transcript::new(b"range proof test");
        assert!(matches!(
            RangeProof::prove(&mut transcript, &opening, 24),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn proof_does_not_verify_against_other_commitment() {
        let opening = Opening::with_random_blinding(12_345);
        let mut transcript = Transcript::new(b"range proof test");
        let (proof, _) = RangeProof::prove(&mut transcript, &opening, 32).expect("prove");

        let (other_commitment, _) = Commitment::new(54_321);
        let mut transcript = Transcript::new(b"range proof test");
        assert_eq!(
            proof.verify(&mut transcript, &other_commitment),
            Err(Error::RangeProofFailed)
        );
    }

    #[test]
    fn proof_is_bound_to_transcript_context() {
        let opening = Opening::with_random_blinding(7);
        let mut transcript = Transcript::new(b"range proof test");
        let (proof, commitment) =
            RangeProof::prove(&mut transcript, &opening, 8).expect("prove");

        let mut transcript = Transcript::new(b"another context");
        assert!(proof.verify(&mut transcript, &commitment).is_err());
    }
}
