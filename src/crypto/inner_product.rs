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

//! Inner-product argument.
//!
//! Proves knowledge of vectors `a`, `b` of length `n` (a power of two) such
//! that a known point `P` equals `⟨a,G⟩ + ⟨b,H⟩ + ⟨a,b⟩·Q`. Each of the
//! `log₂(n)` rounds sends cross terms `L`, `R`, obtains a transcript
//! challenge `u` and folds the vectors (and generators) by `u` and `u⁻¹`,
//! halving the problem size; the final round reveals the two remaining
//! scalars. The proof therefore consists of `2·log₂(n)` group elements and
//! two scalars.

#![allow(non_snake_case)]

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::VartimeMultiscalarMul,
};
use merlin::Transcript;

use std::iter;

use crate::{
    crypto::{
        transcript::TranscriptProtocol,
        util::inner_product,
    },
    errors::Error,
};

/// Proof of an inner-product relation between two committed vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerProductProof {
    pub(crate) L_vec: Vec<CompressedRistretto>,
    pub(crate) R_vec: Vec<CompressedRistretto>,
    pub(crate) a: Scalar,
    pub(crate) b: Scalar,
}

impl InnerProductProof {
    /// Creates an inner-product proof.
    ///
    /// The `G_factors` and `H_factors` are per-element scalings of the
    /// generator vectors; the statement proved is relative to the scaled
    /// generators, but the scaling is folded in during the first round so the
    /// caller can pass the unscaled vectors. The lengths of all vectors must
    /// be equal and a power of two.
    pub(crate) fn create(
        transcript: &mut Transcript,
        Q: &RistrettoPoint,
        G_factors: &[Scalar],
        H_factors: &[Scalar],
        mut G_vec: Vec<RistrettoPoint>,
        mut H_vec: Vec<RistrettoPoint>,
        mut a_vec: Vec<Scalar>,
        mut b_vec: Vec<Scalar>,
    ) -> InnerProductProof {
        let mut G = &mut G_vec[..];
        let mut H = &mut H_vec[..];
        let mut a = &mut a_vec[..];
        let mut b = &mut b_vec[..];

        let mut n = G.len();
        assert_eq!(H.len(), n);
        assert_eq!(a.len(), n);
        assert_eq!(b.len(), n);
        assert_eq!(G_factors.len(), n);
        assert_eq!(H_factors.len(), n);
        assert!(n.is_power_of_two());

        transcript.innerproduct_domain_sep(n as u64);

        let lg_n = n.trailing_zeros() as usize;
        let mut L_vec = Vec::with_capacity(lg_n);
        let mut R_vec = Vec::with_capacity(lg_n);

        // The first round folds the generator scalings into the generators;
        // all subsequent rounds operate on the already-folded vectors.
        if n != 1 {
            n /= 2;
            let (a_L, a_R) = a.split_at_mut(n);
            let (b_L, b_R) = b.split_at_mut(n);
            let (G_L, G_R) = G.split_at_mut(n);
            let (H_L, H_R) = H.split_at_mut(n);

            let c_L = inner_product(a_L, b_R);
            let c_R = inner_product(a_R, b_L);

            let L = RistrettoPoint::vartime_multiscalar_mul(
                a_L.iter()
                    .zip(G_factors[n..2 * n].iter())
                    .map(|(a_L_i, g)| a_L_i * g)
                    .chain(
                        b_R.iter()
                            .zip(H_factors[0..n].iter())
                            .map(|(b_R_i, h)| b_R_i * h),
                    )
                    .chain(iter::once(c_L)),
                G_R.iter().chain(H_L.iter()).chain(iter::once(Q)),
            )
            .compress();

            let R = RistrettoPoint::vartime_multiscalar_mul(
                a_R.iter()
                    .zip(G_factors[0..n].iter())
                    .map(|(a_R_i, g)| a_R_i * g)
                    .chain(
                        b_L.iter()
                            .zip(H_factors[n..2 * n].iter())
                            .map(|(b_L_i, h)| b_L_i * h),
                    )
                    .chain(iter::once(c_R)),
                G_L.iter().chain(H_R.iter()).chain(iter::once(Q)),
            )
            .compress();

            transcript.append_point(b"L", &L);
            transcript.append_point(b"R", &R);
            L_vec.push(L);
            R_vec.push(R);

            let u = transcript.challenge_scalar(b"u");
            let u_inv = u.invert();

            for i in 0..n {
                a_L[i] = a_L[i] * u + u_inv * a_R[i];
                b_L[i] = b_L[i] * u_inv + u * b_R[i];
                G_L[i] = RistrettoPoint::vartime_multiscalar_mul(
                    &[u_inv * G_factors[i], u * G_factors[n + i]],
                    &[G_L[i], G_R[i]],
                );
                H_L[i] = RistrettoPoint::vartime_multiscalar_mul(
                    &[u * H_factors[i], u_inv * H_factors[n + i]],
                    &[H_L[i], H_R[i]],
                );
            }

            a = a_L;
            b = b_L;
            G = G_L;
            H = H_L;
        }

        while n != 1 {
            n /= 2;
            let (a_L, a_R) = a.split_at_mut(n);
            let (b_L, b_R) = b.split_at_mut(n);
            let (G_L, G_R) = G.split_at_mut(n);
            let (H_L, H_R) = H.split_at_mut(n);

            let c_L = inner_product(a_L, b_R);
            let c_R = inner_product(a_R, b_L);

            let L = RistrettoPoint::vartime_multiscalar_mul(
                a_L.iter().chain(b_R.iter()).chain(iter::once(&c_L)),
                G_R.iter().chain(H_L.iter()).chain(iter::once(Q)),
            )
            .compress();

            let R = RistrettoPoint::vartime_multiscalar_mul(
                a_R.iter().chain(b_L.iter()).chain(iter::once(&c_R)),
                G_L.iter().chain(H_R.iter()).chain(iter::once(Q)),
            )
            .compress();

            transcript.append_point(b"L", &L);
            transcript.append_point(b"R", &R);
            L_vec.push(L);
            R_vec.push(R);

            let u = transcript.challenge_scalar(b"u");
            let u_inv = u.invert();

            for i in 0..n {
                a_L[i] = a_L[i] * u + u_inv * a_R[i];
                b_L[i] = b_L[i] * u_inv + u * b_R[i];
                G_L[i] = RistrettoPoint::vartime_multiscalar_mul(
                    &[u_inv, u],
                    &[G_L[i], G_R[i]],
                );
                H_L[i] = RistrettoPoint::vartime_multiscalar_mul(
                    &[u, u_inv],
                    &[H_L[i], H_R[i]],
                );
            }

            a = a_L;
            b = b_L;
            G = G_L;
            H = H_L;
        }

        InnerProductProof {
            L_vec,
            R_vec,
            a: a[0],
            b: b[0],
        }
    }

    /// Recomputes the verification scalars for the folded statement.
    ///
    /// Returns the squared challenges, their inverses, and the expansion
    /// vector `s` used to express the folded generators as a multiscalar
    /// combination of the original ones. The transcript is advanced exactly
    /// as during proving, so the challenges match.
    pub(crate) fn verification_scalars(
        &self,
        n: usize,
        transcript: &mut Transcript,
    ) -> Result<(Vec<Scalar>, Vec<Scalar>, Vec<Scalar>), Error> {
        let lg_n = self.L_vec.len();
        if lg_n >= 32 || self.R_vec.len() != lg_n {
            return Err(Error::InnerProductFailed);
        }
        if n != (1 << lg_n) {
            return Err(Error::InnerProductFailed);
        }

        transcript.innerproduct_domain_sep(n as u64);

        let mut challenges = Vec::with_capacity(lg_n);
        for (L, R) in self.L_vec.iter().zip(self.R_vec.iter()) {
            transcript.validate_and_append_point(b"L", L)?;
            transcript.validate_and_append_point(b"R", R)?;
            challenges.push(transcript.challenge_scalar(b"u"));
        }

        let mut challenges_inv = challenges.clone();
        let allinv = Scalar::batch_invert(&mut challenges_inv);

        for i in 0..lg_n {
            challenges[i] = challenges[i] * challenges[i];
            challenges_inv[i] = challenges_inv[i] * challenges_inv[i];
        }
        let challenges_sq = challenges;
        let challenges_inv_sq = challenges_inv;

        // s[0] = Π u_i⁻¹; every further entry flips one challenge from
        // inverse to direct, following the binary decomposition of the index.
        let mut s = Vec::with_capacity(n);
        s.push(allinv);
        for i in 1..n {
            let lg_i = (32 - 1 - (i as u32).leading_zeros()) as usize;
            let k = 1 << lg_i;
            let u_lg_i_sq = challenges_sq[(lg_n - 1) - lg_i];
            s.push(s[i - k] * u_lg_i_sq);
        }

        Ok((challenges_sq, challenges_inv_sq, s))
    }

    /// Verifies the proof against the commitment `P = ⟨a,G⟩ + ⟨b,H⟩ + c·Q`.
    pub fn verify(
        &self,
        n: usize,
        transcript: &mut Transcript,
        P: &RistrettoPoint,
        Q: &RistrettoPoint,
        G: &[RistrettoPoint],
        H: &[RistrettoPoint],
    ) -> Result<(), Error> {
        let (u_sq, u_inv_sq, s) = self.verification_scalars(n, transcript)?;

        let g_scalars = s.iter().map(|s_i| self.a * s_i);
        let h_scalars = s.iter().rev().map(|s_i_inv| self.b * s_i_inv);
        let neg_u_sq = u_sq.iter().map(|u| -u);
        let neg_u_inv_sq = u_inv_sq.iter().map(|u| -u);

        let expected_P = RistrettoPoint::optional_multiscalar_mul(
            iter::once(self.a * self.b)
                .chain(g_scalars)
                .chain(h_scalars)
                .chain(neg_u_sq)
                .chain(neg_u_inv_sq),
            iter::once(Some(*Q))
                .chain(G.iter().map(|&p| Some(p)))
                .chain(H.iter().map(|&p| Some(p)))
                .chain(self.L_vec.iter().map(|p| p.decompress()))
                .chain(self.R_vec.iter().map(|p| p.decompress())),
        )
        .ok_or(Error::NotInPrimeSubgroup)?;

        if expected_P == *P {
            Ok(())
        } else {
            Err(Error::InnerProductFailed)
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::thread_rng;

    use crate::crypto::{
        group::{generators, random_scalar},
        util::exp_iter,
    };

    fn create_and_verify_helper(n: usize) {
        let mut rng = thread_rng();
        let gens = generators();

        let G: Vec<RistrettoPoint> = gens.g_iter(n).cloned().collect();
        let H: Vec<RistrettoPoint> = gens.h_iter(n).cloned().collect();
        let Q = gens.g * random_scalar(&mut rng);

        let a: Vec<Scalar> = (0..n).map(|_| random_scalar(&mut rng)).collect();
        let b: Vec<Scalar> = (0..n).map(|_| random_scalar(&mut rng)).collect();
        let c = inner_product(&a, &b);

        let ones: Vec<Scalar> = exp_iter(Scalar::ONE).take(n).collect();

        let P = RistrettoPoint::vartime_multiscalar_mul(
            a.iter().chain(b.iter()).chain(iter::once(&c)),
            G.iter().chain(H.iter()).chain(iter::once(&Q)),
        );

        let mut prover_transcript = Transcript::new(b"ipp test");
        let proof = InnerProductProof::create(
            &mut prover_transcript,
            &Q,
            &ones,
            &ones,
            G.clone(),
            H.clone(),
            a,
            b,
        );

        let mut verifier_transcript = Transcript::new(b"ipp test");
        proof
            .verify(n, &mut verifier_transcript, &P, &Q, &G, &H)
            .expect("proof verifies");

        // A statement for a different commitment must be rejected.
        let mut verifier_transcript = Transcript::new(b"ipp test");
        let bogus = P + gens.h;
        assert_eq!(
            proof.verify(n, &mut verifier_transcript, &bogus, &Q, &G, &H),
            Err(Error::InnerProductFailed)
        );
    }

    #[test]
    fn create_and_verify_n_1() {
        create_and_verify_helper(1);
    }

    #[test]
    fn create_and_verify_n_8() {
        create_and_verify_helper(8);
    }

    #[test]
    fn create_and_verify_n_64() {
        create_and_verify_helper(64);
    }

    #[test]
    fn mismatched_length_is_rejected() {
        let mut rng = thread_rng();
        let gens = generators();
        let n = 8;

        let G: Vec<RistrettoPoint> = gens.g_iter(n).cloned().collect();
        let H: Vec<RistrettoPoint> = gens.h_iter(n).cloned().collect();
        let Q = gens.g * random_scalar(&mut rng);
        let ones: Vec<Scalar> = exp_iter(Scalar::ONE).take(n).collect();

        let a: Vec<Scalar> = (0..n).map(|_| random_scalar(&mut rng)).collect();
        let b: Vec<Scalar> = (0..n).map(|_| random_scalar(&mut rng)).collect();

        let mut transcript = Transcript::new(b"ipp test");
        let proof = InnerProductProof::create(
            &mut transcript,
            &Q,
            &ones,
            &ones,
            G.clone(),
            H.clone(),
            a,
            b,
        );

        let mut transcript = Transcript::new(b"ipp test");
        let P = gens.g;
        assert_eq!(
            proof.verify(n * 2, &mut transcript, &P, &Q, &G, &H),
            Err(Error::InnerProductFailed)
        );
    }
}
