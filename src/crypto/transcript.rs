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

//! Fiat–Shamir transcript protocol.
//!
//! All proofs derive their challenges from a [`merlin::Transcript`], which
//! absorbs every prior protocol message with length- and label-framing, so a
//! challenge is a deterministic function of the entire statement proved so
//! far. A composite proof threads a single transcript through all of its
//! sub-protocols; this binds each sub-proof to the whole statement and makes
//! the individual proofs non-malleable.

use curve25519_dalek::{
    ristretto::CompressedRistretto,
    scalar::Scalar,
    traits::IsIdentity,
};
use merlin::Transcript;

use crate::errors::Error;

/// Extension trait adding protocol-specific operations to [`Transcript`].
pub trait TranscriptProtocol {
    /// Begins a transfer-validity proof with the given protocol version.
    fn transfer_domain_sep(&mut self, version: u32);

    /// Begins a multi-input/multi-output transaction proof.
    fn transaction_domain_sep(&mut self, version: u32, inputs: u64, outputs: u64);

    /// Begins an `n`-bit range proof.
    fn rangeproof_domain_sep(&mut self, n: u64);

    /// Begins an inner-product argument over vectors of length `n`.
    fn innerproduct_domain_sep(&mut self, n: u64);

    /// Begins an equality proof.
    fn equality_domain_sep(&mut self);

    /// Absorbs a scalar in its canonical encoding.
    fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar);

    /// Absorbs a compressed point.
    fn append_point(&mut self, label: &'static [u8], point: &CompressedRistretto);

    /// Absorbs a compressed point, rejecting the identity.
    ///
    /// Proof elements that are never legitimately the identity (e.g. the
    /// `L`/`R` cross terms of the inner-product argument) are checked here to
    /// rule out degenerate statements.
    fn validate_and_append_point(
        &mut self,
        label: &'static [u8],
        point: &CompressedRistretto,
    ) -> Result<(), Error>;

    /// Squeezes a uniformly distributed challenge scalar.
    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar;

    /// Squeezes `count` independent challenge scalars.
    fn challenge_scalars(&mut self, label: &'static [u8], count: usize) -> Vec<Scalar>;
}

impl TranscriptProtocol for Transcript {
    fn transfer_domain_sep(&mut self, version: u32) {
        self.append_message(b"dom-sep", b"transfer-validity.v1");
        self.append_u64(b"version", u64::from(version));
    }

    fn transaction_domain_sep(&mut self, version: u32, inputs: u64, outputs: u64) {
        self.append_message(b"dom-sep", b"transaction-validity.v1");
        self.append_u64(b"version", u64::from(version));
        self.append_u64(b"inputs", inputs);
        self.append_u64(b"outputs", outputs);
    }

    fn rangeproof_domain_sep(&mut self, n: u64) {
        self.append_message(b"dom-sep", b"range-proof.v1");
        self.append_u64(b"n", n);
    }

    fn innerproduct_domain_sep(&mut self, n: u64) {
        self.append_message(b"dom-sep", b"inner-product.v1");
        self.append_u64(b"n", n);
    }

    fn equality_domain_sep(&mut self) {
        self.append_message(b"dom-sep", b"equality-proof.v1");
    }

    fn append_scalar(&mut self, label: &'static [u8], scalar: &Scalar) {
        self.append_message(label, scalar.as_bytes());
    }

    fn append_point(&mut self, label: &'static [u8], point: &CompressedRistretto) {
        self.append_message(label, point.as_bytes());
    }

    fn validate_and_append_point(
        &mut self,
        label: &'static [u8],
        point: &CompressedRistretto,
    ) -> Result<(), Error> {
        if point.is_identity() {
            Err(Error::InvalidEncoding)
        } else {
            self.append_message(label, point.as_bytes());
            Ok(())
        }
    }

    fn challenge_scalar(&mut self, label: &'static [u8]) -> Scalar {
        let mut bytes = [0_u8; 64];
        self.challenge_bytes(label, &mut bytes);
        Scalar::from_bytes_mod_order_wide(&bytes)
    }

    fn challenge_scalars(&mut self, label: &'static [u8], count: usize) -> Vec<Scalar> {
        (0..count).map(|_| self.challenge_scalar(label)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curve25519_dalek::traits::Identity;

    #[test]
    fn identical_transcripts_produce_identical_challenges() {
        let mut first = Transcript::new(b"test");
        let mut second = Transcript::new(b"test");
        first.append_message(b"data", b"payload");
        second.append_message(b"data", b"payload");
        assert_eq!(
            first.challenge_scalar(b"c"),
            second.challenge_scalar(b"c")
        );
    }

    #[test]
    fn single_byte_difference_changes_challenges() {
        let mut first = Transcript::new(b"test");
        let mut second = Transcript::new(b"test");
        first.append_message(b"data", b"payload");
        second.append_message(b"data", b"paylaod");
        assert_ne!(
            first.challenge_scalar(b"c"),
            second.challenge_scalar(b"c")
        );
    }

    #[test]
    fn successive_challenges_are_independent() {
        let mut transcript = Transcript::new(b"test");
        let challenges = transcript.challenge_scalars(b"c", 4);
        for (i, x) in challenges.iter().enumerate() {
            for y in &challenges[i + 1..] {
                assert_ne!(x, y);
            }
        }
    }

    #[test]
    fn identity_point_is_rejected() {
        let mut transcript = Transcript::new(b"test");
        let identity = CompressedRistretto::identity();
        assert_eq!(
            transcript.validate_and_append_point(b"P", &identity),
            Err(Error::InvalidEncoding)
        );
    }
}
