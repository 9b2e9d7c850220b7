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

//! Composite validity proofs for transfers.
//!
//! A [`ConfidentialTransfer`] proves that a transfer is well-formed while
//! revealing only hiding commitments to the balances involved: the
//! transferred amount and the sender's remaining balance are in range, and
//! the pre-transfer balance decomposes into their sum. A
//! [`TransactionProof`] generalizes this to several inputs and outputs.
//!
//! All sub-proofs of one statement share a single transcript, seeded with a
//! protocol-version label and every commitment of the statement, so each
//! sub-proof is bound to the transfer as a whole and cannot be replayed in
//! another context.

use merlin::Transcript;
use rand::thread_rng;
use rand_core::{CryptoRng, RngCore};
use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    crypto::{
        envelope, open_envelope, tag, write_framed, write_u32, Commitment, EqualityProof,
        Opening, RangeProof, Reader, TranscriptProtocol, SUPPORTED_BITS, WIRE_VERSION,
    },
    errors::Error,
};

const TRANSFER_TRANSCRIPT: &[u8] = b"confidential-transfer/validity";
const TRANSACTION_TRANSCRIPT: &[u8] = b"confidential-transfer/transaction";

/// Checks that `value` fits into `bits` bits.
fn check_width(value: u64, bits: usize, what: &'static str) -> Result<(), Error> {
    if bits < 64 && (value >> bits) != 0 {
        return Err(Error::InvalidArgument(what));
    }
    Ok(())
}

/// Validity proof for a single confidential transfer.
///
/// The proof packages three commitments (to the sender's balance before the
/// transfer, to the transferred amount and to the balance after it) together
/// with range proofs for the amount and the remaining balance and an
/// equality proof for the balance equation
///
/// ```text
/// sender_before = amount + sender_after.
/// ```
///
/// The pre-transfer balance needs no range proof of its own: it is the sum of
/// two committed values that are both proved to be in range (the bit width is
/// chosen so that the sum cannot wrap around the group order).
///
/// # Examples
///
/// ```
/// # use confidential_transfer::{ConfidentialTransfer, crypto::Opening};
/// let before = Opening::with_random_blinding(100);
/// let amount = Opening::with_random_blinding(30);
/// let after = Opening::with_random_blinding(70);
///
/// let transfer = ConfidentialTransfer::create(&before, &amount, &after).unwrap();
/// assert!(transfer.verify().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ConfidentialTransfer {
    sender_before: Commitment,
    amount: Commitment,
    sender_after: Commitment,
    amount_proof: RangeProof,
    sender_after_proof: RangeProof,
    balance_proof: EqualityProof,
}

impl ConfidentialTransfer {
    /// Creates a transfer proof with the default 64-bit range width, using
    /// the process-wide RNG.
    pub fn create(
        sender_before: &Opening,
        amount: &Opening,
        sender_after: &Opening,
    ) -> Result<Self, Error> {
        Self::create_with_rng(sender_before, amount, sender_after, 64, &mut thread_rng())
    }

    /// Creates a transfer proof with the given range width.
    ///
    /// All precondition violations are reported before any group operation is
    /// performed: [`Error::InsufficientBalance`] if the balance does not
    /// cover the amount, [`Error::BalanceEquationViolated`] if the remainder
    /// is inconsistent, and [`Error::InvalidArgument`] if a value does not
    /// fit the requested width.
    pub fn create_with_rng<R: RngCore + CryptoRng>(
        sender_before: &Opening,
        amount: &Opening,
        sender_after: &Opening,
        bits: usize,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if !SUPPORTED_BITS.contains(&bits) {
            return Err(Error::InvalidArgument("unsupported range bit width"));
        }
        if sender_before.value < amount.value {
            return Err(Error::InsufficientBalance);
        }
        if sender_before.value - amount.value != sender_after.value {
            return Err(Error::BalanceEquationViolated);
        }
        check_width(amount.value, bits, "amount is wider than the proved range")?;
        check_width(
            sender_after.value,
            bits,
            "remaining balance is wider than the proved range",
        )?;

        let before_commitment = Commitment::from_opening(sender_before);
        let amount_commitment = Commitment::from_opening(amount);
        let after_commitment = Commitment::from_opening(sender_after);

        let mut transcript = Transcript::new(TRANSFER_TRANSCRIPT);
        append_transfer_statement(
            &mut transcript,
            &before_commitment,
            &amount_commitment,
            &after_commitment,
        );

        let (amount_proof, _) = RangeProof::prove_with_rng(&mut transcript, amount, bits, rng)?;
        let (sender_after_proof, _) =
            RangeProof::prove_with_rng(&mut transcript, sender_after, bits, rng)?;

        let claimed = amount + sender_after;
        let balance_proof =
            EqualityProof::prove_with_rng(&mut transcript, sender_before, &claimed, rng)?;

        Ok(ConfidentialTransfer {
            sender_before: before_commitment,
            amount: amount_commitment,
            sender_after: after_commitment,
            amount_proof,
            sender_after_proof,
            balance_proof,
        })
    }

    /// Commitment to the sender's balance before the transfer.
    pub fn sender_before(&self) -> &Commitment {
        &self.sender_before
    }

    /// Commitment to the transferred amount.
    pub fn amount(&self) -> &Commitment {
        &self.amount
    }

    /// Commitment to the sender's balance after the transfer.
    pub fn sender_after(&self) -> &Commitment {
        &self.sender_after
    }

    /// Bit width of the embedded range proofs.
    pub fn bits(&self) -> u8 {
        self.amount_proof.bits()
    }

    /// Verifies the transfer proof using the process-wide RNG.
    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with_rng(&mut thread_rng())
    }

    /// Verifies the transfer proof.
    ///
    /// The verifier replays the prover's transcript and checks the two range
    /// proofs and the balance-equation proof, surfacing the most specific
    /// failure.
    pub fn verify_with_rng<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(), Error> {
        if self.amount_proof.bits() != self.sender_after_proof.bits() {
            return Err(Error::InvalidArgument("range proofs use different widths"));
        }

        let mut transcript = Transcript::new(TRANSFER_TRANSCRIPT);
        append_transfer_statement(
            &mut transcript,
            &self.sender_before,
            &self.amount,
            &self.sender_after,
        );

        self.amount_proof
            .verify_with_rng(&mut transcript, &self.amount, rng)?;
        self.sender_after_proof
            .verify_with_rng(&mut transcript, &self.sender_after, rng)?;

        let claimed = self.amount + self.sender_after;
        self.balance_proof
            .verify(&mut transcript, &self.sender_before, &claimed)
    }

    /// Serializes the transfer proof into an enveloped byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = envelope(tag::TRANSFER);
        buf.extend_from_slice(&self.amount.to_bytes());
        buf.extend_from_slice(&self.sender_after.to_bytes());
        buf.extend_from_slice(&self.sender_before.to_bytes());

        let mut nested = Vec::new();
        self.amount_proof.write_payload(&mut nested);
        write_framed(&mut buf, &nested);

        nested.clear();
        self.sender_after_proof.write_payload(&mut nested);
        write_framed(&mut buf, &nested);

        nested.clear();
        self.balance_proof.write_payload(&mut nested);
        write_framed(&mut buf, &nested);

        buf
    }

    /// Deserializes a transfer proof, rejecting malformed or oversized input.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, Error> {
        let payload = open_envelope(slice, tag::TRANSFER)?;
        let mut reader = Reader::new(payload);

        let amount = Commitment {
            inner: reader.read_group_element()?,
        };
        let sender_after = Commitment {
            inner: reader.read_group_element()?,
        };
        let sender_before = Commitment {
            inner: reader.read_group_element()?,
        };

        let amount_proof = read_framed_range_proof(&mut reader)?;
        let sender_after_proof = read_framed_range_proof(&mut reader)?;

        let mut nested = Reader::new(reader.read_framed()?);
        let balance_proof = EqualityProof::read_payload(&mut nested)?;
        nested.finish()?;

        reader.finish()?;
        Ok(ConfidentialTransfer {
            sender_before,
            amount,
            sender_after,
            amount_proof,
            sender_after_proof,
            balance_proof,
        })
    }
}

fn append_transfer_statement(
    transcript: &mut Transcript,
    before: &Commitment,
    amount: &Commitment,
    after: &Commitment,
) {
    transcript.transfer_domain_sep(WIRE_VERSION);
    transcript.append_point(b"C_before", &before.inner.compress());
    transcript.append_point(b"C_amount", &amount.inner.compress());
    transcript.append_point(b"C_after", &after.inner.compress());
}

fn read_framed_range_proof(reader: &mut Reader<'_>) -> Result<RangeProof, Error> {
    let mut nested = Reader::new(reader.read_framed()?);
    let proof = RangeProof::read_payload(&mut nested)?;
    nested.finish()?;
    Ok(proof)
}

impl Serialize for ConfidentialTransfer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for ConfidentialTransfer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TransferVisitor;

        impl<'de> Visitor<'de> for TransferVisitor {
            type Value = ConfidentialTransfer;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a valid transfer proof")
            }

            fn visit_bytes<E: serde::de::Error>(
                self,
                v: &[u8],
            ) -> Result<ConfidentialTransfer, E> {
                ConfidentialTransfer::from_bytes(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(TransferVisitor)
    }
}

/// Validity proof for a transaction with several inputs and outputs.
///
/// Proves that every output is in range and that the inputs and outputs
/// commit to the same total value, i.e. `ΣC_in − ΣC_out` hides zero. Inputs
/// are assumed to be existing commitments whose ranges were established when
/// they were created.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionProof {
    inputs: Vec<Commitment>,
    outputs: Vec<Commitment>,
    output_proofs: Vec<RangeProof>,
    balance_proof: EqualityProof,
}

impl TransactionProof {
    /// Creates a transaction proof with the default 64-bit range width.
    pub fn create(inputs: &[Opening], outputs: &[Opening]) -> Result<Self, Error> {
        Self::create_with_rng(inputs, outputs, 64, &mut thread_rng())
    }

    /// Creates a transaction proof with the given range width.
    pub fn create_with_rng<R: RngCore + CryptoRng>(
        inputs: &[Opening],
        outputs: &[Opening],
        bits: usize,
        rng: &mut R,
    ) -> Result<Self, Error> {
        if !SUPPORTED_BITS.contains(&bits) {
            return Err(Error::InvalidArgument("unsupported range bit width"));
        }
        if inputs.is_empty() || outputs.is_empty() {
            return Err(Error::InvalidArgument("empty input or output set"));
        }

        let input_total = checked_total(inputs, "input sum overflows")?;
        let output_total = checked_total(outputs, "output sum overflows")?;
        if input_total != output_total {
            return Err(Error::BalanceEquationViolated);
        }
        for output in outputs {
            check_width(output.value, bits, "output is wider than the proved range")?;
        }

        let input_commitments: Vec<_> = inputs.iter().map(Commitment::from_opening).collect();
        let output_commitments: Vec<_> = outputs.iter().map(Commitment::from_opening).collect();

        let mut transcript = Transcript::new(TRANSACTION_TRANSCRIPT);
        append_transaction_statement(&mut transcript, &input_commitments, &output_commitments);

        let mut output_proofs = Vec::with_capacity(outputs.len());
        for output in outputs {
            let (proof, _) = RangeProof::prove_with_rng(&mut transcript, output, bits, rng)?;
            output_proofs.push(proof);
        }

        let input_sum = sum_openings(inputs);
        let output_sum = sum_openings(outputs);
        let balance_proof =
            EqualityProof::prove_with_rng(&mut transcript, &input_sum, &output_sum, rng)?;

        Ok(TransactionProof {
            inputs: input_commitments,
            outputs: output_commitments,
            output_proofs,
            balance_proof,
        })
    }

    /// Input commitments of the transaction.
    pub fn inputs(&self) -> &[Commitment] {
        &self.inputs
    }

    /// Output commitments of the transaction.
    pub fn outputs(&self) -> &[Commitment] {
        &self.outputs
    }

    /// Verifies the transaction proof using the process-wide RNG.
    pub fn verify(&self) -> Result<(), Error> {
        self.verify_with_rng(&mut thread_rng())
    }

    /// Verifies the transaction proof.
    pub fn verify_with_rng<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Result<(), Error> {
        if self.inputs.is_empty() || self.outputs.is_empty() {
            return Err(Error::InvalidArgument("empty input or output set"));
        }
        if self.outputs.len() != self.output_proofs.len() {
            return Err(Error::InvalidArgument(
                "output and range proof counts differ",
            ));
        }

        let mut transcript = Transcript::new(TRANSACTION_TRANSCRIPT);
        append_transaction_statement(&mut transcript, &self.inputs, &self.outputs);

        for (output, proof) in self.outputs.iter().zip(self.output_proofs.iter()) {
            proof.verify_with_rng(&mut transcript, output, rng)?;
        }

        let input_sum = sum_commitments(&self.inputs);
        let output_sum = sum_commitments(&self.outputs);
        self.balance_proof
            .verify(&mut transcript, &input_sum, &output_sum)
    }

    /// Serializes the transaction proof into an enveloped byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = envelope(tag::TRANSACTION);
        write_u32(&mut buf, self.inputs.len() as u32);
        for input in &self.inputs {
            buf.extend_from_slice(&input.to_bytes());
        }
        write_u32(&mut buf, self.outputs.len() as u32);
        for output in &self.outputs {
            buf.extend_from_slice(&output.to_bytes());
        }

        let mut nested = Vec::new();
        for proof in &self.output_proofs {
            nested.clear();
            proof.write_payload(&mut nested);
            write_framed(&mut buf, &nested);
        }

        nested.clear();
        self.balance_proof.write_payload(&mut nested);
        write_framed(&mut buf, &nested);

        buf
    }

    /// Deserializes a transaction proof, rejecting malformed or oversized
    /// input.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, Error> {
        let payload = open_envelope(slice, tag::TRANSACTION)?;
        let mut reader = Reader::new(payload);

        let input_count = reader.read_u32()? as usize;
        if input_count == 0 {
            return Err(Error::InvalidEncoding);
        }
        let mut inputs = Vec::with_capacity(input_count);
        for _ in 0..input_count {
            inputs.push(Commitment {
                inner: reader.read_group_element()?,
            });
        }

        let output_count = reader.read_u32()? as usize;
        if output_count == 0 {
            return Err(Error::InvalidEncoding);
        }
        let mut outputs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            outputs.push(Commitment {
                inner: reader.read_group_element()?,
            });
        }

        let mut output_proofs = Vec::with_capacity(output_count);
        for _ in 0..output_count {
            output_proofs.push(read_framed_range_proof(&mut reader)?);
        }

        let mut nested = Reader::new(reader.read_framed()?);
        let balance_proof = EqualityProof::read_payload(&mut nested)?;
        nested.finish()?;

        reader.finish()?;
        Ok(TransactionProof {
            inputs,
            outputs,
            output_proofs,
            balance_proof,
        })
    }
}

fn append_transaction_statement(
    transcript: &mut Transcript,
    inputs: &[Commitment],
    outputs: &[Commitment],
) {
    transcript.transaction_domain_sep(WIRE_VERSION, inputs.len() as u64, outputs.len() as u64);
    for input in inputs {
        transcript.append_point(b"C_in", &input.inner.compress());
    }
    for output in outputs {
        transcript.append_point(b"C_out", &output.inner.compress());
    }
}

fn checked_total(openings: &[Opening], what: &'static str) -> Result<u64, Error> {
    openings
        .iter()
        .try_fold(0_u64, |acc, opening| acc.checked_add(opening.value))
        .ok_or(Error::InvalidArgument(what))
}

fn sum_openings(openings: &[Opening]) -> Opening {
    let mut sum = Opening::with_no_blinding(0);
    for opening in openings {
        sum = &sum + opening;
    }
    sum
}

fn sum_commitments(commitments: &[Commitment]) -> Commitment {
    let mut sum = commitments[0];
    for commitment in &commitments[1..] {
        sum = &sum + commitment;
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer_openings(before: u64, amount: u64) -> (Opening, Opening, Opening) {
        (
            Opening::with_random_blinding(before),
            Opening::with_random_blinding(amount),
            Opening::with_random_blinding(before - amount),
        )
    }

    #[test]
    fn transfer_roundtrip() {
        let (before, amount, after) = transfer_openings(1_000, 250);
        let transfer =
            ConfidentialTransfer::create_with_rng(&before, &amount, &after, 32, &mut thread_rng())
                .expect("create");
        transfer.verify().expect("verify");

        let restored =
            ConfidentialTransfer::from_bytes(&transfer.to_bytes()).expect("deserialize");
        assert_eq!(restored, transfer);
        restored.verify().expect("deserialized transfer verifies");
    }

    #[test]
    fn insufficient_balance_is_rejected_before_proving() {
        let before = Opening::with_random_blinding(50);
        let amount = Opening::with_random_blinding(100);
        let after = Opening::with_random_blinding(0);
        assert_eq!(
            ConfidentialTransfer::create(&before, &amount, &after),
            Err(Error::InsufficientBalance)
        );
    }

    #[test]
    fn wrong_remainder_is_rejected_before_proving() {
        let before = Opening::with_random_blinding(100);
        let amount = Opening::with_random_blinding(30);
        let after = Opening::with_random_blinding(80);
        assert_eq!(
            ConfidentialTransfer::create(&before, &amount, &after),
            Err(Error::BalanceEquationViolated)
        );
    }

    #[test]
    fn transaction_proof_roundtrip() {
        let inputs = vec![
            Opening::with_random_blinding(60),
            Opening::with_random_blinding(40),
        ];
        let outputs = vec![
            Opening::with_random_blinding(70),
            Opening::with_random_blinding(30),
        ];

        let proof =
            TransactionProof::create_with_rng(&inputs, &outputs, 8, &mut thread_rng())
                .expect("create");
        proof.verify().expect("verify");

        let restored = TransactionProof::from_bytes(&proof.to_bytes()).expect("deserialize");
        assert_eq!(restored, proof);
        restored.verify().expect("deserialized proof verifies");
    }

    #[test]
    fn transaction_with_mismatched_totals_is_rejected() {
        let inputs = vec![Opening::with_random_blinding(100)];
        let outputs = vec![Opening::with_random_blinding(90)];
        assert_eq!(
            TransactionProof::create(&inputs, &outputs),
            Err(Error::BalanceEquationViolated)
        );
    }

    #[test]
    fn transaction_with_empty_side_is_rejected() {
        let outputs = vec![Opening::with_random_blinding(90)];
        assert!(matches!(
            TransactionProof::create(&[], &outputs),
            Err(Error::InvalidArgument(_))
        ));
    }
}
