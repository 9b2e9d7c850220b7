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

//! End-to-end tests for transfer proving and verification.
//!
//! Proofs use the 8-bit range width for speed; the protocol logic is
//! identical for wider ranges.

use confidential_transfer::{
    crypto::{Commitment, Opening},
    ConfidentialTransfer, Error, PrivacyConfig, PrivacyLayer, TransactionProof, TransferSecrets,
};

const BITS: u8 = 8;

fn test_layer() -> PrivacyLayer {
    PrivacyLayer::new(PrivacyConfig {
        range_bits: BITS,
        enable_caching: false,
        enable_parallel: false,
    })
    .expect("config")
}

fn secrets(sender_before: u64, amount: u64, sender_after: u64) -> TransferSecrets {
    TransferSecrets::new(
        Opening::with_random_blinding(sender_before),
        Opening::with_random_blinding(amount),
        Opening::with_random_blinding(sender_after),
    )
}

#[test]
fn simple_transfer_proves_and_verifies() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(100, 30, 70))
        .expect("generate");
    layer.verify_transfer(&transfer).expect("verify");
}

#[test]
fn zero_amount_transfer_verifies() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(100, 0, 100))
        .expect("generate");
    layer.verify_transfer(&transfer).expect("verify");
}

#[test]
fn full_sweep_transfer_verifies() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(100, 100, 0))
        .expect("generate");
    layer.verify_transfer(&transfer).expect("verify");
}

#[test]
fn insufficient_balance_is_rejected_without_a_proof() {
    let layer = test_layer();
    assert_eq!(
        layer.generate_transfer(&secrets(50, 100, 0)),
        Err(Error::InsufficientBalance)
    );
}

#[test]
fn violated_balance_equation_is_rejected_without_a_proof() {
    let layer = test_layer();
    assert_eq!(
        layer.generate_transfer(&secrets(100, 30, 80)),
        Err(Error::BalanceEquationViolated)
    );
}

#[test]
fn tampering_with_the_amount_range_proof_is_detected() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(100, 30, 70))
        .expect("generate");

    let mut bytes = transfer.to_bytes();
    // Offset of `tau_x` inside the framed amount range proof: envelope (8),
    // three commitments (96), frame length (4), four points (128).
    let tau_x_offset = 8 + 96 + 4 + 128;
    bytes[tau_x_offset] ^= 1;

    let tampered = ConfidentialTransfer::from_bytes(&bytes).expect("still parses");
    assert_eq!(
        layer.verify_transfer(&tampered),
        Err(Error::RangeProofFailed)
    );
}

#[test]
fn every_single_byte_flip_invalidates_the_proof() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(100, 30, 70))
        .expect("generate");
    let bytes = transfer.to_bytes();

    for position in 0..bytes.len() {
        let mut tampered_bytes = bytes.clone();
        tampered_bytes[position] ^= 1;

        let outcome = ConfidentialTransfer::from_bytes(&tampered_bytes)
            .and_then(|tampered| layer.verify_transfer(&tampered));
        assert!(
            outcome.is_err(),
            "flipping byte {} went undetected",
            position
        );
    }
}

#[test]
fn multi_input_multi_output_transaction_verifies() {
    let inputs = vec![
        Opening::with_random_blinding(60),
        Opening::with_random_blinding(40),
    ];
    let outputs = vec![
        Opening::with_random_blinding(70),
        Opening::with_random_blinding(30),
    ];

    let proof = TransactionProof::create_with_rng(
        &inputs,
        &outputs,
        BITS as usize,
        &mut rand::thread_rng(),
    )
    .expect("create");
    proof.verify().expect("verify");

    let unbalanced_inputs = vec![Opening::with_random_blinding(100)];
    let unbalanced_outputs = vec![Opening::with_random_blinding(90)];
    assert_eq!(
        TransactionProof::create(&unbalanced_inputs, &unbalanced_outputs),
        Err(Error::BalanceEquationViolated)
    );
}

#[test]
fn commitment_homomorphism_holds() {
    let (comm1, opening1) = Commitment::new(10);
    let (comm2, opening2) = Commitment::new(20);

    let sum_opening = &opening1 + &opening2;
    assert_eq!(sum_opening.value, 30);

    let sum = comm1 + comm2;
    assert!(sum.verify(&sum_opening));
    assert_eq!(sum, Commitment::from_opening(&sum_opening));
    assert!(comm1.verify(&opening1) && comm2.verify(&opening2));
}

#[test]
fn batch_verification_matches_individual_verification() {
    let layer = PrivacyLayer::new(PrivacyConfig {
        range_bits: BITS,
        enable_caching: false,
        enable_parallel: true,
    })
    .expect("config");

    let batch: Vec<_> = [(100, 30, 70), (100, 0, 100), (255, 255, 0)]
        .iter()
        .map(|&(before, amount, after)| secrets(before, amount, after))
        .collect();

    let transfers: Vec<_> = layer
        .generate_batch(&batch)
        .into_iter()
        .map(|result| result.expect("generate"))
        .collect();

    for transfer in &transfers {
        layer.verify_transfer(transfer).expect("individual verify");
    }
    layer.verify_batch(&transfers).expect("batch verify");

    // A batch with a proof for a different statement fails as a whole.
    let mut broken = transfers.clone();
    let foreign = test_layer()
        .generate_transfer(&secrets(10, 5, 5))
        .expect("generate");
    let mut bytes = foreign.to_bytes();
    bytes[8 + 96 + 4 + 128] ^= 1;
    broken.push(ConfidentialTransfer::from_bytes(&bytes).expect("parses"));
    assert!(layer.verify_batch(&broken).is_err());
}

#[test]
fn serialized_transfer_roundtrips_through_the_wire_format() {
    let layer = test_layer();
    let transfer = layer
        .generate_transfer(&secrets(200, 55, 145))
        .expect("generate");

    let bytes = transfer.to_bytes();
    let restored = ConfidentialTransfer::from_bytes(&bytes).expect("deserialize");
    assert_eq!(restored, transfer);
    layer.verify_transfer(&restored).expect("verify");

    assert_eq!(restored.amount(), transfer.amount());
    assert_eq!(restored.sender_before(), transfer.sender_before());
    assert_eq!(restored.sender_after(), transfer.sender_after());
}
