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

//! Client-side cryptographic core for confidential value transfers.
//!
//! The library proves, in zero knowledge, that a transfer of hidden amounts
//! is well-formed: the transferred amount and the sender's remaining balance
//! lie in a fixed non-negative range, and the balances update consistently.
//! Only hiding [commitments](crypto::Commitment) to the underlying values are
//! revealed.
//!
//! # Components
//!
//! - [`crypto`]: group and scalar primitives, the Fiat–Shamir
//!   [transcript](crypto::TranscriptProtocol), Pedersen commitments,
//!   Bulletproofs [range proofs](crypto::RangeProof) with the
//!   [inner-product argument](crypto::InnerProductProof), and Schnorr-style
//!   [equality proofs](crypto::EqualityProof).
//! - [`ConfidentialTransfer`]: the composite validity proof for a single
//!   transfer; [`TransactionProof`] generalizes it to several inputs and
//!   outputs.
//! - [`PrivacyLayer`]: the orchestration entry point with input validation,
//!   batch proving with optional parallelism, and an optional proof cache.
//!
//! # Workflow
//!
//! The prover supplies the openings of three commitments (balance before the
//! transfer, amount, balance after) to
//! [`PrivacyLayer::generate_transfer`]; the resulting
//! [`ConfidentialTransfer`] serializes to a versioned byte string that
//! external collaborators transmit and persist. The verifier deserializes and
//! calls [`PrivacyLayer::verify_transfer`]. The recipient learns the amount
//! opening out-of-band; the library performs no I/O and never emits blinding
//! material.
//!
//! ```
//! use confidential_transfer::{ConfidentialTransfer, PrivacyLayer, TransferSecrets};
//!
//! let layer = PrivacyLayer::with_defaults();
//! let secrets = TransferSecrets::generate(1_000, 250)?;
//!
//! let transfer = layer.generate_transfer(&secrets)?;
//! let wire_bytes = transfer.to_bytes();
//!
//! // ... the bytes travel to the verifier ...
//!
//! let received = ConfidentialTransfer::from_bytes(&wire_bytes)?;
//! layer.verify_transfer(&received)?;
//! # Ok::<(), confidential_transfer::Error>(())
//! ```

#[macro_use]
extern crate lazy_static;

pub mod crypto;

mod errors;
mod privacy;
mod transfer;

pub use crate::{
    errors::Error,
    privacy::{PrivacyConfig, PrivacyLayer, TransferSecrets},
    transfer::{ConfidentialTransfer, TransactionProof},
};
