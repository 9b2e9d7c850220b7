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

//! Cryptographic primitives of the transfer core.
//!
//! # Commitments and range proofs
//!
//! See [`Commitment`] and [`RangeProof`] docs for details on cryptographic
//! commitments. Commitments stand in for plaintext balances and transfer
//! amounts; range proofs assert that a committed amount is non-negative and
//! bounded (i.e., the sender cannot create tokens out of thin air by
//! "transferring" a negative amount), without revealing it.
//!
//! # Equality proofs
//!
//! [`EqualityProof`]s tie commitments together: the balance equation of a
//! transfer is checked by proving that the pre-transfer balance commitment
//! hides the same value as the sum of the amount and post-transfer balance
//! commitments.
//!
//! # Transcript
//!
//! All proofs are made non-interactive with the Fiat–Shamir transform over a
//! [`merlin`]-based transcript; see [`TranscriptProtocol`].

mod equality;
mod group;
mod inner_product;
mod proofs;
mod range_proof;
mod serialization;
mod transcript;
pub(crate) mod util;

pub use self::{
    equality::EqualityProof,
    group::{generators, random_scalar, Generators, GENERATORS_DOMAIN, MAX_RANGE_BITS},
    inner_product::InnerProductProof,
    proofs::{Commitment, Opening},
    range_proof::{RangeProof, SUPPORTED_BITS},
    serialization::{MAX_PROOF_BYTES, WIRE_VERSION},
    transcript::TranscriptProtocol,
};

pub(crate) use self::serialization::{
    envelope, open_envelope, tag, write_framed, write_u32, Reader,
};
