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

//! Errors that can occur when creating or verifying proofs.

use failure::Fail;

/// Errors that can occur during proof creation or verification.
///
/// The prover surfaces input-validation failures ([`InvalidArgument`],
/// [`InsufficientBalance`], [`BalanceEquationViolated`]) before performing any
/// group operations; no partial proof state is ever observable. The verifier
/// reports the most specific failure it detects.
///
/// [`InvalidArgument`]: Error::InvalidArgument
/// [`InsufficientBalance`]: Error::InsufficientBalance
/// [`BalanceEquationViolated`]: Error::BalanceEquationViolated
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum Error {
    /// An input is malformed or out of the range supported by the protocol
    /// (e.g., an unsupported bit width, a value too wide for the requested
    /// range, or an empty input/output set).
    #[fail(display = "invalid argument: {}", _0)]
    InvalidArgument(&'static str),

    /// The sender's balance is insufficient for the transferred amount.
    ///
    /// Detected before any proof is constructed.
    #[fail(display = "sender balance is insufficient for the transfer")]
    InsufficientBalance,

    /// The sender's balance does not decompose into the transferred amount
    /// and the declared remainder.
    ///
    /// Detected before any proof is constructed.
    #[fail(display = "balance equation `before = amount + after` is violated")]
    BalanceEquationViolated,

    /// A byte string is not a canonical encoding of a scalar, point or proof:
    /// wrong length, non-canonical scalar, unknown tag or version, or
    /// leftover bytes.
    #[fail(display = "malformed or non-canonical encoding")]
    InvalidEncoding,

    /// A compressed point failed to decode into the prime-order group.
    ///
    /// Every successfully decoded Ristretto point lies in the prime-order
    /// group, so this covers both invalid and small-subgroup encodings.
    #[fail(display = "point encoding is not a member of the prime-order group")]
    NotInPrimeSubgroup,

    /// A range proof did not verify against its commitment.
    #[fail(display = "range proof verification failed")]
    RangeProofFailed,

    /// An equality proof did not verify against its pair of commitments.
    #[fail(display = "equality proof verification failed")]
    EqualityProofFailed,

    /// An inner-product argument is structurally invalid or did not verify.
    #[fail(display = "inner-product argument verification failed")]
    InnerProductFailed,

    /// A serialized proof exceeds the maximum accepted size.
    #[fail(display = "serialized proof exceeds the size cap")]
    OversizedProof,
}
