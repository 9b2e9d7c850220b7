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

//! Canonical byte encodings for proofs.
//!
//! Every top-level proof is framed in an envelope consisting of a 4-byte
//! little-endian proof-kind tag and a 4-byte little-endian format version,
//! followed by the payload. Points and scalars are fixed 32-byte canonical
//! encodings; variable-length sequences carry little-endian length prefixes.
//! Nested proofs inside a payload are framed with a length but carry no
//! envelope of their own.
//!
//! Deserialization is strict: oversized inputs are rejected before parsing,
//! every point must decode into the prime-order group, every scalar must be
//! canonical, and no trailing bytes are allowed.

use byteorder::{ByteOrder, LittleEndian};
use curve25519_dalek::{ristretto::CompressedRistretto, scalar::Scalar};
use serde::{de::Visitor, Deserialize, Deserializer, Serialize, Serializer};

use crate::{
    crypto::{
        equality::EqualityProof,
        group::{point_from_slice, scalar_from_slice},
        inner_product::InnerProductProof,
        range_proof::{RangeProof, SUPPORTED_BITS},
        util::read32,
    },
    errors::Error,
};

/// Maximum accepted size of a serialized proof, in bytes.
///
/// Inputs larger than this are rejected before any parsing to preclude
/// resource-exhaustion attacks.
pub const MAX_PROOF_BYTES: usize = 10 * 1024;

/// Format version carried in every proof envelope.
pub const WIRE_VERSION: u32 = 1;

/// Proof-kind tags.
pub(crate) mod tag {
    pub const RANGE: u32 = 1;
    pub const EQUALITY: u32 = 2;
    pub const TRANSFER: u32 = 3;
    pub const TRANSACTION: u32 = 4;
}

/// Sequential reader over a byte slice.
///
/// All `read_*` methods fail with [`Error::InvalidEncoding`] on exhausted
/// input; [`finish`](Reader::finish) fails if any bytes remain, so encodings
/// cannot be padded.
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Reader { bytes }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.bytes.len() < len {
            return Err(Error::InvalidEncoding);
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_scalar(&mut self) -> Result<Scalar, Error> {
        scalar_from_slice(self.take(32)?)
    }

    /// Reads a compressed point, checking that it decodes into the
    /// prime-order group.
    pub fn read_point(&mut self) -> Result<CompressedRistretto, Error> {
        let bytes = self.take(32)?;
        point_from_slice(bytes)?;
        Ok(CompressedRistretto(read32(bytes)))
    }

    /// Reads a point in decompressed form.
    pub fn read_group_element(&mut self) -> Result<curve25519_dalek::ristretto::RistrettoPoint, Error> {
        point_from_slice(self.take(32)?)
    }

    /// Reads a length-prefixed nested structure.
    pub fn read_framed(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    pub fn finish(self) -> Result<(), Error> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidEncoding)
        }
    }
}

pub(crate) fn write_u32(buf: &mut Vec<u8>, value: u32) {
    let mut bytes = [0_u8; 4];
    LittleEndian::write_u32(&mut bytes, value);
    buf.extend_from_slice(&bytes);
}

/// Writes a length-prefixed nested structure.
pub(crate) fn write_framed(buf: &mut Vec<u8>, payload: &[u8]) {
    write_u32(buf, payload.len() as u32);
    buf.extend_from_slice(payload);
}

/// Starts an envelope with the given proof-kind tag.
pub(crate) fn envelope(kind: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u32(&mut buf, kind);
    write_u32(&mut buf, WIRE_VERSION);
    buf
}

/// Checks the size cap and the envelope, returning the payload.
pub(crate) fn open_envelope(slice: &[u8], kind: u32) -> Result<&[u8], Error> {
    if slice.len() > MAX_PROOF_BYTES {
        return Err(Error::OversizedProof);
    }
    if slice.len() < 8 {
        return Err(Error::InvalidEncoding);
    }
    if LittleEndian::read_u32(&slice[..4]) != kind
        || LittleEndian::read_u32(&slice[4..8]) != WIRE_VERSION
    {
        return Err(Error::InvalidEncoding);
    }
    Ok(&slice[8..])
}

impl InnerProductProof {
    /// Appends the raw encoding: a round count, the `L`/`R` pairs, and the
    /// two final scalars.
    pub(crate) fn write_payload(&self, buf: &mut Vec<u8>) {
        write_u32(buf, self.L_vec.len() as u32);
        for (l, r) in self.L_vec.iter().zip(self.R_vec.iter()) {
            buf.extend_from_slice(l.as_bytes());
            buf.extend_from_slice(r.as_bytes());
        }
        buf.extend_from_slice(self.a.as_bytes());
        buf.extend_from_slice(self.b.as_bytes());
    }

    pub(crate) fn read_payload(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let rounds = reader.read_u32()? as usize;
        // log2 of the largest supported vector length.
        if rounds > 8 {
            return Err(Error::InvalidEncoding);
        }
        let mut l_vec = Vec::with_capacity(rounds);
        let mut r_vec = Vec::with_capacity(rounds);
        for _ in 0..rounds {
            l_vec.push(reader.read_point()?);
            r_vec.push(reader.read_point()?);
        }
        let a = reader.read_scalar()?;
        let b = reader.read_scalar()?;
        Ok(InnerProductProof {
            L_vec: l_vec,
            R_vec: r_vec,
            a,
            b,
        })
    }
}

impl RangeProof {
    /// Serializes the proof into an enveloped byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = envelope(tag::RANGE);
        self.write_payload(&mut buf);
        buf
    }

    /// Deserializes a proof, rejecting malformed or oversized input.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, Error> {
        let payload = open_envelope(slice, tag::RANGE)?;
        let mut reader = Reader::new(payload);
        let proof = Self::read_payload(&mut reader)?;
        reader.finish()?;
        Ok(proof)
    }

    pub(crate) fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.A.as_bytes());
        buf.extend_from_slice(self.S.as_bytes());
        buf.extend_from_slice(self.T_1.as_bytes());
        buf.extend_from_slice(self.T_2.as_bytes());
        buf.extend_from_slice(self.tau_x.as_bytes());
        buf.extend_from_slice(self.mu.as_bytes());
        buf.extend_from_slice(self.t_hat.as_bytes());
        self.ipp_proof.write_payload(buf);
        buf.push(self.bits);
    }

    pub(crate) fn read_payload(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let a = reader.read_point()?;
        let s = reader.read_point()?;
        let t_1 = reader.read_point()?;
        let t_2 = reader.read_point()?;
        let tau_x = reader.read_scalar()?;
        let mu = reader.read_scalar()?;
        let t_hat = reader.read_scalar()?;
        let ipp_proof = InnerProductProof::read_payload(reader)?;
        let bits = reader.read_u8()?;
        if !SUPPORTED_BITS.contains(&(bits as usize)) {
            return Err(Error::InvalidEncoding);
        }
        if ipp_proof.L_vec.len() != (bits as usize).trailing_zeros() as usize {
            return Err(Error::InvalidEncoding);
        }
        Ok(RangeProof {
            A: a,
            S: s,
            T_1: t_1,
            T_2: t_2,
            tau_x,
            mu,
            t_hat,
            ipp_proof,
            bits,
        })
    }
}

impl EqualityProof {
    /// Serializes the proof into an enveloped byte string.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = envelope(tag::EQUALITY);
        self.write_payload(&mut buf);
        buf
    }

    /// Deserializes a proof, rejecting malformed or oversized input.
    pub fn from_bytes(slice: &[u8]) -> Result<Self, Error> {
        let payload = open_envelope(slice, tag::EQUALITY)?;
        let mut reader = Reader::new(payload);
        let proof = Self::read_payload(&mut reader)?;
        reader.finish()?;
        Ok(proof)
    }

    pub(crate) fn write_payload(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.A.as_bytes());
        buf.extend_from_slice(self.z.as_bytes());
    }

    pub(crate) fn read_payload(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let a = reader.read_point()?;
        let z = reader.read_scalar()?;
        Ok(EqualityProof { A: a, z })
    }
}

impl Serialize for RangeProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for RangeProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RangeProofVisitor;

        impl<'de> Visitor<'de> for RangeProofVisitor {
            type Value = RangeProof;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a valid range proof")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<RangeProof, E> {
                RangeProof::from_bytes(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(RangeProofVisitor)
    }
}

impl Serialize for EqualityProof {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_bytes())
    }
}

impl<'de> Deserialize<'de> for EqualityProof {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EqualityProofVisitor;

        impl<'de> Visitor<'de> for EqualityProofVisitor {
            type Value = EqualityProof;

            fn expecting(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                formatter.write_str("a valid equality proof")
            }

            fn visit_bytes<E: serde::de::Error>(self, v: &[u8]) -> Result<EqualityProof, E> {
                EqualityProof::from_bytes(v).map_err(serde::de::Error::custom)
            }
        }

        deserializer.deserialize_bytes(EqualityProofVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merlin::Transcript;

    use crate::crypto::Opening;

    fn sample_range_proof() -> RangeProof {
        let opening = Opening::with_random_blinding(123);
        let mut transcript = Transcript::new(b"serialization test");
        RangeProof::prove(&mut transcript, &opening, 8)
            .expect("prove")
            .0
    }

    #[test]
    fn range_proof_roundtrip() {
        let proof = sample_range_proof();
        let bytes = proof.to_bytes();
        // Envelope, 7 fixed elements, 3 IPP rounds, 2 final scalars, bit width.
        assert_eq!(bytes.len(), 8 + 7 * 32 + 4 + 3 * 64 + 2 * 32 + 1);
        assert_eq!(RangeProof::from_bytes(&bytes).expect("roundtrip"), proof);
    }

    #[test]
    fn equality_proof_roundtrip() {
        let first = Opening::with_random_blinding(5);
        let second = Opening::with_random_blinding(5);
        let mut transcript = Transcript::new(b"serialization test");
        let proof = EqualityProof::prove(&mut transcript, &first, &second).expect("prove");

        let bytes = proof.to_bytes();
        assert_eq!(bytes.len(), 8 + 2 * 32);
        assert_eq!(EqualityProof::from_bytes(&bytes).expect("roundtrip"), proof);
    }

    #[test]
    fn wrong_tag_and_version_are_rejected() {
        let proof = sample_range_proof();
        let mut bytes = proof.to_bytes();
        assert_eq!(
            EqualityProof::from_bytes(&bytes),
            Err(Error::InvalidEncoding)
        );

        bytes[4] = 99;
        assert_eq!(RangeProof::from_bytes(&bytes), Err(Error::InvalidEncoding));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = sample_range_proof().to_bytes();
        bytes.push(0);
        assert_eq!(RangeProof::from_bytes(&bytes), Err(Error::InvalidEncoding));
    }

    #[test]
    fn oversized_input_is_rejected() {
        let bytes = vec![0_u8; MAX_PROOF_BYTES + 1];
        assert_eq!(RangeProof::from_bytes(&bytes), Err(Error::OversizedProof));
    }

    #[test]
    fn serde_roundtrip_via_bincode() {
        let proof = sample_range_proof();
        let encoded = bincode::serialize(&proof).expect("serialize");
        let decoded: RangeProof = bincode::deserialize(&encoded).expect("deserialize");
        assert_eq!(decoded, proof);
    }
}
