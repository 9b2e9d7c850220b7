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

//! Orchestration layer packaging proofs for transfers.
//!
//! [`PrivacyLayer`] is the single external-facing entry point of the core: it
//! validates transfer inputs, assembles the commitments and sub-proofs into a
//! [`ConfidentialTransfer`], and verifies incoming ones. It also supports
//! batch proving/verification with optional parallelism and an optional
//! proof cache.
//!
//! The layer performs no I/O and keeps no state other than the cache; all
//! cryptographic routines are pure functions of their inputs and an RNG, so
//! independent transfers may be processed on any number of threads.

use log::debug;
use rand_chacha::ChaCha20Rng;
use rand_core::{CryptoRng, RngCore, SeedableRng};
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

use crate::{
    crypto::{random_scalar, Opening, SUPPORTED_BITS},
    errors::Error,
    transfer::ConfidentialTransfer,
};

/// Time-to-live of a cached proof.
const CACHE_TTL: Duration = Duration::from_secs(60);
/// Maximum number of cached proofs.
const CACHE_MAX_ENTRIES: usize = 128;

/// Secret inputs for a single transfer: openings of the sender's balance
/// before the transfer, of the transferred amount, and of the remaining
/// balance.
///
/// The amount opening (value and blinding) must be communicated to the
/// recipient out-of-band so they can track their own balance; the library
/// never emits it in any proof bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSecrets {
    /// Opening of the sender's balance before the transfer.
    pub sender_before: Opening,
    /// Opening of the transferred amount.
    pub amount: Opening,
    /// Opening of the sender's balance after the transfer.
    pub sender_after: Opening,
}

impl TransferSecrets {
    /// Bundles caller-supplied openings.
    pub fn new(sender_before: Opening, amount: Opening, sender_after: Opening) -> Self {
        TransferSecrets {
            sender_before,
            amount,
            sender_after,
        }
    }

    /// Creates transfer secrets with randomly chosen blindings.
    ///
    /// Fails with [`Error::InsufficientBalance`] if the balance does not
    /// cover the amount.
    pub fn generate(sender_before: u64, amount: u64) -> Result<Self, Error> {
        let remainder = sender_before
            .checked_sub(amount)
            .ok_or(Error::InsufficientBalance)?;
        let mut rng = rand::thread_rng();
        Ok(TransferSecrets {
            sender_before: Opening::new(sender_before, random_scalar(&mut rng)),
            amount: Opening::new(amount, random_scalar(&mut rng)),
            sender_after: Opening::new(remainder, random_scalar(&mut rng)),
        })
    }

    /// Fingerprint of the secrets under the given range width, used as the
    /// proof-cache key.
    fn fingerprint(&self, range_bits: u8) -> [u8; 32] {
        let mut hasher = Sha512::new();
        hasher.update(b"confidential-transfer/fingerprint/v1");
        hasher.update([range_bits]);
        for opening in [&self.sender_before, &self.amount, &self.sender_after] {
            hasher.update(opening.value.to_le_bytes());
            hasher.update(opening.blinding.as_bytes());
        }
        let digest = hasher.finalize();
        let mut fingerprint = [0_u8; 32];
        fingerprint.copy_from_slice(&digest[..32]);
        fingerprint
    }
}

/// Configuration of the privacy layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Bit width of range proofs; one of 8, 16, 32 or 64. Larger widths admit
    /// larger amounts at the cost of slower proving.
    pub range_bits: u8,
    /// Memoize generated proofs keyed by a fingerprint of the inputs.
    pub enable_caching: bool,
    /// Generate and verify independent proofs of a batch in parallel.
    pub enable_parallel: bool,
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        PrivacyConfig {
            range_bits: 64,
            enable_caching: false,
            enable_parallel: true,
        }
    }
}

impl PrivacyConfig {
    fn validate(&self) -> Result<(), Error> {
        if !SUPPORTED_BITS.contains(&(self.range_bits as usize)) {
            return Err(Error::InvalidArgument("unsupported range bit width"));
        }
        Ok(())
    }
}

struct CacheEntry {
    transfer: ConfidentialTransfer,
    expires_at: Instant,
}

/// Fingerprint-keyed proof cache with TTL-based eviction.
///
/// The cache is the only shared mutable state in the core; accesses are short
/// critical sections under the mutex in [`PrivacyLayer`]. A poisoned lock is
/// treated as a cache miss, so cache trouble degrades to recomputation and is
/// never fatal.
#[derive(Default)]
struct ProofCache {
    entries: HashMap<[u8; 32], CacheEntry>,
}

impl ProofCache {
    fn get(&mut self, fingerprint: &[u8; 32], now: Instant) -> Option<ConfidentialTransfer> {
        match self.entries.get(fingerprint) {
            Some(entry) if entry.expires_at > now => Some(entry.transfer.clone()),
            Some(_) => {
                self.entries.remove(fingerprint);
                None
            }
            None => None,
        }
    }

    fn insert(&mut self, fingerprint: [u8; 32], transfer: ConfidentialTransfer, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() >= CACHE_MAX_ENTRIES {
            // Still full after dropping expired entries; evict the entry
            // closest to expiry.
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(key, _)| *key)
            {
                debug!("proof cache full, evicting entry");
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            fingerprint,
            CacheEntry {
                transfer,
                expires_at: now + CACHE_TTL,
            },
        );
    }
}

/// External-facing entry point for proving and verifying transfers.
///
/// # Examples
///
/// ```
/// # use confidential_transfer::{PrivacyConfig, PrivacyLayer, TransferSecrets};
/// let layer = PrivacyLayer::new(PrivacyConfig::default()).unwrap();
/// let secrets = TransferSecrets::generate(100, 30).unwrap();
///
/// let transfer = layer.generate_transfer(&secrets).unwrap();
/// assert!(layer.verify_transfer(&transfer).is_ok());
/// ```
pub struct PrivacyLayer {
    config: PrivacyConfig,
    cache: Mutex<ProofCache>,
}

impl PrivacyLayer {
    /// Creates a privacy layer with the given configuration.
    pub fn new(config: PrivacyConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(PrivacyLayer {
            config,
            cache: Mutex::new(ProofCache::default()),
        })
    }

    /// Creates a privacy layer with the default configuration.
    pub fn with_defaults() -> Self {
        Self::new(PrivacyConfig::default()).expect("default config is valid")
    }

    /// Configuration of this layer.
    pub fn config(&self) -> &PrivacyConfig {
        &self.config
    }

    /// Generates a validity proof for a single transfer.
    ///
    /// Validates the balance equation before any cryptographic work; see
    /// [`ConfidentialTransfer::create_with_rng`] for the failure modes.
    pub fn generate_transfer(
        &self,
        secrets: &TransferSecrets,
    ) -> Result<ConfidentialTransfer, Error> {
        self.generate_transfer_with_rng(secrets, &mut rand::thread_rng())
    }

    fn generate_transfer_with_rng<R: RngCore + CryptoRng>(
        &self,
        secrets: &TransferSecrets,
        rng: &mut R,
    ) -> Result<ConfidentialTransfer, Error> {
        let fingerprint = if self.config.enable_caching {
            let fingerprint = secrets.fingerprint(self.config.range_bits);
            if let Some(transfer) = self.cache_get(&fingerprint) {
                debug!("proof cache hit");
                return Ok(transfer);
            }
            Some(fingerprint)
        } else {
            None
        };

        let transfer = ConfidentialTransfer::create_with_rng(
            &secrets.sender_before,
            &secrets.amount,
            &secrets.sender_after,
            self.config.range_bits as usize,
            rng,
        )?;

        if let Some(fingerprint) = fingerprint {
            self.cache_insert(fingerprint, transfer.clone());
        }
        Ok(transfer)
    }

    /// Verifies a transfer proof.
    ///
    /// In addition to the cryptographic checks, the embedded range proofs are
    /// required to use exactly the configured width, so a narrower proof
    /// cannot be substituted for the expected one.
    pub fn verify_transfer(&self, transfer: &ConfidentialTransfer) -> Result<(), Error> {
        if transfer.bits() != self.config.range_bits {
            return Err(Error::InvalidArgument(
                "range proof width does not match configuration",
            ));
        }
        transfer.verify()
    }

    /// Generates proofs for a batch of independent transfers.
    ///
    /// Returns per-transfer results in input order. When `enable_parallel` is
    /// set, proofs are computed on a work-stealing thread pool; the proofs
    /// are independent (each has its own transcript), so no ordering is
    /// imposed between them.
    pub fn generate_batch(
        &self,
        batch: &[TransferSecrets],
    ) -> Vec<Result<ConfidentialTransfer, Error>> {
        debug!("generating batch of {} transfers", batch.len());
        if self.config.enable_parallel {
            batch
                .par_iter()
                .map(|secrets| self.generate_transfer(secrets))
                .collect()
        } else {
            batch
                .iter()
                .map(|secrets| self.generate_transfer(secrets))
                .collect()
        }
    }

    /// Generates a batch of proofs reproducibly from a seed.
    ///
    /// Each proof draws its randomness from a `ChaCha20` stream keyed by the
    /// seed and the transfer's position in the batch, so the output does not
    /// depend on scheduling. Intended for testing and auditability; the
    /// caller is responsible for the seed's entropy.
    pub fn generate_batch_seeded(
        &self,
        batch: &[TransferSecrets],
        seed: [u8; 32],
    ) -> Vec<Result<ConfidentialTransfer, Error>> {
        let prove = |(ordinal, secrets): (usize, &TransferSecrets)| {
            let mut rng = ChaCha20Rng::from_seed(subseed(&seed, ordinal as u64));
            self.generate_transfer_with_rng(secrets, &mut rng)
        };

        if self.config.enable_parallel {
            batch.par_iter().enumerate().map(prove).collect()
        } else {
            batch.iter().enumerate().map(prove).collect()
        }
    }

    /// Verifies a batch of transfer proofs.
    ///
    /// Succeeds iff every proof verifies; otherwise reports the failure of
    /// the first (by input order) failing proof.
    pub fn verify_batch(&self, batch: &[ConfidentialTransfer]) -> Result<(), Error> {
        debug!("verifying batch of {} transfers", batch.len());
        if self.config.enable_parallel {
            let results: Vec<_> = batch
                .par_iter()
                .map(|transfer| self.verify_transfer(transfer))
                .collect();
            results.into_iter().collect()
        } else {
            batch
                .iter()
                .try_for_each(|transfer| self.verify_transfer(transfer))
        }
    }

    fn cache_get(&self, fingerprint: &[u8; 32]) -> Option<ConfidentialTransfer> {
        // A poisoned lock means a prover panicked mid-insert; treat it as a
        // miss rather than propagating.
        let mut cache = self.cache.lock().ok()?;
        cache.get(fingerprint, Instant::now())
    }

    fn cache_insert(&self, fingerprint: [u8; 32], transfer: ConfidentialTransfer) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(fingerprint, transfer, Instant::now());
        }
    }
}

/// Derives the RNG seed for the proof at the given batch position.
fn subseed(seed: &[u8; 32], ordinal: u64) -> [u8; 32] {
    let mut hasher = Sha512::new();
    hasher.update(b"confidential-transfer/batch-seed/v1");
    hasher.update(seed);
    hasher.update(ordinal.to_le_bytes());
    let digest = hasher.finalize();
    let mut out = [0_u8; 32];
    out.copy_from_slice(&digest[..32]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(range_bits: u8, caching: bool, parallel: bool) -> PrivacyLayer {
        PrivacyLayer::new(PrivacyConfig {
            range_bits,
            enable_caching: caching,
            enable_parallel: parallel,
        })
        .expect("config")
    }

    #[test]
    fn generate_and_verify_single_transfer() {
        let layer = layer(8, false, false);
        let secrets = TransferSecrets::generate(200, 50).expect("secrets");
        let transfer = layer.generate_transfer(&secrets).expect("generate");
        layer.verify_transfer(&transfer).expect("verify");
    }

    #[test]
    fn invalid_config_is_rejected() {
        assert!(matches!(
            PrivacyLayer::new(PrivacyConfig {
                range_bits: 24,
                ..PrivacyConfig::default()
            }),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn narrower_proof_is_rejected_by_configured_verifier() {
        let narrow = layer(8, false, false);
        let wide = layer(64, false, false);
        let secrets = TransferSecrets::generate(100, 10).expect("secrets");
        let transfer = narrow.generate_transfer(&secrets).expect("generate");
        assert!(matches!(
            wide.verify_transfer(&transfer),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn cached_proof_is_returned_for_identical_inputs() {
        let layer = layer(8, true, false);
        let secrets = TransferSecrets::generate(100, 30).expect("secrets");

        let first = layer.generate_transfer(&secrets).expect("generate");
        let second = layer.generate_transfer(&secrets).expect("generate");
        // Proving is randomized, so byte-identical proofs only come from the
        // cache.
        assert_eq!(first, second);
    }

    #[test]
    fn uncached_proofs_differ_between_runs() {
        let layer = layer(8, false, false);
        let secrets = TransferSecrets::generate(100, 30).expect("secrets");
        let first = layer.generate_transfer(&secrets).expect("generate");
        let second = layer.generate_transfer(&secrets).expect("generate");
        assert_ne!(first, second);
    }

    #[test]
    fn seeded_batches_are_reproducible() {
        let sequential = layer(8, false, false);
        let parallel = layer(8, false, true);
        let batch: Vec<_> = (1..=4_u64)
            .map(|i| TransferSecrets::generate(100 * i, 10 * i).expect("secrets"))
            .collect();
        let seed = [7_u8; 32];

        let first: Vec<_> = sequential
            .generate_batch_seeded(&batch, seed)
            .into_iter()
            .map(|result| result.expect("generate"))
            .collect();
        let second: Vec<_> = parallel
            .generate_batch_seeded(&batch, seed)
            .into_iter()
            .map(|result| result.expect("generate"))
            .collect();
        assert_eq!(first, second);

        sequential.verify_batch(&first).expect("batch verifies");
    }
}
