// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use super::Verifier;
use super::VerifyError;

use crate::chain::ChainInfo;
use crate::client::Client;
use crate::client::FetchError;
use crate::client::RandomData;
use crate::client::RoundResult;
use crate::client::SigVersion;
use crate::crypto::BeaconLink;
use crate::crypto::Primitives;
use crate::{debug, warn};

use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// Highest round verified back to genesis, shared by all verifications of one client.
///
/// The checkpoint also carries its verified previous signature, which makes a
/// repeated request for the checkpoint round free.
#[derive(Default)]
pub struct PointOfTrust(ArcSwapOption<RandomData>);

impl PointOfTrust {
    pub fn load(&self) -> Option<Arc<RandomData>> {
        self.0.load_full()
    }

    pub fn round(&self) -> Option<u64> {
        self.load().map(|pot| pot.round())
    }

    /// Stores `checkpoint` unless a higher round is already trusted.
    /// Returns `true` if the point of trust has moved.
    pub(super) fn commit(&self, checkpoint: RandomData) -> bool {
        let new = Arc::new(checkpoint);
        let prev = self.0.rcu(|current| match current {
            Some(current) if current.round() >= new.round() => Some(Arc::clone(current)),
            _ => Some(Arc::clone(&new)),
        });

        prev.map_or(true, |prev| prev.round() < new.round())
    }
}

impl<I, P> Verifier<I, P>
where
    I: Client<Key = P::Key, Error = FetchError>,
    P: Primitives,
{
    /// Returns the verified signature of round `round - 1`.
    ///
    /// Walks the chain from the point of trust, or from genesis if there is none
    /// below `round`, verifying every link on the way.
    pub async fn trusted_previous_signature(
        &self,
        info: &ChainInfo<P::Key>,
        round: u64,
    ) -> Result<Vec<u8>, VerifyError> {
        if round <= 1 {
            return Ok(info.group_hash.clone());
        }
        let target = round - 1;

        let pot = self.trust.load();
        if let Some(prev) = pot
            .as_deref()
            .filter(|pot| pot.round() == round)
            .and_then(|pot| pot.previous_signature())
        {
            return Ok(prev.to_vec());
        }
        // Group hash is the signature of round 0.
        let (mut trust_round, mut trust_sig) = match pot {
            Some(pot) if pot.round() <= target => (pot.round(), pot.signature().to_vec()),
            _ => (0, info.group_hash.clone()),
        };
        let initial = trust_round;

        let mut checkpoint = None;
        while trust_round < target {
            trust_round += 1;
            debug!(self.log, "loading round {trust_round} to verify");
            let next = self
                .indirect
                .get(trust_round)
                .await
                .map_err(|source| VerifyError::FetchRound {
                    round: trust_round,
                    source,
                })?;

            let link = BeaconLink {
                previous_sig: &trust_sig,
                round: trust_round,
                signature: next.signature(),
            };
            let key = self.primitives.clone_key(&info.public_key);
            if let Err(source) = self.primitives.verify_v1(&key, &link) {
                warn!(self.log, "failed to verify value: {link}, {source}");
                return Err(VerifyError::Verification {
                    round: trust_round,
                    version: SigVersion::V1,
                    source,
                });
            }

            let signature = next.signature().to_vec();
            let prev_sig = std::mem::replace(&mut trust_sig, signature.clone());
            let mut verified =
                RandomData::new(trust_round, signature, Some(prev_sig), SigVersion::V1);
            verified.set_randomness(self.primitives.randomness_from(verified.signature()));
            checkpoint = Some(verified);
        }

        if let Some(checkpoint) = checkpoint {
            if self.trust.commit(checkpoint) {
                debug!(
                    self.log,
                    "point of trust moved from {initial} to {trust_round}"
                );
            }
        }
        if trust_round != target {
            return Err(VerifyError::UnexpectedTrustRound {
                reached: trust_round,
                expected: target,
            });
        }

        Ok(trust_sig)
    }
}
