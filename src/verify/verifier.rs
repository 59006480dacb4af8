// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use super::trust::PointOfTrust;
use super::Config;
use super::VerifyError;

use crate::chain::ChainInfo;
use crate::client::Client;
use crate::client::FetchError;
use crate::client::RandomData;
use crate::client::RoundResult;
use crate::client::SigVersion;
use crate::crypto::BeaconLink;
use crate::crypto::Primitives;
use crate::log::Logger;
use crate::debug;

/// Verifies rounds of a single chain. Rounds needed to establish the chain of
/// trust are fetched from `indirect`.
pub struct Verifier<I, P> {
    pub(super) indirect: I,
    pub(super) primitives: P,
    pub(super) trust: PointOfTrust,
    config: Config,
    pub(super) log: Logger,
}

impl<I, P> Verifier<I, P>
where
    I: Client<Key = P::Key, Error = FetchError>,
    P: Primitives,
{
    pub fn new(indirect: I, primitives: P, config: Config, log: Logger) -> Self {
        Self {
            indirect,
            primitives,
            trust: PointOfTrust::default(),
            config,
            log,
        }
    }

    pub fn config(&self) -> Config {
        self.config
    }

    pub fn point_of_trust(&self) -> &PointOfTrust {
        &self.trust
    }

    /// Trusts `checkpoint` as verified back to genesis, walks start from it
    /// instead of genesis. Randomness is derived from its signature.
    pub fn seed_point_of_trust(&self, mut checkpoint: RandomData) {
        let randomness = self.primitives.randomness_from(checkpoint.signature());
        checkpoint.set_randomness(randomness);
        let round = checkpoint.round();
        if self.trust.commit(checkpoint) {
            debug!(self.log, "point of trust seeded at round {round}");
        }
    }

    pub async fn info(&self) -> Result<ChainInfo<P::Key>, VerifyError> {
        Ok(self.indirect.info().await?)
    }

    /// Returns `rd` with randomness recomputed from its signature once the signature is verified.
    pub async fn verify(
        &self,
        info: &ChainInfo<P::Key>,
        mut rd: RandomData,
    ) -> Result<RandomData, VerifyError> {
        let round = rd.round();
        let is_v2 = round >= self.config.v2_from;

        // Previous signature is authoritative only if established by chain walk.
        let (prev_sig, walked) = match rd.previous_signature() {
            Some(hint) if is_v2 || !self.config.strict => (hint.to_vec(), false),
            // Not a part of v2 message.
            None if is_v2 => (vec![], false),
            _ => (self.trusted_previous_signature(info, round).await?, true),
        };

        let version = if is_v2 {
            SigVersion::V2
        } else {
            SigVersion::V1
        };
        let signature = match version {
            SigVersion::V1 => rd.signature_v1(),
            SigVersion::V2 => rd.signature_v2(),
        }
        .unwrap_or_default();

        let link = BeaconLink {
            previous_sig: &prev_sig,
            round,
            signature,
        };
        let key = self.primitives.clone_key(&info.public_key);
        let checked = match version {
            SigVersion::V1 => self.primitives.verify_v1(&key, &link),
            SigVersion::V2 => self.primitives.verify_v2(&key, &link),
        };
        if let Err(source) = checked {
            debug!(self.log, "verification {version} failed: {link}, {source}");
            return Err(VerifyError::Verification {
                round,
                version,
                source,
            });
        }
        let randomness = self.primitives.randomness_from(signature);
        rd.set_randomness(randomness);

        if walked {
            rd.set_previous_signature(prev_sig);
            if self.trust.commit(rd.clone()) {
                debug!(self.log, "point of trust moved to round {round}");
            }
        }

        Ok(rd)
    }
}
