// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;
use toml::Table;
use toml::Value;

/// Randomness of a single round as exposed by any source.
pub trait RoundResult: Send + Sync + 'static {
    fn round(&self) -> u64;

    fn randomness(&self) -> &[u8];

    fn signature(&self) -> &[u8];

    /// Signature of the previous round, for sources which carry it.
    fn previous_signature(&self) -> Option<&[u8]> {
        None
    }

    /// Returns `Ok` if the value is already in canonical form.
    fn into_random_data(self) -> Result<RandomData, Self>
    where
        Self: Sized,
    {
        Err(self)
    }
}

/// Signature slot which is authoritative for a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SigVersion {
    #[default]
    V1,
    V2,
}

impl Display for SigVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigVersion::V1 => f.write_str("v1"),
            SigVersion::V2 => f.write_str("v2"),
        }
    }
}

/// Canonical owned representation of a round, including data needed for verification.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RandomData {
    round: u64,
    randomness: Vec<u8>,
    signature: Option<Vec<u8>>,
    signature_v2: Option<Vec<u8>>,
    previous_signature: Option<Vec<u8>>,
    version: SigVersion,
}

impl RandomData {
    /// Stores `signature` into the slot of `version`. Randomness is left empty until verified.
    pub fn new(
        round: u64,
        signature: Vec<u8>,
        previous_signature: Option<Vec<u8>>,
        version: SigVersion,
    ) -> Self {
        let (signature, signature_v2) = match version {
            SigVersion::V1 => (Some(signature), None),
            SigVersion::V2 => (None, Some(signature)),
        };
        Self {
            round,
            randomness: vec![],
            signature,
            signature_v2,
            previous_signature,
            version,
        }
    }

    pub fn version(&self) -> SigVersion {
        self.version
    }

    pub fn signature_v1(&self) -> Option<&[u8]> {
        self.signature.as_deref()
    }

    pub fn signature_v2(&self) -> Option<&[u8]> {
        self.signature_v2.as_deref()
    }

    pub(crate) fn set_randomness(&mut self, randomness: Vec<u8>) {
        self.randomness = randomness;
    }

    pub(crate) fn set_previous_signature(&mut self, previous_signature: Vec<u8>) {
        self.previous_signature = Some(previous_signature);
    }

    /// External representation, fields are present only if applicable to the round.
    pub fn to_value(&self) -> Value {
        let mut table = Table::new();
        let round = i64::try_from(self.round).unwrap_or(i64::MAX);
        table.insert("round".into(), Value::Integer(round));
        table.insert("randomness".into(), hex::encode(&self.randomness).into());
        if let Some(sig) = &self.signature {
            table.insert("signature".into(), hex::encode(sig).into());
        }
        if let Some(prev) = &self.previous_signature {
            table.insert("previous_signature".into(), hex::encode(prev).into());
        }
        if let Some(sig) = &self.signature_v2 {
            table.insert("signature_v2".into(), hex::encode(sig).into());
        }
        Value::Table(table)
    }

    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string(&self.to_value())?)
    }
}

impl RoundResult for RandomData {
    fn round(&self) -> u64 {
        self.round
    }

    fn randomness(&self) -> &[u8] {
        &self.randomness
    }

    fn signature(&self) -> &[u8] {
        let sig = match self.version {
            SigVersion::V1 => &self.signature,
            SigVersion::V2 => &self.signature_v2,
        };
        sig.as_deref().unwrap_or_default()
    }

    fn previous_signature(&self) -> Option<&[u8]> {
        self.previous_signature.as_deref()
    }

    fn into_random_data(self) -> Result<RandomData, Self> {
        Ok(self)
    }
}

/// Normalizes any round result into [`RandomData`], rounds from `v2_from` onwards use the v2 slot.
pub fn adapt<R: RoundResult>(r: R, v2_from: u64) -> RandomData {
    match r.into_random_data() {
        Ok(rd) => rd,
        Err(r) => {
            let version = if r.round() >= v2_from {
                SigVersion::V2
            } else {
                SigVersion::V1
            };
            let mut rd = RandomData::new(
                r.round(),
                r.signature().to_vec(),
                r.previous_signature().map(<[u8]>::to_vec),
                version,
            );
            rd.randomness = r.randomness().to_vec();
            rd
        }
    }
}
