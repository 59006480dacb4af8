// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

//! In-memory randomness source loaded from a chain archive.
//!
//! Archive layout:
//! ```toml
//! [info]
//! scheme = "pedersen-bls-chained"
//! public_key = "<hex>"
//! period = 30            # or "30s"
//! genesis_time = 1595431050
//! group_hash = "<hex>"
//! beacon_id = "default"  # optional
//!
//! [[beacons]]
//! round = 1
//! signature = "<hex>"
//! previous_signature = "<hex>" # optional
//! randomness = "<hex>"         # optional
//! ```
use super::Client;
use super::FetchError;
use super::RoundResult;

use crate::chain::ChainInfo;
use crate::chain::Seconds;
use crate::crypto::CryptoError;

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use toml::Table;
use toml::Value;

/// Get value by $key:&str, define resulting type of value by $method
macro_rules! get {
    ($map:expr, $key:literal, $method:ident) => {
        $map.get($key)
            .and_then(|v| v.$method())
            .ok_or(ArchiveError::Missing($key))
    };
}

#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("expected {0}")]
    Missing(&'static str),
    #[error("invalid hex in {field}: {source}")]
    Hex {
        field: &'static str,
        source: hex::FromHexError,
    },
    #[error("public key: {0}")]
    Key(#[from] CryptoError),
    #[error("invalid period")]
    InvalidPeriod,
    #[error("invalid genesis time: {0}")]
    InvalidGenesisTime(i64),
    #[error("invalid round: {0}")]
    InvalidRound(i64),
    #[error("round {0} is duplicated")]
    DuplicatedRound(u64),
}

/// Round as stored in an archive.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchivedBeacon {
    pub round: u64,
    pub signature: Vec<u8>,
    pub previous_signature: Option<Vec<u8>>,
    pub randomness: Vec<u8>,
}

impl RoundResult for ArchivedBeacon {
    fn round(&self) -> u64 {
        self.round
    }

    fn randomness(&self) -> &[u8] {
        &self.randomness
    }

    fn signature(&self) -> &[u8] {
        &self.signature
    }

    fn previous_signature(&self) -> Option<&[u8]> {
        self.previous_signature.as_deref()
    }
}

/// Parsed archive file, the key is decoded once the scheme is known.
pub struct ArchiveFile {
    info: Table,
    beacons: Vec<Value>,
}

impl ArchiveFile {
    pub fn parse(data: &str) -> Result<Self, ArchiveError> {
        let mut table: Table = data.parse()?;
        let info = match table.remove("info") {
            Some(Value::Table(info)) => info,
            _ => return Err(ArchiveError::Missing("info")),
        };
        let beacons = match table.remove("beacons") {
            Some(Value::Array(beacons)) => beacons,
            None => vec![],
            Some(_) => return Err(ArchiveError::Missing("beacons")),
        };

        Ok(Self { info, beacons })
    }

    pub fn scheme(&self) -> Result<&str, ArchiveError> {
        get!(self.info, "scheme", as_str)
    }

    pub fn load<K, F>(&self, decode_key: F) -> Result<ArchiveClient<K>, ArchiveError>
    where
        F: FnOnce(&[u8]) -> Result<K, CryptoError>,
    {
        let info = &self.info;
        let public_key = decode_key(&hex_field(info, "public_key")?)?;

        let period = match info.get("period") {
            Some(Value::Integer(p)) => u32::try_from(*p).map_err(|_| ArchiveError::InvalidPeriod)?,
            Some(Value::String(p)) => p
                .parse::<Seconds>()
                .map_err(|_| ArchiveError::InvalidPeriod)?
                .get_value(),
            _ => return Err(ArchiveError::Missing("period")),
        };
        if period == 0 {
            return Err(ArchiveError::InvalidPeriod);
        }

        let genesis_time = get!(info, "genesis_time", as_integer)?;
        let genesis_time = u64::try_from(genesis_time)
            .ok()
            .filter(|t| *t > 0)
            .ok_or(ArchiveError::InvalidGenesisTime(genesis_time))?;

        let beacon_id = info
            .get("beacon_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let info = ChainInfo {
            public_key,
            beacon_id,
            period: Seconds::new(period),
            genesis_time,
            group_hash: hex_field(info, "group_hash")?,
        };

        let mut beacons = Vec::with_capacity(self.beacons.len());
        for b in &self.beacons {
            let b = b.as_table().ok_or(ArchiveError::Missing("beacons table"))?;
            let round = get!(b, "round", as_integer)?;
            let previous_signature = match b.get("previous_signature") {
                Some(_) => Some(hex_field(b, "previous_signature")?),
                None => None,
            };
            let randomness = match b.get("randomness") {
                Some(_) => hex_field(b, "randomness")?,
                None => vec![],
            };

            beacons.push(ArchivedBeacon {
                round: u64::try_from(round).map_err(|_| ArchiveError::InvalidRound(round))?,
                signature: hex_field(b, "signature")?,
                previous_signature,
                randomness,
            });
        }

        ArchiveClient::new(info, beacons)
    }
}

fn hex_field(table: &Table, field: &'static str) -> Result<Vec<u8>, ArchiveError> {
    let value = table
        .get(field)
        .and_then(Value::as_str)
        .ok_or(ArchiveError::Missing(field))?;

    hex::decode(value).map_err(|source| ArchiveError::Hex { field, source })
}

struct Archive<K> {
    info: ChainInfo<K>,
    beacons: BTreeMap<u64, ArchivedBeacon>,
}

/// Serves rounds of a single chain from memory.
pub struct ArchiveClient<K> {
    inner: Arc<Archive<K>>,
}

impl<K> Clone for ArchiveClient<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> ArchiveClient<K> {
    pub fn new(info: ChainInfo<K>, beacons: Vec<ArchivedBeacon>) -> Result<Self, ArchiveError> {
        let mut map = BTreeMap::new();
        for b in beacons {
            let round = b.round;
            if map.insert(round, b).is_some() {
                return Err(ArchiveError::DuplicatedRound(round));
            }
        }
        let inner = Archive { info, beacons: map };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn last_round(&self) -> Option<u64> {
        self.inner.beacons.keys().next_back().copied()
    }
}

impl<K> std::fmt::Display for ArchiveClient<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "archive[{}]", self.inner.info.beacon_id)
    }
}

impl<K: Clone + Send + Sync + 'static> Client for ArchiveClient<K> {
    type Key = K;
    type Output = ArchivedBeacon;
    type Error = FetchError;

    async fn get(&self, round: u64) -> Result<ArchivedBeacon, FetchError> {
        self.inner
            .beacons
            .get(&round)
            .cloned()
            .ok_or(FetchError::NotFound(round))
    }

    /// Replays all stored rounds in ascending order.
    async fn watch(&self, token: CancellationToken) -> ReceiverStream<ArchivedBeacon> {
        let (tx, rx) = mpsc::channel(1);
        let archive = Arc::clone(&self.inner);

        tokio::spawn(async move {
            for b in archive.beacons.values() {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    sent = tx.send(b.clone()) => if sent.is_err() {
                        break;
                    },
                }
            }
        });

        ReceiverStream::new(rx)
    }

    async fn info(&self) -> Result<ChainInfo<K>, FetchError> {
        Ok(self.inner.info.clone())
    }

    fn round_at(&self, time: u64) -> u64 {
        self.inner.info.round_at(time)
    }
}
