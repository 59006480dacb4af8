// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic chains and instrumented collaborators for verifier tests.

use crate::chain::ChainInfo;
use crate::chain::Seconds;
use crate::client::archive::ArchiveClient;
use crate::client::archive::ArchivedBeacon;
use crate::client::Client;
use crate::client::FetchError;
use crate::crypto::BeaconLink;
use crate::crypto::CryptoError;
use crate::crypto::KeyPoint;
use crate::crypto::Primitives;
use crate::crypto::Scheme;

use energon::drand::traits::BeaconDigest;
use energon::traits::Affine;
use energon::traits::ScalarField;
use sha2::Digest;
use sha2::Sha256;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

pub const GENESIS: u64 = 1745308582;
pub const FAKE_KEY: &[u8] = b"fake chain key";

/// Message of chained rounds: `sha256(previous_signature || round)`.
pub fn digest_v1(previous_sig: &[u8], round: u64) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(previous_sig);
    h.update(round.to_be_bytes());
    h.finalize().into()
}

/// Message of v2 rounds: `sha256(round)`.
pub fn digest_v2(round: u64) -> [u8; 32] {
    Sha256::digest(round.to_be_bytes()).into()
}

/// Signature of the fake scheme: `sha256(key || message)`.
pub fn fake_sign(key: &[u8], msg: &[u8]) -> Vec<u8> {
    let mut h = Sha256::new();
    h.update(key);
    h.update(msg);
    h.finalize().to_vec()
}

/// Primitives over [`fake_sign`], counting every check by version.
#[derive(Clone, Default)]
pub struct FakePrimitives {
    v1: Arc<AtomicUsize>,
    v2: Arc<AtomicUsize>,
}

impl FakePrimitives {
    pub fn v1_checks(&self) -> usize {
        self.v1.load(Ordering::SeqCst)
    }

    pub fn v2_checks(&self) -> usize {
        self.v2.load(Ordering::SeqCst)
    }

    pub fn checks(&self) -> usize {
        self.v1_checks() + self.v2_checks()
    }

    fn check(key: &[u8], signature: &[u8], msg: &[u8]) -> Result<(), CryptoError> {
        if fake_sign(key, msg) == signature {
            Ok(())
        } else {
            Err(CryptoError::InvalidSignature)
        }
    }
}

impl Primitives for FakePrimitives {
    type Key = Vec<u8>;

    fn verify_v1(&self, key: &Vec<u8>, link: &BeaconLink) -> Result<(), CryptoError> {
        self.v1.fetch_add(1, Ordering::SeqCst);
        Self::check(
            key,
            link.signature,
            &digest_v1(link.previous_sig, link.round),
        )
    }

    fn verify_v2(&self, key: &Vec<u8>, link: &BeaconLink) -> Result<(), CryptoError> {
        self.v2.fetch_add(1, Ordering::SeqCst);
        Self::check(key, link.signature, &digest_v2(link.round))
    }

    fn decode_key(&self, bytes: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(bytes.to_vec())
    }
}

pub fn chain_info<K>(public_key: K) -> ChainInfo<K> {
    ChainInfo {
        public_key,
        beacon_id: "default".into(),
        period: Seconds::new(3),
        genesis_time: GENESIS,
        group_hash: Sha256::digest(b"group").to_vec(),
    }
}

/// Builds rounds `1..=rounds`, `sign` receives the previous signature and the round.
/// Every round carries its previous signature and bogus randomness.
pub fn build_chain<F>(group_hash: &[u8], rounds: u64, sign: F) -> Vec<ArchivedBeacon>
where
    F: Fn(&[u8], u64) -> Vec<u8>,
{
    let mut prev = group_hash.to_vec();
    let mut beacons = Vec::new();
    for round in 1..=rounds {
        let signature = sign(&prev, round);
        beacons.push(ArchivedBeacon {
            round,
            signature: signature.clone(),
            previous_signature: Some(std::mem::replace(&mut prev, signature)),
            randomness: vec![0xee; 32],
        });
    }

    beacons
}

/// Fake chain, rounds from `v2_from` onwards sign the v2 message.
pub fn fake_chain(rounds: u64, v2_from: u64) -> (ChainInfo<Vec<u8>>, Vec<ArchivedBeacon>) {
    let info = chain_info(FAKE_KEY.to_vec());
    let beacons = build_chain(&info.group_hash, rounds, |prev, round| {
        if round >= v2_from {
            fake_sign(FAKE_KEY, &digest_v2(round))
        } else {
            fake_sign(FAKE_KEY, &digest_v1(prev, round))
        }
    });

    (info, beacons)
}

/// Chain of scheme `S` signed by a fresh private key over the scheme digest.
pub fn bls_chain<S: Scheme>(rounds: u64) -> (ChainInfo<KeyPoint<S>>, Vec<ArchivedBeacon>) {
    let private = S::Scalar::random();
    let info = chain_info(S::sk_to_pk(&private));
    let beacons = build_chain(&info.group_hash, rounds, |prev, round| {
        let msg = S::Beacon::digest(prev, round);
        let sig = S::bls_sign(&msg, &private).unwrap();
        Affine::serialize(&sig).unwrap().into()
    });

    (info, beacons)
}

/// Archive client which records every requested round and may fail on metadata.
#[derive(Clone)]
pub struct CountingClient {
    inner: ArchiveClient<Vec<u8>>,
    gets: Arc<Mutex<Vec<u64>>>,
    info_fails: bool,
}

impl CountingClient {
    pub fn new(info: ChainInfo<Vec<u8>>, beacons: Vec<ArchivedBeacon>) -> Self {
        Self {
            inner: ArchiveClient::new(info, beacons).unwrap(),
            gets: Arc::default(),
            info_fails: false,
        }
    }

    pub fn failing_info(mut self) -> Self {
        self.info_fails = true;
        self
    }

    pub fn gets(&self) -> Vec<u64> {
        self.gets.lock().unwrap().clone()
    }

    pub fn reset(&self) {
        self.gets.lock().unwrap().clear();
    }
}

impl Client for CountingClient {
    type Key = Vec<u8>;
    type Output = ArchivedBeacon;
    type Error = FetchError;

    async fn get(&self, round: u64) -> Result<ArchivedBeacon, FetchError> {
        self.gets.lock().unwrap().push(round);
        // Give concurrent requests a chance to interleave.
        tokio::task::yield_now().await;
        self.inner.get(round).await
    }

    async fn watch(&self, token: CancellationToken) -> ReceiverStream<ArchivedBeacon> {
        self.inner.watch(token).await
    }

    async fn info(&self) -> Result<ChainInfo<Vec<u8>>, FetchError> {
        if self.info_fails {
            return Err(FetchError::Unavailable("info endpoint is down".into()));
        }
        self.inner.info().await
    }

    fn round_at(&self, time: u64) -> u64 {
        self.inner.round_at(time)
    }
}
