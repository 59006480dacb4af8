// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

//! Verification of rounds against the chain public key.
//!
//! A round below [`Config::v2_from`] is verified with the v1 (chained) scheme,
//! which requires a trusted signature of the previous round. That signature is
//! either taken from the round itself or, when it is absent or `strict` is set,
//! established by walking the chain forward from the latest point of trust.
mod trust;
mod verifier;

pub use trust::PointOfTrust;
pub use verifier::Verifier;

use crate::client::{FetchError, SigVersion};
use crate::crypto::CryptoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Verify previous signature of v1 rounds by walking the chain, even if the round carries it.
    pub strict: bool,
    /// First round of the v2 scheme.
    pub v2_from: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict: false,
            v2_from: u64::MAX,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum VerifyError {
    #[error("could not get info: {0}")]
    Fetch(#[from] FetchError),
    #[error("could not get round {round}: {source}")]
    FetchRound { round: u64, source: FetchError },
    #[error("verification {version} of round {round} failed: {source}")]
    Verification {
        round: u64,
        version: SigVersion,
        source: CryptoError,
    },
    #[error("unexpected trust round {reached}, expected {expected}")]
    UnexpectedTrustRound { reached: u64, expected: u64 },
}
