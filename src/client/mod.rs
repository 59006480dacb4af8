// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

//! Client capability shared by randomness sources and the verifying decorator.
pub mod archive;
mod result;
mod verifying;

pub use result::{adapt, RandomData, RoundResult, SigVersion};
pub use verifying::VerifyingClient;

use crate::chain::ChainInfo;
use std::future::Future;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Error of a randomness source which could not retrieve metadata or a round.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("round {0} not found")]
    NotFound(u64),
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Source of randomness rounds for a single chain.
pub trait Client: Send + Sync + 'static {
    type Key: Clone + Send + Sync + 'static;
    type Output: RoundResult;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the randomness at `round`.
    fn get(&self, round: u64) -> impl Future<Output = Result<Self::Output, Self::Error>> + Send;

    /// Returns new randomness as it becomes available. The stream is closed once
    /// the source is exhausted or `token` is cancelled.
    fn watch(
        &self,
        token: CancellationToken,
    ) -> impl Future<Output = ReceiverStream<Self::Output>> + Send;

    fn info(&self) -> impl Future<Output = Result<ChainInfo<Self::Key>, Self::Error>> + Send;

    /// Returns the most recent round available at `time` (UNIX seconds).
    fn round_at(&self, time: u64) -> u64;
}
