// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use super::adapt;
use super::Client;
use super::FetchError;
use super::RandomData;
use super::RoundResult;

use crate::chain::ChainInfo;
use crate::crypto::Primitives;
use crate::log::Logger;
use crate::verify::Config;
use crate::verify::Verifier;
use crate::verify::VerifyError;
use crate::{debug, error, warn};

use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Wraps a client to verify every emitted round against the chain public key.
///
/// Rounds from [`Config::v2_from`] onwards are verified with the v2 scheme only,
/// earlier rounds with the v1 (chained) scheme.
pub struct VerifyingClient<C, I, P> {
    /// Wrapped client, `get` and `watch` return rounds proxied from it.
    client: C,
    /// Holds the indirect client used for chain info and for rounds needed to
    /// establish the chain of trust. It may be backed by a cache or a shared
    /// pool which the direct client does not have.
    verifier: Arc<Verifier<I, P>>,
    log: Logger,
}

impl<C, I, P> VerifyingClient<C, I, P>
where
    C: Client<Key = P::Key, Error = FetchError>,
    I: Client<Key = P::Key, Error = FetchError>,
    P: Primitives,
{
    pub fn new(client: C, indirect: I, primitives: P, config: Config, log: Logger) -> Self {
        let verifier = Verifier::new(indirect, primitives, config, log.clone());
        Self {
            client,
            verifier: Arc::new(verifier),
            log,
        }
    }

    /// Starts from a round the caller already trusts, e.g. one verified in a
    /// previous run, so the chain is never walked from genesis below it.
    #[must_use]
    pub fn with_point_of_trust(self, checkpoint: RandomData) -> Self {
        self.verifier.seed_point_of_trust(checkpoint);
        self
    }

    pub fn verifier(&self) -> &Verifier<I, P> {
        &self.verifier
    }

    pub fn logger(&self) -> &Logger {
        &self.log
    }
}

impl<C, P> VerifyingClient<C, C, P>
where
    C: Client<Key = P::Key, Error = FetchError> + Clone,
    P: Primitives,
{
    /// Uses the same client for direct and indirect fetches.
    pub fn from_client(client: C, primitives: P, config: Config, log: Logger) -> Self {
        Self::new(client.clone(), client, primitives, config, log)
    }
}

impl<C, I, P> Client for VerifyingClient<C, I, P>
where
    C: Client<Key = P::Key, Error = FetchError>,
    I: Client<Key = P::Key, Error = FetchError>,
    P: Primitives,
{
    type Key = P::Key;
    type Output = RandomData;
    type Error = VerifyError;

    /// Returns a verified round of randomness.
    async fn get(&self, round: u64) -> Result<RandomData, VerifyError> {
        let info = self.verifier.info().await?;

        if let Some(pot) = self
            .verifier
            .point_of_trust()
            .load()
            .filter(|pot| pot.round() == round)
        {
            debug!(self.log, "round {round} is the point of trust");
            return Ok(RandomData::clone(&pot));
        }

        let r = self
            .client
            .get(round)
            .await
            .map_err(|source| VerifyError::FetchRound { round, source })?;
        let rd = adapt(r, self.verifier.config().v2_from);

        self.verifier.verify(&info, rd).await
    }

    /// Returns verified rounds as they become available, invalid rounds are skipped.
    async fn watch(&self, token: CancellationToken) -> ReceiverStream<RandomData> {
        let (tx, rx) = mpsc::channel(1);

        let info = match self.verifier.info().await {
            Ok(info) => info,
            Err(err) => {
                error!(self.log, "watch: {err}");
                return ReceiverStream::new(rx);
            }
        };
        let upstream = self.client.watch(token.clone()).await;
        let verifier = Arc::clone(&self.verifier);
        let log = self.log.new_child(".watch".into());

        tokio::spawn(forward_verified(verifier, info, upstream, tx, token, log));

        ReceiverStream::new(rx)
    }

    async fn info(&self) -> Result<ChainInfo<P::Key>, VerifyError> {
        Ok(self.client.info().await?)
    }

    fn round_at(&self, time: u64) -> u64 {
        self.client.round_at(time)
    }
}

/// Forwards verified rounds until `upstream` is closed, `tx` is dropped or `token` is cancelled.
async fn forward_verified<I, P, R>(
    verifier: Arc<Verifier<I, P>>,
    info: ChainInfo<P::Key>,
    mut upstream: ReceiverStream<R>,
    tx: mpsc::Sender<RandomData>,
    token: CancellationToken,
    log: Logger,
) where
    I: Client<Key = P::Key, Error = FetchError>,
    P: Primitives,
    R: RoundResult,
{
    let v2_from = verifier.config().v2_from;
    loop {
        let r = tokio::select! {
            biased;
            () = token.cancelled() => break,
            r = upstream.next() => match r {
                Some(r) => r,
                None => break,
            },
        };
        let rd = adapt(r, v2_from);
        let round = rd.round();

        let verified = tokio::select! {
            biased;
            () = token.cancelled() => break,
            verified = verifier.verify(&info, rd) => verified,
        };
        match verified {
            Ok(rd) => {
                if tx.send(rd).await.is_err() {
                    debug!(log, "receiver closed at round {round}");
                    break;
                }
            }
            Err(err) => warn!(log, "skipping invalid watch round {round}: {err}"),
        }
    }
}

impl<C: Display, I, P> Display for VerifyingClient<C, I, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.(+verifier)", self.client)
    }
}
