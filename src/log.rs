// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use tracing::Span;
use tracing_subscriber::fmt::time;
use tracing_subscriber::prelude::__tracing_subscriber_SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub fn init_log(verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::builder().parse_lossy(match verbose {
        true => "drand_verify=trace",
        false => "drand_verify=info",
    });

    let layer = tracing_subscriber::fmt::layer()
        .with_timer(time::time())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Diagnostic sink of a client: every event is emitted under `span`.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    pub span: Span,
}

impl Logger {
    pub fn register_client(name: &str) -> Self {
        let span = tracing::info_span!("", client = name);
        Self {
            name: name.into(),
            span,
        }
    }

    /// Returns logger for a sub-task of this client, e.g. `.watch`.
    pub fn new_child(&self, mut args: String) -> Self {
        args.insert_str(0, self.name.as_ref());
        let span = tracing::info_span!("", client = args);
        Self {
            name: Arc::clone(&self.name),
            span,
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::register_client("verifier")
    }
}

#[macro_export]
macro_rules! debug {
    ($log:expr, $($arg:tt)+) => {
        tracing::debug!(parent: &$log.span, $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($log:expr, $($arg:tt)+) => {
        tracing::info!(parent: &$log.span, $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($log:expr, $($arg:tt)+) => {
        tracing::warn!(parent: &$log.span, $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($log:expr, $($arg:tt)+) => {
        tracing::error!(parent: &$log.span, $($arg)+)
    };
}
