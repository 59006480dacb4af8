// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use std::str::FromStr;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

#[derive(Debug, Default, PartialEq, Clone, Copy)]
pub struct Seconds {
    value: u32,
}

impl Seconds {
    pub fn new(value: u32) -> Self {
        Self { value }
    }

    pub fn get_value(&self) -> u32 {
        self.value
    }
}

impl From<u32> for Seconds {
    fn from(value: u32) -> Self {
        Seconds { value }
    }
}

impl std::fmt::Display for Seconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}s", self.value)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseSecondsError;

impl FromStr for Seconds {
    type Err = ParseSecondsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value
            .strip_suffix("s")
            .ok_or(ParseSecondsError)?
            .parse()
            .map_err(|_| ParseSecondsError)?;

        Ok(Self::new(value))
    }
}

/// Calculates the active round at `now`.
pub fn current_round(now: u64, period: u32, genesis: u64) -> u64 {
    let (next_round, _) = next_round(now, period, genesis);
    if next_round <= 1 {
        next_round
    } else {
        next_round - 1
    }
}

/// Returns the next upcoming round and its UNIX time given the genesis
/// time and the period. Round at time genesis = round 1. Round 0 is fixed.
pub fn next_round(now: u64, period: u32, genesis: u64) -> (u64, u64) {
    if now < genesis {
        return (1, genesis);
    }
    // Periods elapsed since genesis, +1 for the round at genesis and +1 for the next one.
    let from_genesis = now - genesis;
    let next_round = from_genesis / u64::from(period.max(1)) + 1;
    let next_time = genesis + (next_round * u64::from(period));

    (next_round + 1, next_time)
}

/// Returns the time the `round` should happen.
pub fn time_of_round(period: u32, genesis: u64, round: u64) -> u64 {
    if round == 0 {
        return genesis;
    }

    // - 1 because genesis time is for 1st round already.
    let delta = (round - 1) * u64::from(period);
    genesis + delta
}

/// Returns current Unix time as duration.
pub fn time_now() -> Duration {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}
