// Copyright 2023-2025 StorSwift Inc.
// SPDX-License-Identifier: Apache-2.0

use super::time;
use super::time::Seconds;

/// Public information that is necessary for a client to verify any beacon present in a randomness chain.
#[derive(Clone)]
pub struct ChainInfo<K> {
    pub public_key: K,
    pub beacon_id: String,
    pub period: Seconds,
    pub genesis_time: u64,
    /// Group hash, used as previous signature of the first round.
    pub group_hash: Vec<u8>,
}

impl<K> ChainInfo<K> {
    /// Returns the latest round available at `now` (UNIX seconds).
    pub fn round_at(&self, now: u64) -> u64 {
        time::current_round(now, self.period.get_value(), self.genesis_time)
    }

    /// Returns the UNIX time of `round`.
    pub fn time_of(&self, round: u64) -> u64 {
        time::time_of_round(self.period.get_value(), self.genesis_time, round)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rounds_follow_period() {
        let info = ChainInfo {
            public_key: (),
            beacon_id: "default".into(),
            period: Seconds::new(3),
            genesis_time: 1745308582,
            group_hash: vec![0; 32],
        };
        assert_eq!(info.round_at(1745308581), 1);
        assert_eq!(info.round_at(1745308582), 1);
        assert_eq!(info.round_at(1745308647), 22);
        assert_eq!(info.time_of(22), 1745308645);
        assert_eq!(info.round_at(info.time_of(40)), 40);
    }
}
