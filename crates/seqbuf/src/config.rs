// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use crate::error::BufferError;

/// Fewest segments a chain is ever built with.
pub const MIN_SEGMENTS: usize = 3;

/// Construction settings for a [`SequentialBuffer`](crate::buffer::SequentialBuffer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, clap::Args)]
#[serde(default)]
pub struct BufferConfig {
    /// Items stored per segment (the unit of growth).
    #[arg(long, default_value_t = 512, env = "SEQBUF_SEGMENT_LEN")]
    pub segment_len: usize,

    /// Initial capacity in items, rounded up to whole segments.
    #[arg(long, default_value_t = 1536, env = "SEQBUF_INITIAL_CAPACITY")]
    pub initial_capacity: usize,

    /// Spare segments ahead of the writer at which background growth starts.
    #[arg(long, default_value_t = 1, env = "SEQBUF_GROWTH_SLACK")]
    pub growth_slack_segments: usize,

    /// Segments added by the first growth event; doubles on every event after.
    #[arg(long, default_value_t = 2, env = "SEQBUF_INITIAL_GROWTH")]
    pub initial_growth_segments: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            segment_len: 512,
            initial_capacity: 1536,
            growth_slack_segments: 1,
            initial_growth_segments: 2,
        }
    }
}

impl BufferConfig {
    pub fn with_segment_len(mut self, segment_len: usize) -> Self {
        self.segment_len = segment_len;
        self
    }

    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    pub fn with_growth_slack(mut self, segments: usize) -> Self {
        self.growth_slack_segments = segments;
        self
    }

    pub fn with_initial_growth(mut self, segments: usize) -> Self {
        self.initial_growth_segments = segments;
        self
    }

    pub fn validate(&self) -> Result<(), BufferError> {
        if self.segment_len == 0
            || self.initial_capacity == 0
            || self.growth_slack_segments == 0
            || self.initial_growth_segments == 0
        {
            return Err(BufferError::InvalidConfig);
        }
        Ok(())
    }

    /// Number of segments the chain starts with.
    pub fn initial_segments(&self) -> usize {
        self.initial_capacity.div_ceil(self.segment_len.max(1)).max(MIN_SEGMENTS)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
