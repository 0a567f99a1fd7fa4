// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: small buffers, a recording sink, and
//! assertion helpers.

use std::time::Instant;

use parking_lot::Mutex;

use crate::buffer::SequentialBuffer;
use crate::config::BufferConfig;
use crate::error::BufferError;
use crate::queue::Sink;

/// Config for a buffer of exactly `segments` segments of `segment_len`
/// items each, so wrap-around happens after a handful of appends.
pub fn small_config(segment_len: usize, segments: usize) -> BufferConfig {
    BufferConfig::default()
        .with_segment_len(segment_len)
        .with_initial_capacity(segment_len * segments)
}

pub fn small_buffer<T: Clone + Send + Sync + 'static>(
    segment_len: usize,
    segments: usize,
) -> Result<SequentialBuffer<T>, BufferError> {
    SequentialBuffer::new(small_config(segment_len, segments))
}

/// Sink that records every delivery with its arrival time. Messages equal
/// to `reject` fail delivery.
pub struct RecordingSink<M> {
    deliveries: Mutex<Vec<(Instant, M)>>,
    reject: Option<M>,
}

impl<M: Clone + PartialEq> RecordingSink<M> {
    pub fn new() -> Self {
        Self { deliveries: Mutex::new(Vec::new()), reject: None }
    }

    pub fn rejecting(message: M) -> Self {
        Self { deliveries: Mutex::new(Vec::new()), reject: Some(message) }
    }

    pub fn messages(&self) -> Vec<M> {
        self.deliveries.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn times(&self) -> Vec<Instant> {
        self.deliveries.lock().iter().map(|(at, _)| *at).collect()
    }
}

impl<M: Clone + PartialEq> Default for RecordingSink<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Clone + PartialEq + Send + Sync + 'static> Sink<M> for RecordingSink<M> {
    fn deliver(&self, message: M) -> anyhow::Result<()> {
        if self.reject.as_ref() == Some(&message) {
            anyhow::bail!("rejected message");
        }
        self.deliveries.lock().push((Instant::now(), message));
        Ok(())
    }
}

/// Assert that an expression evaluates to `Err` whose Display output
/// contains the given substring.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
