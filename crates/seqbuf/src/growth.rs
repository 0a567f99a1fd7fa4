// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Growth policy and in-flight bookkeeping.
//!
//! The writer triggers growth when the spare segments ahead of it (before
//! the slowest reader's segment) fall to the configured slack. The actual
//! allocation runs on a background thread; the writer only waits for it at
//! its next segment crossing. Increments double on every growth event.

use parking_lot::{Condvar, Mutex};

#[derive(Debug)]
struct GrowthState {
    in_flight: bool,
    increment: usize,
    events: u64,
}

#[derive(Debug)]
pub struct Growth {
    slack: usize,
    state: Mutex<GrowthState>,
    idle: Condvar,
}

/// True when the writer's next crossing would enter the slowest reader's
/// segment.
pub fn would_overwrite(segments: usize, writer_generation: u64, low_water: Option<u64>) -> bool {
    match low_water {
        Some(low) => writer_generation.saturating_sub(low) + 1 >= segments as u64,
        None => false,
    }
}

/// True when the segments not yet lapped by the writer relative to the
/// slowest reader have dropped to `slack`.
pub fn should_grow(
    segments: usize,
    writer_generation: u64,
    low_water: Option<u64>,
    slack: usize,
) -> bool {
    match low_water {
        Some(low) => {
            let lapped = writer_generation.saturating_sub(low);
            (segments as u64).saturating_sub(lapped) <= slack as u64
        }
        None => false,
    }
}

impl Growth {
    pub fn new(initial_increment: usize, slack: usize) -> Self {
        Self {
            slack,
            state: Mutex::new(GrowthState {
                in_flight: false,
                increment: initial_increment.max(1),
                events: 0,
            }),
            idle: Condvar::new(),
        }
    }

    /// Claim a background growth run if the trigger fires and none is in
    /// flight. Returns the number of segments to add.
    pub fn begin_if_needed(
        &self,
        segments: usize,
        writer_generation: u64,
        low_water: Option<u64>,
    ) -> Option<usize> {
        if !should_grow(segments, writer_generation, low_water, self.slack) {
            return None;
        }
        let mut state = self.state.lock();
        if state.in_flight {
            return None;
        }
        state.in_flight = true;
        Some(state.increment)
    }

    /// Complete a background run started by [`begin_if_needed`](Self::begin_if_needed).
    pub fn finish(&self, grew: bool) {
        let mut state = self.state.lock();
        if grew {
            state.events += 1;
            state.increment = state.increment.saturating_mul(2);
        }
        state.in_flight = false;
        self.idle.notify_all();
    }

    /// Record a growth performed inline (no background run involved).
    pub fn record_inline(&self) {
        let mut state = self.state.lock();
        state.events += 1;
        state.increment = state.increment.saturating_mul(2);
    }

    /// Block until no background growth is running.
    pub fn wait_idle(&self) {
        let mut state = self.state.lock();
        while state.in_flight {
            self.idle.wait(&mut state);
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Segments the next growth event will add.
    pub fn next_increment(&self) -> usize {
        self.state.lock().increment
    }

    pub fn events(&self) -> u64 {
        self.state.lock().events
    }
}

#[cfg(test)]
#[path = "growth_tests.rs"]
mod tests;
