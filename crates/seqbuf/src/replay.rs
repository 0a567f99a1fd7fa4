// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded iterators over a buffer.

use std::sync::Arc;

use crate::buffer::SequentialBuffer;
use crate::cursor::Cursor;
use crate::registry::{ReaderHandle, ReaderSlot};
use crate::segment::Segment;

/// Consuming walk from a reader's position to the writer position observed
/// when the replay was created.
pub struct ForwardReplay<'a, T> {
    buffer: &'a SequentialBuffer<T>,
    slot: Arc<ReaderSlot<T>>,
    end: u64,
    remaining: usize,
}

impl<'a, T: Clone + Send + Sync + 'static> ForwardReplay<'a, T> {
    pub(crate) fn new(
        buffer: &'a SequentialBuffer<T>,
        slot: Arc<ReaderSlot<T>>,
        end: u64,
        max: usize,
    ) -> Self {
        Self { buffer, slot, end, remaining: max }
    }

    /// Writer sequence this replay stops at.
    pub fn end(&self) -> u64 {
        self.end
    }
}

impl<T: Clone + Send + Sync + 'static> Iterator for ForwardReplay<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.remaining == 0 {
            return None;
        }
        let item = self.buffer.take_until(&self.slot, self.end)?;
        self.remaining -= 1;
        Some(item)
    }
}

enum Phase<T> {
    /// Walking back through data pinned by the boundary reader.
    Resident,
    /// Walking the previous lap left in the writer's segment.
    Stale { segment: Arc<Segment<T>>, base: u64, offset: usize, floor: usize },
    Done,
}

/// Newest-to-oldest walk bounded by a transient oldest-available reader.
///
/// Sequence numbers of yielded items strictly decrease by one; a slot that
/// no longer holds the expected sequence ends the walk.
pub struct BackwardReplay<'a, T: Clone + Send + Sync + 'static> {
    buffer: &'a SequentialBuffer<T>,
    position: Cursor<T>,
    start: Cursor<T>,
    boundary: u64,
    stale_base: Option<u64>,
    guard: Option<ReaderHandle>,
    remaining: usize,
    is_live: bool,
    phase: Phase<T>,
}

impl<'a, T: Clone + Send + Sync + 'static> BackwardReplay<'a, T> {
    pub(crate) fn new(
        buffer: &'a SequentialBuffer<T>,
        start: Cursor<T>,
        boundary: u64,
        stale_base: Option<u64>,
        guard: ReaderHandle,
        max: usize,
        is_live: bool,
    ) -> Self {
        Self {
            buffer,
            position: start.clone(),
            start,
            boundary,
            stale_base,
            guard: Some(guard),
            remaining: max,
            is_live,
            phase: Phase::Resident,
        }
    }

    /// Sequence number of the oldest item the resident phase reaches.
    pub fn boundary(&self) -> u64 {
        self.boundary
    }

    fn release_guard(&mut self) {
        if let Some(guard) = self.guard.take() {
            self.buffer.release_quietly(guard);
        }
    }

    /// Leave the resident phase: drop the boundary reader and, for a quiet
    /// buffer, continue into the writer segment's previous lap when it
    /// directly precedes the boundary.
    fn leave_resident(&mut self) {
        self.release_guard();
        let len = self.start.pinned.len() as u64;
        self.phase = match self.stale_base {
            Some(base) if !self.is_live && self.remaining > 0 && base + len == self.boundary => {
                Phase::Stale {
                    segment: Arc::clone(&self.start.pinned),
                    base,
                    offset: self.start.pinned.len(),
                    floor: self.start.offset,
                }
            }
            _ => Phase::Done,
        };
    }

    fn finish(&mut self) {
        self.release_guard();
        self.phase = Phase::Done;
    }
}

impl<T: Clone + Send + Sync + 'static> Iterator for BackwardReplay<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            match &mut self.phase {
                Phase::Resident => {
                    if self.position.sequence <= self.boundary {
                        self.leave_resident();
                        continue;
                    }
                    if self.remaining == 0 {
                        self.finish();
                        return None;
                    }
                    if self.position.at_segment_start() {
                        self.buffer.prev_segment(&mut self.position);
                    } else {
                        self.position.step_back();
                    }
                    match self.position.read() {
                        Some(item) => {
                            self.remaining -= 1;
                            return Some(item);
                        }
                        None => {
                            self.finish();
                            return None;
                        }
                    }
                }
                Phase::Stale { segment, base, offset, floor } => {
                    if self.remaining == 0 || *offset <= *floor {
                        self.phase = Phase::Done;
                        return None;
                    }
                    *offset -= 1;
                    match segment.load_seq(*offset, *base + *offset as u64) {
                        Some(item) => {
                            self.remaining -= 1;
                            return Some(item);
                        }
                        None => {
                            self.phase = Phase::Done;
                            return None;
                        }
                    }
                }
                Phase::Done => return None,
            }
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for BackwardReplay<'_, T> {
    fn drop(&mut self) {
        self.release_guard();
    }
}
