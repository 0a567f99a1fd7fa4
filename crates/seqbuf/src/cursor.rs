// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use crate::chain::SegmentId;
use crate::segment::Segment;

/// Position within the chain.
///
/// `sequence` counts every slot ever advanced over; `generation` counts
/// segment crossings. Both are on the writer's timeline, so a reader
/// snapshotted from the writer compares directly against it.
#[derive(Debug)]
pub struct Cursor<T> {
    pub segment: SegmentId,
    /// Pinned handle to `segment` so slot access needs no chain lock.
    pub pinned: Arc<Segment<T>>,
    pub offset: usize,
    pub generation: u64,
    pub sequence: u64,
}

impl<T> Clone for Cursor<T> {
    fn clone(&self) -> Self {
        Self {
            segment: self.segment,
            pinned: Arc::clone(&self.pinned),
            offset: self.offset,
            generation: self.generation,
            sequence: self.sequence,
        }
    }
}

impl<T: Clone> Cursor<T> {
    pub fn new(
        segment: SegmentId,
        pinned: Arc<Segment<T>>,
        offset: usize,
        generation: u64,
        sequence: u64,
    ) -> Self {
        Self { segment, pinned, offset, generation, sequence }
    }

    /// Item at the cursor, if the slot still holds `sequence`.
    pub fn read(&self) -> Option<T> {
        self.pinned.load_seq(self.offset, self.sequence)
    }

    /// Move one slot forward. Returns true when the segment is exhausted
    /// and the caller must [`cross`](Self::cross) into the next one.
    pub fn step(&mut self) -> bool {
        self.offset += 1;
        self.sequence += 1;
        self.offset >= self.pinned.len()
    }

    /// Undo a [`step`](Self::step) that has not crossed yet.
    pub fn unstep(&mut self) {
        self.offset = self.offset.saturating_sub(1);
        self.sequence = self.sequence.saturating_sub(1);
    }

    /// Enter `segment` at slot 0, one generation later.
    pub fn cross(&mut self, segment: SegmentId, pinned: Arc<Segment<T>>) {
        self.segment = segment;
        self.pinned = pinned;
        self.offset = 0;
        self.generation += 1;
    }

    /// True when moving back one slot leaves the current segment.
    pub fn at_segment_start(&self) -> bool {
        self.offset == 0
    }

    /// Move one slot back within the current segment.
    pub fn step_back(&mut self) {
        self.offset -= 1;
        self.sequence -= 1;
    }

    /// Move back into the last slot of `segment`, one generation earlier.
    pub fn cross_back(&mut self, segment: SegmentId, pinned: Arc<Segment<T>>) {
        self.offset = pinned.len().saturating_sub(1);
        self.segment = segment;
        self.pinned = pinned;
        self.generation = self.generation.saturating_sub(1);
        self.sequence -= 1;
    }
}
