// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circular, append-only arena of segments.
//!
//! Segments live in a `Vec` and are addressed by [`SegmentId`]; circular
//! order is kept in separate `next`/`prev` link tables, so inserting a
//! segment never moves an existing one and never invalidates a cursor.
//! The chain also remembers, per segment, which writer lap last filled it.

use std::sync::Arc;

use crate::error::BufferError;
use crate::segment::{self, Segment};

/// Index of a segment in the chain's arena.
pub type SegmentId = usize;

/// The writer lap that most recently entered a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lap {
    /// Writer generation at entry.
    pub generation: u64,
    /// Sequence number stored in slot 0 during this lap.
    pub base_seq: u64,
}

#[derive(Debug)]
struct Link<T> {
    segment: Arc<Segment<T>>,
    next: SegmentId,
    prev: SegmentId,
    lap: Option<Lap>,
    /// Base sequence of the lap before `lap`, if any.
    stale_base: Option<u64>,
}

#[derive(Debug)]
pub struct Chain<T> {
    links: Vec<Link<T>>,
    segment_len: usize,
    writer: SegmentId,
    highest_inserted: u64,
}

impl<T: Clone> Chain<T> {
    /// Build a ring of `count` empty segments with the writer entering the
    /// first one at generation 0.
    pub fn new(segment_len: usize, count: usize) -> Result<Self, BufferError> {
        let count = count.max(1);
        let segments = segment::allocate(segment_len, count)?;
        let links = segments
            .into_iter()
            .enumerate()
            .map(|(id, segment)| Link {
                segment: Arc::new(segment),
                next: (id + 1) % count,
                prev: (id + count - 1) % count,
                lap: None,
                stale_base: None,
            })
            .collect();
        let mut chain = Self { links, segment_len, writer: 0, highest_inserted: 0 };
        chain.enter(0, 0, 0);
        Ok(chain)
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Total slots across all segments.
    pub fn capacity(&self) -> usize {
        self.links.len() * self.segment_len
    }

    pub fn segment(&self, id: SegmentId) -> Arc<Segment<T>> {
        Arc::clone(&self.links[id].segment)
    }

    pub fn next(&self, id: SegmentId) -> SegmentId {
        self.links[id].next
    }

    pub fn prev(&self, id: SegmentId) -> SegmentId {
        self.links[id].prev
    }

    #[cfg(test)]
    pub fn lap(&self, id: SegmentId) -> Option<Lap> {
        self.links[id].lap
    }

    pub fn stale_base(&self, id: SegmentId) -> Option<u64> {
        self.links[id].stale_base
    }

    /// Segment the writer currently fills.
    pub fn writer_segment(&self) -> SegmentId {
        self.writer
    }

    /// Generation of the writer's current lap.
    pub fn writer_generation(&self) -> u64 {
        self.links[self.writer].lap.map(|lap| lap.generation).unwrap_or(0)
    }

    /// Generation the most recently inserted segment will be filled at.
    pub fn highest_inserted(&self) -> u64 {
        self.highest_inserted
    }

    /// Record that the writer entered `id` at `generation`, with `base_seq`
    /// going into slot 0.
    pub fn enter(&mut self, id: SegmentId, generation: u64, base_seq: u64) {
        let link = &mut self.links[id];
        link.stale_base = link.lap.map(|lap| lap.base_seq);
        link.lap = Some(Lap { generation, base_seq });
        self.writer = id;
    }

    /// Splice `segments` into the ring directly after `at`, preserving their
    /// order. `writer_generation` is the writer's generation at the time of
    /// insertion. Returns the number of segments added.
    pub fn insert_after(
        &mut self,
        at: SegmentId,
        segments: Vec<Segment<T>>,
        writer_generation: u64,
    ) -> usize {
        let added = segments.len();
        let mut cursor = at;
        for segment in segments {
            let id = self.links.len();
            let next = self.links[cursor].next;
            self.links.push(Link {
                segment: Arc::new(segment),
                next,
                prev: cursor,
                lap: None,
                stale_base: None,
            });
            self.links[cursor].next = id;
            self.links[next].prev = id;
            cursor = id;
        }
        // Fresh segments queued ahead of the writer push earlier ones back.
        self.highest_inserted = if self.highest_inserted > writer_generation {
            self.highest_inserted + added as u64
        } else {
            writer_generation + added as u64
        };
        added
    }

    /// Find the first segment ahead of `from` that holds a completed lap;
    /// that segment's slot 0 is the oldest item not yet overwritten.
    pub fn oldest_written_after(&self, from: SegmentId) -> Option<(SegmentId, Lap)> {
        let mut id = self.next(from);
        while id != from {
            if let Some(lap) = self.links[id].lap {
                return Some((id, lap));
            }
            id = self.next(id);
        }
        None
    }

    /// Segment ids in ring order starting at `from`.
    #[cfg(test)]
    pub fn ring_order(&self, from: SegmentId) -> Vec<SegmentId> {
        let mut order = Vec::with_capacity(self.links.len());
        let mut id = from;
        loop {
            order.push(id);
            id = self.next(id);
            if id == from {
                return order;
            }
        }
    }
}

#[cfg(test)]
#[path = "chain_tests.rs"]
mod tests;
