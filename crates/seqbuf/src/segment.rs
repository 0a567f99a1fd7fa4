// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use parking_lot::RwLock;

use crate::error::BufferError;

/// A stored item tagged with the sequence number it was appended under.
#[derive(Debug, Clone)]
pub struct Slot<T> {
    pub seq: u64,
    pub item: T,
}

/// Fixed-capacity block of slots; the unit of chain growth.
///
/// Each slot carries its own lock so the writer filling one slot never
/// contends with readers cloning another.
#[derive(Debug)]
pub struct Segment<T> {
    slots: Box<[RwLock<Option<Slot<T>>>]>,
}

impl<T: Clone> Segment<T> {
    /// Allocate an empty segment with `len` slots.
    pub fn new(len: usize) -> Result<Self, BufferError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(len).map_err(|_| BufferError::AllocFailed)?;
        slots.extend((0..len).map(|_| RwLock::new(None)));
        Ok(Self { slots: slots.into_boxed_slice() })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Overwrite the slot at `offset`.
    pub fn store(&self, offset: usize, seq: u64, item: T) {
        if let Some(slot) = self.slots.get(offset) {
            *slot.write() = Some(Slot { seq, item });
        }
    }

    /// Clone the slot at `offset`, whatever lap it belongs to.
    #[cfg(test)]
    pub fn load(&self, offset: usize) -> Option<Slot<T>> {
        self.slots.get(offset).and_then(|slot| slot.read().clone())
    }

    /// Clone the item at `offset` only if it was stored under `seq`.
    pub fn load_seq(&self, offset: usize, seq: u64) -> Option<T> {
        let slot = self.slots.get(offset)?.read();
        match slot.as_ref() {
            Some(s) if s.seq == seq => Some(s.item.clone()),
            _ => None,
        }
    }
}

/// Allocate `count` fresh segments of `len` slots each.
pub fn allocate<T: Clone>(len: usize, count: usize) -> Result<Vec<Segment<T>>, BufferError> {
    let mut segments = Vec::new();
    segments.try_reserve_exact(count).map_err(|_| BufferError::AllocFailed)?;
    for _ in 0..count {
        segments.push(Segment::new(len)?);
    }
    Ok(segments)
}

#[cfg(test)]
#[path = "segment_tests.rs"]
mod tests;
