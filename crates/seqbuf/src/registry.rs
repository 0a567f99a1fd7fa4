// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::cursor::Cursor;
use crate::error::BufferError;

/// Opaque reader handle issued by one buffer instance.
///
/// Carries the issuing buffer's id and a reuse tag, so handles from another
/// buffer or handles that were already released are rejected instead of
/// aliasing someone else's cursor. Deliberately not `Clone`: use
/// [`clone_reader`](crate::buffer::SequentialBuffer::clone_reader) for a
/// second, independent cursor.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ReaderHandle {
    buffer: u64,
    index: u32,
    tag: u32,
}

impl ReaderHandle {
    /// Id of the buffer that issued this handle.
    pub fn buffer_id(&self) -> u64 {
        self.buffer
    }

    /// Registry slot index (stable for the handle's lifetime).
    pub fn index(&self) -> u32 {
        self.index
    }
}

/// A live reader: its cursor plus the generation published for low-water.
#[derive(Debug)]
pub struct ReaderSlot<T> {
    pub cursor: Mutex<Cursor<T>>,
    generation: AtomicU64,
}

impl<T> ReaderSlot<T> {
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn publish_generation(&self, generation: u64) {
        self.generation.store(generation, Ordering::Release);
    }
}

#[derive(Debug)]
struct Entry<T> {
    tag: u32,
    slot: Option<Arc<ReaderSlot<T>>>,
}

/// Slab of live readers keyed by [`ReaderHandle`].
#[derive(Debug)]
pub struct Registry<T> {
    buffer: u64,
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Registry<T> {
    pub fn new(buffer: u64) -> Self {
        Self { buffer, entries: Vec::new(), free: Vec::new(), live: 0 }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn insert(&mut self, cursor: Cursor<T>) -> (ReaderHandle, Arc<ReaderSlot<T>>) {
        let slot = Arc::new(ReaderSlot {
            generation: AtomicU64::new(cursor.generation),
            cursor: Mutex::new(cursor),
        });
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.entries.push(Entry { tag: 0, slot: None });
                (self.entries.len() - 1) as u32
            }
        };
        let entry = &mut self.entries[index as usize];
        entry.slot = Some(Arc::clone(&slot));
        self.live += 1;
        (ReaderHandle { buffer: self.buffer, index, tag: entry.tag }, slot)
    }

    pub fn get(&self, handle: &ReaderHandle) -> Result<Arc<ReaderSlot<T>>, BufferError> {
        if handle.buffer != self.buffer {
            return Err(BufferError::ForeignReader);
        }
        match self.entries.get(handle.index as usize) {
            Some(Entry { tag, slot: Some(slot) }) if *tag == handle.tag => Ok(Arc::clone(slot)),
            _ => Err(BufferError::UnknownReader),
        }
    }

    pub fn remove(&mut self, handle: &ReaderHandle) -> Result<Arc<ReaderSlot<T>>, BufferError> {
        let slot = self.get(handle)?;
        let entry = &mut self.entries[handle.index as usize];
        entry.slot = None;
        entry.tag = entry.tag.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        Ok(slot)
    }

    /// Lowest generation among live readers, or `None` without readers.
    pub fn low_water(&self) -> Option<u64> {
        self.entries
            .iter()
            .filter_map(|entry| entry.slot.as_ref())
            .map(|slot| slot.generation())
            .min()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
