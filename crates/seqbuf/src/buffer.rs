// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Growable single-writer, multi-reader circular buffer.
//!
//! Lock order, outermost first: a cursor lock (writer or one reader), the
//! chain lock, the registry lock. The growth state and the arrival signal
//! are leaf locks. Low-water is only recomputed under the chain lock, so
//! the writer's overwrite check at a crossing sees a stable value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::chain::Chain;
use crate::config::BufferConfig;
use crate::cursor::Cursor;
use crate::error::BufferError;
use crate::growth::{self, Growth};
use crate::registry::{ReaderHandle, ReaderSlot, Registry};
use crate::replay::{BackwardReplay, ForwardReplay};
use crate::segment;

/// Sentinel stored in `low_water` when no reader is registered.
const NO_READERS: u64 = u64::MAX;

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

/// Where a new reader starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReaderOrigin {
    /// At the writer: the reader sees only items appended after creation.
    MostRecentlyInserted,
    /// At the oldest item the writer cannot overwrite before the reader
    /// reaches it: slot 0 of the first completed segment ahead of the
    /// writer. Previous-lap slots left in the writer's own segment are not
    /// included, since the writer only checks for readers when it crosses
    /// into a new segment.
    OldestStillAvailable,
}

/// Point-in-time counters, mostly for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferStats {
    pub segment_len: usize,
    pub segments: usize,
    pub capacity: usize,
    pub readers: usize,
    pub low_water: Option<u64>,
    pub writer_sequence: u64,
    pub writer_generation: u64,
    pub highest_inserted: u64,
    pub growth_events: u64,
    pub next_growth_segments: usize,
}

pub(crate) struct Shared<T> {
    id: u64,
    segment_len: usize,
    chain: Mutex<Chain<T>>,
    writer: Mutex<Cursor<T>>,
    /// Writer sequence visible to readers; bumped only after a crossing
    /// completes, so a reader never outruns the writer's path.
    published: AtomicU64,
    registry: RwLock<Registry<T>>,
    low_water: AtomicU64,
    growth: Growth,
    signal: Mutex<()>,
    arrived: Condvar,
}

/// Sequential circular buffer: one writer, any number of independent
/// readers, and no unread item is ever overwritten. When the writer laps
/// close to the slowest reader the chain grows instead.
pub struct SequentialBuffer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> std::fmt::Debug for SequentialBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequentialBuffer")
            .field("id", &self.shared.id)
            .field("segment_len", &self.shared.segment_len)
            .field("published", &self.shared.published.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T: Clone + Send + Sync + 'static> SequentialBuffer<T> {
    pub fn new(config: BufferConfig) -> Result<Self, BufferError> {
        config.validate()?;
        let id = NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed);
        let chain = Chain::new(config.segment_len, config.initial_segments())?;
        let first = chain.writer_segment();
        let writer = Cursor::new(first, chain.segment(first), 0, 0, 0);
        debug!(buffer = id, segments = chain.len(), segment_len = config.segment_len, "buffer created");
        Ok(Self {
            shared: Arc::new(Shared {
                id,
                segment_len: config.segment_len,
                chain: Mutex::new(chain),
                writer: Mutex::new(writer),
                published: AtomicU64::new(0),
                registry: RwLock::new(Registry::new(id)),
                low_water: AtomicU64::new(NO_READERS),
                growth: Growth::new(config.initial_growth_segments, config.growth_slack_segments),
                signal: Mutex::new(()),
                arrived: Condvar::new(),
            }),
        })
    }

    /// Instance id embedded in every handle this buffer issues.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn segment_len(&self) -> usize {
        self.shared.segment_len
    }

    /// Sequence number the next appended item will get.
    pub fn writer_sequence(&self) -> u64 {
        self.shared.published.load(Ordering::Acquire)
    }

    /// Lowest generation among live readers.
    pub fn low_water(&self) -> Option<u64> {
        self.shared.low_water()
    }

    // -- writer ------------------------------------------------------------

    /// Store `item` and advance the writer. Returns the item's sequence
    /// number. Never waits on a reader; only on a background growth that
    /// must finish before the writer can enter the next segment.
    pub fn append(&self, item: T) -> Result<u64, BufferError> {
        let shared = &self.shared;
        let mut writer = shared.writer.lock();
        let seq = writer.sequence;
        writer.pinned.store(writer.offset, seq, item);
        if writer.step() {
            if let Err(e) = shared.cross_writer(&mut writer) {
                writer.unstep();
                return Err(e);
            }
        }
        shared.published.store(writer.sequence, Ordering::Release);
        drop(writer);
        shared.notify_arrival();
        Ok(seq)
    }

    // -- reader lifecycle --------------------------------------------------

    pub fn create_reader(&self, origin: ReaderOrigin) -> Result<ReaderHandle, BufferError> {
        let shared = &self.shared;
        let writer = shared.writer.lock();
        let chain = shared.chain.lock();
        let cursor = match origin {
            ReaderOrigin::MostRecentlyInserted => writer.clone(),
            ReaderOrigin::OldestStillAvailable => oldest_cursor(&chain, &writer),
        };
        let handle = shared.register(cursor);
        let scheduled =
            shared.growth.begin_if_needed(chain.len(), writer.generation, shared.low_water());
        drop(chain);
        drop(writer);
        debug!(buffer = shared.id, reader = handle.index(), ?origin, "reader created");
        if let Some(count) = scheduled {
            Shared::spawn_growth(shared, count);
        }
        Ok(handle)
    }

    /// New independent reader at `existing`'s current position.
    pub fn clone_reader(&self, existing: &ReaderHandle) -> Result<ReaderHandle, BufferError> {
        let shared = &self.shared;
        let slot = shared.lookup(existing)?;
        let cursor = slot.cursor.lock();
        let _chain = shared.chain.lock();
        let handle = shared.register(cursor.clone());
        debug!(buffer = shared.id, reader = handle.index(), from = existing.index(), "reader cloned");
        Ok(handle)
    }

    /// Deregister a reader. It stops holding back the writer immediately.
    ///
    /// The caller must not release a reader while a `blocking_next` on the
    /// same handle is outstanding.
    pub fn release_reader(&self, handle: ReaderHandle) -> Result<(), BufferError> {
        let shared = &self.shared;
        let slot = shared.lookup(&handle)?;
        let _cursor = slot.cursor.lock();
        let _chain = shared.chain.lock();
        let mut registry = shared.registry.write();
        registry.remove(&handle)?;
        shared.store_low_water(registry.low_water());
        debug!(buffer = shared.id, reader = handle.index(), "reader released");
        Ok(())
    }

    // -- reads -------------------------------------------------------------

    /// Next item for `reader`, waiting for the writer if it is caught up.
    ///
    /// Waits indefinitely if nothing is ever appended; callers needing a
    /// bound wrap this in their own timeout.
    pub fn blocking_next(&self, reader: &ReaderHandle) -> Result<T, BufferError> {
        let shared = &self.shared;
        let slot = shared.lookup(reader)?;
        loop {
            let position = slot.cursor.lock().sequence;
            shared.wait_past(position);
            let mut cursor = slot.cursor.lock();
            if let Some(item) = shared.take(&slot, &mut cursor)? {
                return Ok(item);
            }
        }
    }

    /// Next item for `reader`, or `None` when it is caught up.
    pub fn try_next(&self, reader: &ReaderHandle) -> Result<Option<T>, BufferError> {
        let shared = &self.shared;
        let slot = shared.lookup(reader)?;
        let mut cursor = slot.cursor.lock();
        shared.take(&slot, &mut cursor)
    }

    /// Like [`try_next`](Self::try_next) without advancing.
    pub fn try_peek(&self, reader: &ReaderHandle) -> Result<Option<T>, BufferError> {
        let shared = &self.shared;
        let slot = shared.lookup(reader)?;
        let cursor = slot.cursor.lock();
        if cursor.sequence >= shared.published.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(cursor.read())
    }

    /// Consume up to `max` items, stopping at the writer position observed
    /// now. Items the iterator yields are consumed even if it is dropped
    /// early.
    pub fn replay_forward(
        &self,
        reader: &ReaderHandle,
        max: usize,
    ) -> Result<ForwardReplay<'_, T>, BufferError> {
        let slot = self.shared.lookup(reader)?;
        let end = self.writer_sequence();
        Ok(ForwardReplay::new(self, slot, end, max))
    }

    /// Walk from the newest item toward the oldest still available, up to
    /// `max` items, newest first.
    ///
    /// A transient reader pins the oldest boundary while the walk runs.
    /// With `is_live == false` the walk may continue past that boundary into
    /// the previous lap still resident in the writer's segment; that data is
    /// only safe when nothing is being appended.
    pub fn replay_backward(
        &self,
        max: usize,
        is_live: bool,
    ) -> Result<BackwardReplay<'_, T>, BufferError> {
        let shared = &self.shared;
        let writer = shared.writer.lock();
        let chain = shared.chain.lock();
        let boundary = oldest_cursor(&chain, &writer);
        let boundary_seq = boundary.sequence;
        let guard = shared.register(boundary);
        let stale_base = chain.stale_base(writer.segment);
        let start = writer.clone();
        let scheduled =
            shared.growth.begin_if_needed(chain.len(), writer.generation, shared.low_water());
        drop(chain);
        drop(writer);
        if let Some(count) = scheduled {
            Shared::spawn_growth(shared, count);
        }
        Ok(BackwardReplay::new(self, start, boundary_seq, stale_base, guard, max, is_live))
    }

    // -- capacity ----------------------------------------------------------

    /// Total slots, after any in-flight growth has landed.
    pub fn size(&self) -> usize {
        self.shared.growth.wait_idle();
        self.shared.chain.lock().capacity()
    }

    /// Grow to at least `target` slots. Never shrinks. Returns the
    /// resulting capacity.
    ///
    /// Allocation happens with no lock held, so appends keep going while a
    /// large resize is in progress.
    pub fn resize(&self, target: usize) -> Result<usize, BufferError> {
        let shared = &self.shared;
        let wanted = target.div_ceil(shared.segment_len);
        shared.growth.wait_idle();
        let shortfall = wanted.saturating_sub(shared.chain.lock().len());
        if shortfall == 0 {
            return Ok(shared.chain.lock().capacity());
        }
        let mut segments = segment::allocate(shared.segment_len, shortfall)?;

        shared.growth.wait_idle();
        let mut chain = shared.chain.lock();
        segments.truncate(wanted.saturating_sub(chain.len()));
        if segments.is_empty() {
            return Ok(chain.capacity());
        }
        let at = chain.writer_segment();
        let generation = chain.writer_generation();
        let added = chain.insert_after(at, segments, generation);
        info!(buffer = shared.id, added, segments = chain.len(), "buffer resized");
        Ok(chain.capacity())
    }

    pub fn stats(&self) -> BufferStats {
        let shared = &self.shared;
        let writer = shared.writer.lock();
        let chain = shared.chain.lock();
        let readers = shared.registry.read().len();
        BufferStats {
            segment_len: shared.segment_len,
            segments: chain.len(),
            capacity: chain.capacity(),
            readers,
            low_water: shared.low_water(),
            writer_sequence: writer.sequence,
            writer_generation: writer.generation,
            highest_inserted: chain.highest_inserted(),
            growth_events: shared.growth.events(),
            next_growth_segments: shared.growth.next_increment(),
        }
    }

    /// Current sequence number of `reader`'s cursor.
    pub fn reader_sequence(&self, reader: &ReaderHandle) -> Result<u64, BufferError> {
        let slot = self.shared.lookup(reader)?;
        let sequence = slot.cursor.lock().sequence;
        Ok(sequence)
    }

    pub(crate) fn take_until(&self, slot: &ReaderSlot<T>, end: u64) -> Option<T> {
        let mut cursor = slot.cursor.lock();
        if cursor.sequence >= end {
            return None;
        }
        self.shared.take(slot, &mut cursor).ok().flatten()
    }

    pub(crate) fn prev_segment(&self, cursor: &mut Cursor<T>) {
        let chain = self.shared.chain.lock();
        let prev = chain.prev(cursor.segment);
        cursor.cross_back(prev, chain.segment(prev));
    }

    pub(crate) fn release_quietly(&self, handle: ReaderHandle) {
        if let Err(e) = self.release_reader(handle) {
            warn!(buffer = self.shared.id, "failed to release transient reader: {e}");
        }
    }
}

/// Cursor at the oldest item not yet overwritten: slot 0 of the first
/// completed segment ahead of the writer, or the start of the writer's own
/// segment when no other segment holds data yet.
fn oldest_cursor<T: Clone>(chain: &Chain<T>, writer: &Cursor<T>) -> Cursor<T> {
    match chain.oldest_written_after(writer.segment) {
        Some((id, lap)) => Cursor::new(id, chain.segment(id), 0, lap.generation, lap.base_seq),
        None => Cursor::new(
            writer.segment,
            Arc::clone(&writer.pinned),
            0,
            writer.generation,
            writer.sequence - writer.offset as u64,
        ),
    }
}

impl<T: Clone + Send + Sync + 'static> Shared<T> {
    fn low_water(&self) -> Option<u64> {
        match self.low_water.load(Ordering::Acquire) {
            NO_READERS => None,
            low => Some(low),
        }
    }

    fn store_low_water(&self, low: Option<u64>) {
        self.low_water.store(low.unwrap_or(NO_READERS), Ordering::Release);
    }

    fn lookup(&self, handle: &ReaderHandle) -> Result<Arc<ReaderSlot<T>>, BufferError> {
        if handle.buffer_id() != self.id {
            return Err(BufferError::ForeignReader);
        }
        self.registry.read().get(handle)
    }

    /// Register a cursor. Callers hold the chain lock.
    fn register(&self, cursor: Cursor<T>) -> ReaderHandle {
        let mut registry = self.registry.write();
        let (handle, _) = registry.insert(cursor);
        self.store_low_water(registry.low_water());
        handle
    }

    /// Move the writer into the next segment, growing first if that segment
    /// still holds the slowest reader's unread data.
    fn cross_writer(self: &Arc<Self>, writer: &mut Cursor<T>) -> Result<(), BufferError> {
        self.growth.wait_idle();
        let mut chain = self.chain.lock();
        let low = self.low_water();
        if growth::would_overwrite(chain.len(), writer.generation, low) {
            let count = self.growth.next_increment();
            let segments = segment::allocate(self.segment_len, count)?;
            chain.insert_after(writer.segment, segments, writer.generation);
            self.growth.record_inline();
            warn!(
                buffer = self.id,
                added = count,
                segments = chain.len(),
                "writer reached slowest reader, grew inline"
            );
        }
        let next = chain.next(writer.segment);
        writer.cross(next, chain.segment(next));
        chain.enter(next, writer.generation, writer.sequence);
        let scheduled = self.growth.begin_if_needed(chain.len(), writer.generation, low);
        drop(chain);
        if let Some(count) = scheduled {
            Self::spawn_growth(self, count);
        }
        Ok(())
    }

    fn spawn_growth(self: &Arc<Self>, count: usize) {
        let worker = Arc::clone(self);
        let spawned = std::thread::Builder::new()
            .name("seqbuf-grow".to_owned())
            .spawn(move || worker.grow(count));
        if let Err(e) = spawned {
            warn!(buffer = self.id, "growth thread unavailable, growing inline: {e}");
            self.grow(count);
        }
    }

    /// Background growth: allocate outside the chain lock, then splice in
    /// after wherever the writer is now.
    fn grow(&self, count: usize) {
        let result = segment::allocate(self.segment_len, count).map(|segments| {
            let mut chain = self.chain.lock();
            let at = chain.writer_segment();
            let generation = chain.writer_generation();
            chain.insert_after(at, segments, generation);
            chain.len()
        });
        match result {
            Ok(segments) => info!(buffer = self.id, added = count, segments, "chain grown"),
            Err(e) => error!(buffer = self.id, added = count, "background growth failed: {e}"),
        }
        self.growth.finish(result.is_ok());
    }

    /// Read the item at `cursor` and advance it, if the writer is ahead.
    /// `Ok(None)` means caught up; a slot holding another sequence number
    /// is an error and leaves the cursor where it is.
    fn take(
        &self,
        slot: &ReaderSlot<T>,
        cursor: &mut Cursor<T>,
    ) -> Result<Option<T>, BufferError> {
        if cursor.sequence >= self.published.load(Ordering::Acquire) {
            return Ok(None);
        }
        let Some(item) = cursor.read() else {
            error!(buffer = self.id, sequence = cursor.sequence, "reader slot overwritten");
            return Err(BufferError::Overwritten);
        };
        if cursor.step() {
            let chain = self.chain.lock();
            let next = chain.next(cursor.segment);
            cursor.cross(next, chain.segment(next));
            slot.publish_generation(cursor.generation);
            let registry = self.registry.read();
            self.store_low_water(registry.low_water());
        }
        Ok(Some(item))
    }

    fn wait_past(&self, sequence: u64) {
        if self.published.load(Ordering::Acquire) > sequence {
            return;
        }
        let mut guard = self.signal.lock();
        while self.published.load(Ordering::Acquire) <= sequence {
            self.arrived.wait(&mut guard);
        }
    }

    fn notify_arrival(&self) {
        let _guard = self.signal.lock();
        self.arrived.notify_all();
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
