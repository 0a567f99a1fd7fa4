// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::segment::allocate;

#[test]
fn new_chain_is_circular() -> anyhow::Result<()> {
    let chain = Chain::<u8>::new(4, 3)?;
    assert_eq!(chain.len(), 3);
    assert_eq!(chain.capacity(), 12);
    assert_eq!(chain.ring_order(0), vec![0, 1, 2]);
    assert_eq!(chain.prev(0), 2);
    assert_eq!(chain.writer_segment(), 0);
    assert_eq!(chain.lap(0), Some(Lap { generation: 0, base_seq: 0 }));
    Ok(())
}

#[test]
fn insert_after_preserves_order() -> anyhow::Result<()> {
    let mut chain = Chain::<u8>::new(4, 3)?;
    let added = chain.insert_after(1, allocate(4, 2)?, 0);
    assert_eq!(added, 2);
    assert_eq!(chain.ring_order(0), vec![0, 1, 3, 4, 2]);
    for id in chain.ring_order(0) {
        assert_eq!(chain.prev(chain.next(id)), id);
    }
    assert_eq!(chain.capacity(), 20);
    Ok(())
}

#[test]
fn enter_rotates_lap_into_stale_base() -> anyhow::Result<()> {
    let mut chain = Chain::<u8>::new(4, 3)?;
    chain.enter(1, 1, 4);
    chain.enter(2, 2, 8);
    chain.enter(0, 3, 12);
    assert_eq!(chain.stale_base(0), Some(0));
    assert_eq!(chain.lap(0), Some(Lap { generation: 3, base_seq: 12 }));
    assert_eq!(chain.stale_base(1), None);
    assert_eq!(chain.writer_generation(), 3);
    Ok(())
}

#[test]
fn oldest_written_skips_fresh_segments() -> anyhow::Result<()> {
    let mut chain = Chain::<u8>::new(4, 3)?;
    chain.enter(1, 1, 4);
    // Before the first lap completes the oldest data is segment 0.
    assert_eq!(chain.oldest_written_after(1), Some((0, Lap { generation: 0, base_seq: 0 })));

    chain.enter(2, 2, 8);
    chain.insert_after(2, allocate(4, 2)?, 2);
    assert_eq!(chain.oldest_written_after(2), Some((0, Lap { generation: 0, base_seq: 0 })));
    Ok(())
}

#[test]
fn oldest_written_none_when_only_writer_segment_written() -> anyhow::Result<()> {
    let chain = Chain::<u8>::new(4, 3)?;
    assert_eq!(chain.oldest_written_after(0), None);
    Ok(())
}

#[yare::parameterized(
    first_insert        = { 0, 2, 2 },
    behind_writer       = { 5, 4, 9 },
)]
fn highest_inserted_marker(writer_generation: u64, count: usize, expected: u64) {
    let marker = || -> anyhow::Result<u64> {
        let mut chain = Chain::<u8>::new(2, 3)?;
        chain.insert_after(0, allocate(2, count)?, writer_generation);
        Ok(chain.highest_inserted())
    };
    assert_eq!(marker().ok(), Some(expected));
}

#[test]
fn highest_inserted_accumulates_when_ahead_of_writer() -> anyhow::Result<()> {
    let mut chain = Chain::<u8>::new(2, 3)?;
    chain.insert_after(0, allocate(2, 2)?, 3);
    chain.insert_after(0, allocate(2, 4)?, 3);
    assert_eq!(chain.highest_inserted(), 9);
    Ok(())
}
