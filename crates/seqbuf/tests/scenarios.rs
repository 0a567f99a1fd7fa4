// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end buffer scenarios on a small three-segment chain.

use seqbuf::test_support::small_buffer;
use seqbuf::{ReaderHandle, ReaderOrigin, SequentialBuffer};

fn read_all(buffer: &SequentialBuffer<u64>, reader: &ReaderHandle) -> anyhow::Result<Vec<u64>> {
    Ok(buffer.replay_forward(reader, usize::MAX)?.collect())
}

// ---------------------------------------------------------------------------
// Lagging reader keeps everything
// ---------------------------------------------------------------------------

#[test]
fn reader_created_before_writes_sees_every_item() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    let a = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
    buffer.fill(0..20)?;

    assert_eq!(read_all(&buffer, &a)?, (0..20).collect::<Vec<_>>());
    assert!(buffer.size() >= 20);
    Ok(())
}

#[test]
fn oldest_reader_joins_behind_lagging_reader() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    let a = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
    buffer.fill(0..20)?;

    // A pins the start of the stream, so B starts at item 0 as well.
    let b = buffer.create_reader(ReaderOrigin::OldestStillAvailable)?;
    assert_eq!(buffer.reader_sequence(&b)?, 0);

    for expected in 0..5 {
        assert_eq!(buffer.try_next(&a)?, Some(expected));
    }
    buffer.release_reader(a)?;

    assert_eq!(read_all(&buffer, &b)?, (0..20).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn backward_replay_yields_descending_suffix() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    let _a = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
    buffer.fill(0..20)?;

    let newest_first: Vec<_> = buffer.replay_backward(usize::MAX, true)?.collect();
    assert_eq!(newest_first, (0..20).rev().collect::<Vec<_>>());
    assert_eq!(buffer.stats().readers, 1);
    Ok(())
}

// ---------------------------------------------------------------------------
// Without readers the writer overwrites freely
// ---------------------------------------------------------------------------

#[test]
fn unread_history_is_bounded_without_readers() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    buffer.fill(0..100)?;
    assert_eq!(buffer.size(), 12);

    let b = buffer.create_reader(ReaderOrigin::OldestStillAvailable)?;
    let items = read_all(&buffer, &b)?;
    assert_eq!(items, (92..100).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn snapshot_includes_resident_previous_lap() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    buffer.fill(0..102)?;
    // Writer sits 2 slots into its segment; the rest of that segment still
    // holds 90 and 91 from the previous lap.
    assert_eq!(buffer.snapshot()?, (90..102).rev().collect::<Vec<_>>());
    Ok(())
}

#[test]
fn fill_reports_last_sequence() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    assert_eq!(buffer.fill(Vec::new())?, None);
    assert_eq!(buffer.fill(0..7)?, Some(6));
    assert_eq!(buffer.fill([7])?, Some(7));
    Ok(())
}

#[test]
fn released_reader_no_longer_counts_for_low_water() -> anyhow::Result<()> {
    let buffer = small_buffer::<u64>(4, 3)?;
    let a = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
    buffer.fill(0..20)?;
    let consumed: Vec<_> = buffer.replay_forward(&a, 5)?.collect();
    assert_eq!(consumed, (0..5).collect::<Vec<_>>());
    assert_eq!(buffer.low_water(), Some(1));

    let c = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
    assert_eq!(buffer.low_water(), Some(1));
    buffer.release_reader(a)?;
    assert_eq!(buffer.low_water(), Some(5));

    // With only a keeping-up reader left, a long run adds no segments.
    let size = buffer.size();
    let growth_events = buffer.stats().growth_events;
    for chunk in 0..100u64 {
        let start = 20 + chunk * 4;
        buffer.fill(start..start + 4)?;
        assert_eq!(read_all(&buffer, &c)?, (start..start + 4).collect::<Vec<_>>());
    }
    assert_eq!(buffer.size(), size);
    assert_eq!(buffer.stats().growth_events, growth_events);
    Ok(())
}
