// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;
use std::time::Duration;

use super::*;

#[yare::parameterized(
    no_readers           = { 3, 10, None, false },
    reader_caught_up     = { 3, 4, Some(4), false },
    one_lap_behind       = { 3, 5, Some(4), false },
    next_is_reader       = { 3, 6, Some(4), true },
    grown_chain          = { 5, 6, Some(4), false },
)]
fn overwrite_detection(segments: usize, writer: u64, low: Option<u64>, expected: bool) {
    assert_eq!(would_overwrite(segments, writer, low), expected);
}

#[yare::parameterized(
    no_readers        = { 3, 10, None, 1, false },
    plenty_of_room    = { 3, 0, Some(0), 1, false },
    one_spare         = { 3, 1, Some(0), 1, false },
    at_slack          = { 3, 2, Some(0), 1, true },
    wider_slack       = { 3, 1, Some(0), 2, true },
    grown_past_slack  = { 5, 2, Some(0), 1, false },
)]
fn trigger(segments: usize, writer: u64, low: Option<u64>, slack: usize, expected: bool) {
    assert_eq!(should_grow(segments, writer, low, slack), expected);
}

#[test]
fn increment_doubles_per_event() {
    let growth = Growth::new(2, 1);
    assert_eq!(growth.begin_if_needed(3, 2, Some(0)), Some(2));
    // Only one run at a time.
    assert_eq!(growth.begin_if_needed(3, 2, Some(0)), None);
    growth.finish(true);
    assert_eq!(growth.next_increment(), 4);
    assert_eq!(growth.events(), 1);

    growth.record_inline();
    assert_eq!(growth.next_increment(), 8);
    assert_eq!(growth.events(), 2);
}

#[test]
fn failed_run_keeps_increment() {
    let growth = Growth::new(2, 1);
    assert_eq!(growth.begin_if_needed(3, 2, Some(0)), Some(2));
    growth.finish(false);
    assert!(!growth.in_flight());
    assert_eq!(growth.next_increment(), 2);
    assert_eq!(growth.events(), 0);
}

#[test]
fn wait_idle_blocks_until_finish() -> anyhow::Result<()> {
    let growth = Arc::new(Growth::new(2, 1));
    assert!(growth.begin_if_needed(3, 2, Some(0)).is_some());

    let finisher = Arc::clone(&growth);
    let handle = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        finisher.finish(true);
    });

    growth.wait_idle();
    assert!(!growth.in_flight());
    assert_eq!(growth.events(), 1);
    handle.join().map_err(|_| anyhow::anyhow!("finisher panicked"))?;
    Ok(())
}
