// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;

use super::{BufferConfig, MIN_SEGMENTS};
use crate::error::BufferError;

#[derive(Debug, Parser)]
struct Cli {
    #[command(flatten)]
    buffer: BufferConfig,
}

#[test]
fn defaults_match_clap_defaults() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from(["seqbuf"])?;
    assert_eq!(cli.buffer, BufferConfig::default());
    cli.buffer.validate()?;
    Ok(())
}

#[test]
fn flags_override_defaults() -> anyhow::Result<()> {
    let cli = Cli::try_parse_from([
        "seqbuf",
        "--segment-len",
        "4",
        "--initial-capacity",
        "12",
        "--growth-slack-segments",
        "2",
    ])?;
    assert_eq!(cli.buffer.segment_len, 4);
    assert_eq!(cli.buffer.initial_capacity, 12);
    assert_eq!(cli.buffer.growth_slack_segments, 2);
    assert_eq!(cli.buffer.initial_segments(), 3);
    Ok(())
}

#[yare::parameterized(
    exact        = { 4, 12, 3 },
    rounds_up    = { 4, 13, 4 },
    floor_of_min = { 512, 1, MIN_SEGMENTS },
    large        = { 8, 80, 10 },
)]
fn initial_segments(segment_len: usize, capacity: usize, expected: usize) {
    let config = BufferConfig::default()
        .with_segment_len(segment_len)
        .with_initial_capacity(capacity);
    assert_eq!(config.initial_segments(), expected);
}

#[yare::parameterized(
    zero_segment_len = { BufferConfig::default().with_segment_len(0) },
    zero_capacity    = { BufferConfig::default().with_initial_capacity(0) },
    zero_slack       = { BufferConfig::default().with_growth_slack(0) },
    zero_growth      = { BufferConfig::default().with_initial_growth(0) },
)]
fn invalid_config(config: BufferConfig) {
    assert_eq!(config.validate(), Err(BufferError::InvalidConfig));
}

#[test]
fn deserializes_partial_json() -> anyhow::Result<()> {
    let config: BufferConfig = serde_json::from_str(r#"{"segment_len": 16}"#)?;
    assert_eq!(config.segment_len, 16);
    assert_eq!(config.initial_capacity, BufferConfig::default().initial_capacity);
    Ok(())
}
