// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Soak harness: pushes numbered payloads through a paced queue into a
//! buffer while blocking readers check that every item arrives in order.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info, warn};

use seqbuf::{BufferConfig, PacedQueue, ReaderHandle, ReaderOrigin, SequentialBuffer};

#[derive(Debug, Parser)]
#[command(name = "seqbuf", version, about)]
struct Cli {
    #[command(flatten)]
    buffer: BufferConfig,

    /// Number of payloads to append.
    #[arg(long, env = "SEQBUF_ITEMS", default_value_t = 100_000)]
    items: u64,

    /// Number of concurrent readers.
    #[arg(long, env = "SEQBUF_READERS", default_value_t = 4)]
    readers: usize,

    /// Pause between deliveries, in microseconds.
    #[arg(long, env = "SEQBUF_PACE_US", default_value_t = 0)]
    pace_us: u64,

    /// Per-item delay for the first reader, in microseconds. A slow reader
    /// forces the buffer to grow.
    #[arg(long, env = "SEQBUF_SLOW_READER_US", default_value_t = 0)]
    slow_reader_us: u64,

    /// Log format (json or text).
    #[arg(long, env = "SEQBUF_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "SEQBUF_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Debug, Serialize)]
struct ReaderReport {
    reader: usize,
    received: u64,
    violations: u64,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.buffer.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&cli);

    match run(cli).await {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}

/// Returns `Ok(false)` when any reader saw items out of order.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let buffer = Arc::new(SequentialBuffer::<Bytes>::new(cli.buffer.clone())?);

    let mut readers = Vec::with_capacity(cli.readers);
    for reader in 0..cli.readers {
        let handle = buffer.create_reader(ReaderOrigin::MostRecentlyInserted)?;
        let delay = match reader {
            0 if cli.slow_reader_us > 0 => Some(Duration::from_micros(cli.slow_reader_us)),
            _ => None,
        };
        let buffer = Arc::clone(&buffer);
        let items = cli.items;
        readers.push(tokio::task::spawn_blocking(move || {
            verify_order(&buffer, handle, reader, items, delay)
        }));
    }
    info!(readers = cli.readers, items = cli.items, "soak started");

    let queue = PacedQueue::<Bytes>::spawn(buffer.clone());
    let pace = Duration::from_micros(cli.pace_us);
    for n in 0..cli.items {
        queue.enqueue(Bytes::copy_from_slice(&n.to_be_bytes()), pace).await?;
    }
    let delivered = queue.close().await?;
    if delivered.failed > 0 {
        anyhow::bail!("{} payloads failed to append", delivered.failed);
    }

    let mut reports = Vec::with_capacity(readers.len());
    for reader in readers {
        reports.push(reader.await??);
    }
    let clean = reports.iter().all(|r| r.violations == 0);
    if !clean {
        warn!("ordering violations detected");
    }

    let summary = serde_json::json!({
        "queue": delivered,
        "readers": reports,
        "buffer": buffer.stats(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(clean)
}

fn verify_order(
    buffer: &SequentialBuffer<Bytes>,
    handle: ReaderHandle,
    reader: usize,
    items: u64,
    delay: Option<Duration>,
) -> anyhow::Result<ReaderReport> {
    let mut report = ReaderReport { reader, received: 0, violations: 0 };
    for expected in 0..items {
        let payload = buffer.blocking_next(&handle)?;
        let got = <[u8; 8]>::try_from(payload.as_ref()).map(u64::from_be_bytes).ok();
        if got != Some(expected) {
            warn!(reader, expected, ?got, "out-of-order payload");
            report.violations += 1;
        }
        report.received += 1;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
    buffer.release_reader(handle)?;
    Ok(report)
}
