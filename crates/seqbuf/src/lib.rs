// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

pub mod buffer;
pub(crate) mod chain;
pub mod config;
pub(crate) mod cursor;
pub mod error;
pub mod ext;
pub(crate) mod growth;
pub mod queue;
pub(crate) mod registry;
pub mod replay;
pub(crate) mod segment;
pub mod test_support;

pub use buffer::{BufferStats, ReaderOrigin, SequentialBuffer};
pub use config::BufferConfig;
pub use error::BufferError;
pub use queue::{PacedQueue, QueueReport, QueueStatus, Sink};
pub use registry::ReaderHandle;
pub use replay::{BackwardReplay, ForwardReplay};
