// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Errors surfaced by buffer operations.
///
/// An empty read is not an error; non-blocking reads return `None` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// The reader handle was issued by a different buffer instance.
    ForeignReader,
    /// The reader handle was already released (or its slot was reused).
    UnknownReader,
    /// Segment storage could not be allocated.
    AllocFailed,
    /// The buffer configuration is unusable (zero sizes).
    InvalidConfig,
    /// The reader's next slot holds a different sequence number.
    Overwritten,
}

impl BufferError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignReader => "FOREIGN_READER",
            Self::UnknownReader => "UNKNOWN_READER",
            Self::AllocFailed => "ALLOC_FAILED",
            Self::InvalidConfig => "INVALID_CONFIG",
            Self::Overwritten => "OVERWRITTEN",
        }
    }

    /// Human-readable description used by `Display`.
    pub fn message(&self) -> &'static str {
        match self {
            Self::ForeignReader => "reader handle belongs to another buffer",
            Self::UnknownReader => "reader handle is not registered",
            Self::AllocFailed => "segment allocation failed",
            Self::InvalidConfig => "segment length, capacity and growth settings must be non-zero",
            Self::Overwritten => "reader's next item was overwritten",
        }
    }
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.as_str(), self.message())
    }
}

impl std::error::Error for BufferError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
