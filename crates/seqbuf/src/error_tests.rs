// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    foreign_reader = { BufferError::ForeignReader, "FOREIGN_READER" },
    unknown_reader = { BufferError::UnknownReader, "UNKNOWN_READER" },
    alloc_failed = { BufferError::AllocFailed, "ALLOC_FAILED" },
    invalid_config = { BufferError::InvalidConfig, "INVALID_CONFIG" },
    overwritten = { BufferError::Overwritten, "OVERWRITTEN" },
)]
fn display_starts_with_code(error: BufferError, code: &str) {
    assert_eq!(error.as_str(), code);
    assert!(error.to_string().starts_with(code));
}

#[test]
fn converts_into_anyhow() {
    let err: anyhow::Error = BufferError::ForeignReader.into();
    assert!(err.to_string().contains("another buffer"));
}
