// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::buffer::SequentialBuffer;
use crate::error::BufferError;

impl<T: Clone + Send + Sync + 'static> SequentialBuffer<T> {
    /// Every still-available item, newest first.
    ///
    /// Treats the buffer as quiet, so it also returns the previous lap left
    /// in the writer's segment when that lap is intact.
    pub fn snapshot(&self) -> Result<Vec<T>, BufferError> {
        Ok(self.replay_backward(usize::MAX, false)?.collect())
    }

    /// Append every item in order. Returns the last sequence number
    /// assigned, or `None` for an empty input.
    pub fn fill<I>(&self, items: I) -> Result<Option<u64>, BufferError>
    where
        I: IntoIterator<Item = T>,
    {
        let mut last = None;
        for item in items {
            last = Some(self.append(item)?);
        }
        Ok(last)
    }
}
