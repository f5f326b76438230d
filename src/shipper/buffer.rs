//! FIFO of pending fragments.

use std::collections::VecDeque;

use crate::config::{BufferLimit, OverflowPolicy};

/// A batch removed from the head of the buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch {
    pub entries: usize,
    pub payload: String,
}

/// Result of pushing a fragment into a bounded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Stored,
    /// The oldest buffered fragment was evicted to make room.
    EvictedOldest,
    /// The incoming fragment was discarded.
    Rejected,
}

/// Ordered buffer of serialised fragments awaiting delivery.
#[derive(Debug, Default)]
pub struct PendingBuffer {
    entries: VecDeque<String>,
    limit: Option<BufferLimit>,
}

impl PendingBuffer {
    pub fn new(limit: Option<BufferLimit>) -> Self {
        Self {
            entries: VecDeque::new(),
            limit,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `entry` to the tail, applying the capacity policy if one is set.
    pub fn push(&mut self, entry: String) -> PushOutcome {
        let Some(limit) = self.limit else {
            self.entries.push_back(entry);
            return PushOutcome::Stored;
        };
        if self.entries.len() < limit.max_entries {
            self.entries.push_back(entry);
            return PushOutcome::Stored;
        }
        match limit.policy {
            OverflowPolicy::DropOldest => {
                self.entries.pop_front();
                self.entries.push_back(entry);
                PushOutcome::EvictedOldest
            }
            OverflowPolicy::DropNewest => PushOutcome::Rejected,
        }
    }

    /// Remove up to `max` fragments from the head and concatenate them.
    ///
    /// No separator is inserted; each fragment carries its own delimiter.
    /// Returns `None` when the buffer is empty.
    pub fn take_batch(&mut self, max: usize) -> Option<Batch> {
        if self.entries.is_empty() || max == 0 {
            return None;
        }
        let count = max.min(self.entries.len());
        let drained: Vec<String> = self.entries.drain(..count).collect();
        Some(Batch {
            entries: count,
            payload: drained.concat(),
        })
    }
}
