// SPDX-License-Identifier: GPL-3.0-only

//! Session gallery
//!
//! Bounded and most recent first. Records are ordered by capture time and
//! the oldest record is dropped once the gallery is over capacity.

use crate::app::state::PhotoRecord;
use std::collections::VecDeque;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Gallery {
    capacity: usize,
    records: VecDeque<PhotoRecord>,
}

impl Gallery {
    /// An empty gallery holding at most `capacity` records (at least one)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Add a record, returning the one evicted to make room
    ///
    /// A record with the capture time of an existing one replaces it.
    pub fn push(&mut self, record: PhotoRecord) -> Option<PhotoRecord> {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.captured_at == record.captured_at)
        {
            *existing = record;
            return None;
        }

        let position = self
            .records
            .iter()
            .position(|r| r.captured_at < record.captured_at)
            .unwrap_or(self.records.len());
        self.records.insert(position, record);

        if self.records.len() > self.capacity {
            let evicted = self.records.pop_back();
            if let Some(evicted) = &evicted {
                debug!(captured_at = evicted.captured_at, "Evicted oldest gallery photo");
            }
            evicted
        } else {
            None
        }
    }

    /// Most recent record
    pub fn latest(&self) -> Option<&PhotoRecord> {
        self.records.front()
    }

    pub fn get(&self, captured_at: i64) -> Option<&PhotoRecord> {
        self.records.iter().find(|r| r.captured_at == captured_at)
    }

    /// Record at `index`, 0 being the most recent
    pub fn nth(&self, index: usize) -> Option<&PhotoRecord> {
        self.records.get(index)
    }

    pub fn position(&self, captured_at: i64) -> Option<usize> {
        self.records.iter().position(|r| r.captured_at == captured_at)
    }

    /// Attach the share URL to the record captured at `captured_at`
    ///
    /// Returns `false` if the record is gone or already has a URL.
    pub fn attach_url(&mut self, captured_at: i64, url: &str) -> bool {
        match self
            .records
            .iter_mut()
            .find(|r| r.captured_at == captured_at)
        {
            Some(record) if record.remote_url.is_none() => {
                record.remote_url = Some(url.to_string());
                true
            }
            _ => false,
        }
    }

    /// Records, most recent first
    pub fn iter(&self) -> impl Iterator<Item = &PhotoRecord> {
        self.records.iter()
    }
}
