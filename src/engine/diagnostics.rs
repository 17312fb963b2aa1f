//! Bounded log of compile and render failures

use std::collections::VecDeque;

use serde_json::Value;

/// Everything needed to reproduce one failure
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    /// Template source
    pub template: String,
    /// Generated representation, when compilation got that far
    pub generated: Option<String>,
    /// Deep copy of the render data; null for compile-only calls
    pub data: Value,
    pub message: String,
}

/// Keeps the most recent `capacity` records, oldest dropped first
#[derive(Debug)]
pub(crate) struct ErrorLog {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl ErrorLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: ErrorRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Oldest first
    pub fn records(&self) -> Vec<ErrorRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<ErrorRecord> {
        self.records.back().cloned()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}
