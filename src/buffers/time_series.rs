use std::collections::VecDeque;

use tracing::debug;

use crate::Reading;

// ---

/// Fixed-capacity sliding window of readings, oldest first.
///
/// Timestamps never decrease from front to back; when full, appending evicts
/// the oldest reading.
#[derive(Debug, Clone)]
pub struct TimeSeriesBuffer {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl TimeSeriesBuffer {
    /// Create an empty window holding at most `capacity` readings (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::new(),
            capacity,
        }
    }

    /// Replace the whole window.
    ///
    /// `readings` must already be ascending. If more than `capacity` are
    /// supplied only the newest are kept.
    pub fn seed(&mut self, readings: Vec<Reading>) {
        // ---
        let skip = readings.len().saturating_sub(self.capacity);
        self.readings.clear();
        self.readings.extend(readings.into_iter().skip(skip));
    }

    /// Append a live reading, evicting the oldest when full.
    ///
    /// A reading older than the current tail is rejected and `false` returned.
    pub fn append(&mut self, reading: Reading) -> bool {
        // ---
        if let Some(tail) = self.readings.back() {
            if reading.timestamp < tail.timestamp {
                debug!(
                    "Rejecting reading at {} older than window tail {}",
                    reading.timestamp, tail.timestamp
                );
                return false;
            }
        }
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
        true
    }

    /// Newest reading in the window.
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.readings.iter()
    }

    pub fn to_vec(&self) -> Vec<Reading> {
        self.readings.iter().cloned().collect()
    }
}
