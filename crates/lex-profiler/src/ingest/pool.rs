//! Reusable row buffers shared by the reader thread and the aggregation loop.
//!
//! A buffer is owned by exactly one side at a time: the parser takes it from
//! the pool, fills it and sends it through the queue; the consumer gives it
//! back after accounting for the row.

use parking_lot::Mutex;

/// Initial capacity of a fresh row buffer.
const ROW_CAPACITY: usize = 10;

/// Default number of idle buffers kept around.
const DEFAULT_MAX_IDLE: usize = 256;

/// Thread-safe free list of `Vec<String>` row buffers.
#[derive(Debug)]
pub struct RowPool {
    idle: Mutex<Vec<Vec<String>>>,
    max_idle: usize,
}

impl Default for RowPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RowPool {
    pub fn new() -> Self {
        Self::with_max_idle(DEFAULT_MAX_IDLE)
    }

    /// Keep at most `max_idle` returned buffers; extra ones are dropped.
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            max_idle,
        }
    }

    /// Take an empty buffer, reusing a returned one when available.
    pub fn get(&self) -> Vec<String> {
        self.idle
            .lock()
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(ROW_CAPACITY))
    }

    /// Return a buffer. It is cleared before it becomes available again.
    pub fn put(&self, mut row: Vec<String>) {
        row.clear();
        let mut idle = self.idle.lock();
        if idle.len() < self.max_idle {
            idle.push(row);
        }
    }

    /// Number of buffers currently waiting for reuse.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

static_assertions::assert_impl_all!(RowPool: Send, Sync);
