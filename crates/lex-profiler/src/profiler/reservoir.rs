//! Fixed-size uniform sampling over a stream of unknown length.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Uniform sample of at most `capacity` items (algorithm R).
///
/// While fewer than `capacity` items were offered the sample holds all of
/// them in arrival order.
#[derive(Debug, Clone)]
pub struct Reservoir<T> {
    items: Vec<T>,
    capacity: usize,
    seen: u64,
    rng: StdRng,
}

impl<T> Reservoir<T> {
    /// Reservoir seeded from OS entropy.
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Reservoir with a reproducible random stream.
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    /// Seeded when `seed` is `Some`, entropy otherwise.
    pub fn with_optional_seed(capacity: usize, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(capacity, seed),
            None => Self::new(capacity),
        }
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(1024)),
            capacity,
            seen: 0,
            rng,
        }
    }

    /// Offer one item.
    ///
    /// Returns the item that was not kept: the offered one, or the one it
    /// replaced. Callers use this to recycle buffers.
    pub fn offer(&mut self, item: T) -> Option<T> {
        self.seen += 1;
        if self.items.len() < self.capacity {
            self.items.push(item);
            return None;
        }
        let slot = self.rng.gen_range(0..self.seen);
        match usize::try_from(slot) {
            Ok(slot) if slot < self.capacity => Some(std::mem::replace(&mut self.items[slot], item)),
            _ => Some(item),
        }
    }

    /// Number of items offered so far.
    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}
