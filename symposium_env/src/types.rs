//! Common types for the dining table.

use serde::{Deserialize, Serialize};

/// Identifier of a philosopher, an index in `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PhilosopherId(pub usize);

impl PhilosopherId {
    /// Returns the raw index.
    pub fn index(&self) -> usize {
        self.0
    }

    /// Returns true for even-numbered philosophers.
    pub fn is_even(&self) -> bool {
        self.0 % 2 == 0
    }
}

impl std::fmt::Display for PhilosopherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "P{}", self.0)
    }
}

/// A philosopher's place at a table of `count` seats.
///
/// Fork `i` lies between philosopher `i - 1` and philosopher `i`, so the
/// left fork of philosopher `id` is `id` and the right one is `(id + 1) % count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    /// Who sits here
    pub id: PhilosopherId,

    /// Left fork index
    pub left: usize,

    /// Right fork index
    pub right: usize,

    /// Number of seats (and forks) at the table
    pub count: usize,
}

impl Seat {
    /// Creates the seat for philosopher `id` at a table of `count`.
    ///
    /// `id` must be below `count`; the coordinator only builds valid seats.
    pub fn new(id: usize, count: usize) -> Self {
        debug_assert!(id < count, "seat {} out of range for {} seats", id, count);
        Self {
            id: PhilosopherId(id),
            left: id,
            right: (id + 1) % count,
            count,
        }
    }

    /// Returns true for the philosopher whose right fork wraps to index 0.
    pub fn is_ring_closer(&self) -> bool {
        self.right == 0
    }

    /// Returns both fork indices as `[left, right]`.
    pub fn forks(&self) -> [usize; 2] {
        [self.left, self.right]
    }

    /// Returns true if this seat uses `fork`.
    pub fn touches(&self, fork: usize) -> bool {
        self.left == fork || self.right == fork
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_neighbors() {
        let seat = Seat::new(2, 5);
        assert_eq!(seat.left, 2);
        assert_eq!(seat.right, 3);
        assert!(!seat.is_ring_closer());
        assert!(seat.touches(3));
        assert!(!seat.touches(4));
    }

    #[test]
    fn test_ring_closer_wraps() {
        let seat = Seat::new(4, 5);
        assert_eq!(seat.forks(), [4, 0]);
        assert!(seat.is_ring_closer());

        // Two seats: philosopher 1 holds forks {1, 0}
        let seat = Seat::new(1, 2);
        assert_eq!(seat.forks(), [1, 0]);
        assert!(seat.is_ring_closer());
    }

    #[test]
    fn test_philosopher_id_display() {
        assert_eq!(PhilosopherId(3).to_string(), "P3");
        assert!(PhilosopherId(4).is_even());
        assert!(!PhilosopherId(5).is_even());
    }
}
