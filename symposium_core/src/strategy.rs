//! Fork acquisition strategies.

use crate::table::ForkKind;
use serde::{Deserialize, Serialize};
use symposium_env::{Seat, SimError};

/// Strategy identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Lock order alternates with philosopher parity
    Mutex,

    /// Binary semaphores, always left then right.
    ///
    /// Same fixed-order hazard as a naive mutex: if every philosopher takes
    /// its left fork in lock-step the ring deadlocks. Kept for comparing
    /// primitive overhead, not as a deadlock-avoidance scheme.
    Semaphore,

    /// Non-blocking grab of both forks, release and back off on failure
    TryLock,

    /// A single guarded table hands out fork pairs atomically
    Arbitrator,

    /// Always lock the lower-numbered fork first
    ResourceHierarchy,
}

impl Strategy {
    /// Returns a list of all strategies.
    pub fn all() -> Vec<Strategy> {
        vec![
            Strategy::Mutex,
            Strategy::Semaphore,
            Strategy::TryLock,
            Strategy::Arbitrator,
            Strategy::ResourceHierarchy,
        ]
    }

    /// Returns the strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Mutex => "mutex",
            Strategy::Semaphore => "semaphore",
            Strategy::TryLock => "try_lock",
            Strategy::Arbitrator => "arbitrator",
            Strategy::ResourceHierarchy => "resource_hierarchy",
        }
    }

    /// Returns a description of the strategy.
    pub fn description(&self) -> &'static str {
        match self {
            Strategy::Mutex => "Even seats lock left then right, odd seats right then left",
            Strategy::Semaphore => "Binary semaphores acquired left then right (deadlock-prone)",
            Strategy::TryLock => "try_lock both forks, release and back off randomly on failure",
            Strategy::Arbitrator => "Central waiter grants both forks atomically or refuses",
            Strategy::ResourceHierarchy => "Lower-numbered fork first, ring closer reversed",
        }
    }

    /// Returns the kind of fork set this strategy synchronizes through.
    pub fn fork_kind(&self) -> ForkKind {
        match self {
            Strategy::Mutex | Strategy::TryLock | Strategy::ResourceHierarchy => ForkKind::Exclusive,
            Strategy::Semaphore => ForkKind::Signal,
            Strategy::Arbitrator => ForkKind::Arbitrated,
        }
    }

    /// Returns true if acquisition spins through a retry loop instead of blocking.
    pub fn is_retrying(&self) -> bool {
        matches!(self, Strategy::TryLock | Strategy::Arbitrator)
    }

    /// Returns the order in which `seat` requests its two forks.
    ///
    /// The arbitrator takes both at once; its order is only nominal.
    pub fn acquisition_order(&self, seat: &Seat) -> [usize; 2] {
        match self {
            Strategy::Mutex => parity_order(seat),
            Strategy::ResourceHierarchy => hierarchy_order(seat),
            Strategy::Semaphore | Strategy::TryLock | Strategy::Arbitrator => {
                [seat.left, seat.right]
            }
        }
    }
}

/// Even seats take left then right, odd seats right then left.
pub fn parity_order(seat: &Seat) -> [usize; 2] {
    if seat.id.is_even() {
        [seat.left, seat.right]
    } else {
        [seat.right, seat.left]
    }
}

/// Lower index first.
///
/// The ring closer's pair `{N-1, 0}` is remapped to `(0, id)` before
/// ordering, which gives every seat the same total order over fork indices.
pub fn hierarchy_order(seat: &Seat) -> [usize; 2] {
    let (a, b) = if seat.is_ring_closer() {
        (0, seat.id.index())
    } else {
        (seat.left, seat.right)
    };
    [a.min(b), a.max(b)]
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Strategy {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mutex" | "mutexes" | "1" => Ok(Strategy::Mutex),
            "semaphore" | "semaphores" | "2" => Ok(Strategy::Semaphore),
            "try_lock" | "trylock" | "try-lock" | "3" => Ok(Strategy::TryLock),
            "arbitrator" | "waiter" | "4" => Ok(Strategy::Arbitrator),
            "resource_hierarchy" | "hierarchy" | "resource-hierarchy" | "5" => {
                Ok(Strategy::ResourceHierarchy)
            }
            _ => Err(SimError::UnknownStrategy(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Strategy;
    use proptest::prelude::*;

    #[test]
    fn test_parse_round_trips_names() {
        for strategy in Strategy::all() {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!("TryLock".parse::<Strategy>().unwrap(), Strategy::TryLock);
        assert_eq!("waiter".parse::<Strategy>().unwrap(), Strategy::Arbitrator);
    }

    #[test]
    fn test_unknown_strategy_is_configuration_error() {
        let err = "chopsticks".parse::<Strategy>().unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("chopsticks"));
    }

    #[test]
    fn test_fork_kinds() {
        assert_eq!(Strategy::Mutex.fork_kind(), ForkKind::Exclusive);
        assert_eq!(Strategy::Semaphore.fork_kind(), ForkKind::Signal);
        assert_eq!(Strategy::Arbitrator.fork_kind(), ForkKind::Arbitrated);
        assert!(Strategy::TryLock.is_retrying());
        assert!(!Strategy::ResourceHierarchy.is_retrying());
    }

    #[test]
    fn test_hierarchy_ring_closer() {
        // Five seats: philosopher 4 holds {4, 0} and must take 0 first
        assert_eq!(hierarchy_order(&Seat::new(4, 5)), [0, 4]);
        assert_eq!(hierarchy_order(&Seat::new(3, 5)), [3, 4]);

        // Two seats: both take 0 then 1
        assert_eq!(hierarchy_order(&Seat::new(0, 2)), [0, 1]);
        assert_eq!(hierarchy_order(&Seat::new(1, 2)), [0, 1]);
    }

    #[test]
    fn test_parity_order() {
        assert_eq!(parity_order(&Seat::new(0, 5)), [0, 1]);
        assert_eq!(parity_order(&Seat::new(1, 5)), [2, 1]);
        assert_eq!(parity_order(&Seat::new(4, 5)), [4, 0]);
    }

    proptest! {
        #[test]
        fn prop_hierarchy_lower_first(count in 2usize..64, offset in 0usize..64) {
            let seat = Seat::new(offset % count, count);
            let [first, second] = hierarchy_order(&seat);

            prop_assert!(first < second);
            prop_assert!(seat.touches(first) && seat.touches(second));
            if seat.is_ring_closer() {
                prop_assert_eq!([first, second], [0, count - 1]);
            }
        }

        #[test]
        fn prop_parity_order_flips_by_seat(count in 2usize..64, offset in 0usize..64) {
            let seat = Seat::new(offset % count, count);
            let order = Strategy::Mutex.acquisition_order(&seat);

            if seat.id.is_even() {
                prop_assert_eq!(order, [seat.left, seat.right]);
            } else {
                prop_assert_eq!(order, [seat.right, seat.left]);
            }
        }
    }
}
