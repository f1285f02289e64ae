//! DiningTable - the ring of forks shared by every philosopher.
//!
//! The table owns one of three fork sets, picked by the run's strategy:
//! - **Exclusive**: one `Mutex<()>` per fork (`lock`, `try_lock`)
//! - **Signal**: one binary semaphore per fork (`lock` = acquire, `try_lock` = try-acquire)
//! - **Arbitrated**: a single guarded `available[0..N)` table (`arbitrate`)
//!
//! Independently of the fork set, the table keeps an ownership ledger with
//! one atomic slot per fork. Every acquisition claims the slot and every
//! release clears it, so a double-hold is reported as
//! [`SimError::ExclusionViolated`] instead of going unnoticed.
//!
//! Held forks are RAII values: dropping a [`HeldFork`] or an
//! [`ArbiterGrant`] gives the fork back, including during unwinding, so a
//! failing philosopher never strands its neighbors.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError, TryLockError};
use symposium_env::{PhilosopherId, SimError};
use tracing::warn;

/// Ledger value of a fork nobody holds. Holders are stored as `id + 1`.
const FREE: usize = 0;

/// Which primitive backs the forks of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForkKind {
    /// Per-fork exclusive locks
    Exclusive,

    /// Per-fork binary semaphores (initially available, max count 1)
    Signal,

    /// Centralized availability table behind one guard
    Arbitrated,
}

impl ForkKind {
    /// Returns a human-readable name for error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ForkKind::Exclusive => "exclusive locks",
            ForkKind::Signal => "binary semaphores",
            ForkKind::Arbitrated => "the arbitrator table",
        }
    }
}

/// A binary semaphore guarding one fork.
#[derive(Debug)]
pub struct SignalFork {
    index: usize,
    available: Mutex<bool>,
    signal: Condvar,
}

impl SignalFork {
    /// Creates an available semaphore for fork `index`.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            available: Mutex::new(true),
            signal: Condvar::new(),
        }
    }

    /// Blocks until the signal is available, then consumes it.
    pub fn acquire(&self) -> Result<(), SimError> {
        let mut available = self
            .available
            .lock()
            .map_err(|_| SimError::poisoned(self.index))?;
        while !*available {
            available = self
                .signal
                .wait(available)
                .map_err(|_| SimError::poisoned(self.index))?;
        }
        *available = false;
        Ok(())
    }

    /// Consumes the signal if it is available, without waiting.
    pub fn try_acquire(&self) -> Result<bool, SimError> {
        let mut available = self
            .available
            .lock()
            .map_err(|_| SimError::poisoned(self.index))?;
        Ok(std::mem::replace(&mut *available, false))
    }

    /// Sets the signal and wakes one waiter.
    pub fn release(&self) {
        let mut available = self.available.lock().unwrap_or_else(PoisonError::into_inner);
        *available = true;
        drop(available);
        self.signal.notify_one();
    }
}

#[derive(Debug)]
enum ForkSet {
    Exclusive(Vec<Mutex<()>>),
    Signal(Vec<SignalFork>),
    Arbitrated(Mutex<Vec<bool>>),
}

/// The Resource Set of one simulation run.
///
/// Built fresh per run and shared by `Arc` between the philosopher threads;
/// nothing survives from one run to the next.
#[derive(Debug)]
pub struct DiningTable {
    forks: ForkSet,
    holders: Vec<AtomicUsize>,
}

impl DiningTable {
    /// Creates a table of `count` free forks backed by `kind`.
    pub fn new(count: usize, kind: ForkKind) -> Self {
        let forks = match kind {
            ForkKind::Exclusive => ForkSet::Exclusive((0..count).map(|_| Mutex::new(())).collect()),
            ForkKind::Signal => ForkSet::Signal((0..count).map(SignalFork::new).collect()),
            ForkKind::Arbitrated => ForkSet::Arbitrated(Mutex::new(vec![true; count])),
        };

        Self {
            forks,
            holders: (0..count).map(|_| AtomicUsize::new(FREE)).collect(),
        }
    }

    /// Returns the number of forks.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    /// Returns true for a table without forks.
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    /// Returns the primitive backing the forks.
    pub fn kind(&self) -> ForkKind {
        match self.forks {
            ForkSet::Exclusive(_) => ForkKind::Exclusive,
            ForkSet::Signal(_) => ForkKind::Signal,
            ForkSet::Arbitrated(_) => ForkKind::Arbitrated,
        }
    }

    /// Returns who holds `fork` according to the ownership ledger.
    pub fn holder(&self, fork: usize) -> Option<PhilosopherId> {
        match self.holders[fork].load(Ordering::Acquire) {
            FREE => None,
            slot => Some(PhilosopherId(slot - 1)),
        }
    }

    /// Returns the number of forks currently held.
    pub fn held_count(&self) -> usize {
        self.holders
            .iter()
            .filter(|slot| slot.load(Ordering::Acquire) != FREE)
            .count()
    }

    /// Blocks until `fork` is free, then takes it for `owner`.
    pub fn lock(&self, fork: usize, owner: PhilosopherId) -> Result<HeldFork<'_>, SimError> {
        let guard = match &self.forks {
            ForkSet::Exclusive(locks) => {
                ForkGuard::Exclusive(locks[fork].lock().map_err(|_| SimError::poisoned(fork))?)
            }
            ForkSet::Signal(signals) => {
                signals[fork].acquire()?;
                ForkGuard::Signal(SignalPermit(&signals[fork]))
            }
            ForkSet::Arbitrated(_) => {
                return Err(SimError::unsupported("lock", self.kind().label()));
            }
        };

        self.seize(fork, owner, guard)
    }

    /// Takes `fork` for `owner` if it is free right now.
    ///
    /// Returns `Ok(None)` when another philosopher holds it.
    pub fn try_lock(
        &self,
        fork: usize,
        owner: PhilosopherId,
    ) -> Result<Option<HeldFork<'_>>, SimError> {
        let guard = match &self.forks {
            ForkSet::Exclusive(locks) => match locks[fork].try_lock() {
                Ok(guard) => ForkGuard::Exclusive(guard),
                Err(TryLockError::WouldBlock) => return Ok(None),
                Err(TryLockError::Poisoned(_)) => return Err(SimError::poisoned(fork)),
            },
            ForkSet::Signal(signals) => {
                if !signals[fork].try_acquire()? {
                    return Ok(None);
                }
                ForkGuard::Signal(SignalPermit(&signals[fork]))
            }
            ForkSet::Arbitrated(_) => {
                return Err(SimError::unsupported("try_lock", self.kind().label()));
            }
        };

        self.seize(fork, owner, guard).map(Some)
    }

    /// Asks the arbitrator for both `forks` at once.
    ///
    /// The check-both-then-take-both decision happens under the table guard.
    /// `inspect` is called with the decision while the guard is still held.
    pub fn arbitrate<F>(
        &self,
        owner: PhilosopherId,
        forks: [usize; 2],
        inspect: F,
    ) -> Result<Option<ArbiterGrant<'_>>, SimError>
    where
        F: FnOnce(bool),
    {
        let ForkSet::Arbitrated(table) = &self.forks else {
            return Err(SimError::unsupported("arbitrate", self.kind().label()));
        };

        let mut available = table.lock().map_err(|_| SimError::ArbiterPoisoned)?;
        let granted = forks.iter().all(|&fork| available[fork]);
        inspect(granted);

        if !granted {
            return Ok(None);
        }

        self.claim(forks[0], owner)?;
        if let Err(err) = self.claim(forks[1], owner) {
            self.relinquish(forks[0], owner);
            return Err(err);
        }
        for &fork in &forks {
            available[fork] = false;
        }

        Ok(Some(ArbiterGrant {
            table: self,
            forks,
            owner,
        }))
    }

    fn seize<'a>(
        &'a self,
        fork: usize,
        owner: PhilosopherId,
        guard: ForkGuard<'a>,
    ) -> Result<HeldFork<'a>, SimError> {
        // On failure the guard drops here and the primitive is given back.
        self.claim(fork, owner)?;
        Ok(HeldFork {
            table: self,
            fork,
            owner,
            _guard: guard,
        })
    }

    fn claim(&self, fork: usize, owner: PhilosopherId) -> Result<(), SimError> {
        self.holders[fork]
            .compare_exchange(FREE, owner.index() + 1, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|slot| SimError::ExclusionViolated {
                fork,
                holder: slot - 1,
                claimant: owner.index(),
            })
    }

    fn relinquish(&self, fork: usize, owner: PhilosopherId) {
        let released = self.holders[fork].compare_exchange(
            owner.index() + 1,
            FREE,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
        if released.is_err() {
            warn!("Fork {} released by {} without being held", fork, owner);
        }
    }
}

// Held only for their Drop impls.
#[allow(dead_code)]
enum ForkGuard<'a> {
    Exclusive(MutexGuard<'a, ()>),
    Signal(SignalPermit<'a>),
}

struct SignalPermit<'a>(&'a SignalFork);

impl Drop for SignalPermit<'_> {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// One fork held by one philosopher. Dropping it puts the fork back.
pub struct HeldFork<'a> {
    table: &'a DiningTable,
    fork: usize,
    owner: PhilosopherId,
    _guard: ForkGuard<'a>,
}

impl HeldFork<'_> {
    /// Returns the fork index.
    pub fn index(&self) -> usize {
        self.fork
    }

    /// Returns the holder.
    pub fn owner(&self) -> PhilosopherId {
        self.owner
    }
}

impl Drop for HeldFork<'_> {
    fn drop(&mut self) {
        // Ledger first: the next holder may claim as soon as the guard drops.
        self.table.relinquish(self.fork, self.owner);
    }
}

/// A fork pair handed out by the arbitrator.
pub struct ArbiterGrant<'a> {
    table: &'a DiningTable,
    forks: [usize; 2],
    owner: PhilosopherId,
}

impl ArbiterGrant<'_> {
    /// Returns the granted forks.
    pub fn forks(&self) -> [usize; 2] {
        self.forks
    }

    /// Returns the holder.
    pub fn owner(&self) -> PhilosopherId {
        self.owner
    }
}

impl Drop for ArbiterGrant<'_> {
    fn drop(&mut self) {
        if let ForkSet::Arbitrated(table) = &self.table.forks {
            let mut available = table.lock().unwrap_or_else(PoisonError::into_inner);
            for &fork in &self.forks {
                self.table.relinquish(fork, self.owner);
                available[fork] = true;
            }
        }
    }
}
