//! Error types shared by every Symposium crate.

use thiserror::Error;

/// Errors that can occur while configuring or running a dining simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// Fewer than two philosophers: no neighbor to contend with
    #[error("Invalid philosopher count {0}: at least 2 are required")]
    InvalidPhilosopherCount(usize),

    /// Zero iterations per philosopher
    #[error("Invalid iteration count {0}: must be positive")]
    InvalidIterations(usize),

    /// Strategy tag outside the closed variant set
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A duration range with min > max, or similar
    #[error("Invalid timing profile: {0}")]
    InvalidTiming(String),

    /// Benchmark sweep parameters rejected
    #[error("Invalid benchmark: {0}")]
    InvalidBenchmark(String),

    /// A fork's lock was poisoned by a panicking holder
    #[error("Fork {fork} is poisoned")]
    Poisoned { fork: usize },

    /// The arbitrator's table guard was poisoned
    #[error("Arbitrator table is poisoned")]
    ArbiterPoisoned,

    /// Two philosophers were caught holding the same fork
    #[error("Fork {fork} already held by philosopher {holder}, claimed by {claimant}")]
    ExclusionViolated {
        fork: usize,
        holder: usize,
        claimant: usize,
    },

    /// A primitive was requested from a fork set that does not provide it
    #[error("Primitive `{primitive}` is not available on {set}")]
    UnsupportedPrimitive {
        primitive: &'static str,
        set: &'static str,
    },

    /// The OS refused to start a philosopher thread
    #[error("Failed to spawn philosopher {id}: {source}")]
    SpawnFailed {
        id: usize,
        #[source]
        source: std::io::Error,
    },

    /// A philosopher thread panicked
    #[error("Philosopher {id} panicked: {message}")]
    AgentPanicked { id: usize, message: String },

    /// A philosopher aborted with an error
    #[error("Philosopher {id} failed: {source}")]
    AgentFailed {
        id: usize,
        #[source]
        source: Box<SimError>,
    },

    /// Report export failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Creates a poisoned-fork error.
    pub fn poisoned(fork: usize) -> Self {
        Self::Poisoned { fork }
    }

    /// Creates an unsupported-primitive error.
    pub fn unsupported(primitive: &'static str, set: &'static str) -> Self {
        Self::UnsupportedPrimitive { primitive, set }
    }

    /// Wraps an agent's error with its id.
    pub fn agent(id: usize, source: SimError) -> Self {
        Self::AgentFailed {
            id,
            source: Box::new(source),
        }
    }

    /// Returns true for errors rejected before any thread starts.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidPhilosopherCount(_)
                | Self::InvalidIterations(_)
                | Self::UnknownStrategy(_)
                | Self::InvalidTiming(_)
                | Self::InvalidBenchmark(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(SimError::InvalidPhilosopherCount(1).is_configuration());
        assert!(SimError::UnknownStrategy("chopsticks".into()).is_configuration());
        assert!(!SimError::poisoned(3).is_configuration());
        assert!(!SimError::agent(0, SimError::ArbiterPoisoned).is_configuration());
    }

    #[test]
    fn test_agent_error_message() {
        let err = SimError::agent(2, SimError::poisoned(3));
        assert_eq!(err.to_string(), "Philosopher 2 failed: Fork 3 is poisoned");
    }
}
