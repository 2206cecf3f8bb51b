use thiserror::Error;

/// Errors that can occur when operating on a simulation through a weak
/// handle.
///
/// Caller bugs (negative delays, re-scheduling a pending timer, time
/// moving backward) are not represented here: they abort the run with a
/// panic, because silently correcting them would mask nondeterminism
/// bugs. This type covers only lifecycle conditions a correct caller can
/// legitimately encounter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    /// The simulation context behind a weak handle has been dropped.
    #[error("simulation context has been dropped")]
    ContextDropped,
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;
