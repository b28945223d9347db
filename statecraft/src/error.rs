//! Error taxonomy for the statechart engine.
//!
//! The kinds mirror the five failure modes a transition function can hit:
//! a bad definition (caught at load time), a malformed event, an
//! unresolvable transition target, a guard that panicked, and an
//! assignment/resolver that panicked. `guard_failure` is the only kind the
//! core swallows (treated as `false`, logged, stepping continues); every
//! other kind aborts the call and is returned to the caller.

use thiserror::Error;

/// Errors raised by the pure core. Never constructed from side effects —
/// only from structural problems in a definition or a call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatechartError {
    /// Structural violation caught at load time: duplicate id, missing or
    /// invalid `initial`, delimiter conflict, cycle in target resolution,
    /// a parallel region that isn't compound/parallel, a final state with
    /// children or outgoing transitions.
    #[error("invalid definition: {0}")]
    InvalidDefinition(String),

    /// The event passed to `transition` is neither a bare type string nor
    /// a well-formed event value (or, under `strict` machines, no
    /// transition in the whole configuration matched it).
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// A transition's target could not be resolved against the state
    /// tree, either at load time (static targets) or transition time.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// A guard function panicked while being evaluated. Callers observe
    /// this only via `tracing::warn!`; the core itself treats the guard
    /// as having returned `false` and keeps searching candidates. This
    /// variant exists so the taxonomy is complete and testable, even
    /// though the core never surfaces it as an `Err`.
    #[error("guard failed: {0}")]
    GuardFailure(String),

    /// An assignment or resolver function panicked. The macrostep is
    /// aborted and the prior configuration is preserved; the interpreter
    /// is expected to surface this as an `error.execution` event on the
    /// next microstep.
    #[error("action execution failed: {0}")]
    Execution(String),
}

/// Result alias used throughout the engine.
pub type StateResult<T> = Result<T, StatechartError>;
