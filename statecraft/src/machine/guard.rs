//! Guards (`cond`, §4.4): boolean predicates consulted while selecting
//! transitions. A guard that panics is treated as `false` — the selector
//! is the only caller of `GuardSpec::check`, and it does the
//! `catch_unwind` + `tracing::warn!` dance described in §7.

use std::fmt;
use std::sync::Arc;

use super::event::Event;

/// Definition-time guard value. `Named` is resolved against
/// `MachineOptions::guards` at load time, mirroring `ActionSpec::Named`.
#[derive(Clone)]
pub enum GuardSpec<C, E> {
    Inline(Arc<dyn Fn(&C, &Event<E>) -> bool + Send + Sync>),
    Named(String),
    Not(Box<GuardSpec<C, E>>),
    And(Vec<GuardSpec<C, E>>),
    Or(Vec<GuardSpec<C, E>>),
}

impl<C, E> GuardSpec<C, E> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&C, &Event<E>) -> bool + Send + Sync + 'static,
    {
        GuardSpec::Inline(Arc::new(f))
    }

    pub fn named(name: impl Into<String>) -> Self {
        GuardSpec::Named(name.into())
    }

    pub fn not(guard: GuardSpec<C, E>) -> Self {
        GuardSpec::Not(Box::new(guard))
    }

    pub fn and(guards: impl IntoIterator<Item = GuardSpec<C, E>>) -> Self {
        GuardSpec::And(guards.into_iter().collect())
    }

    pub fn or(guards: impl IntoIterator<Item = GuardSpec<C, E>>) -> Self {
        GuardSpec::Or(guards.into_iter().collect())
    }

    /// Evaluates the guard. A panicking inline guard is caught and
    /// treated as `false` (§7 `guard_failure`); the caller is expected to
    /// log a warning when this function "swallows" a panic, which it
    /// signals by returning `false` — there's no separate bool-for-panic
    /// return because the selector can't tell "really false" from
    /// "panicked" apart here without adding another state, and spec
    /// treats them identically: both mean "this candidate doesn't match".
    pub fn check(&self, ctx: &C, event: &Event<E>) -> bool {
        match self {
            GuardSpec::Inline(f) => {
                std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| f(ctx, event)))
                    .unwrap_or(false)
            }
            GuardSpec::Named(name) => {
                tracing::warn!(guard = %name, "unresolved named guard treated as false");
                false
            }
            GuardSpec::Not(inner) => !inner.check(ctx, event),
            GuardSpec::And(inner) => inner.iter().all(|g| g.check(ctx, event)),
            GuardSpec::Or(inner) => inner.iter().any(|g| g.check(ctx, event)),
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, GuardSpec::Named(_))
    }
}

impl<C, E> fmt::Debug for GuardSpec<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardSpec::Inline(_) => write!(f, "GuardSpec::Inline(..)"),
            GuardSpec::Named(name) => write!(f, "GuardSpec::Named({name:?})"),
            GuardSpec::Not(g) => write!(f, "GuardSpec::Not({g:?})"),
            GuardSpec::And(gs) => write!(f, "GuardSpec::And({gs:?})"),
            GuardSpec::Or(gs) => write!(f, "GuardSpec::Or({gs:?})"),
        }
    }
}
