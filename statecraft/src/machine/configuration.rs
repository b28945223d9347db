//! `Configuration` (§3): the immutable value a `transition` call produces
//! — the new state value, context, the event that produced it, the
//! updated history value, the resolved action list for the interpreter,
//! activity bookkeeping, and the `changed` flag.

use std::collections::HashMap;

use super::event::Event;
use super::history::HistoryValue;
use super::node::NodeId;
use super::value::Value;
use super::action::ActionRecord;

/// A snapshot of a running machine. Cloning a `Configuration` is cheap
/// relative to re-deriving it, and it never borrows from the
/// `Definition` that produced it (§9: a definition is read-only and may
/// be shared across any number of independent configurations).
#[derive(Debug, Clone)]
pub struct Configuration<C, E> {
    pub value: Value,
    pub context: C,
    pub event: Event<E>,
    pub history: HistoryValue,
    /// Actions resolved during the step that produced this configuration,
    /// in order, ready for an interpreter to dispatch (§4.6). Empty for a
    /// configuration built via `configuration_from`.
    pub actions: Vec<ActionRecord>,
    /// Which activity-node ids are currently running, keyed by node id
    /// (§4.6 `start`/`stop`).
    pub activities: HashMap<NodeId, bool>,
    /// Whether the producing `transition` call selected at least one
    /// transition (§4.5: "no transition is selected" leaves the
    /// configuration's value and context unchanged, `changed = false`).
    pub changed: bool,
}

impl<C, E> Configuration<C, E> {
    pub fn matches(&self, pattern: &str, delimiter: char) -> bool {
        self.value.matches_pattern(pattern, delimiter)
    }

    pub fn is_running_activity(&self, node: NodeId) -> bool {
        self.activities.get(&node).copied().unwrap_or(false)
    }
}

impl<C: PartialEq, E> Configuration<C, E> {
    /// Two configurations are value-equal when they denote the same
    /// state value and context (§9 determinism property); the event and
    /// action list that produced them are not part of their identity.
    pub fn state_eq(&self, other: &Configuration<C, E>) -> bool {
        self.value == other.value && self.context == other.context
    }
}
