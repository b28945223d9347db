//! Definition model (§4.2): the normalized, immutable tree of state nodes.
//! Nodes live in an arena (`Definition::nodes: Vec<StateNode<C,E>>`)
//! indexed by a small integer id (§9 "Cyclic graphs") rather than owned
//! pointers, so transition targets and history markers can refer to each
//! other without lifetimes or `Rc`.

use super::action::ActionSpec;
use super::guard::GuardSpec;

/// A stable index into a `Definition`'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Shallow,
    Deep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Atomic,
    Compound,
    Parallel,
    Final,
    History(HistoryKind),
}

/// A timer registered via a node's `after` map: on entry, schedules
/// `send(after(N,id), delay=N)`; `transition` is the transition fired by
/// that synthetic event (§4.2).
pub struct AfterTimer<C, E> {
    pub delay_ms: u64,
    pub event_type: String,
    pub transition: Transition<C, E>,
}

/// A single transition table entry, already normalized (§4.2): shorthand
/// `EVENT: "target"` has been expanded, actions/guards wrapped into
/// lists.
#[derive(Clone)]
pub struct Transition<C, E> {
    /// The literal event type this transition is keyed under: a concrete
    /// type, `"*"` (wildcard), `""` (eventless/always), or a synthesized
    /// type such as `done.state.<id>` or `xstate.after(N,id)`.
    pub event_type: String,
    /// The node this transition is declared on.
    pub source: NodeId,
    /// Raw target specs as written in the definition (`#id`, dotted path,
    /// or empty for a targetless/internal transition), resolved to node
    /// ids once the whole tree is known.
    pub raw_targets: Vec<String>,
    pub targets: Vec<NodeId>,
    /// No `target` or explicit `internal: true` (§4.4 step 4).
    pub internal: bool,
    pub guard: Option<GuardSpec<C, E>>,
    pub actions: Vec<ActionSpec<C, E>>,
}

impl<C, E> Transition<C, E> {
    pub fn is_eventless(&self) -> bool {
        self.event_type.is_empty()
    }

    pub fn is_wildcard(&self) -> bool {
        self.event_type == super::event::WILDCARD_EVENT
    }
}

/// A node in the normalized state tree (§3 "State node").
pub struct StateNode<C, E> {
    pub id: NodeId,
    /// Local key, e.g. `"walk"`.
    pub key: String,
    /// Full dotted path from the root, e.g. `"light.red.walk"`.
    pub path: String,
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Document order.
    pub children: Vec<NodeId>,
    /// For `Compound`: the child entered by default. Never a history node.
    pub initial_child: Option<NodeId>,
    /// Transition table, keyed by event type, each bucket in document
    /// order (§4.4 step 2: "first matching transition ... wins").
    pub transitions: std::collections::HashMap<String, Vec<Transition<C, E>>>,
    pub entry: Vec<ActionSpec<C, E>>,
    pub exit: Vec<ActionSpec<C, E>>,
    pub activities: Vec<String>,
    pub after: Vec<AfterTimer<C, E>>,
    /// For `History` nodes: shallow vs deep, and the default target when
    /// no history has been recorded yet.
    pub history_default: Option<String>,
    pub history_default_target: Option<NodeId>,
    pub tags: Vec<String>,
}

impl<C, E> StateNode<C, E> {
    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, NodeKind::Atomic)
    }

    pub fn is_compound(&self) -> bool {
        matches!(self.kind, NodeKind::Compound)
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.kind, NodeKind::Parallel)
    }

    pub fn is_final(&self) -> bool {
        matches!(self.kind, NodeKind::Final)
    }

    pub fn is_history(&self) -> bool {
        matches!(self.kind, NodeKind::History(_))
    }

    pub fn history_kind(&self) -> Option<HistoryKind> {
        match self.kind {
            NodeKind::History(k) => Some(k),
            _ => None,
        }
    }

    /// Candidate transitions for `event_type`, falling back to the
    /// wildcard bucket when there is no exact match (§4.4 step 2).
    pub fn transitions_for<'a>(&'a self, event_type: &str) -> &'a [Transition<C, E>] {
        self.transitions
            .get(event_type)
            .map(|v| v.as_slice())
            .or_else(|| self.transitions.get(super::event::WILDCARD_EVENT).map(|v| v.as_slice()))
            .unwrap_or(&[])
    }
}
