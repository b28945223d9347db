//! The normalized, read-only machine definition (§3, §4.2) and the
//! value↔active-node-set conversions the selector and stepper share.
//!
//! Nodes live in an arena; `NodeId(0)` is always the synthetic root — an
//! implicit container never itself represented in a `Value` (its own key
//! is never used, only its children's).

use std::collections::{HashMap, HashSet};

use super::context::apply_assign;
use super::event::Event;
use super::history::HistoryValue;
use super::node::{HistoryKind, NodeId, NodeKind, StateNode};
use super::value::Value;
use crate::error::StatechartError;

pub struct Definition<C, E> {
    pub(crate) nodes: Vec<StateNode<C, E>>,
    pub(crate) delimiter: char,
    pub(crate) strict: bool,
    pub(crate) initial_context: C,
}

impl<C: Clone + std::fmt::Debug + 'static, E: super::event::EventKind + 'static> Definition<C, E> {
    pub const ROOT: NodeId = NodeId(0);

    pub fn node(&self, id: NodeId) -> &StateNode<C, E> {
        &self.nodes[id.index()]
    }

    pub fn root(&self) -> NodeId {
        Self::ROOT
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.path == path).map(|n| n.id)
    }

    pub fn find_by_id_ref(&self, id_ref: &str) -> Option<NodeId> {
        // `#id` targets address a node by its declared `id`, which this
        // engine treats as equivalent to its full dotted path — there is
        // no separate id namespace to keep straight, matching how the
        // teacher's `StateNode::id` doubles as both (core_types.rs).
        self.find_by_path(id_ref)
    }

    /// Resolves a child of `node` by local key.
    pub fn child_by_key(&self, node: NodeId, key: &str) -> Option<NodeId> {
        self.node(node)
            .children
            .iter()
            .copied()
            .find(|&c| self.node(c).key == key)
    }

    /// Builds the `Value` for whatever is active per `active`, starting
    /// from `node` (root or any descendant). See the module-level
    /// derivation in DESIGN.md: a compound node collapses into its active
    /// child's own value when that child is atomic/final, and otherwise
    /// wraps it under the child's key; a parallel node always produces
    /// one entry per region.
    pub fn value_for(&self, node: NodeId, active: &HashSet<NodeId>) -> Value {
        let n = self.node(node);
        match n.kind {
            NodeKind::Atomic | NodeKind::Final => Value::Leaf(n.key.clone()),
            NodeKind::History(_) => unreachable!("history nodes are never active"),
            NodeKind::Compound => {
                let child = n
                    .children
                    .iter()
                    .copied()
                    .find(|c| active.contains(c))
                    .expect("compound node must have exactly one active child");
                let c = self.node(child);
                match c.kind {
                    NodeKind::Atomic | NodeKind::Final => Value::Leaf(c.key.clone()),
                    _ => {
                        let mut map = std::collections::BTreeMap::new();
                        map.insert(c.key.clone(), self.value_for(child, active));
                        Value::Nested(map)
                    }
                }
            }
            NodeKind::Parallel => {
                let mut map = std::collections::BTreeMap::new();
                for &child in &n.children {
                    let key = self.node(child).key.clone();
                    map.insert(key, self.value_for(child, active));
                }
                Value::Nested(map)
            }
        }
    }

    pub fn configuration_value(&self, active: &HashSet<NodeId>) -> Value {
        self.value_for(self.root(), active)
    }

    /// Inverse of `value_for`: resolves a caller-supplied `Value` against
    /// this definition into the full active node set (ancestors and
    /// leaves, across every region).
    pub fn resolve_active(&self, value: &Value) -> Result<HashSet<NodeId>, StatechartError> {
        let mut out = HashSet::new();
        self.resolve_active_into(self.root(), value, &mut out)?;
        Ok(out)
    }

    fn resolve_active_into(
        &self,
        node: NodeId,
        value: &Value,
        out: &mut HashSet<NodeId>,
    ) -> Result<(), StatechartError> {
        out.insert(node);
        let n = self.node(node);
        match n.kind {
            NodeKind::Atomic | NodeKind::Final | NodeKind::History(_) => Ok(()),
            NodeKind::Compound => match value {
                Value::Leaf(key) => {
                    let child = self.child_by_key(node, key).ok_or_else(|| {
                        StatechartError::InvalidTarget(format!(
                            "no child `{key}` under `{}`",
                            n.path
                        ))
                    })?;
                    out.insert(child);
                    Ok(())
                }
                Value::Nested(map) => {
                    let (key, child_value) = map.iter().next().ok_or_else(|| {
                        StatechartError::InvalidTarget(format!(
                            "empty value for compound node `{}`",
                            n.path
                        ))
                    })?;
                    let child = self.child_by_key(node, key).ok_or_else(|| {
                        StatechartError::InvalidTarget(format!(
                            "no child `{key}` under `{}`",
                            n.path
                        ))
                    })?;
                    self.resolve_active_into(child, child_value, out)
                }
            },
            NodeKind::Parallel => {
                let map = match value {
                    Value::Nested(map) => map,
                    Value::Leaf(_) => {
                        return Err(StatechartError::InvalidTarget(format!(
                            "parallel node `{}` needs one entry per region",
                            n.path
                        )))
                    }
                };
                for &child in &n.children.clone() {
                    let key = &self.node(child).key;
                    let child_value = map.get(key).ok_or_else(|| {
                        StatechartError::InvalidTarget(format!(
                            "missing region `{key}` for parallel node `{}`",
                            n.path
                        ))
                    })?;
                    self.resolve_active_into(child, child_value, out)?;
                }
                Ok(())
            }
        }
    }

    /// The node set entered when entering `node` fresh (no specific
    /// descendant target): recurses into `initial_child` for a compound
    /// node, into every region for a parallel node. Does not include
    /// `node` itself — callers push that separately so history
    /// resolution can intercept before recursing.
    pub fn default_descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.default_descendants_into(node, &mut out);
        out
    }

    fn default_descendants_into(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let n = self.node(node);
        match n.kind {
            NodeKind::Atomic | NodeKind::Final | NodeKind::History(_) => {}
            NodeKind::Compound => {
                if let Some(initial) = n.initial_child {
                    out.push(initial);
                    self.default_descendants_into(initial, out);
                }
            }
            NodeKind::Parallel => {
                for &child in &n.children.clone() {
                    out.push(child);
                    self.default_descendants_into(child, out);
                }
            }
        }
    }

    /// Ancestor chain of `node`, innermost first, not including `node`.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = self.node(node).parent;
        while let Some(id) = cur {
            out.push(id);
            cur = self.node(id).parent;
        }
        out
    }

    pub fn is_descendant(&self, maybe_descendant: NodeId, maybe_ancestor: NodeId) -> bool {
        let mut cur = self.node(maybe_descendant).parent;
        while let Some(id) = cur {
            if id == maybe_ancestor {
                return true;
            }
            cur = self.node(id).parent;
        }
        false
    }

    pub fn depth(&self, node: NodeId) -> usize {
        self.ancestors(node).len()
    }

    /// The least common *compound* ancestor of `a` and `b` (§4.4 step 4):
    /// walks up from `a` until it finds a compound (or root) ancestor
    /// that is also an ancestor of (or equal to) `b`.
    pub fn lcca(&self, a: NodeId, b: NodeId) -> NodeId {
        let mut a_chain = vec![a];
        a_chain.extend(self.ancestors(a));
        for candidate in a_chain {
            let is_compoundish = candidate == self.root()
                || matches!(self.node(candidate).kind, NodeKind::Compound);
            if !is_compoundish {
                continue;
            }
            if candidate == b || self.is_descendant(b, candidate) {
                return candidate;
            }
        }
        self.root()
    }

    /// `initial_state` (§6): the configuration produced by entering the
    /// root's default descendants and firing entry actions, with the
    /// synthetic `xstate.init` event.
    pub fn initial_state(&self) -> super::configuration::Configuration<C, E> {
        self.initial_with_context(self.initial_context.clone())
    }

    pub fn initial_with_context(&self, context: C) -> super::configuration::Configuration<C, E> {
        let mut active: HashSet<NodeId> = HashSet::new();
        active.insert(self.root());
        let descendants = self.default_descendants(self.root());
        for &d in &descendants {
            active.insert(d);
        }
        let event = Event::init();
        let mut ctx = context;
        let mut actions = Vec::new();
        // Entry order root-first, document order (§4.5 step 2).
        let mut ordered = descendants.clone();
        ordered.sort_by_key(|n| self.depth(*n));
        for &node in &ordered {
            self.run_action_list(&self.node(node).entry, &mut ctx, &event, &mut actions)
                .expect("entry actions at initial_state must not fail");
        }
        for &node in &ordered {
            for activity in &self.node(node).activities {
                actions.push(super::action::ActionRecord::Start {
                    activity: activity.clone(),
                });
            }
        }
        let value = self.configuration_value(&active);
        super::configuration::Configuration {
            value,
            context: ctx,
            event,
            history: HistoryValue::default(),
            actions,
            activities: Default::default(),
            changed: true,
        }
    }

    /// Runs a node's action list, applying `assign` in place and
    /// appending resolved records for everything else, preserving order
    /// (§4.5 step 3/4).
    pub(crate) fn run_action_list(
        &self,
        actions: &[super::action::ActionSpec<C, E>],
        ctx: &mut C,
        event: &Event<E>,
        out: &mut Vec<super::action::ActionRecord>,
    ) -> Result<(), StatechartError> {
        for action in actions {
            match action {
                super::action::ActionSpec::Assign(f) => apply_assign(f, ctx, event)?,
                other => other.resolve(ctx, event, out)?,
            }
        }
        Ok(())
    }

    /// `Definition::transition` (§6): delegates to the selector then the
    /// stepper.
    pub fn transition(
        &self,
        from: &super::configuration::Configuration<C, E>,
        event: impl Into<Event<E>>,
    ) -> Result<super::configuration::Configuration<C, E>, StatechartError> {
        super::stepper::step(self, from, event.into())
    }

    /// Tags carried by every currently active node ([ADDED] §"Supplemented
    /// features"), deduplicated but not sorted — callers wanting a stable
    /// order should sort themselves.
    pub fn tags(
        &self,
        config: &super::configuration::Configuration<C, E>,
    ) -> Result<Vec<String>, StatechartError> {
        let active = self.resolve_active(&config.value)?;
        let mut tags = Vec::new();
        for node in active {
            for tag in &self.node(node).tags {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        Ok(tags)
    }

    pub fn has_tag(
        &self,
        config: &super::configuration::Configuration<C, E>,
        tag: &str,
    ) -> Result<bool, StatechartError> {
        Ok(self.tags(config)?.iter().any(|t| t == tag))
    }

    /// `State.from` (§6): constructs a configuration directly from a
    /// value and context, for test scaffolding. Carries no actions and an
    /// empty history.
    pub fn configuration_from(
        &self,
        value: impl Into<Value>,
        context: C,
    ) -> Result<super::configuration::Configuration<C, E>, StatechartError> {
        let value = value.into();
        self.resolve_active(&value)?;
        Ok(super::configuration::Configuration {
            value,
            context,
            event: Event::init(),
            history: HistoryValue::default(),
            actions: Vec::new(),
            activities: HashMap::new(),
            changed: false,
        })
    }
}
