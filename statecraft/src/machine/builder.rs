//! Normalizes a `RawMachineConfig` into a `Definition` (§4.2): assigns
//! every node a stable `NodeId` in document order, resolves target
//! strings and named actions/guards, and expands `after`/`onDone` sugar
//! into ordinary transitions plus synthetic `send`/`cancel` entry/exit
//! actions. Validation is eager ([ADDED] §"Ambient stack"): an unresolved
//! target or action/guard name fails `Machine::new` rather than surfacing
//! later as a run-time error.

use std::collections::HashMap;

use super::action::ActionSpec;
use super::config::{
    MachineOptions, RawActions, RawMachineConfig, RawStateNode, RawTargetSpec, RawTransitionSpec,
    RawTransitionValue,
};
use super::definition::Definition;
use super::event::{self, EventKind};
use super::guard::GuardSpec;
use super::node::{AfterTimer, HistoryKind, NodeId, NodeKind, StateNode, Transition};
use crate::error::StatechartError;

pub struct Machine;

impl Machine {
    /// `Machine(config, options?, initial_context?)` (§6): validates and
    /// normalizes `config` into a ready-to-run `Definition`. The initial
    /// context defaults to `C::default()`; use `with_context` to supply
    /// one explicitly.
    pub fn new<C, E>(
        config: RawMachineConfig,
        options: MachineOptions<C, E>,
    ) -> Result<Definition<C, E>, StatechartError>
    where
        C: Clone + std::fmt::Debug + Default + 'static,
        E: EventKind + 'static,
    {
        let initial_context = C::default();
        Self::with_context(config, options, initial_context)
    }

    pub fn with_context<C, E>(
        config: RawMachineConfig,
        options: MachineOptions<C, E>,
        initial_context: C,
    ) -> Result<Definition<C, E>, StatechartError>
    where
        C: Clone + std::fmt::Debug + 'static,
        E: EventKind + 'static,
    {
        let mut builder: Builder<C, E> = Builder {
            nodes: Vec::new(),
            pending: Vec::new(),
            path_index: HashMap::new(),
            delimiter: options.delimiter,
        };

        let root_kind = if config.parallel {
            NodeKind::Parallel
        } else {
            NodeKind::Compound
        };
        let root_raw = RawStateNode {
            initial: config.initial,
            parallel: config.parallel,
            states: config.states,
            on: config.on,
            ..RawStateNode::default()
        };
        builder.add_node(String::new(), String::new(), root_kind, None, root_raw)?;
        builder.resolve_initial_children();
        builder.resolve_actions_and_transitions(&options)?;

        if builder.nodes.is_empty() {
            return Err(StatechartError::InvalidDefinition(
                "machine has no states".to_string(),
            ));
        }
        builder.validate_structure()?;

        Ok(Definition {
            nodes: builder.nodes,
            delimiter: options.delimiter,
            strict: options.strict,
            initial_context,
        })
    }
}

/// Everything about a node not resolvable during the first pass, since
/// target strings need the full `path_index` and action/guard names need
/// `MachineOptions` — both only available once the whole tree has been
/// walked.
struct PendingNode {
    initial: Option<String>,
    on: HashMap<String, Vec<RawTransitionSpec>>,
    entry: RawActions,
    exit: RawActions,
    after: Vec<(u64, Vec<RawTransitionSpec>)>,
    on_done: Option<Vec<RawTransitionSpec>>,
}

struct Builder<C, E> {
    nodes: Vec<StateNode<C, E>>,
    pending: Vec<PendingNode>,
    path_index: HashMap<String, NodeId>,
    delimiter: char,
}

impl<C, E> Builder<C, E> {
    fn add_node(
        &mut self,
        key: String,
        path: String,
        kind: NodeKind,
        parent: Option<NodeId>,
        raw: RawStateNode,
    ) -> Result<NodeId, StatechartError> {
        let id = NodeId(self.nodes.len() as u32);
        self.path_index.insert(path.clone(), id);

        // Document order (§3 "insertion order is document order and
        // matters for tie-breaking"): `raw.states` is an `IndexMap`, so
        // this iterates in the order the definition declared its
        // children, not alphabetically.
        let entries: Vec<(String, RawStateNode)> = raw.states.into_iter().collect();
        let mut children = Vec::new();
        for (child_key, child_raw) in entries {
            // §4.1: "the engine must treat a key containing the
            // delimiter as an error at definition load" — a dotted key
            // would make its own path ambiguous with a nested child.
            if child_key.contains(self.delimiter) {
                return Err(StatechartError::InvalidDefinition(format!(
                    "state key `{child_key}` contains the delimiter `{}`",
                    self.delimiter
                )));
            }
            let child_path = if path.is_empty() {
                child_key.clone()
            } else {
                format!("{path}{}{child_key}", self.delimiter)
            };
            let child_kind = Self::kind_of(&child_raw);
            let child_id = self.add_node(child_key, child_path, child_kind, Some(id), child_raw)?;
            children.push(child_id);
        }

        self.nodes.push(StateNode {
            id,
            key,
            path: path.clone(),
            kind,
            parent,
            children,
            initial_child: None,
            transitions: HashMap::new(),
            entry: Vec::new(),
            exit: Vec::new(),
            activities: raw.activities,
            after: Vec::new(),
            history_default: raw.target,
            history_default_target: None,
            tags: raw.tags,
        });

        let on_done = raw.on_done.map(normalize);
        let after = raw
            .after
            .into_iter()
            .map(|(delay, v)| (delay.parse::<u64>().unwrap_or(0), normalize(v)))
            .collect();
        let on = raw
            .on
            .into_iter()
            .map(|(event_type, v)| (event_type, normalize(v)))
            .collect();
        self.pending.push(PendingNode {
            initial: raw.initial,
            on,
            entry: raw.entry,
            exit: raw.exit,
            after,
            on_done,
        });

        Ok(id)
    }

    fn kind_of(raw: &RawStateNode) -> NodeKind {
        if let Some(history) = &raw.history {
            return NodeKind::History(if history == "deep" {
                HistoryKind::Deep
            } else {
                HistoryKind::Shallow
            });
        }
        if raw.is_final {
            return NodeKind::Final;
        }
        if raw.parallel {
            return NodeKind::Parallel;
        }
        if raw.states.is_empty() {
            NodeKind::Atomic
        } else {
            NodeKind::Compound
        }
    }

    /// A compound node's declared `initial` is resolved in the main
    /// resolve pass (it is just another target string); a compound node
    /// that never declared one defaults to its first child in document
    /// order, which is already knowable here.
    fn resolve_initial_children(&mut self) {
        for id in 0..self.nodes.len() {
            let node = NodeId(id as u32);
            if !matches!(self.nodes[node.index()].kind, NodeKind::Compound) {
                continue;
            }
            self.nodes[node.index()].initial_child = self.nodes[node.index()].children.first().copied();
        }
    }

    fn resolve_target(&self, source: NodeId, raw: &str) -> Result<NodeId, StatechartError> {
        if let Some(id_ref) = raw.strip_prefix('#') {
            return self
                .path_index
                .get(id_ref)
                .copied()
                .ok_or_else(|| StatechartError::InvalidTarget(format!("no node with id `{id_ref}`")));
        }
        if let Some(parent) = self.nodes[source.index()].parent {
            let parent_path = &self.nodes[parent.index()].path;
            let sibling_path = if parent_path.is_empty() {
                raw.to_string()
            } else {
                format!("{parent_path}{}{raw}", self.delimiter)
            };
            if let Some(&id) = self.path_index.get(&sibling_path) {
                return Ok(id);
            }
        }
        let source_path = &self.nodes[source.index()].path;
        let child_path = if source_path.is_empty() {
            raw.to_string()
        } else {
            format!("{source_path}{}{raw}", self.delimiter)
        };
        if let Some(&id) = self.path_index.get(&child_path) {
            return Ok(id);
        }
        self.path_index
            .get(raw)
            .copied()
            .ok_or_else(|| StatechartError::InvalidTarget(format!("unresolvable target `{raw}`")))
    }

    fn resolve_action_names(
        &self,
        raw: &RawActions,
        options: &MachineOptions<C, E>,
    ) -> Result<Vec<ActionSpec<C, E>>, StatechartError>
    where
        C: Clone,
        E: Clone,
    {
        raw.0
            .iter()
            .map(|name| {
                options.actions.get(name).cloned().ok_or_else(|| {
                    StatechartError::InvalidDefinition(format!(
                        "unknown action `{name}` — register it in MachineOptions::actions"
                    ))
                })
            })
            .collect()
    }

    fn resolve_guard(
        &self,
        name: &str,
        options: &MachineOptions<C, E>,
    ) -> Result<GuardSpec<C, E>, StatechartError>
    where
        C: Clone,
        E: Clone,
    {
        options.guards.get(name).cloned().ok_or_else(|| {
            StatechartError::InvalidDefinition(format!(
                "unknown guard `{name}` — register it in MachineOptions::guards"
            ))
        })
    }

    fn build_transitions(
        &self,
        source: NodeId,
        event_type: &str,
        specs: Vec<RawTransitionSpec>,
        options: &MachineOptions<C, E>,
    ) -> Result<Vec<Transition<C, E>>, StatechartError>
    where
        C: Clone,
        E: Clone,
    {
        specs
            .into_iter()
            .map(|spec| {
                let raw_targets = spec.target.map(RawTargetSpec::into_vec).unwrap_or_default();
                let targets = raw_targets
                    .iter()
                    .map(|t| self.resolve_target(source, t))
                    .collect::<Result<Vec<_>, _>>()?;
                let internal = spec.internal || raw_targets.is_empty();
                let guard = spec
                    .cond
                    .as_deref()
                    .map(|name| self.resolve_guard(name, options))
                    .transpose()?;
                let actions = self.resolve_action_names(&spec.actions, options)?;
                Ok(Transition {
                    event_type: event_type.to_string(),
                    source,
                    raw_targets,
                    targets,
                    internal,
                    guard,
                    actions,
                })
            })
            .collect()
    }

    fn resolve_actions_and_transitions(
        &mut self,
        options: &MachineOptions<C, E>,
    ) -> Result<(), StatechartError>
    where
        C: Clone,
        E: Clone,
    {
        for id in 0..self.nodes.len() {
            let node = NodeId(id as u32);
            let pending = std::mem::replace(
                &mut self.pending[node.index()],
                PendingNode {
                    initial: None,
                    on: HashMap::new(),
                    entry: RawActions::default(),
                    exit: RawActions::default(),
                    after: Vec::new(),
                    on_done: None,
                },
            );

            // A history node's bare `target:` is its default when nothing
            // has been recorded yet.
            if matches!(self.nodes[node.index()].kind, NodeKind::History(_)) {
                if let Some(default_target) = self.nodes[node.index()].history_default.clone() {
                    let resolved = self.resolve_target(node, &default_target)?;
                    self.nodes[node.index()].history_default_target = Some(resolved);
                }
            }

            // An explicit `initial:` on a compound node overrides the
            // document-order default picked by `resolve_initial_children`.
            if let Some(initial_key) = &pending.initial {
                if matches!(self.nodes[node.index()].kind, NodeKind::Compound) {
                    let resolved = self.resolve_target(node, initial_key)?;
                    self.nodes[node.index()].initial_child = Some(resolved);
                }
            }

            for activity in &self.nodes[node.index()].activities {
                if !options.activities.contains_key(activity) {
                    return Err(StatechartError::InvalidDefinition(format!(
                        "unknown activity `{activity}` — register it in MachineOptions::activities"
                    )));
                }
            }

            let mut entry = self.resolve_action_names(&pending.entry, options)?;
            let mut exit = self.resolve_action_names(&pending.exit, options)?;

            let mut transitions: HashMap<String, Vec<Transition<C, E>>> = HashMap::new();
            for (event_type, specs) in pending.on {
                let built = self.build_transitions(node, &event_type, specs, options)?;
                transitions.insert(event_type, built);
            }
            if let Some(specs) = pending.on_done {
                let event_type = format!("{}{}", event::DONE_STATE_PREFIX, self.nodes[node.index()].path);
                let built = self.build_transitions(node, &event_type, specs, options)?;
                transitions.insert(event_type, built);
            }

            let mut after_timers = Vec::new();
            for (delay_ms, specs) in pending.after {
                let event_type = event::after_event_type(delay_ms, &self.nodes[node.index()].path);
                let built = self.build_transitions(node, &event_type, specs, options)?;
                entry.push(ActionSpec::send_after(
                    event_type.as_str(),
                    delay_ms,
                    event_type.clone(),
                ));
                exit.push(ActionSpec::cancel(event_type.clone()));
                for transition in &built {
                    after_timers.push(AfterTimer {
                        delay_ms,
                        event_type: event_type.clone(),
                        transition: transition.clone(),
                    });
                }
                transitions.insert(event_type, built);
            }

            let n = &mut self.nodes[node.index()];
            n.entry = entry;
            n.exit = exit;
            n.transitions = transitions;
            n.after = after_timers;
        }
        Ok(())
    }

    /// [ADDED] Structural validation (spec.md §3 invariants, SPEC_FULL
    /// §4.2): run after targets and `initial:` overrides have resolved,
    /// so `initial_child`/`transitions` reflect their final values.
    fn validate_structure(&self) -> Result<(), StatechartError> {
        for node in &self.nodes {
            match node.kind {
                NodeKind::Parallel => {
                    for &child in &node.children {
                        let child_node = &self.nodes[child.index()];
                        if !matches!(child_node.kind, NodeKind::Compound | NodeKind::Parallel) {
                            return Err(StatechartError::InvalidDefinition(format!(
                                "parallel node `{}` has region `{}` that is not a compound or parallel state",
                                node.path, child_node.key
                            )));
                        }
                    }
                }
                NodeKind::Final => {
                    if !node.children.is_empty() {
                        return Err(StatechartError::InvalidDefinition(format!(
                            "final node `{}` must not have children",
                            node.path
                        )));
                    }
                    if !node.transitions.is_empty() {
                        return Err(StatechartError::InvalidDefinition(format!(
                            "final node `{}` must not have outgoing transitions",
                            node.path
                        )));
                    }
                }
                NodeKind::Compound => match node.initial_child {
                    None => {
                        return Err(StatechartError::InvalidDefinition(format!(
                            "compound node `{}` has no resolvable initial state",
                            node.path
                        )));
                    }
                    Some(initial) => {
                        if matches!(self.nodes[initial.index()].kind, NodeKind::History(_)) {
                            return Err(StatechartError::InvalidDefinition(format!(
                                "compound node `{}` cannot use history node `{}` as its initial state",
                                node.path,
                                self.nodes[initial.index()].path
                            )));
                        }
                    }
                },
                NodeKind::Atomic | NodeKind::History(_) => {}
            }
        }
        Ok(())
    }
}

fn normalize(value: RawTransitionValue) -> Vec<RawTransitionSpec> {
    match value {
        RawTransitionValue::Target(s) => vec![RawTransitionSpec {
            target: Some(RawTargetSpec::One(s)),
            actions: RawActions::default(),
            cond: None,
            internal: false,
        }],
        RawTransitionValue::Targets(v) => vec![RawTransitionSpec {
            target: Some(RawTargetSpec::Many(v)),
            actions: RawActions::default(),
            cond: None,
            internal: false,
        }],
        RawTransitionValue::Full(spec) => vec![spec],
        RawTransitionValue::Multi(specs) => specs,
    }
}
