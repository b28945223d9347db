//! The configuration stepper (§4.5): turns a selected set of transitions
//! into exit actions, context updates, entry actions, and the next
//! configuration, then drains the macrostep — eventless ("always")
//! transitions and actions raised during the step — until it settles.

use std::collections::{HashMap, HashSet, VecDeque};

use super::action::ActionRecord;
use super::configuration::Configuration;
use super::definition::Definition;
use super::event::{Event, EventKind, ALWAYS_EVENT};
use super::history::HistoryValue;
use super::node::{HistoryKind, NodeId, NodeKind};
use super::selector::{self, Selected};
use crate::error::StatechartError;

/// Hard ceiling on macrostep iterations (§9 "determinism"): an eventless
/// transition whose guard never stops matching its own result would
/// otherwise spin forever. Real machines settle in a handful of steps.
const MAX_MACROSTEP_ITERATIONS: usize = 1_000;

pub fn step<C, E>(
    definition: &Definition<C, E>,
    from: &Configuration<C, E>,
    event: Event<E>,
) -> Result<Configuration<C, E>, StatechartError>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let mut active = definition.resolve_active(&from.value)?;
    let mut context = from.context.clone();
    let mut history = from.history.clone();
    let mut activities = from.activities.clone();
    let mut all_actions = Vec::new();
    let mut any_changed = false;

    let mut pending: VecDeque<Event<E>> = VecDeque::new();
    pending.push_back(event.clone());
    let mut last_event = event;

    let mut iterations = 0;
    loop {
        iterations += 1;
        if iterations > MAX_MACROSTEP_ITERATIONS {
            return Err(StatechartError::Execution(
                "macrostep did not converge after 1000 iterations".to_string(),
            ));
        }

        // Drain any event raised by the previous microstep before
        // re-checking eventless transitions, matching the usual
        // statechart macrostep order (§1 "closure over internal events").
        let (current_event, is_always_check) = match pending.pop_front() {
            Some(e) => (e, false),
            None => (last_event.clone(), true),
        };

        let selections = if is_always_check {
            selector::select(definition, &active, &context, &current_event, Some(ALWAYS_EVENT))
        } else {
            selector::select(definition, &active, &context, &current_event, None)
        };

        if selections.is_empty() {
            if !is_always_check && definition.strict && !matches!(current_event, Event::Sentinel(_))
            {
                return Err(StatechartError::InvalidEvent(format!(
                    "no transition matches `{}` in the active configuration",
                    current_event.event_type()
                )));
            }
            if is_always_check {
                break;
            }
            last_event = current_event;
            continue;
        }

        let mut raised = Vec::new();
        apply_selections(
            definition,
            &mut active,
            &mut context,
            &current_event,
            &selections,
            &mut history,
            &mut activities,
            &mut all_actions,
            &mut raised,
        )?;
        any_changed = true;

        for raised_type in raised {
            pending.push_back(Event::Sentinel(raised_type));
        }
        maybe_raise_done_events(definition, &active, &mut pending);
        last_event = current_event;
    }

    let value = definition.configuration_value(&active);
    Ok(Configuration {
        value,
        context,
        event: last_event,
        history,
        actions: all_actions,
        activities,
        changed: any_changed,
    })
}

#[allow(clippy::too_many_arguments)]
fn apply_selections<C, E>(
    definition: &Definition<C, E>,
    active: &mut HashSet<NodeId>,
    context: &mut C,
    event: &Event<E>,
    selections: &[Selected<C, E>],
    history: &mut HistoryValue,
    activities: &mut HashMap<NodeId, bool>,
    all_actions: &mut Vec<ActionRecord>,
    raised: &mut Vec<String>,
) -> Result<(), StatechartError>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    for selected in selections {
        if selected.transition.internal {
            let before = all_actions.len();
            definition.run_action_list(&selected.transition.actions, context, event, all_actions)?;
            collect_raised(all_actions, before, raised);
            continue;
        }

        let resolved_targets = resolve_targets(definition, &selected.transition.targets, history);
        let scope = resolved_targets
            .iter()
            .fold(selected.source, |acc, &t| definition.lcca(acc, t));

        let mut exit_set: Vec<NodeId> = active
            .iter()
            .copied()
            .filter(|&n| n != scope && definition.is_descendant(n, scope))
            .collect();
        exit_set.sort_by_key(|&n| std::cmp::Reverse(definition.depth(n)));

        record_history(definition, &exit_set, active, history);

        for &node in &exit_set {
            let before = all_actions.len();
            definition.run_action_list(&definition.node(node).exit, context, event, all_actions)?;
            collect_raised(all_actions, before, raised);
            if !definition.node(node).activities.is_empty() {
                for activity in &definition.node(node).activities {
                    all_actions.push(ActionRecord::Stop {
                        activity: activity.clone(),
                    });
                }
                activities.insert(node, false);
            }
            active.remove(&node);
        }

        let before = all_actions.len();
        definition.run_action_list(&selected.transition.actions, context, event, all_actions)?;
        collect_raised(all_actions, before, raised);

        let mut entry_set = Vec::new();
        for &target in &resolved_targets {
            build_entry_chain(definition, target, scope, &mut entry_set);
        }
        entry_set.sort_by_key(|&n| definition.depth(n));
        entry_set.dedup();

        for &node in &entry_set {
            active.insert(node);
            let before = all_actions.len();
            definition.run_action_list(&definition.node(node).entry, context, event, all_actions)?;
            collect_raised(all_actions, before, raised);
            if !definition.node(node).activities.is_empty() {
                for activity in &definition.node(node).activities {
                    all_actions.push(ActionRecord::Start {
                        activity: activity.clone(),
                    });
                }
                activities.insert(node, true);
            }
        }
    }
    Ok(())
}

fn collect_raised(all_actions: &[ActionRecord], before: usize, raised: &mut Vec<String>) {
    for record in &all_actions[before..] {
        if let ActionRecord::Raise { event } = record {
            raised.push(event.clone());
        }
    }
}

/// Replaces any history-node target with its remembered descendants (or
/// the node's declared default) and expands every other target down to
/// its own default descendants when it is itself compound/parallel
/// (§4.5 step 2, §4.2 history default target).
fn resolve_targets<C, E>(
    definition: &Definition<C, E>,
    raw_targets: &[NodeId],
    history: &HistoryValue,
) -> Vec<NodeId>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let mut out = Vec::new();
    for &target in raw_targets {
        if let NodeKind::History(_) = definition.node(target).kind {
            if let Some(recorded) = history.get(target) {
                out.extend(recorded.iter().copied());
                continue;
            }
            if let Some(default) = definition.node(target).history_default_target {
                out.push(default);
                continue;
            }
            // No recording and no declared default: fall back to the
            // history node's own parent's default descendants.
            if let Some(parent) = definition.node(target).parent {
                out.push(parent);
            }
            continue;
        }
        out.push(target);
    }
    out
}

/// Builds the chain from just below `scope` down to `target`, expanding
/// `target` into its own default descendants (§4.5 step 2).
fn build_entry_chain<C, E>(
    definition: &Definition<C, E>,
    target: NodeId,
    scope: NodeId,
    out: &mut Vec<NodeId>,
) where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let mut chain = vec![target];
    chain.extend(definition.ancestors(target));
    let chain: Vec<NodeId> = chain.into_iter().take_while(|&n| n != scope).collect();
    out.extend(chain.into_iter().rev());
    out.extend(definition.default_descendants(target));
}

/// For every exiting ancestor that has history children, records what
/// was active under it just before exit (§4.5 step 6).
fn record_history<C, E>(
    definition: &Definition<C, E>,
    exit_set: &[NodeId],
    active_before: &HashSet<NodeId>,
    history: &mut HistoryValue,
) where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    for &node in exit_set {
        let n = definition.node(node);
        if !matches!(n.kind, NodeKind::Compound | NodeKind::Parallel) {
            continue;
        }
        for &child in &n.children {
            let kind = match definition.node(child).kind {
                NodeKind::History(k) => k,
                _ => continue,
            };
            let recorded: Vec<NodeId> = match kind {
                HistoryKind::Shallow => n
                    .children
                    .iter()
                    .copied()
                    .filter(|c| active_before.contains(c))
                    .collect(),
                HistoryKind::Deep => active_before
                    .iter()
                    .copied()
                    .filter(|&d| definition.is_descendant(d, node))
                    .collect(),
            };
            history.record(child, recorded);
        }
    }
}

fn maybe_raise_done_events<C, E>(
    definition: &Definition<C, E>,
    active: &HashSet<NodeId>,
    pending: &mut VecDeque<Event<E>>,
) where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    for &node in active {
        let n = definition.node(node);
        if matches!(n.kind, NodeKind::Compound | NodeKind::Parallel) && is_done(definition, node, active)
        {
            pending.push_back(Event::done_state(&n.path));
        }
    }
}

/// True when every region under `node` has reached a `Final` leaf
/// (§4.2 `onDone`): a compound node is done when its one active child is
/// final; a parallel node is done when every one of its regions is.
fn is_done<C, E>(definition: &Definition<C, E>, node: NodeId, active: &HashSet<NodeId>) -> bool
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let n = definition.node(node);
    match n.kind {
        NodeKind::Final => true,
        NodeKind::Atomic => false,
        NodeKind::Compound => n
            .children
            .iter()
            .copied()
            .find(|c| active.contains(c))
            .map(|c| definition.node(c).is_final())
            .unwrap_or(false),
        NodeKind::Parallel => n
            .children
            .iter()
            .copied()
            .all(|c| is_done(definition, c, active)),
        NodeKind::History(_) => false,
    }
}
