//! Transition selection (§4.4): for each currently active region, the
//! first transition (searching leaf-to-root, document order within a
//! node) whose event type matches and whose guard passes. Regions are
//! resolved independently; conflicting selections across overlapping
//! parallel regions are then reduced to one winner per scope.

use std::collections::HashSet;

use super::definition::Definition;
use super::event::{Event, EventKind, ALWAYS_EVENT};
use super::node::{NodeId, NodeKind, Transition};

pub struct Selected<'a, C, E> {
    pub source: NodeId,
    pub transition: &'a Transition<C, E>,
}

/// For each currently active region, walks leaf-to-root looking for the
/// first transition (by document order within a node) whose event type
/// matches and whose guard passes against `context`. Pass
/// `event_type_override` of `ALWAYS_EVENT` to run the eventless
/// transition re-check loop instead of matching `event`'s own type
/// (§4.4 [ADDED]).
pub fn select<'a, C, E>(
    definition: &'a Definition<C, E>,
    active: &HashSet<NodeId>,
    context: &C,
    event: &Event<E>,
    event_type_override: Option<&str>,
) -> Vec<Selected<'a, C, E>>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let event_type = event_type_override.unwrap_or_else(|| event.event_type());
    let leaves: Vec<NodeId> = active
        .iter()
        .copied()
        .filter(|&n| matches!(definition.node(n).kind, NodeKind::Atomic | NodeKind::Final))
        .collect();

    let mut candidates: Vec<(NodeId, usize)> = Vec::new();
    for leaf in leaves {
        let mut chain = vec![leaf];
        chain.extend(definition.ancestors(leaf));
        'walk: for &candidate in &chain {
            let node = definition.node(candidate);
            let bucket: &[Transition<C, E>] = if event_type == ALWAYS_EVENT {
                match node.transitions.get(ALWAYS_EVENT) {
                    Some(v) => v.as_slice(),
                    None => continue,
                }
            } else {
                node.transitions_for(event_type)
            };
            for (idx, t) in bucket.iter().enumerate() {
                let passes = t
                    .guard
                    .as_ref()
                    .map(|g| g.check(context, event))
                    .unwrap_or(true);
                if passes {
                    candidates.push((candidate, idx));
                    break 'walk;
                }
            }
        }
    }

    // Dedupe: multiple leaves under the same parallel ancestor can walk
    // up into the very same transition.
    candidates.sort();
    candidates.dedup();

    let mut selections: Vec<Selected<C, E>> = candidates
        .into_iter()
        .map(|(source, idx)| {
            let event_key = if event_type == ALWAYS_EVENT {
                ALWAYS_EVENT
            } else {
                event_type
            };
            let transition = &definition.node(source).transitions.get(event_key).expect(
                "candidate was found in this exact bucket above",
            )[idx];
            Selected { source, transition }
        })
        .collect();

    resolve_conflicts(definition, &mut selections);
    selections
}

/// Tie-break rule (§4.4): if two selections' sources are in an
/// ancestor/descendant relationship (one's exit scope would contain the
/// other), the deeper (closer to the leaves) source wins; ties broken by
/// declaration order, for which node-id order is a faithful proxy since
/// the builder assigns ids in document order.
fn resolve_conflicts<C, E>(definition: &Definition<C, E>, selections: &mut Vec<Selected<C, E>>)
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    let mut keep = vec![true; selections.len()];
    for i in 0..selections.len() {
        if !keep[i] {
            continue;
        }
        for j in (i + 1)..selections.len() {
            if !keep[j] {
                continue;
            }
            let a = selections[i].source;
            let b = selections[j].source;
            if a == b {
                keep[j] = false;
                continue;
            }
            let related = definition.is_descendant(a, b) || definition.is_descendant(b, a);
            if !related {
                continue;
            }
            let deeper_is_a = definition.depth(a) >= definition.depth(b);
            if deeper_is_a {
                keep[j] = false;
            } else {
                keep[i] = false;
            }
        }
    }
    let mut idx = 0;
    selections.retain(|_| {
        let k = keep[idx];
        idx += 1;
        k
    });
}
