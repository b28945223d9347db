//! Structural invariants and the `Value` round-trip laws from the core
//! spec, independent of any single scenario: every leaf of a value names
//! a real atomic/final node, a no-match event leaves the configuration
//! untouched, `transition` is a pure function of its inputs, and
//! `initial_state` is idempotent.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use statecraft::machine::{Machine, MachineOptions, RawMachineConfig, StringEvent, Value};

fn pedestrian_light() -> RawMachineConfig {
    serde_json::from_value(json!({
        "initial": "green",
        "states": {
            "green": { "on": { "TIMER": "yellow" } },
            "yellow": { "on": { "TIMER": "red" } },
            "red": {
                "initial": "walk",
                "on": { "TIMER": "green" },
                "states": {
                    "walk": { "on": { "PED_TIMER": "wait" } },
                    "wait": { "on": { "PED_TIMER": "stop" } },
                    "stop": {},
                }
            },
        }
    }))
    .unwrap()
}

fn word_processor() -> RawMachineConfig {
    serde_json::from_value(json!({
        "parallel": true,
        "states": {
            "bold": { "initial": "off", "states": { "off": {"on":{"TOGGLE_BOLD":"on"}}, "on": {"on":{"TOGGLE_BOLD":"off"}} } },
            "italics": { "initial": "off", "states": { "off": {"on":{"TOGGLE_ITALICS":"on"}}, "on": {"on":{"TOGGLE_ITALICS":"off"}} } },
        }
    }))
    .unwrap()
}

#[test]
fn every_leaf_of_the_value_names_a_real_node() {
    let definition =
        Machine::with_context::<(), StringEvent>(pedestrian_light(), MachineOptions::new(), ())
            .unwrap();
    let state = definition.initial_state();
    for path in state.value.to_paths() {
        let dotted = path.join(".");
        assert!(
            definition.find_by_path(&dotted).is_some(),
            "leaf path `{dotted}` does not name a node in the definition"
        );
    }
}

#[test]
fn parallel_ancestor_has_one_value_entry_per_region() {
    let definition =
        Machine::with_context::<(), StringEvent>(word_processor(), MachineOptions::new(), ())
            .unwrap();
    match definition.initial_state().value {
        Value::Nested(regions) => assert_eq!(regions.len(), 2),
        other => panic!("expected a parallel value, got {other:?}"),
    }
}

#[test]
fn no_matching_transition_leaves_value_and_context_unchanged() {
    let definition =
        Machine::with_context::<(), StringEvent>(pedestrian_light(), MachineOptions::new(), ())
            .unwrap();
    let state = definition.initial_state();
    let next = definition
        .transition(&state, StringEvent::from("NOT_A_REAL_EVENT"))
        .unwrap();
    assert_eq!(next.value, state.value);
    assert_eq!(next.context, state.context);
    assert!(!next.changed);
}

#[test]
fn transition_is_deterministic() {
    let definition =
        Machine::with_context::<(), StringEvent>(pedestrian_light(), MachineOptions::new(), ())
            .unwrap();
    let state = definition.initial_state();
    let a = definition.transition(&state, StringEvent::from("TIMER")).unwrap();
    let b = definition.transition(&state, StringEvent::from("TIMER")).unwrap();
    assert_eq!(a.value, b.value);
    assert_eq!(a.context, b.context);
    assert_eq!(a.actions, b.actions);
}

#[test]
fn initial_state_is_idempotent() {
    let definition =
        Machine::with_context::<(), StringEvent>(pedestrian_light(), MachineOptions::new(), ())
            .unwrap();
    let a = definition.initial_state();
    let b = definition.initial_state();
    assert_eq!(a.value, b.value);
    assert_eq!(a.context, b.context);
    assert_eq!(a.actions, b.actions);
}

#[test]
fn history_only_covers_ancestors_that_have_actually_been_exited() {
    let config: RawMachineConfig = serde_json::from_value(json!({
        "initial": "method",
        "states": {
            "method": {
                "initial": "cash",
                "on": { "GOTO_REVIEW": "review" },
                "states": {
                    "cash": { "on": { "NEXT": "check" } },
                    "check": { "on": { "NEXT": "cash" } },
                    "hist": { "history": "shallow", "target": "cash" },
                }
            },
            "review": { "on": { "PREVIOUS": "#method.hist" } },
        }
    }))
    .unwrap();
    let definition = Machine::with_context::<(), StringEvent>(config, MachineOptions::new(), ()).unwrap();
    let initial = definition.initial_state();
    assert!(initial.history.is_empty(), "nothing has been exited yet");
}

/// Renders a value with no orthogonal regions back into dotted notation
/// (the inverse of `Value::from_dotted` for that shape), so the round
/// trip law can be checked without leaning on `Display`'s brace format.
fn dotted_string_of(value: &Value) -> String {
    match value {
        Value::Leaf(name) => name.clone(),
        Value::Nested(children) => {
            let (key, child) = children.iter().next().expect("non-parallel value has one child");
            format!("{key}.{}", dotted_string_of(child))
        }
    }
}

proptest! {
    #[test]
    fn paths_to_value_inverts_to_paths_for_parallel_values(
        bold in prop::bool::ANY,
        italics in prop::bool::ANY,
    ) {
        let value = Value::nested([
            ("bold".to_string(), Value::leaf(if bold { "on" } else { "off" })),
            ("italics".to_string(), Value::leaf(if italics { "on" } else { "off" })),
        ]);
        let restored = Value::paths_to_value(&value.to_paths());
        prop_assert_eq!(&restored, &value);
    }

    #[test]
    fn from_dotted_inverts_a_hand_built_dotted_string(
        segments in prop::collection::vec("[a-z]{1,8}", 1..5),
    ) {
        let dotted = segments.join(".");
        let value = Value::from_dotted(&dotted, '.');
        let rebuilt = dotted_string_of(&value);
        prop_assert_eq!(Value::from_dotted(&rebuilt, '.'), value);
    }
}
