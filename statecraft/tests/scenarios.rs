//! End-to-end scenarios, one per numbered case: flat FSM, hierarchical,
//! parallel, history, delayed send, cancelled delayed event, assign+log,
//! and the uninitialized-service error.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use statecraft::interpreter::{Service, SimulatedClock};
use statecraft::machine::{
    ActionRecord, ActionSpec, Machine, MachineOptions, RawMachineConfig, StringEvent, Text, Value,
};

fn timer_light() -> RawMachineConfig {
    serde_json::from_value(json!({
        "initial": "green",
        "states": {
            "green": { "on": { "TIMER": "yellow" } },
            "yellow": { "on": { "TIMER": "red" } },
            "red": { "on": { "TIMER": "green" } },
        }
    }))
    .unwrap()
}

#[rstest]
#[case("green", "yellow")]
#[case("yellow", "red")]
#[case("red", "green")]
fn scenario_1_flat_fsm(#[case] from: &str, #[case] to: &str) {
    let definition =
        Machine::with_context::<(), StringEvent>(timer_light(), MachineOptions::new(), ()).unwrap();
    let state = definition
        .configuration_from(Value::from_dotted(from, '.'), ())
        .unwrap();
    let next = definition.transition(&state, StringEvent::from("TIMER")).unwrap();
    assert_eq!(next.value, Value::leaf(to));
}

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

#[test]
fn scenario_2_hierarchical() {
    let definition =
        Machine::with_context::<(), StringEvent>(pedestrian_light(), MachineOptions::new(), ())
            .unwrap();

    let walking = definition
        .configuration_from(Value::nested([("red".into(), Value::leaf("walk"))]), ())
        .unwrap();
    let waiting = definition
        .transition(&walking, StringEvent::from("PED_TIMER"))
        .unwrap();
    assert_eq!(waiting.value, Value::nested([("red".into(), Value::leaf("wait"))]));

    let stopped = definition
        .configuration_from(Value::nested([("red".into(), Value::leaf("stop"))]), ())
        .unwrap();
    let green = definition.transition(&stopped, StringEvent::from("TIMER")).unwrap();
    assert_eq!(green.value, Value::leaf("green"));
}

fn toggle_region(off_event: &str, on_event: &str) -> serde_json::Value {
    json!({
        "initial": "off",
        "states": {
            "off": { "on": { on_event: "on" } },
            "on": { "on": { off_event: "off" } },
        }
    })
}

fn word_processor() -> RawMachineConfig {
    serde_json::from_value(json!({
        "parallel": true,
        "states": {
            "bold": toggle_region("TOGGLE_BOLD", "TOGGLE_BOLD"),
            "italics": toggle_region("TOGGLE_ITALICS", "TOGGLE_ITALICS"),
            "underline": toggle_region("TOGGLE_UNDERLINE", "TOGGLE_UNDERLINE"),
            "list": {
                "initial": "none",
                "states": {
                    "none": { "on": { "TOGGLE_LIST": "bullets" } },
                    "bullets": { "on": { "TOGGLE_LIST": "numbers" } },
                    "numbers": { "on": { "TOGGLE_LIST": "none" } },
                }
            },
        }
    }))
    .unwrap()
}

#[test]
fn scenario_3_parallel_regions_are_independent() {
    let definition =
        Machine::with_context::<(), StringEvent>(word_processor(), MachineOptions::new(), ())
            .unwrap();
    let initial = definition.initial_state();
    assert_eq!(
        initial.value,
        Value::nested([
            ("bold".into(), Value::leaf("off")),
            ("italics".into(), Value::leaf("off")),
            ("underline".into(), Value::leaf("off")),
            ("list".into(), Value::leaf("none")),
        ])
    );

    let toggled = definition
        .transition(&initial, StringEvent::from("TOGGLE_BOLD"))
        .unwrap();
    assert_eq!(
        toggled.value,
        Value::nested([
            ("bold".into(), Value::leaf("on")),
            ("italics".into(), Value::leaf("off")),
            ("underline".into(), Value::leaf("off")),
            ("list".into(), Value::leaf("none")),
        ])
    );
}

fn method_history() -> RawMachineConfig {
    serde_json::from_value(json!({
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
    .unwrap()
}

#[test]
fn scenario_4_history_restores_most_recently_visited() {
    let definition =
        Machine::with_context::<(), StringEvent>(method_history(), MachineOptions::new(), ())
            .unwrap();

    let cash = definition.initial_state();
    let checked = definition.transition(&cash, StringEvent::from("NEXT")).unwrap();
    assert_eq!(checked.value, Value::nested([("method".into(), Value::leaf("check"))]));

    let review = definition
        .transition(&checked, StringEvent::from("GOTO_REVIEW"))
        .unwrap();
    assert_eq!(review.value, Value::leaf("review"));

    let restored = definition
        .transition(&review, StringEvent::from("PREVIOUS"))
        .unwrap();
    assert_eq!(restored.value, Value::nested([("method".into(), Value::leaf("check"))]));
}

#[test]
fn scenario_4_history_defaults_when_nothing_recorded() {
    let definition =
        Machine::with_context::<(), StringEvent>(method_history(), MachineOptions::new(), ())
            .unwrap();
    let review = definition
        .configuration_from(Value::leaf("review"), ())
        .unwrap();
    let restored = definition.transition(&review, StringEvent::from("PREVIOUS")).unwrap();
    assert_eq!(restored.value, Value::nested([("method".into(), Value::leaf("cash"))]));
}

fn timer_chain(options: &mut MachineOptions<(), StringEvent>) -> RawMachineConfig {
    options.actions.insert(
        "schedule_timer".to_string(),
        ActionSpec::send_after("TIMER", 10, "green-timer"),
    );
    options
        .actions
        .insert("cancel_timer".to_string(), ActionSpec::cancel("green-timer"));

    serde_json::from_value(json!({
        "initial": "green",
        "states": {
            "green": {
                "entry": ["schedule_timer"],
                "on": {
                    "TIMER": "yellow",
                    "KEEP_GOING": { "target": "green", "internal": true, "actions": ["cancel_timer"] },
                }
            },
            "yellow": { "after": { "10": "red" } },
            "red": { "after": { "10": "green" } },
        }
    }))
    .unwrap()
}

#[test]
fn scenario_5_delayed_send_advances_through_the_cycle() {
    let mut options = MachineOptions::new();
    let config = timer_chain(&mut options);
    let definition = Machine::with_context::<(), StringEvent>(config, options, ()).unwrap();
    let mut service = Service::new(&definition, SimulatedClock::new());

    assert_eq!(service.start().value, Value::leaf("green"));
    service.advance(5).unwrap();
    assert_eq!(service.state().value, Value::leaf("green"));
    service.advance(5).unwrap();
    assert_eq!(service.state().value, Value::leaf("yellow"));
    service.advance(10).unwrap();
    assert_eq!(service.state().value, Value::leaf("red"));
    service.advance(10).unwrap();
    assert_eq!(service.state().value, Value::leaf("green"));
}

#[test]
fn scenario_6_keep_going_cancels_the_pending_timer() {
    let mut options = MachineOptions::new();
    let config = timer_chain(&mut options);
    let definition = Machine::with_context::<(), StringEvent>(config, options, ()).unwrap();
    let mut service = Service::new(&definition, SimulatedClock::new());

    service.start();
    service.send(StringEvent::from("KEEP_GOING")).unwrap();
    service.advance(10).unwrap();
    assert_eq!(service.state().value, Value::leaf("green"));
}

#[derive(Clone, Debug, Default, PartialEq)]
struct Counter {
    count: i32,
}

fn counting_machine(options: &mut MachineOptions<Counter, StringEvent>) -> RawMachineConfig {
    options.actions.insert(
        "increment".to_string(),
        ActionSpec::assign(|ctx: &mut Counter, _event| ctx.count += 1),
    );
    options.actions.insert(
        "log_count".to_string(),
        ActionSpec::Log {
            message: Text::Dynamic(Arc::new(|ctx: &Counter, _event| ctx.count.to_string())),
        },
    );

    serde_json::from_value(json!({
        "initial": "idle",
        "states": {
            "idle": {
                "on": {
                    "LOG": { "target": "idle", "internal": true, "actions": ["increment", "log_count"] },
                }
            },
        }
    }))
    .unwrap()
}

#[test]
fn scenario_7_assign_then_log_observes_the_updated_context() {
    let mut options = MachineOptions::new();
    let config = counting_machine(&mut options);
    let definition = Machine::with_context(config, options, Counter::default()).unwrap();

    let state = definition.initial_state();
    let first = definition.transition(&state, StringEvent::from("LOG")).unwrap();
    assert_eq!(first.context, Counter { count: 1 });
    assert_eq!(first.actions, vec![ActionRecord::log("1")]);

    let second = definition.transition(&first, StringEvent::from("LOG")).unwrap();
    assert_eq!(second.context, Counter { count: 2 });
    assert_eq!(second.actions, vec![ActionRecord::log("2")]);
}

#[test]
fn scenario_8_sending_before_start_is_an_error() {
    let definition =
        Machine::with_context::<(), StringEvent>(timer_light(), MachineOptions::new(), ()).unwrap();
    let mut service = Service::new(&definition, SimulatedClock::new());

    assert!(service.send(StringEvent::from("TIMER")).is_err());

    service.start();
    let before = service.state().value.clone();
    service.send(StringEvent::from("NOT_A_REAL_EVENT")).unwrap();
    assert_eq!(service.state().value, before);
}
