//! The pure statechart core (§1-§4): a normalized `Definition` plus the
//! stateless `initial_state`/`transition` functions that walk it. Nothing
//! under this module performs I/O, spawns a timer, or calls an external
//! service — `send`/`invoke`/`start` resolve to `ActionRecord`s for the
//! interpreter (`crate::interpreter`) to dispatch.

mod action;
mod builder;
mod config;
mod configuration;
mod context;
mod definition;
mod event;
mod guard;
mod history;
mod node;
mod selector;
mod stepper;
mod value;

pub use action::{ActionRecord, ActionSpec, Text};
pub use builder::Machine;
pub use config::{
    MachineOptions, RawActions, RawMachineConfig, RawStateNode, RawTargetSpec, RawTransitionSpec,
    RawTransitionValue,
};
pub use configuration::Configuration;
pub use definition::Definition;
pub use event::{Event, EventKind, StringEvent, ALWAYS_EVENT, WILDCARD_EVENT};
pub use guard::GuardSpec;
pub use history::HistoryValue;
pub use node::{AfterTimer, HistoryKind, NodeId, NodeKind, StateNode, Transition};
pub use value::Value;
