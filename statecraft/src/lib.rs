//! # statecraft
//!
//! A statechart engine core: hierarchical and parallel states, history,
//! guards, entry/exit actions, delayed events, and activities, driven by
//! a pure transition function — no I/O, no threads, no hidden state.
//!
//! The engine computes `initial_state` and `transition` only; scheduling
//! events, driving a clock, and executing side effects is the job of an
//! interpreter sitting on top (a reference one ships in
//! [`interpreter`] for tests and simple embeddings).
//!
//! ```
//! use statecraft::machine::{
//!     Machine, MachineOptions, RawMachineConfig, RawStateNode, RawTransitionValue, StringEvent,
//! };
//!
//! let mut states = std::collections::HashMap::new();
//! states.insert("green".to_string(), RawStateNode {
//!     on: [("TIMER".to_string(), RawTransitionValue::Target("yellow".to_string()))]
//!         .into_iter()
//!         .collect(),
//!     ..Default::default()
//! });
//! states.insert("yellow".to_string(), RawStateNode::default());
//!
//! let config = RawMachineConfig {
//!     initial: Some("green".to_string()),
//!     states,
//!     ..Default::default()
//! };
//!
//! let definition = Machine::with_context::<(), StringEvent>(config, MachineOptions::new(), ()).unwrap();
//! let state = definition.initial_state();
//! assert!(state.matches("green", '.'));
//! ```

pub mod error;
pub mod interpreter;
pub mod machine;

pub use error::{StatechartError, StateResult};
