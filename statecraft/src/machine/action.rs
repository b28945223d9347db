//! Action & activity schedule (§4.6): the closed nine-kind action
//! universe. `ActionSpec` is the definition-time value (may hold closures
//! for `assign`/`pure`/dynamic `send`/`log` fields); `ActionRecord` is the
//! fully-resolved, data-only value the stepper appends to a
//! configuration's action list for the interpreter to dispatch.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::event::Event;
use crate::error::StatechartError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A field that is either a literal or an expression evaluated against
/// the step's final context and event (§4.5 step 5).
#[derive(Clone)]
pub enum Text<C, E> {
    Static(String),
    Dynamic(Arc<dyn Fn(&C, &Event<E>) -> String + Send + Sync>),
}

impl<C, E> Text<C, E> {
    pub fn resolve(&self, ctx: &C, event: &Event<E>) -> String {
        match self {
            Text::Static(s) => s.clone(),
            Text::Dynamic(f) => f(ctx, event),
        }
    }
}

impl<C, E> fmt::Debug for Text<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Text::Static(s) => write!(f, "Text::Static({s:?})"),
            Text::Dynamic(_) => write!(f, "Text::Dynamic(..)"),
        }
    }
}

impl<C, E> From<&str> for Text<C, E> {
    fn from(s: &str) -> Self {
        Text::Static(s.to_string())
    }
}

impl<C, E> From<String> for Text<C, E> {
    fn from(s: String) -> Self {
        Text::Static(s)
    }
}

/// Definition-time action value. Built directly via the constructors
/// below (Rust-native machines), or resolved from a bare name against
/// `MachineOptions::actions` when a machine is loaded from a parsed
/// config document (§6 Options: `actions: map<name, fn>`).
#[derive(Clone)]
pub enum ActionSpec<C, E> {
    Raise(Text<C, E>),
    Send {
        event: Text<C, E>,
        delay_ms: Option<u64>,
        id: Option<String>,
        to: Option<String>,
    },
    Cancel(Text<C, E>),
    Log {
        message: Text<C, E>,
    },
    Start(String),
    Stop(String),
    /// Executed inside the pure core: the only action kind permitted to
    /// mutate the context (§4.3, §4.5 step 4).
    Assign(Arc<dyn Fn(&mut C, &Event<E>) + Send + Sync>),
    /// Executed inside the pure core against the step's final context;
    /// expands into zero or more `ActionRecord`s in place (§4.6).
    Pure(Arc<dyn Fn(&C, &Event<E>) -> Vec<ActionRecord> + Send + Sync>),
    Invoke {
        src: String,
        id: String,
    },
    /// A name to be resolved against `MachineOptions::actions` at load
    /// time. Never appears in a loaded `Definition`.
    Named(String),
}

impl<C, E> ActionSpec<C, E> {
    pub fn raise(event_type: impl Into<Text<C, E>>) -> Self {
        ActionSpec::Raise(event_type.into())
    }

    pub fn send(event_type: impl Into<Text<C, E>>) -> Self {
        ActionSpec::Send {
            event: event_type.into(),
            delay_ms: None,
            id: None,
            to: None,
        }
    }

    pub fn send_after(event_type: impl Into<Text<C, E>>, delay_ms: u64, id: impl Into<String>) -> Self {
        ActionSpec::Send {
            event: event_type.into(),
            delay_ms: Some(delay_ms),
            id: Some(id.into()),
            to: None,
        }
    }

    pub fn cancel(id: impl Into<Text<C, E>>) -> Self {
        ActionSpec::Cancel(id.into())
    }

    pub fn log(message: impl Into<Text<C, E>>) -> Self {
        ActionSpec::Log {
            message: message.into(),
        }
    }

    pub fn assign<F>(f: F) -> Self
    where
        F: Fn(&mut C, &Event<E>) + Send + Sync + 'static,
    {
        ActionSpec::Assign(Arc::new(f))
    }

    pub fn pure<F>(f: F) -> Self
    where
        F: Fn(&C, &Event<E>) -> Vec<ActionRecord> + Send + Sync + 'static,
    {
        ActionSpec::Pure(Arc::new(f))
    }

    pub fn invoke(src: impl Into<String>, id: impl Into<String>) -> Self {
        ActionSpec::Invoke {
            src: src.into(),
            id: id.into(),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        ActionSpec::Named(name.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ActionSpec::Raise(_) => "raise",
            ActionSpec::Send { .. } => "send",
            ActionSpec::Cancel(_) => "cancel",
            ActionSpec::Log { .. } => "log",
            ActionSpec::Start(_) => "start",
            ActionSpec::Stop(_) => "stop",
            ActionSpec::Assign(_) => "assign",
            ActionSpec::Pure(_) => "pure",
            ActionSpec::Invoke { .. } => "invoke",
            ActionSpec::Named(_) => "named",
        }
    }

    /// Runs this action against the running context. `assign` mutates
    /// `ctx` in place; every other kind resolves to zero or more
    /// `ActionRecord`s appended to `out`. Panics inside `assign`/`pure`
    /// are caught and converted to `StatechartError::Execution` (§7).
    pub fn resolve(&self, ctx: &mut C, event: &Event<E>, out: &mut Vec<ActionRecord>) -> Result<(), StatechartError> {
        match self {
            ActionSpec::Raise(text) => out.push(ActionRecord::Raise {
                event: text.resolve(ctx, event),
            }),
            ActionSpec::Send { event: text, delay_ms, id, to } => out.push(ActionRecord::Send {
                event: text.resolve(ctx, event),
                delay_ms: *delay_ms,
                id: id.clone().unwrap_or_default(),
                to: to.clone(),
            }),
            ActionSpec::Cancel(text) => out.push(ActionRecord::Cancel {
                id: text.resolve(ctx, event),
            }),
            ActionSpec::Log { message } => out.push(ActionRecord::Log {
                message: message.resolve(ctx, event),
            }),
            ActionSpec::Start(activity) => out.push(ActionRecord::Start {
                activity: activity.clone(),
            }),
            ActionSpec::Stop(activity) => out.push(ActionRecord::Stop {
                activity: activity.clone(),
            }),
            ActionSpec::Assign(f) => {
                let result = catch_unwind(AssertUnwindSafe(|| f(ctx, event)));
                if result.is_err() {
                    return Err(StatechartError::Execution(
                        "assign action panicked".to_string(),
                    ));
                }
            }
            ActionSpec::Pure(f) => {
                let result = catch_unwind(AssertUnwindSafe(|| f(ctx, event)));
                match result {
                    Ok(records) => out.extend(records),
                    Err(_) => {
                        return Err(StatechartError::Execution(
                            "pure action panicked".to_string(),
                        ))
                    }
                }
            }
            ActionSpec::Invoke { src, id } => out.push(ActionRecord::Invoke {
                src: src.clone(),
                id: id.clone(),
            }),
            ActionSpec::Named(name) => {
                return Err(StatechartError::InvalidDefinition(format!(
                    "unresolved named action `{name}` — register it in MachineOptions::actions"
                )))
            }
        }
        Ok(())
    }
}

impl<C, E> fmt::Debug for ActionSpec<C, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ActionSpec::{}", self.kind())
    }
}

/// A fully-resolved action, ready for the interpreter to dispatch. This
/// is what appears in `Configuration::actions`; `assign` is never
/// represented here (§4.5 step 4 strips it after folding).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind"))]
pub enum ActionRecord {
    Raise { event: String },
    Send {
        event: String,
        delay_ms: Option<u64>,
        id: String,
        to: Option<String>,
    },
    Cancel { id: String },
    Log { message: String },
    Start { activity: String },
    Stop { activity: String },
    Invoke { src: String, id: String },
}

impl ActionRecord {
    pub fn log(message: impl Into<String>) -> Self {
        ActionRecord::Log {
            message: message.into(),
        }
    }

    pub fn raise(event: impl Into<String>) -> Self {
        ActionRecord::Raise {
            event: event.into(),
        }
    }
}
