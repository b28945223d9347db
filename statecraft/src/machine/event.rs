//! Event descriptors (§6): user events plus the built-in sentinel and
//! synthesized event types the engine raises internally.

use std::fmt;

/// Implemented by a caller's event type so the engine can read its wire
/// type without knowing its payload shape. `StringEvent` below is the
/// bare-string implementation for machines that carry no payload.
pub trait EventKind: Clone + fmt::Debug {
    fn event_type(&self) -> &str;
}

/// A plain string event, for machines whose events carry no payload
/// (scenarios 1, 2, 3, 4, 5, 6 in §8 all use these).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StringEvent(pub String);

impl EventKind for StringEvent {
    fn event_type(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StringEvent {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StringEvent {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for StringEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The event that produced a configuration: either a user event, or one
/// of the engine's own synthesized/sentinel events (`xstate.init`,
/// `done.state.<id>`, `xstate.after(N,id)`, `error.execution`) which carry
/// only a type string, no user payload.
#[derive(Debug, Clone)]
pub enum Event<E> {
    User(E),
    Sentinel(String),
}

impl<E: EventKind> Event<E> {
    pub fn event_type(&self) -> &str {
        match self {
            Event::User(e) => e.event_type(),
            Event::Sentinel(s) => s,
        }
    }

    pub fn init() -> Self {
        Event::Sentinel(INIT_EVENT.to_string())
    }

    pub fn done_state(node_id: &str) -> Self {
        Event::Sentinel(format!("{DONE_STATE_PREFIX}{node_id}"))
    }

    pub fn done_invoke(invoke_id: &str) -> Self {
        Event::Sentinel(format!("{DONE_INVOKE_PREFIX}{invoke_id}"))
    }

    pub fn error_platform(id: &str) -> Self {
        Event::Sentinel(format!("{ERROR_PLATFORM_PREFIX}{id}"))
    }

    pub fn error_execution() -> Self {
        Event::Sentinel("error.execution".to_string())
    }

    pub fn after(delay_ms: u64, node_id: &str) -> Self {
        Event::Sentinel(after_event_type(delay_ms, node_id))
    }
}

impl<E> From<E> for Event<E> {
    fn from(e: E) -> Self {
        Event::User(e)
    }
}

/// Reserved prefixes (§6): built-in event types never usable as a
/// user-chosen event name without colliding with engine semantics.
pub const INIT_EVENT: &str = "xstate.init";
pub const DONE_STATE_PREFIX: &str = "done.state.";
pub const DONE_INVOKE_PREFIX: &str = "done.invoke.";
pub const ERROR_PLATFORM_PREFIX: &str = "error.platform.";
pub const AFTER_PREFIX: &str = "xstate.after";

/// Reserved event key for guard-less, eventless ("always") transitions
/// (§4.4 [ADDED]): never producible by a real event since the public API
/// rejects empty type strings.
pub const ALWAYS_EVENT: &str = "";

/// Wildcard transition key (§4.4 step 2).
pub const WILDCARD_EVENT: &str = "*";

/// Builds the stable `xstate.after(N,id)` event type used for a node's
/// `after` timers, so cancellation-on-exit can look the id back up (§9
/// "Event identity").
pub fn after_event_type(delay_ms: u64, node_id: &str) -> String {
    format!("{AFTER_PREFIX}({delay_ms},{node_id})")
}

pub fn is_reserved_event_type(event_type: &str) -> bool {
    event_type.starts_with("xstate.")
        || event_type.starts_with(DONE_STATE_PREFIX)
        || event_type.starts_with(DONE_INVOKE_PREFIX)
        || event_type.starts_with(ERROR_PLATFORM_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_event_type_is_stable() {
        assert_eq!(after_event_type(10, "red"), "xstate.after(10,red)");
        assert_eq!(after_event_type(10, "red"), after_event_type(10, "red"));
    }
}
