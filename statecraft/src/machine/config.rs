//! The "already-parsed definition object" the engine ingests (§1, §4.2):
//! a serde-deserializable raw config tree plus the `MachineOptions` used
//! to resolve named actions/guards into executable values (§6 Options).
//!
//! Building a `Definition` straight from Rust (no serde document in
//! sight) is also supported — construct `RawMachineConfig`/`RawStateNode`
//! as struct literals and hand them to `machine::builder::Machine`.

use std::collections::HashMap;

use indexmap::IndexMap;

use super::action::ActionSpec;
use super::guard::GuardSpec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The root of a raw machine definition, as it would arrive after
/// parsing a JSON/YAML document (the engine never parses SCXML or any
/// wire format itself — only an already-structured tree, §1).
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMachineConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub id: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parallel: bool,
    /// Order-preserving: §3 "ordered list of children (insertion order is
    /// document order and matters for tie-breaking)" — a plain `HashMap`
    /// would silently discard that order.
    #[cfg_attr(feature = "serde", serde(default))]
    pub states: IndexMap<String, RawStateNode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on: HashMap<String, RawTransitionValue>,
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawStateNode {
    #[cfg_attr(feature = "serde", serde(default))]
    pub initial: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub parallel: bool,
    #[cfg_attr(feature = "serde", serde(rename = "final", default))]
    pub is_final: bool,
    /// `"shallow"` or `"deep"` marks this node as a history node (§4.2
    /// "History markers become nodes of kind `history`").
    #[cfg_attr(feature = "serde", serde(default))]
    pub history: Option<String>,
    /// Default target for a history node when nothing has been recorded.
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub states: IndexMap<String, RawStateNode>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on: HashMap<String, RawTransitionValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub entry: RawActions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub exit: RawActions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub activities: Vec<String>,
    /// Keyed by delay in milliseconds as a string (serde map keys are
    /// strings), expanded per §4.2 `after: { N: target }`.
    #[cfg_attr(feature = "serde", serde(default))]
    pub after: HashMap<String, RawTransitionValue>,
    #[cfg_attr(feature = "serde", serde(default, rename = "onDone"))]
    pub on_done: Option<RawTransitionValue>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub tags: Vec<String>,
}

/// Action names attached to a node or transition. §4.2: "Actions given
/// as a single value are wrapped in a one-element list" — so this
/// deserializes from either a bare string or an array of strings.
#[derive(Debug, Clone, Default)]
pub struct RawActions(pub Vec<String>);

#[cfg(feature = "serde")]
impl Serialize for RawActions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de> Deserialize<'de> for RawActions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            One(String),
            Many(Vec<String>),
        }
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::One(s) => RawActions(vec![s]),
            OneOrMany::Many(v) => RawActions(v),
        })
    }
}

/// Transition shorthand `EVENT: "target"` or the full object form
/// `{ target, actions, cond, internal }` (§4.2).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawTransitionValue {
    Target(String),
    Targets(Vec<String>),
    Full(RawTransitionSpec),
    Multi(Vec<RawTransitionSpec>),
}

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawTransitionSpec {
    #[cfg_attr(feature = "serde", serde(default))]
    pub target: Option<RawTargetSpec>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub actions: RawActions,
    #[cfg_attr(feature = "serde", serde(default))]
    pub cond: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub internal: bool,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum RawTargetSpec {
    One(String),
    Many(Vec<String>),
}

impl RawTargetSpec {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            RawTargetSpec::One(s) => vec![s],
            RawTargetSpec::Many(v) => v,
        }
    }
}

/// Options resolving names in the definition to executable Rust values
/// (§6 Options), plus the non-default configuration knobs.
pub struct MachineOptions<C, E> {
    pub actions: HashMap<String, ActionSpec<C, E>>,
    pub guards: HashMap<String, GuardSpec<C, E>>,
    /// Activity starters are not invoked by the pure core (§1: effect
    /// execution is the interpreter's job) — this registry exists only
    /// so `Machine::new` can validate that every `activities` name used
    /// in the definition has a registered starter, catching typos at
    /// load time rather than silently no-opping at run time.
    pub activities: HashMap<String, ()>,
    pub delimiter: char,
    /// When true, an event matching no transition anywhere in the active
    /// configuration is `InvalidEvent` rather than a silent no-op ([ADDED]
    /// §4.5, XState "strict machine" behavior).
    pub strict: bool,
}

impl<C, E> Default for MachineOptions<C, E> {
    fn default() -> Self {
        Self {
            actions: HashMap::new(),
            guards: HashMap::new(),
            activities: HashMap::new(),
            delimiter: '.',
            strict: false,
        }
    }
}

impl<C, E> MachineOptions<C, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(mut self, name: impl Into<String>, action: ActionSpec<C, E>) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    pub fn with_guard(mut self, name: impl Into<String>, guard: GuardSpec<C, E>) -> Self {
        self.guards.insert(name.into(), guard);
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}
