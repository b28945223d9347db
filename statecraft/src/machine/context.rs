//! Context & Assignment (§4.3): assignments fold left-to-right over the
//! running context. Each assignment is "a whole-context function
//! `(ctx,event)->partial` whose result is merged over `ctx`" — realized
//! in Rust as `Fn(&mut C, &Event<E>)`, mutating the accumulator directly
//! rather than returning a separate partial value, since that is the
//! natural "merge partial record into whole" operation (§9) for a
//! statically typed, opaque context.
//!
//! The stepper (§4.5 step 4) is the sole caller: it walks a step's full
//! action list in order and applies each `assign` here as it's reached,
//! so non-assign actions keep their position relative to the assigns
//! that ran before them.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use super::event::Event;
use crate::error::StatechartError;

/// Applies a single assignment action to `ctx`, catching panics per §7.
pub fn apply_assign<C, E>(
    assign: &Arc<dyn Fn(&mut C, &Event<E>) + Send + Sync>,
    ctx: &mut C,
    event: &Event<E>,
) -> Result<(), StatechartError> {
    catch_unwind(AssertUnwindSafe(|| assign(ctx, event)))
        .map_err(|_| StatechartError::Execution("assign action panicked".to_string()))
}
