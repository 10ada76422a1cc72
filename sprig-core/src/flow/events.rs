//! Events
//!
//! Events are plain structs. The dispatcher identifies them by type, so any
//! `'static` type can serve as an event; a *targeted* event additionally
//! names the component it is aimed at through [`TargetedEvent`].
//!
//! # How Dispatch Works
//!
//! 1. The system builds an [`EventTraversal`] describing the pass: whether
//!    it is a refresh, and for targeted events the routing path from the
//!    root to the target.
//!
//! 2. The controller runs. Component containers consult the traversal to
//!    decide whether to execute their bodies.
//!
//! 3. Handlers detect the event by type (and target), handle it, and may
//!    call [`abort_traversal`] to skip the rest of the pass. The resulting
//!    [`Error::TraversalAborted`] is swallowed at the dispatch boundary.

use std::cell::{Cell, RefCell, RefMut};

use super::components::{
    mark_dirty_component, ComponentId, ContainerPtr, ExternalComponentId, RoutingPath,
};
use super::context::Context;
use crate::action::{perform_action, Action};
use crate::error::{Error, Result};
use crate::id::CapturedId;
use crate::reactive::ReadSignal;

/// Per-pass routing state.
pub(crate) struct EventTraversal {
    pub(crate) active_container: Option<ContainerPtr>,
    pub(crate) targeted: bool,
    pub(crate) path: RoutingPath,
    pub(crate) path_cursor: usize,
    pub(crate) is_refresh: bool,
    pub(crate) aborted: bool,
}

impl EventTraversal {
    pub(crate) fn untargeted(is_refresh: bool) -> Self {
        Self {
            active_container: None,
            targeted: false,
            path: RoutingPath::new(),
            path_cursor: 0,
            is_refresh,
            aborted: false,
        }
    }

    pub(crate) fn targeted(path: RoutingPath) -> Self {
        Self {
            active_container: None,
            targeted: true,
            path,
            path_cursor: 0,
            is_refresh: false,
            aborted: false,
        }
    }
}

/// The event that drives a refresh pass. Refresh passes are the only ones
/// that collect garbage and clear caches.
#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshEvent;

/// An event aimed at a single component.
pub trait TargetedEvent: 'static {
    fn target(&self) -> ExternalComponentId;
}

// ----------------------------------------------------------------------------
// Detection
// ----------------------------------------------------------------------------

/// Borrow the current event if it is an `E`.
pub fn detect_event<'c, E: 'static>(ctx: &'c Context<'_>) -> Option<RefMut<'c, E>> {
    ctx.event::<E>()
}

/// Borrow the current event if it is an `E` aimed at `id`.
pub fn detect_targeted_event<'c, E: TargetedEvent>(
    ctx: &'c Context<'_>,
    id: &ComponentId,
) -> Option<RefMut<'c, E>> {
    let event = ctx.event::<E>()?;
    (event.target() == id.external()).then_some(event)
}

/// Run `handler` if the current event is an `E`.
pub fn event_handler<E: 'static>(
    ctx: &Context<'_>,
    handler: impl FnOnce(&Context<'_>, &mut E) -> Result<()>,
) -> Result<()> {
    match detect_event::<E>(ctx) {
        Some(mut event) => handler(ctx, &mut event),
        None => Ok(()),
    }
}

/// Run `handler` if the current event is an `E` aimed at `id`, then end
/// the pass.
pub fn targeted_event_handler<E: TargetedEvent>(
    ctx: &Context<'_>,
    id: &ComponentId,
    handler: impl FnOnce(&Context<'_>, &mut E) -> Result<()>,
) -> Result<()> {
    let Some(mut event) = detect_targeted_event::<E>(ctx, id) else {
        return Ok(());
    };
    handler(ctx, &mut event)?;
    drop(event);
    abort_traversal(ctx)
}

/// Stop processing the current event.
///
/// Always returns `Err(Error::TraversalAborted)`, which the dispatcher
/// treats as success. Must not be used during refresh passes, which are
/// required to visit the whole tree.
pub fn abort_traversal<T>(ctx: &Context<'_>) -> Result<T> {
    debug_assert!(!ctx.is_refresh(), "refresh passes cannot be aborted");
    ctx.event_traversal_mut().aborted = true;
    Err(Error::TraversalAborted)
}

/// Run `body` with errors handed to the system's error handler instead of
/// aborting the pass. Without a handler, errors propagate as usual.
pub fn isolate_errors(ctx: &Context<'_>, body: impl FnOnce() -> Result<()>) -> Result<()> {
    match body() {
        Ok(()) => Ok(()),
        Err(error) if error.is_traversal_control() => Err(error),
        Err(error) => ctx.system().report_error(error),
    }
}

// ----------------------------------------------------------------------------
// Lifecycle hooks
// ----------------------------------------------------------------------------

/// Perform `action` during the first refresh in which this call site is
/// visited and the action is ready.
pub fn on_init<A: Action>(ctx: &Context<'_>, action: &A) -> Result<()> {
    let (initialized, _) = ctx.get_data::<Cell<bool>>();
    if ctx.is_refresh() && !initialized.get() && action.is_ready() {
        initialized.set(true);
        isolate_errors(ctx, || perform_action(action, ()))?;
        mark_dirty_component(ctx);
    }
    Ok(())
}

/// Perform `action` whenever this call site becomes active again, i.e. the
/// first refresh after it was created or after its cache was cleared.
pub fn on_activate<A: Action>(ctx: &Context<'_>, action: &A) -> Result<()> {
    let (active, _) = ctx.get_cached_data::<Cell<bool>>();
    if ctx.is_refresh() && !active.get() && action.is_ready() {
        active.set(true);
        isolate_errors(ctx, || perform_action(action, ()))?;
        mark_dirty_component(ctx);
    }
    Ok(())
}

/// Run `body` on every refresh pass.
pub fn on_refresh(ctx: &Context<'_>, body: impl FnOnce(&Context<'_>) -> Result<()>) -> Result<()> {
    if ctx.is_refresh() {
        body(ctx)?;
    }
    Ok(())
}

#[derive(Default)]
struct ChangeDetection {
    id: CapturedId,
    observed: bool,
}

fn value_change_logic<S, A>(
    ctx: &Context<'_>,
    signal: &S,
    action: &A,
    fire_on_first: bool,
) -> Result<()>
where
    S: ReadSignal,
    A: Action,
{
    let (data, _) = ctx.get_cached_data::<RefCell<ChangeDetection>>();
    if !ctx.is_refresh() {
        return Ok(());
    }
    let changed = {
        let mut data = data.borrow_mut();
        let first = !std::mem::replace(&mut data.observed, true);
        if signal.has_value() {
            let id = signal.value_id();
            if data.id.matches(&id) {
                false
            } else {
                data.id.capture(&id);
                !first || fire_on_first
            }
        } else if data.id.is_initialized() {
            data.id.clear();
            !first || fire_on_first
        } else {
            first && fire_on_first
        }
    };
    if changed && action.is_ready() {
        isolate_errors(ctx, || perform_action(action, ()))?;
        mark_dirty_component(ctx);
    }
    Ok(())
}

/// Perform `action` whenever the value of `signal` changes, including the
/// first time it is observed.
pub fn on_value_change<S: ReadSignal, A: Action>(
    ctx: &Context<'_>,
    signal: &S,
    action: &A,
) -> Result<()> {
    value_change_logic(ctx, signal, action, true)
}

/// Perform `action` whenever the value of `signal` changes after it was
/// first observed.
pub fn on_observed_value_change<S: ReadSignal, A: Action>(
    ctx: &Context<'_>,
    signal: &S,
    action: &A,
) -> Result<()> {
    value_change_logic(ctx, signal, action, false)
}
