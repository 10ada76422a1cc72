//! Control Flow
//!
//! Everything a controller uses to structure its traversal: the per-pass
//! [`Context`], conditionals and loops that keep the data graph aligned
//! with the code's structure, the component tree that routes events, event
//! detection, content caching, and error containment.
//!
//! # Overview
//!
//! The controller is an ordinary function that re-runs on every pass. The
//! rules it has to follow are few:
//!
//! - Storage is requested through the context at stable positions.
//! - Anything that can change the sequence of storage requests (a branch,
//!   a loop, a switch) goes through one of the constructs in this module,
//!   which give each branch or item its own block.
//! - Errors are returned, never swallowed, unless explicitly contained by
//!   [`try_catch`] or [`isolate_errors`].

mod components;
mod conditionals;
mod content_caching;
mod context;
mod events;
mod iteration;
mod try_catch;

pub use components::{
    component_container, externalize, get_component_id, mark_animating, mark_animating_component,
    mark_dirty, mark_dirty_component, routing_path, ComponentContainer, ComponentId,
    ComponentIdentity, ContainerPtr, ExternalComponentId, RoutingPath, ScopedComponentContainer,
    ROUTING_PATH_INLINE,
};
pub use conditionals::{if_, if_else, if_signal, Condition};
pub use content_caching::invoke_pure_component;
pub use context::Context;
pub use events::{
    abort_traversal, detect_event, detect_targeted_event, event_handler, isolate_errors,
    on_activate, on_init, on_observed_value_change, on_refresh, on_value_change,
    targeted_event_handler, RefreshEvent, TargetedEvent,
};
pub use iteration::{
    for_each, for_each_keyed, named_block, naming_context, switch_on, NamingContext,
};
pub use try_catch::try_catch;

pub(crate) use components::ComponentRegistry;
pub(crate) use events::EventTraversal;
