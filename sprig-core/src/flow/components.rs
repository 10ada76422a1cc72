//! Component Containers
//!
//! Component containers form a tree that mirrors the live structure of the
//! UI. The tree exists for two reasons:
//!
//! 1. **Routing.** A targeted event carries the identity of one container.
//!    The path from that container to the root is computed up front, and
//!    during the pass only containers on that path execute their bodies.
//!
//! 2. **Invalidation.** When state beneath a container changes, the
//!    container and all of its ancestors are marked dirty so that cached
//!    content on the way down is revisited on the next refresh.
//!
//! # Ownership
//!
//! Each container is owned by the data node of the call site that created
//! it, and holds a strong link to its parent. Nothing holds strong links
//! downward, so reclaiming a data node reclaims the container beneath it.
//! Event targets only ever hold weak handles ([`ComponentIdentity`],
//! [`ExternalComponentId`]).

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use super::context::Context;
use crate::error::Result;

/// A node in the component tree.
pub struct ComponentContainer {
    serial: u64,
    parent: RefCell<Option<ContainerPtr>>,
    dirty: Cell<bool>,
    animating: Cell<bool>,
}

/// Strong, shared ownership of a container.
pub type ContainerPtr = Rc<ComponentContainer>;

/// A weak handle to a container. Never keeps it alive.
pub type ComponentIdentity = Weak<ComponentContainer>;

/// Inline capacity of a routing path before it spills to the heap.
pub const ROUTING_PATH_INLINE: usize = 16;

/// Containers from the root down to an event's target.
pub type RoutingPath = SmallVec<[ContainerPtr; ROUTING_PATH_INLINE]>;

impl Default for ComponentContainer {
    fn default() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            serial: COUNTER.fetch_add(1, Ordering::Relaxed),
            parent: RefCell::new(None),
            dirty: Cell::new(false),
            animating: Cell::new(false),
        }
    }
}

impl ComponentContainer {
    pub fn new() -> ContainerPtr {
        Rc::new(Self::default())
    }

    /// Diagnostic serial number, unique per container.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub fn parent(&self) -> Option<ContainerPtr> {
        self.parent.borrow().clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub fn is_animating(&self) -> bool {
        self.animating.get()
    }
}

impl std::fmt::Debug for ComponentContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentContainer")
            .field("serial", &self.serial)
            .field("dirty", &self.dirty.get())
            .field("animating", &self.animating.get())
            .finish()
    }
}

/// Mark `container` and its ancestors dirty.
///
/// Stops at the first container that is already dirty, since its ancestors
/// were marked when it was.
pub fn mark_dirty(container: &ContainerPtr) {
    let mut current = Some(container.clone());
    while let Some(node) = current {
        if node.dirty.replace(true) {
            break;
        }
        current = node.parent();
    }
}

/// Mark `container` and its ancestors as animating.
pub fn mark_animating(container: &ContainerPtr) {
    let mut current = Some(container.clone());
    while let Some(node) = current {
        if node.animating.replace(true) {
            break;
        }
        current = node.parent();
    }
}

/// Mark the active component dirty.
pub fn mark_dirty_component(ctx: &Context<'_>) {
    if let Some(container) = ctx.active_container() {
        mark_dirty(&container);
    }
}

/// Mark the active component as animating.
pub fn mark_animating_component(ctx: &Context<'_>) {
    if let Some(container) = ctx.active_container() {
        mark_animating(&container);
    }
}

/// Build the path from the root to `target`, root first.
pub fn routing_path(target: &ContainerPtr) -> RoutingPath {
    let mut path = RoutingPath::new();
    let mut current = Some(target.clone());
    while let Some(node) = current {
        current = node.parent();
        path.push(node);
    }
    path.reverse();
    path
}

// ----------------------------------------------------------------------------
// Scoped containers
// ----------------------------------------------------------------------------

/// Guard that makes a container active for the duration of a scope.
///
/// On entry the container is reparented under the previously active one if
/// necessary, its dirty and animating flags are latched and reset, and it
/// decides whether it is on the route of the current event. On drop the
/// previously active container is restored.
pub struct ScopedComponentContainer<'c, 'a> {
    ctx: &'c Context<'a>,
    container: ContainerPtr,
    parent: Option<ContainerPtr>,
    on_route: bool,
    dirty: bool,
    animating: bool,
}

impl<'c, 'a> ScopedComponentContainer<'c, 'a> {
    /// Enter the container stored at the current call site.
    pub fn new(ctx: &'c Context<'a>) -> Self {
        let (container, _) = ctx.get_data::<ComponentContainer>();
        Self::with_container(ctx, container)
    }

    /// Enter a container supplied by the caller.
    pub fn with_container(ctx: &'c Context<'a>, container: ContainerPtr) -> Self {
        let mut events = ctx.event_traversal_mut();

        let parent = events.active_container.clone();
        let reparent = match (&parent, &*container.parent.borrow()) {
            (Some(expected), Some(actual)) => !Rc::ptr_eq(expected, actual),
            (None, None) => false,
            _ => true,
        };
        if reparent {
            tracing::trace!(container = container.serial, "reparenting component container");
            *container.parent.borrow_mut() = parent.clone();
        }
        events.active_container = Some(container.clone());

        let dirty = container.dirty.replace(false);
        let animating = container.animating.replace(false);

        let on_route = if events.targeted {
            match events.path.get(events.path_cursor) {
                Some(head) if Rc::ptr_eq(head, &container) => {
                    events.path_cursor += 1;
                    true
                }
                _ => false,
            }
        } else {
            true
        };
        drop(events);

        Self {
            ctx,
            container,
            parent,
            on_route,
            dirty,
            animating,
        }
    }

    /// Whether the current event should descend into this container.
    pub fn is_on_route(&self) -> bool {
        self.on_route
    }

    /// Whether the container was dirty when entered.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the container was animating when entered.
    pub fn is_animating(&self) -> bool {
        self.animating
    }

    pub fn container(&self) -> &ContainerPtr {
        &self.container
    }
}

impl Drop for ScopedComponentContainer<'_, '_> {
    fn drop(&mut self) {
        self.ctx.event_traversal_mut().active_container = self.parent.take();
    }
}

/// Run `body` inside a component container at the current call site, but
/// only if the container is on the route of the current event.
pub fn component_container(
    ctx: &Context<'_>,
    body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    let scope = ScopedComponentContainer::new(ctx);
    if scope.is_on_route() {
        body(ctx)?;
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Component ids
// ----------------------------------------------------------------------------

/// Per call site record of which container a component lives in.
pub struct IdentitySlot {
    serial: u64,
    container: RefCell<ComponentIdentity>,
}

impl Default for IdentitySlot {
    fn default() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self {
            serial: COUNTER.fetch_add(1, Ordering::Relaxed),
            container: RefCell::new(Weak::new()),
        }
    }
}

/// Identifies a component within the controller. Compare with `==`.
#[derive(Clone)]
pub struct ComponentId(Rc<IdentitySlot>);

impl ComponentId {
    pub fn external(&self) -> ExternalComponentId {
        ExternalComponentId(self.0.serial)
    }

    /// The container this component was last seen in.
    pub fn identity(&self) -> ComponentIdentity {
        self.0.container.borrow().clone()
    }
}

impl PartialEq for ComponentId {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ComponentId {}

impl std::fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ComponentId({})", self.0.serial)
    }
}

/// A `Send` handle to a component, usable from outside the traversal (timer
/// callbacks, worker threads). Resolves to nothing once the component is
/// gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalComponentId(u64);

impl ExternalComponentId {
    /// A handle that never resolves.
    pub const NULL: ExternalComponentId = ExternalComponentId(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// Fetch the id of the component at the current call site.
///
/// On refresh passes the id is rebound to the active container, so it
/// follows the component if it moves.
pub fn get_component_id(ctx: &Context<'_>) -> ComponentId {
    let (slot, created) = ctx.get_data::<IdentitySlot>();
    if created || ctx.is_refresh() {
        let active = ctx.active_container();
        *slot.container.borrow_mut() = active.as_ref().map(Rc::downgrade).unwrap_or_default();
    }
    if created {
        ctx.system().registry.borrow_mut().register(&slot);
    }
    ComponentId(slot)
}

/// Convert a component id into its thread-safe form.
pub fn externalize(id: &ComponentId) -> ExternalComponentId {
    id.external()
}

/// Maps external ids back to live components.
#[derive(Default)]
pub(crate) struct ComponentRegistry {
    slots: HashMap<u64, Weak<IdentitySlot>>,
}

impl ComponentRegistry {
    fn register(&mut self, slot: &Rc<IdentitySlot>) {
        self.slots.insert(slot.serial, Rc::downgrade(slot));
    }

    /// Find the container currently associated with `id`.
    pub(crate) fn resolve(&self, id: ExternalComponentId) -> Option<ContainerPtr> {
        let slot = self.slots.get(&id.0)?.upgrade()?;
        let container = slot.container.borrow().upgrade();
        container
    }

    /// Forget every component whose call site has been reclaimed.
    pub(crate) fn prune(&mut self) {
        self.slots.retain(|_, slot| slot.strong_count() > 0);
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}
