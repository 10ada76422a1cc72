//! Content Caching
//!
//! A pure component is a subtree whose output depends only on an explicit
//! identity (usually the combined value ids of its arguments) and on the
//! state beneath it. On refresh passes it is skipped entirely unless
//! something it depends on changed.
//!
//! # When the Body Runs
//!
//! On a refresh pass, in order of precedence:
//!
//! 1. If the component's container is dirty or animating, the body runs.
//! 2. If the identity differs from the one captured last time (or the
//!    context's content id changed), the body runs.
//! 3. If the last run failed, the stored error is returned again without
//!    running the body.
//! 4. Otherwise nothing happens and the previous content stands.
//!
//! On any other pass the body runs if the container is on the event's
//! route.

use std::cell::RefCell;

use crate::error::{Error, Result};
use crate::graph::DataBlock;
use crate::id::{combine_ids, CapturedId, IdInterface};

use super::components::ScopedComponentContainer;
use super::context::Context;

#[derive(Default)]
struct PureComponentCache {
    input: CapturedId,
    error: Option<Error>,
}

/// Run `body` as a pure component keyed by `id`.
pub fn invoke_pure_component<I: IdInterface>(
    ctx: &Context<'_>,
    id: I,
    body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    let (cache, _) = ctx.get_data::<RefCell<PureComponentCache>>();
    let (block, _) = ctx.get_data::<DataBlock>();
    let scope = ScopedComponentContainer::new(ctx);
    if !scope.is_on_route() {
        return Ok(());
    }

    if !ctx.is_refresh() {
        return ctx.scoped_block(&block, body);
    }

    let key = combine_ids(ctx.content_id(), id);
    let stale = scope.is_dirty() || scope.is_animating() || !cache.borrow().input.matches(&key);
    if !stale {
        return match &cache.borrow().error {
            Some(error) => Err(error.clone()),
            None => {
                tracing::trace!(container = scope.container().serial(), "pure component unchanged");
                Ok(())
            }
        };
    }

    {
        let mut cache = cache.borrow_mut();
        cache.input.capture(&key);
        cache.error = None;
    }
    let result = ctx.scoped_block(&block, body);
    if let Err(error) = &result {
        if !error.is_traversal_control() {
            cache.borrow_mut().error = Some(error.clone());
        }
    }
    result
}
