//! Try/Catch
//!
//! A try block runs its body and, if the body fails, shows the catch body
//! instead. The error is remembered per call site, so the catch body keeps
//! running (and can handle events) until the next refresh gives the try
//! body another chance.

use std::cell::{Cell, RefCell};

use crate::error::{Error, Result};
use crate::graph::DataBlock;

use super::context::Context;

#[derive(Default)]
struct TryBlockData {
    error: RefCell<Option<Error>>,
    last_refresh: Cell<u64>,
}

/// Run `try_body`; if it fails, run `catch_body` with the error.
///
/// Traversal control (an aborted event pass) is never caught.
pub fn try_catch(
    ctx: &Context<'_>,
    try_body: impl FnOnce(&Context<'_>) -> Result<()>,
    catch_body: impl FnOnce(&Context<'_>, &Error) -> Result<()>,
) -> Result<()> {
    let (data, _) = ctx.get_data::<TryBlockData>();
    let (try_block, _) = ctx.get_data::<DataBlock>();
    let (catch_block, _) = ctx.get_data::<DataBlock>();

    // a new refresh gives the try body another chance
    if ctx.is_refresh() && data.last_refresh.replace(ctx.refresh_counter()) != ctx.refresh_counter()
    {
        data.error.borrow_mut().take();
    }

    if data.error.borrow().is_none() {
        match ctx.scoped_block(&try_block, try_body) {
            Ok(()) => {
                if ctx.gc_enabled() {
                    catch_block.clear();
                }
                return Ok(());
            }
            Err(error) if error.is_traversal_control() => return Err(error),
            Err(error) => {
                tracing::debug!(%error, "try block failed");
                *data.error.borrow_mut() = Some(error);
            }
        }
    }

    let error = data.error.borrow().clone();
    match error {
        Some(error) => ctx.scoped_block(&catch_block, |ctx| catch_body(ctx, &error)),
        None => Ok(()),
    }
}
