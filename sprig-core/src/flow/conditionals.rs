//! Conditionals
//!
//! Each branch of a conditional owns a data block. The taken branch runs
//! inside its block; an untaken branch's block is destroyed on passes that
//! collect garbage, and has its cache cleared on passes that only clear
//! caches. Either way, a branch that comes back later starts fresh.

use crate::error::Result;
use crate::graph::DataBlock;
use crate::reactive::ReadSignal;

use super::context::Context;

/// Something a conditional can branch on.
///
/// `None` means the condition is unknown (a signal without a value), in
/// which case no branch is taken.
pub trait Condition {
    fn test(&self) -> Option<bool>;
}

impl Condition for bool {
    fn test(&self) -> Option<bool> {
        Some(*self)
    }
}

impl<S: ReadSignal<Value = bool>> Condition for S {
    fn test(&self) -> Option<bool> {
        if self.has_value() {
            self.with(|value| *value).ok()
        } else {
            None
        }
    }
}

fn branch<R: Default>(
    ctx: &Context<'_>,
    taken: bool,
    body: impl FnOnce(&Context<'_>) -> Result<R>,
) -> Result<R> {
    let (block, _) = ctx.get_data::<DataBlock>();
    if taken {
        ctx.scoped_block(&block, body)
    } else {
        if ctx.gc_enabled() {
            if !block.is_empty() {
                tracing::trace!("destroying untaken branch");
            }
            block.clear();
        } else if ctx.cache_clearing_enabled() {
            block.clear_cache();
        }
        Ok(R::default())
    }
}

/// Run `body` if `condition` holds.
pub fn if_<C: Condition>(
    ctx: &Context<'_>,
    condition: C,
    body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    branch(ctx, condition.test() == Some(true), body)
}

/// Run `body` if `signal` has the value `true`.
pub fn if_signal<S: ReadSignal<Value = bool>>(
    ctx: &Context<'_>,
    signal: &S,
    body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    if_(ctx, signal, body)
}

/// Run `then_body` or `else_body` depending on `condition`. If the
/// condition is unknown, neither runs.
pub fn if_else<C: Condition>(
    ctx: &Context<'_>,
    condition: C,
    then_body: impl FnOnce(&Context<'_>) -> Result<()>,
    else_body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    let outcome = condition.test();
    branch(ctx, outcome == Some(true), then_body)?;
    branch(ctx, outcome == Some(false), else_body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, empty, get_state, ReadSignal, WriteSignal};
    use crate::system::System;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[test]
    fn untaken_branch_loses_its_state() {
        let show = Rc::new(Cell::new(true));
        let observed = Rc::new(RefCell::new(Vec::new()));
        let (s, o) = (show.clone(), observed.clone());
        let mut system = System::new(move |ctx| {
            if_(ctx, s.get(), |ctx| {
                let state = get_state(ctx, 0)?;
                o.borrow_mut().push(state.read()?);
                if state.read()? == 0 {
                    state.write(7)?;
                }
                Ok(())
            })
        });
        system.refresh().unwrap();
        show.set(false);
        system.refresh().unwrap();
        show.set(true);
        system.refresh().unwrap();

        // first refresh: 0 then 7 (the write dirties the component); last
        // refresh starts over from 0
        assert_eq!(*observed.borrow(), vec![0, 7, 0, 7]);
    }

    #[test]
    fn unknown_condition_takes_no_branch() {
        let taken = Rc::new(Cell::new(0));
        let t = taken.clone();
        let mut system = System::new(move |ctx| {
            let (a, b) = (t.clone(), t.clone());
            if_else(
                ctx,
                empty::<bool>(),
                move |_| {
                    a.set(a.get() + 1);
                    Ok(())
                },
                move |_| {
                    b.set(b.get() + 1);
                    Ok(())
                },
            )
        });
        system.refresh().unwrap();
        assert_eq!(taken.get(), 0);
    }

    #[test]
    fn signal_conditions_are_read() {
        let flag = Rc::new(RefCell::new(false));
        let hits = Rc::new(Cell::new(0));
        let (f, h) = (flag.clone(), hits.clone());
        let mut system = System::new(move |ctx| {
            if_signal(ctx, &direct(&*f), |_| {
                h.set(h.get() + 1);
                Ok(())
            })
        });
        system.refresh().unwrap();
        assert_eq!(hits.get(), 0);
        *flag.borrow_mut() = true;
        system.refresh().unwrap();
        assert_eq!(hits.get(), 1);
    }
}
