//! Loops and Named Blocks
//!
//! Loops cannot rely on position-keyed storage: removing the first item of a
//! list would shift every other item's storage by one. Instead, each item
//! runs inside a named block keyed by an identity (the index, or a key the
//! caller derives from the item), so storage follows the key.
//!
//! # Garbage Collection
//!
//! A [`NamingContext`] records which keys were visited. When it closes at
//! the end of a successful garbage-collecting pass, the blocks of keys that
//! were not visited are destroyed.

use std::rc::Rc;

use crate::error::Result;
use crate::graph::NamingSlot;
use crate::id::{make_id, IdInterface, IdValue};
use crate::reactive::{element, Element, ReadSignal};

use super::context::Context;

/// A scope in which blocks are looked up by key rather than position.
pub struct NamingContext<'c, 'a> {
    ctx: &'c Context<'a>,
    map: Rc<NamingSlot>,
}

impl<'c, 'a> NamingContext<'c, 'a> {
    pub fn context(&self) -> &'c Context<'a> {
        self.ctx
    }

    /// Number of named blocks currently alive in this scope.
    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

/// Open a naming context at the current call site.
pub fn naming_context<'c, 'a, R>(
    ctx: &'c Context<'a>,
    body: impl FnOnce(&NamingContext<'c, 'a>) -> Result<R>,
) -> Result<R> {
    let (map, _) = ctx.get_data::<NamingSlot>();
    map.borrow_mut().begin_pass();
    let naming = NamingContext { ctx, map };
    let result = body(&naming)?;
    if ctx.gc_enabled() {
        let removed = naming.map.borrow_mut().take_unseen();
        if !removed.is_empty() {
            tracing::trace!(count = removed.len(), "destroying unvisited named blocks");
        }
        drop(removed);
    }
    Ok(result)
}

/// Run `body` in the block named `key`.
pub fn named_block<R>(
    naming: &NamingContext<'_, '_>,
    key: &dyn IdInterface,
    body: impl FnOnce(&Context<'_>) -> Result<R>,
) -> Result<R> {
    let block = naming.map.borrow_mut().find_or_create(key);
    naming.ctx.scoped_block(&block, body)
}

/// Run `body` for every element of the vector in `container`, keyed by
/// index. Does nothing while the container has no value.
pub fn for_each<S, T>(
    ctx: &Context<'_>,
    container: &S,
    mut body: impl FnMut(&Context<'_>, Element<&S>) -> Result<()>,
) -> Result<()>
where
    S: ReadSignal<Value = Vec<T>>,
{
    if !container.has_value() {
        return Ok(());
    }
    let len = container.with(Vec::len)?;
    naming_context(ctx, |naming| {
        for index in 0..len {
            named_block(naming, &make_id(index), |ctx| {
                body(ctx, element(container, index))
            })?;
        }
        Ok(())
    })
}

/// Like [`for_each`], but storage follows the key `key_of` derives from
/// each element, so items keep their state when the vector is reordered.
pub fn for_each_keyed<S, T, K>(
    ctx: &Context<'_>,
    container: &S,
    key_of: impl Fn(&T) -> K,
    mut body: impl FnMut(&Context<'_>, Element<&S>) -> Result<()>,
) -> Result<()>
where
    S: ReadSignal<Value = Vec<T>>,
    K: IdValue,
{
    if !container.has_value() {
        return Ok(());
    }
    let keys: Vec<K> = container.with(|items| items.iter().map(&key_of).collect())?;
    naming_context(ctx, |naming| {
        for (index, key) in keys.into_iter().enumerate() {
            named_block(naming, &make_id(key), |ctx| {
                body(ctx, element(container, index))
            })?;
        }
        Ok(())
    })
}

/// Run `body` in a block dedicated to `key`. Switching to another key
/// destroys the storage of the previous case on the next garbage-collecting
/// pass.
pub fn switch_on<R>(
    ctx: &Context<'_>,
    key: &dyn IdInterface,
    body: impl FnOnce(&Context<'_>) -> Result<R>,
) -> Result<R> {
    naming_context(ctx, |naming| named_block(naming, key, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, get_state, WriteSignal};
    use crate::system::System;
    use std::cell::RefCell;

    #[test]
    fn keyed_items_keep_their_state() {
        let items = Rc::new(RefCell::new(vec!["a".to_string(), "b".to_string()]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (list, log) = (items.clone(), seen.clone());
        let mut system = System::new(move |ctx| {
            for_each_keyed(ctx, &direct(&*list), |name| name.clone(), |ctx, item| {
                let name = item.read()?;
                let count = get_state(ctx, 0)?;
                if count.read()? == 0 {
                    let weight = if name == "b" { 2 } else { 1 };
                    count.write(weight)?;
                }
                log.borrow_mut().push((name, count.read()?));
                Ok(())
            })
        });
        system.refresh().unwrap();
        items.borrow_mut().reverse();
        seen.borrow_mut().clear();
        system.refresh().unwrap();
        assert_eq!(
            *seen.borrow(),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
    }

    #[test]
    fn indexed_items_keep_state_by_position() {
        let items = Rc::new(RefCell::new(vec![10, 20, 30]));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (list, log) = (items.clone(), seen.clone());
        let mut system = System::new(move |ctx| {
            log.borrow_mut().clear();
            for_each(ctx, &direct(&*list), |ctx, item| {
                let first = get_state::<i32, _>(ctx, item.read()?)?;
                log.borrow_mut().push(first.read()?);
                Ok(())
            })
        });
        system.refresh().unwrap();
        assert_eq!(*seen.borrow(), vec![10, 20, 30]);

        items.borrow_mut().rotate_right(1);
        system.refresh().unwrap();
        assert_eq!(*seen.borrow(), vec![10, 20, 30]);

        items.borrow_mut().truncate(1);
        system.refresh().unwrap();
        assert_eq!(*seen.borrow(), vec![10]);

        *items.borrow_mut() = vec![30, 10, 20];
        system.refresh().unwrap();
        assert_eq!(*seen.borrow(), vec![10, 10, 20]);
    }

    #[test]
    fn removed_items_are_collected() {
        let items = Rc::new(RefCell::new(vec![1, 2, 3]));
        let live = Rc::new(RefCell::new(0));
        let (list, count) = (items.clone(), live.clone());
        let mut system = System::new(move |ctx| {
            naming_context(ctx, |naming| {
                for item in list.borrow().iter() {
                    named_block(naming, &make_id(*item), |ctx| {
                        get_state(ctx, *item)?;
                        Ok(())
                    })?;
                }
                *count.borrow_mut() = naming.len();
                Ok(())
            })
        });
        system.refresh().unwrap();
        assert_eq!(*live.borrow(), 3);
        items.borrow_mut().pop();
        system.refresh().unwrap();
        system.refresh().unwrap();
        assert_eq!(*live.borrow(), 2);
    }

    #[test]
    fn switch_cases_have_separate_storage() {
        let case = Rc::new(RefCell::new(0));
        let values = Rc::new(RefCell::new(Vec::new()));
        let (c, v) = (case.clone(), values.clone());
        let mut system = System::new(move |ctx| {
            let key = *c.borrow();
            switch_on(ctx, &make_id(key), |ctx| {
                let state = get_state::<i32, _>(ctx, key * 10)?;
                v.borrow_mut().push(state.read()?);
                Ok(())
            })
        });
        system.refresh().unwrap();
        *case.borrow_mut() = 1;
        system.refresh().unwrap();
        assert_eq!(*values.borrow(), vec![0, 10]);
    }
}
