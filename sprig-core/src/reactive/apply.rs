//! Function Application
//!
//! Derived values computed by ordinary functions over signal arguments.
//!
//! # How Application Works
//!
//! 1. Arguments are passed as a tuple of signals. The tuple's combined value
//!    id identifies the inputs.
//!
//! 2. [`apply`] stores the result in the data graph at the call site. On
//!    later passes the function only runs again if the combined id changed.
//!
//! 3. [`try_apply`] does the same for fallible functions; a failure is
//!    cached like a value and reported whenever the result is read.
//!
//! 4. [`lazy_apply`] stores nothing and computes on every read. It is meant
//!    for cheap functions, or for use outside of a traversal.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::flow::Context;
use crate::id::{CapturedId, IdInterface, IdPair, SimpleId, UnitId};

use super::signal::{ReadSignal, Signal};
use super::text::ToText;

// ----------------------------------------------------------------------------
// Argument tuples
// ----------------------------------------------------------------------------

/// A tuple of readable signals.
pub trait SignalArgs {
    /// The tuple of the signals' values.
    type Values;

    type Id<'a>: IdInterface
    where
        Self: 'a;

    /// Number of signals in the tuple.
    const LEN: usize;

    fn all_have_values(&self) -> bool;

    /// The identities of all values, folded into one.
    fn combined_id(&self) -> Self::Id<'_>;

    fn read_all(&self) -> Result<Self::Values>;
}

/// Argument tuples whose values can be rendered as text.
pub trait TextArgs: SignalArgs {
    /// Render argument `index`, with `precision` digits after the decimal
    /// point if given.
    fn render(&self, index: usize, precision: Option<usize>) -> Result<String>;
}

fn render_one<S>(signal: &S, precision: Option<usize>) -> Result<String>
where
    S: ReadSignal,
    S::Value: ToText,
{
    signal.with(|value| match precision {
        Some(digits) => value.to_text_with_precision(digits),
        None => value.to_text(),
    })
}

fn no_such_argument(index: usize) -> Error {
    Error::PrintfFormat(format!("there is no argument {index}"))
}

impl SignalArgs for () {
    type Values = ();
    type Id<'a> = UnitId where Self: 'a;
    const LEN: usize = 0;

    fn all_have_values(&self) -> bool {
        true
    }

    fn combined_id(&self) -> UnitId {
        UnitId
    }

    fn read_all(&self) -> Result<()> {
        Ok(())
    }
}

impl TextArgs for () {
    fn render(&self, index: usize, _: Option<usize>) -> Result<String> {
        Err(no_such_argument(index))
    }
}

impl<A> SignalArgs for (A,)
where
    A: ReadSignal,
    A::Value: Clone,
{
    type Values = (A::Value,);
    type Id<'a> = A::Id<'a> where Self: 'a;
    const LEN: usize = 1;

    fn all_have_values(&self) -> bool {
        self.0.has_value()
    }

    fn combined_id(&self) -> Self::Id<'_> {
        self.0.value_id()
    }

    fn read_all(&self) -> Result<Self::Values> {
        Ok((self.0.read()?,))
    }
}

impl<A, B> SignalArgs for (A, B)
where
    A: ReadSignal,
    B: ReadSignal,
    A::Value: Clone,
    B::Value: Clone,
{
    type Values = (A::Value, B::Value);
    type Id<'a> = IdPair<A::Id<'a>, B::Id<'a>> where Self: 'a;
    const LEN: usize = 2;

    fn all_have_values(&self) -> bool {
        self.0.has_value() && self.1.has_value()
    }

    fn combined_id(&self) -> Self::Id<'_> {
        IdPair(self.0.value_id(), self.1.value_id())
    }

    fn read_all(&self) -> Result<Self::Values> {
        Ok((self.0.read()?, self.1.read()?))
    }
}

impl<A, B, C> SignalArgs for (A, B, C)
where
    A: ReadSignal,
    B: ReadSignal,
    C: ReadSignal,
    A::Value: Clone,
    B::Value: Clone,
    C::Value: Clone,
{
    type Values = (A::Value, B::Value, C::Value);
    type Id<'a> = IdPair<A::Id<'a>, IdPair<B::Id<'a>, C::Id<'a>>> where Self: 'a;
    const LEN: usize = 3;

    fn all_have_values(&self) -> bool {
        self.0.has_value() && self.1.has_value() && self.2.has_value()
    }

    fn combined_id(&self) -> Self::Id<'_> {
        IdPair(
            self.0.value_id(),
            IdPair(self.1.value_id(), self.2.value_id()),
        )
    }

    fn read_all(&self) -> Result<Self::Values> {
        Ok((self.0.read()?, self.1.read()?, self.2.read()?))
    }
}

impl<A, B, C, D> SignalArgs for (A, B, C, D)
where
    A: ReadSignal,
    B: ReadSignal,
    C: ReadSignal,
    D: ReadSignal,
    A::Value: Clone,
    B::Value: Clone,
    C::Value: Clone,
    D::Value: Clone,
{
    type Values = (A::Value, B::Value, C::Value, D::Value);
    type Id<'a> = IdPair<A::Id<'a>, IdPair<B::Id<'a>, IdPair<C::Id<'a>, D::Id<'a>>>>
    where
        Self: 'a;
    const LEN: usize = 4;

    fn all_have_values(&self) -> bool {
        self.0.has_value() && self.1.has_value() && self.2.has_value() && self.3.has_value()
    }

    fn combined_id(&self) -> Self::Id<'_> {
        IdPair(
            self.0.value_id(),
            IdPair(
                self.1.value_id(),
                IdPair(self.2.value_id(), self.3.value_id()),
            ),
        )
    }

    fn read_all(&self) -> Result<Self::Values> {
        Ok((
            self.0.read()?,
            self.1.read()?,
            self.2.read()?,
            self.3.read()?,
        ))
    }
}

macro_rules! impl_text_args {
    ($(($($name:ident . $index:tt),+))*) => {
        $(
            impl<$($name),+> TextArgs for ($($name,)+)
            where
                Self: SignalArgs,
                $($name: ReadSignal, $name::Value: ToText,)+
            {
                fn render(&self, index: usize, precision: Option<usize>) -> Result<String> {
                    match index {
                        $($index => render_one(&self.$index, precision),)+
                        _ => Err(no_such_argument(index)),
                    }
                }
            }
        )*
    };
}

impl_text_args! {
    (A.0)
    (A.0, B.1)
    (A.0, B.1, C.2)
    (A.0, B.1, C.2, D.3)
}

// ----------------------------------------------------------------------------
// Cached application
// ----------------------------------------------------------------------------

/// Outcome of the last application.
#[derive(Debug, Clone)]
pub enum ApplyResult<T> {
    /// Some argument had no value.
    Unready,
    Value(T),
    Failed(Error),
}

struct ApplyData<T> {
    input: CapturedId,
    result: ApplyResult<T>,
    version: u64,
}

impl<T> Default for ApplyData<T> {
    fn default() -> Self {
        Self {
            input: CapturedId::default(),
            result: ApplyResult::Unready,
            version: 0,
        }
    }
}

/// The signal returned by [`apply`] and [`try_apply`].
pub struct Applied<T> {
    data: Rc<RefCell<ApplyData<T>>>,
}

impl<T> Clone for Applied<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<T> Applied<T> {
    /// Whether the last application failed.
    pub fn failed(&self) -> bool {
        matches!(self.data.borrow().result, ApplyResult::Failed(_))
    }
}

impl<T> Signal for Applied<T> {
    type Value = T;
}

impl<T> ReadSignal for Applied<T> {
    type Id<'a> = SimpleId<u64> where Self: 'a;

    fn has_value(&self) -> bool {
        matches!(self.data.borrow().result, ApplyResult::Value(_))
    }

    fn value_id(&self) -> SimpleId<u64> {
        SimpleId(self.data.borrow().version)
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        match &self.data.borrow().result {
            ApplyResult::Value(value) => Ok(f(value)),
            ApplyResult::Failed(error) => Err(error.clone()),
            ApplyResult::Unready => Err(Error::NoValue),
        }
    }
}

fn apply_logic<T: 'static, A: SignalArgs>(
    ctx: &Context<'_>,
    args: &A,
    compute: impl FnOnce(A::Values) -> Result<T>,
) -> Applied<T> {
    let (data, _) = ctx.get_cached_data::<RefCell<ApplyData<T>>>();
    {
        let mut data = data.borrow_mut();
        if args.all_have_values() {
            let id = args.combined_id();
            if !data.input.matches(&id) {
                data.input.capture(&id);
                data.version += 1;
                data.result = match args.read_all().and_then(compute) {
                    Ok(value) => ApplyResult::Value(value),
                    Err(error) => ApplyResult::Failed(error),
                };
            }
        } else if data.input.is_initialized() {
            data.input.clear();
            data.version += 1;
            data.result = ApplyResult::Unready;
        }
    }
    Applied { data }
}

/// Apply `f` to the values of `args`, caching the result at the call site.
///
/// ```rust,ignore
/// let sum = apply(ctx, |(a, b)| a + b, (x, y));
/// ```
pub fn apply<T, A, F>(ctx: &Context<'_>, f: F, args: A) -> Applied<T>
where
    T: 'static,
    A: SignalArgs,
    F: FnOnce(A::Values) -> T,
{
    apply_logic(ctx, &args, |values| Ok(f(values)))
}

/// Like [`apply`], but `f` may fail. The failure is cached and returned
/// whenever the result is read, until the arguments change.
pub fn try_apply<T, A, F>(ctx: &Context<'_>, f: F, args: A) -> Applied<T>
where
    T: 'static,
    A: SignalArgs,
    F: FnOnce(A::Values) -> Result<T>,
{
    apply_logic(ctx, &args, f)
}

// ----------------------------------------------------------------------------
// Lazy application
// ----------------------------------------------------------------------------

/// The signal returned by [`lazy_apply`].
#[derive(Clone)]
pub struct LazyApply<F, A> {
    f: F,
    args: A,
}

/// Apply `f` to the values of `args` every time the result is read.
pub fn lazy_apply<T, A, F>(f: F, args: A) -> LazyApply<F, A>
where
    A: SignalArgs,
    F: Fn(A::Values) -> T,
{
    LazyApply { f, args }
}

impl<T, A, F> Signal for LazyApply<F, A>
where
    A: SignalArgs,
    F: Fn(A::Values) -> T,
{
    type Value = T;
}

impl<T, A, F> ReadSignal for LazyApply<F, A>
where
    A: SignalArgs,
    F: Fn(A::Values) -> T,
{
    type Id<'a> = A::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.args.all_have_values()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.args.combined_id()
    }

    fn with<R>(&self, g: impl FnOnce(&T) -> R) -> Result<R> {
        let value = (self.f)(self.args.read_all()?);
        Ok(g(&value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, empty, value};
    use crate::system::System;
    use std::cell::Cell;

    #[test]
    fn results_are_cached_until_inputs_change() {
        let x = Rc::new(RefCell::new(2));
        let runs = Rc::new(Cell::new(0));
        let results = Rc::new(RefCell::new(Vec::new()));
        let (input, counter, out) = (x.clone(), runs.clone(), results.clone());
        let mut system = System::new(move |ctx| {
            let counter = counter.clone();
            let doubled = apply(
                ctx,
                move |(a, b): (i32, i32)| {
                    counter.set(counter.get() + 1);
                    a * b
                },
                (direct(&*input), value(2)),
            );
            out.borrow_mut().push(doubled.read()?);
            Ok(())
        });
        system.refresh().unwrap();
        system.refresh().unwrap();
        *x.borrow_mut() = 5;
        system.refresh().unwrap();
        assert_eq!(*results.borrow(), vec![4, 4, 10]);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn unready_arguments_give_no_value() {
        let mut system = System::new(|ctx| {
            let result = apply(ctx, |(a,): (i32,)| a + 1, (empty::<i32>(),));
            assert!(!result.has_value());
            assert!(matches!(result.read(), Err(Error::NoValue)));
            Ok(())
        });
        system.refresh().unwrap();
    }

    #[test]
    fn failures_are_reported_on_read() {
        let mut system = System::new(|ctx| {
            let parsed = try_apply(
                ctx,
                |(text,): (&'static str,)| {
                    text.parse::<i32>()
                        .map_err(|_| Error::validation("not a number"))
                },
                (value("x1"),),
            );
            assert!(parsed.failed());
            assert!(matches!(parsed.read(), Err(Error::Validation(_))));
            Ok(())
        });
        system.refresh().unwrap();
    }

    #[test]
    fn lazy_application_needs_no_context() {
        let x = RefCell::new(3);
        let squared = lazy_apply(|(a,): (i32,)| a * a, (direct(&x),));
        assert_eq!(squared.read().unwrap(), 9);
        *x.borrow_mut() = 4;
        assert_eq!(squared.read().unwrap(), 16);
    }
}
