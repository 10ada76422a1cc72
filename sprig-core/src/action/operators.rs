//! Action combinators: sequencing, argument binding and copying.

use crate::error::Result;
use crate::reactive::{IntoReadSignal, ReadSignal, WriteSignal};

use super::Action;

// ----------------------------------------------------------------------------
// Sequencing
// ----------------------------------------------------------------------------

fn perform_in_sequence<A, B, Args>(
    first: &A,
    second: &B,
    intermediary: &mut dyn FnMut() -> Result<()>,
    args: Args,
) -> Result<()>
where
    A: Action<Args> + ?Sized,
    B: Action<Args> + ?Sized,
    Args: Clone,
{
    let first_args = args.clone();
    second.perform(
        &mut || first.perform(&mut *intermediary, first_args.clone()),
        args,
    )
}

/// `(a, b)` performs both actions and is ready when both are.
impl<A, B, Args> Action<Args> for (A, B)
where
    A: Action<Args>,
    B: Action<Args>,
    Args: Clone,
{
    fn is_ready(&self) -> bool {
        self.0.is_ready() && self.1.is_ready()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        perform_in_sequence(&self.0, &self.1, intermediary, args)
    }
}

impl<A, B, C, Args> Action<Args> for (A, B, C)
where
    A: Action<Args>,
    B: Action<Args>,
    C: Action<Args>,
    Args: Clone,
{
    fn is_ready(&self) -> bool {
        self.0.is_ready() && self.1.is_ready() && self.2.is_ready()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, args: Args) -> Result<()> {
        perform_in_sequence(&(&self.0, &self.1), &self.2, intermediary, args)
    }
}

/// Sequence two actions. Equivalent to the tuple `(first, second)`.
pub fn seq<A, B>(first: A, second: B) -> (A, B) {
    (first, second)
}

// ----------------------------------------------------------------------------
// Binding
// ----------------------------------------------------------------------------

/// An action with its first argument supplied by a signal.
#[derive(Clone)]
pub struct Bound<A, S> {
    action: A,
    signal: S,
}

/// Bind the first argument of `action` to the value of `signal` (or to a
/// plain value). The result is ready when `action` is ready and `signal`
/// has a value.
pub fn bind<A, S: IntoReadSignal>(action: A, signal: S) -> Bound<A, S::Signal> {
    Bound {
        action,
        signal: signal.into_read_signal(),
    }
}

impl<A, S> Action<()> for Bound<A, S>
where
    S: ReadSignal,
    S::Value: Clone,
    A: Action<(S::Value,)>,
{
    fn is_ready(&self) -> bool {
        self.action.is_ready() && self.signal.has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        self.action.perform(intermediary, (self.signal.read()?,))
    }
}

impl<A, S, U> Action<(U,)> for Bound<A, S>
where
    S: ReadSignal,
    S::Value: Clone,
    A: Action<(S::Value, U)>,
{
    fn is_ready(&self) -> bool {
        self.action.is_ready() && self.signal.has_value()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (arg,): (U,)) -> Result<()> {
        self.action.perform(intermediary, (self.signal.read()?, arg))
    }
}

// ----------------------------------------------------------------------------
// Copying
// ----------------------------------------------------------------------------

/// Writes the value of a source signal into a sink.
#[derive(Clone)]
pub struct CopyAction<Sink, Source> {
    sink: Sink,
    source: Source,
}

/// An action that copies `source` into `sink`. Ready when `source` has a
/// value and `sink` is ready to write. The source is read before the
/// intermediary runs and the sink written after.
pub fn copy<Sink, Source>(sink: Sink, source: Source) -> CopyAction<Sink, Source::Signal>
where
    Source: IntoReadSignal,
{
    CopyAction {
        sink,
        source: source.into_read_signal(),
    }
}

impl<Sink, Source, T> Action<()> for CopyAction<Sink, Source>
where
    Sink: WriteSignal<Value = T>,
    Source: ReadSignal<Value = T>,
    T: Clone,
{
    fn is_ready(&self) -> bool {
        self.source.has_value() && self.sink.ready_to_write()
    }

    fn perform(&self, intermediary: &mut dyn FnMut() -> Result<()>, (): ()) -> Result<()> {
        let value = self.source.read()?;
        intermediary()?;
        self.sink.write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{callback, perform_action, unready_action};
    use crate::error::Error;
    use crate::reactive::{direct, empty, value};
    use std::cell::RefCell;

    fn ready<A: Action>(action: &A) -> bool {
        action.is_ready()
    }

    #[test]
    fn pairs_are_ready_only_when_both_are() {
        let yes = || callback(|()| Ok(()));
        let no = unready_action::<()>;
        assert!(ready(&(yes(), yes())));
        assert!(!ready(&(yes(), no())));
        assert!(!ready(&(no(), yes())));
        assert!(!ready(&(no(), no())));
    }

    #[test]
    fn sequences_commit_in_declaration_order() {
        let log = RefCell::new(Vec::new());
        let (a, b) = (RefCell::new(0), RefCell::new(0));
        let note = |name: &'static str| {
            let log = &log;
            callback(move |()| {
                log.borrow_mut().push(name);
                Ok(())
            })
        };

        perform_action(&(note("a"), copy(direct(&a), value(1)), note("b")), ()).unwrap();
        perform_action(&seq(seq(note("c"), copy(direct(&b), value(2))), note("d")), ()).unwrap();
        assert_eq!(*a.borrow(), 1);
        assert_eq!(*b.borrow(), 2);
        assert_eq!(*log.borrow(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn reads_happen_before_any_write() {
        let cell = RefCell::new(1);
        let seen = RefCell::new(Vec::new());
        let observe = callback(|()| {
            seen.borrow_mut().push(*cell.borrow());
            Ok(())
        });
        // The copy reads 1 before the callback runs, then writes 5.
        let swap = (observe, copy(direct(&cell), value(5)));
        perform_action(&swap, ()).unwrap();
        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(*cell.borrow(), 5);
    }

    #[test]
    fn copying_from_an_empty_source_leaves_the_sink_alone() {
        let sink = RefCell::new(7);
        let action = copy(direct(&sink), empty::<i32>());
        assert!(!action.is_ready());
        assert!(matches!(perform_action(&action, ()), Err(Error::NotReady)));
        assert_eq!(*sink.borrow(), 7);
    }

    #[test]
    fn binding_supplies_the_first_argument() {
        let sum = RefCell::new(0);
        let add = callback(|(x, y): (i32, i32)| {
            *sum.borrow_mut() += x * 10 + y;
            Ok(())
        });
        let partly = bind(&add, 4);
        perform_action(&partly, (2,)).unwrap();
        assert_eq!(*sum.borrow(), 42);

        let fully = bind(bind(&add, 1), 3);
        perform_action(&fully, ()).unwrap();
        assert_eq!(*sum.borrow(), 55);

        assert!(!Action::<()>::is_ready(&bind(bind(&add, 1), empty::<i32>())));
    }
}
