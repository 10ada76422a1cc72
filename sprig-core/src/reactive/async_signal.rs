//! Asynchronous Signals
//!
//! Bridges work that completes outside the traversal (a network request, a
//! computation on a worker thread) into the data graph.
//!
//! # How Async Signals Work
//!
//! 1. On each refresh pass the combined id of the arguments is compared
//!    with the one captured at the last launch. If it changed, the version
//!    counter is bumped and the launcher is called once with the argument
//!    values and an [`AsyncReporter`].
//!
//! 2. The launcher must return immediately. Whoever finishes the work
//!    calls [`AsyncReporter::report`] (from any thread). That schedules an
//!    asynchronous update which dispatches an [`AsyncResultEvent`] to the
//!    component that owns the signal.
//!
//! 3. When the event arrives, its version is checked against the current
//!    one. Results for superseded arguments are dropped.
//!
//! There is no cancellation: a superseded operation runs to completion and
//! its result is discarded.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::flow::{
    detect_targeted_event, get_component_id, mark_dirty_component, Context, ExternalComponentId,
    TargetedEvent,
};
use crate::id::{CapturedId, SimpleId};
use crate::system::ExternalInterface;

use super::apply::SignalArgs;
use super::signal::{ReadSignal, Signal};

/// Where an asynchronous operation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncStatus {
    /// The arguments are not available, so nothing has been launched.
    Unready,
    /// Launched and waiting for a result.
    Launched,
    Complete,
    Failed,
}

struct AsyncData<T> {
    status: AsyncStatus,
    result: Option<T>,
    error: Option<Error>,
    /// Bumped on every launch; results carry the version they were launched
    /// under.
    version: u64,
    /// Bumped on every status change; the signal's value id.
    changes: u64,
    input: CapturedId,
}

impl<T> Default for AsyncData<T> {
    fn default() -> Self {
        Self {
            status: AsyncStatus::Unready,
            result: None,
            error: None,
            version: 0,
            changes: 0,
            input: CapturedId::default(),
        }
    }
}

impl<T> AsyncData<T> {
    fn reset(&mut self, status: AsyncStatus) {
        self.status = status;
        self.result = None;
        self.error = None;
        self.version += 1;
        self.changes += 1;
    }
}

/// Delivers the outcome of an asynchronous operation back to its signal.
pub struct AsyncResultEvent<T> {
    pub target: ExternalComponentId,
    pub version: u64,
    pub result: Option<Result<T>>,
}

impl<T: 'static> TargetedEvent for AsyncResultEvent<T> {
    fn target(&self) -> ExternalComponentId {
        self.target
    }
}

/// The `Send` half handed to a launcher. Consumed by reporting.
pub struct AsyncReporter<T> {
    external: Arc<dyn ExternalInterface>,
    target: ExternalComponentId,
    version: u64,
    _result: std::marker::PhantomData<fn(T)>,
}

impl<T: Send + 'static> AsyncReporter<T> {
    /// Report success.
    pub fn report(self, value: T) {
        self.deliver(Ok(value));
    }

    /// Report failure. The signal's status becomes [`AsyncStatus::Failed`]
    /// and reads return `error`.
    pub fn report_failure(self, error: Error) {
        self.deliver(Err(error));
    }

    fn deliver(self, result: Result<T>) {
        let (target, version) = (self.target, self.version);
        self.external
            .schedule_asynchronous_update(Box::new(move |system| {
                system.dispatch_targeted_event(&mut AsyncResultEvent {
                    target,
                    version,
                    result: Some(result),
                })
            }));
    }
}

/// The value of an asynchronous operation, once it has one.
pub struct AsyncSignal<T> {
    data: Rc<RefCell<AsyncData<T>>>,
}

impl<T> Clone for AsyncSignal<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
        }
    }
}

impl<T> AsyncSignal<T> {
    pub fn status(&self) -> AsyncStatus {
        self.data.borrow().status
    }

    /// The failure reported for the current arguments, if any.
    pub fn error(&self) -> Option<Error> {
        self.data.borrow().error.clone()
    }
}

impl<T> Signal for AsyncSignal<T> {
    type Value = T;
}

impl<T> ReadSignal for AsyncSignal<T> {
    type Id<'a> = SimpleId<u64> where Self: 'a;

    fn has_value(&self) -> bool {
        self.data.borrow().status == AsyncStatus::Complete
    }

    fn value_id(&self) -> SimpleId<u64> {
        SimpleId(self.data.borrow().changes)
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let data = self.data.borrow();
        match (&data.result, &data.error) {
            (Some(value), _) => Ok(f(value)),
            (None, Some(error)) => Err(error.clone()),
            (None, None) => Err(Error::NoValue),
        }
    }
}

/// Run `launcher` whenever `args` change and expose its eventual result.
///
/// ```rust,ignore
/// let user = async_signal(ctx, |reporter, (name,)| {
///     pool.spawn(move || reporter.report(fetch_user(&name)));
/// }, (user_name,))?;
/// ```
pub fn async_signal<T, A>(
    ctx: &Context<'_>,
    launcher: impl FnOnce(AsyncReporter<T>, A::Values),
    args: A,
) -> Result<AsyncSignal<T>>
where
    T: Send + 'static,
    A: SignalArgs,
{
    let (data, _) = ctx.get_data::<RefCell<AsyncData<T>>>();
    let id = get_component_id(ctx);

    let delivered = detect_targeted_event::<AsyncResultEvent<T>>(ctx, &id)
        .and_then(|mut event| Some((event.version, event.result.take()?)));
    if let Some((version, result)) = delivered {
        let mut data = data.borrow_mut();
        if version == data.version {
            match result {
                Ok(value) => {
                    data.status = AsyncStatus::Complete;
                    data.result = Some(value);
                }
                Err(error) => {
                    tracing::debug!(%error, "asynchronous operation failed");
                    data.status = AsyncStatus::Failed;
                    data.error = Some(error);
                }
            }
            data.changes += 1;
            mark_dirty_component(ctx);
        } else {
            tracing::trace!(version, current = data.version, "discarding stale result");
        }
    }

    if ctx.is_refresh() {
        let launch_version = {
            let mut data = data.borrow_mut();
            if args.all_have_values() {
                let input = args.combined_id();
                if data.input.matches(&input) {
                    None
                } else {
                    data.input.capture(&input);
                    data.reset(AsyncStatus::Launched);
                    Some(data.version)
                }
            } else {
                if data.input.is_initialized() {
                    data.input.clear();
                    data.reset(AsyncStatus::Unready);
                }
                None
            }
        };
        if let Some(version) = launch_version {
            let reporter = AsyncReporter {
                external: ctx.external().clone(),
                target: id.external(),
                version,
                _result: std::marker::PhantomData,
            };
            launcher(reporter, args.read_all()?);
        }
    }

    Ok(AsyncSignal { data })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{direct, empty};
    use crate::system::System;
    use std::cell::Cell;
    use std::sync::Mutex;

    type Pending = Arc<Mutex<Vec<(AsyncReporter<i32>, i32)>>>;

    fn launcher(pending: &Pending) -> impl FnOnce(AsyncReporter<i32>, (i32,)) + '_ {
        move |reporter, (n,)| pending.lock().unwrap().push((reporter, n))
    }

    #[test]
    fn results_arrive_through_queued_updates() {
        let pending: Pending = Arc::default();
        let status = Rc::new(Cell::new(AsyncStatus::Unready));
        let seen = Rc::new(Cell::new(0));
        let (queue, shown, value) = (pending.clone(), status.clone(), seen.clone());
        let mut system = System::new(move |ctx| {
            let doubled = async_signal(ctx, launcher(&queue), (crate::reactive::value(21),))?;
            shown.set(doubled.status());
            if doubled.has_value() {
                value.set(doubled.read()?);
            }
            Ok(())
        });
        system.refresh().unwrap();
        assert_eq!(status.get(), AsyncStatus::Launched);

        let (reporter, n) = pending.lock().unwrap().pop().unwrap();
        reporter.report(n * 2);
        assert_eq!(system.process_asynchronous_updates().unwrap(), 1);
        assert_eq!(status.get(), AsyncStatus::Complete);
        assert_eq!(seen.get(), 42);
        assert!(pending.lock().unwrap().is_empty());
    }

    #[test]
    fn stale_results_are_discarded() {
        let pending: Pending = Arc::default();
        let input = Rc::new(RefCell::new(1));
        let seen = Rc::new(Cell::new(None));
        let (queue, cell, value) = (pending.clone(), input.clone(), seen.clone());
        let mut system = System::new(move |ctx| {
            let signal = async_signal(ctx, launcher(&queue), (direct(&*cell),))?;
            value.set(signal.has_value().then(|| signal.read()).transpose()?);
            Ok(())
        });
        system.refresh().unwrap();
        *input.borrow_mut() = 2;
        system.refresh().unwrap();
        assert_eq!(pending.lock().unwrap().len(), 2);

        let (second, _) = pending.lock().unwrap().pop().unwrap();
        let (first, _) = pending.lock().unwrap().pop().unwrap();
        first.report(10);
        system.process_asynchronous_updates().unwrap();
        assert_eq!(seen.get(), None);
        second.report(20);
        system.process_asynchronous_updates().unwrap();
        assert_eq!(seen.get(), Some(20));
    }

    #[test]
    fn failures_are_reported_on_read() {
        let pending: Pending = Arc::default();
        let outcome = Rc::new(RefCell::new(None));
        let (queue, slot) = (pending.clone(), outcome.clone());
        let mut system = System::new(move |ctx| {
            let signal = async_signal(ctx, launcher(&queue), (crate::reactive::value(1),))?;
            if signal.status() == AsyncStatus::Failed {
                *slot.borrow_mut() = Some(signal.read());
            }
            Ok(())
        });
        system.refresh().unwrap();
        let (reporter, _) = pending.lock().unwrap().pop().unwrap();
        reporter.report_failure(Error::AsyncFailure("timed out".into()));
        system.process_asynchronous_updates().unwrap();
        assert!(matches!(
            outcome.borrow().as_ref(),
            Some(Err(Error::AsyncFailure(_)))
        ));
    }

    #[test]
    fn nothing_launches_without_arguments() {
        let launches = Rc::new(Cell::new(0));
        let count = launches.clone();
        let mut system = System::new(move |ctx| {
            let signal = async_signal(
                ctx,
                |_: AsyncReporter<i32>, _: (i32,)| count.set(count.get() + 1),
                (empty::<i32>(),),
            )?;
            assert_eq!(signal.status(), AsyncStatus::Unready);
            Ok(())
        });
        system.refresh().unwrap();
        system.refresh().unwrap();
        assert_eq!(launches.get(), 0);
    }
}
