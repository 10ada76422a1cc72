//! Integration Tests for the Runtime
//!
//! These tests drive whole systems through refreshes and events and check
//! that the data graph, signals, actions, routing, timers and asynchronous
//! signals work together correctly.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::Ordering;

use sprig_core::action::{copy, perform_action, Action};
use sprig_core::flow::{
    component_container, detect_event, externalize, get_component_id, if_, Context,
    ExternalComponentId, TargetedEvent,
};
use sprig_core::id::IdInterface;
use sprig_core::reactive::{
    as_duplex_text, async_signal, direct, empty, get_state, scale, value, AsyncStatus,
    ReadSignal, StateSignal, WriteSignal,
};
use sprig_core::system::System;
use sprig_core::timing::{timer, TickClock};
use sprig_core::{Error, Result};

/// Test that value ids are stable across reads and distinguish values.
#[test]
fn value_ids_are_stable() {
    let a = value(3);
    assert!(a.value_id().equals(&a.value_id()));
    assert!(!value(3).value_id().equals(&value(4).value_id()));
}

/// Test that a call site gets the same storage on every refresh.
#[test]
fn state_storage_is_stable_across_refreshes() {
    let first: Rc<RefCell<Option<StateSignal<i32>>>> = Rc::default();
    let mismatches = Rc::new(Cell::new(0));
    let (slot, bad) = (first.clone(), mismatches.clone());
    let mut system = System::new(move |ctx| {
        let state = get_state(ctx, 0)?;
        match &*slot.borrow() {
            Some(previous) if !previous.same_state(&state) => bad.set(bad.get() + 1),
            _ => {}
        }
        slot.borrow_mut().get_or_insert(state);
        Ok(())
    });

    for _ in 0..5 {
        system.refresh().unwrap();
    }
    assert_eq!(mismatches.get(), 0);

    let state = first.borrow().clone().unwrap();
    state.write(9).unwrap();
    system.refresh().unwrap();
    assert_eq!(state.read().unwrap(), 9);
}

/// Test that state inside an untaken branch is destroyed and comes back
/// fresh.
#[test]
fn untaken_branches_are_collected() {
    let show = Rc::new(Cell::new(true));
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (flag, log) = (show.clone(), seen.clone());
    let mut system = System::new(move |ctx| {
        if_(ctx, flag.get(), |ctx| {
            let state = get_state(ctx, 1)?;
            log.borrow_mut().push(state.read()?);
            if state.read()? == 1 {
                state.write(2)?;
            }
            Ok(())
        })
    });

    system.refresh().unwrap();
    show.set(false);
    system.refresh().unwrap();
    show.set(true);
    system.refresh().unwrap();

    // Pass 1 runs twice (the write dirties the root), pass 3 likewise.
    assert_eq!(*seen.borrow(), vec![1, 2, 1, 2]);
}

// ----------------------------------------------------------------------------
// Routing
// ----------------------------------------------------------------------------

struct Poke {
    target: ExternalComponentId,
}

impl TargetedEvent for Poke {
    fn target(&self) -> ExternalComponentId {
        self.target
    }
}

fn labeled(
    ctx: &Context<'_>,
    log: &RefCell<String>,
    label: &str,
    body: impl FnOnce(&Context<'_>) -> Result<()>,
) -> Result<()> {
    component_container(ctx, |ctx| {
        if detect_event::<Poke>(ctx).is_some() {
            log.borrow_mut().push_str(&format!("{label};"));
        }
        body(ctx)
    })
}

/// Test that a targeted event visits exactly the path to its target.
#[test]
fn targeted_events_visit_only_their_route() {
    let n = Rc::new(Cell::new(1));
    let log = Rc::new(RefCell::new(String::new()));
    let deep = Rc::new(Cell::new(ExternalComponentId::NULL));
    let (n_in, log_in, deep_in) = (n.clone(), log.clone(), deep.clone());
    let mut system = System::new(move |ctx| {
        let log = &*log_in;
        let n = n_in.get();
        labeled(ctx, log, "root", |ctx| {
            if_(ctx, n != 0, |ctx| {
                labeled(ctx, log, "nonzero", |ctx| {
                    labeled(ctx, log, "deep", |ctx| {
                        deep_in.set(externalize(&get_component_id(ctx)));
                        Ok(())
                    })
                })
            })?;
            if_(ctx, n % 2 == 1, |ctx| labeled(ctx, log, "odd", |_| Ok(())))
        })
    });

    system.refresh().unwrap();
    let target = deep.get();
    assert!(!target.is_null());

    log.borrow_mut().push(';');
    system.dispatch_targeted_event(&mut Poke { target }).unwrap();
    assert_eq!(*log.borrow(), ";root;nonzero;deep;");

    n.set(0);
    system.refresh().unwrap();
    log.borrow_mut().clear();
    system.dispatch_targeted_event(&mut Poke { target }).unwrap();
    assert_eq!(*log.borrow(), "");
}

// ----------------------------------------------------------------------------
// Signals and actions
// ----------------------------------------------------------------------------

/// Test pair readiness and that copying from an empty source writes
/// nothing.
#[test]
fn action_readiness_propagates() {
    let (x, y) = (RefCell::new(0), RefCell::new(0));
    let both = (copy(direct(&x), value(1)), copy(direct(&y), value(2)));
    assert!(both.is_ready());
    perform_action(&both, ()).unwrap();
    assert_eq!((*x.borrow(), *y.borrow()), (1, 2));

    let blocked = (copy(direct(&x), value(5)), copy(direct(&y), empty::<i32>()));
    assert!(!blocked.is_ready());
    assert!(matches!(perform_action(&blocked, ()), Err(Error::NotReady)));
    assert_eq!((*x.borrow(), *y.borrow()), (1, 2));
}

/// Test that a scaled signal writes through the inverse transform.
#[test]
fn scaled_signals_round_trip() {
    let x = RefCell::new(0);
    let scaled = scale(direct(&x), 10);
    scaled.write(20).unwrap();
    assert_eq!(*x.borrow(), 2);
    assert_eq!(scaled.read().unwrap(), 20);
}

/// Test that duplex text parses valid input and rejects invalid input.
#[test]
fn duplex_text_round_trips_with_validation() {
    let x = Rc::new(RefCell::new(0));
    let results = Rc::new(RefCell::new(Vec::new()));
    let (cell, out) = (x.clone(), results.clone());
    let mut system = System::new(move |ctx| {
        let text = as_duplex_text(ctx, direct(&*cell))?;
        if out.borrow().is_empty() {
            text.write("17".to_owned())?;
            out.borrow_mut().push(text.read()?);
            let rejected = text.write("a17".to_owned());
            out.borrow_mut().push(format!("{}", matches!(rejected, Err(Error::Validation(_)))));
        }
        Ok(())
    });
    system.refresh().unwrap();
    assert_eq!(*results.borrow(), vec!["17".to_owned(), "true".to_owned()]);
    assert_eq!(*x.borrow(), 17);
}

/// Test that a controller converges: 12 becomes 13 and then stays put.
/// The write gives the state a new value id, which is stable afterwards.
#[test]
fn state_converges_after_one_refresh() {
    let handle: Rc<RefCell<Option<StateSignal<i32>>>> = Rc::default();
    let initial_id: Rc<RefCell<Option<Box<dyn IdInterface>>>> = Rc::default();
    let (slot, first_id) = (handle.clone(), initial_id.clone());
    let mut system = System::new(move |ctx| {
        let n = get_state(ctx, 12)?;
        first_id
            .borrow_mut()
            .get_or_insert_with(|| n.value_id().clone_id());
        if n.read()? != 13 {
            n.write(13)?;
        }
        *slot.borrow_mut() = Some(n);
        Ok(())
    });

    system.refresh().unwrap();
    let n = handle.borrow().clone().unwrap();
    assert_eq!(n.read().unwrap(), 13);
    let before = initial_id.borrow_mut().take().unwrap();
    let after = n.value_id().clone_id();
    assert!(!before.equals(&*after));

    system.refresh().unwrap();
    assert_eq!(n.read().unwrap(), 13);
    assert!(n.value_id().equals(&*after));
}

// ----------------------------------------------------------------------------
// Timers and asynchronous signals
// ----------------------------------------------------------------------------

/// Test that a timer fires when the clock reaches its trigger time.
#[test]
fn timers_fire_on_schedule() {
    let (clock, ticks) = TickClock::manual();
    let fired = Rc::new(Cell::new(0));
    let started = Rc::new(Cell::new(false));
    let (count, flag) = (fired.clone(), started.clone());
    let mut system = System::builder().clock(clock).build(move |ctx| {
        let t = timer(ctx);
        if t.is_triggered() {
            count.set(count.get() + 1);
        } else if !flag.replace(true) {
            t.start(100);
        }
        t.finish()
    });

    system.refresh().unwrap();
    ticks.store(50, Ordering::Release);
    system.process_internal_timing_events(50).unwrap();
    assert_eq!(fired.get(), 0);
    assert_eq!(system.time_until_next_timer(50), Some(50));

    ticks.store(100, Ordering::Release);
    system.process_internal_timing_events(100).unwrap();
    assert_eq!(fired.get(), 1);
    assert_eq!(system.time_until_next_timer(100), None);
}

/// Test that results computed on worker threads reach the signal.
#[test]
fn async_results_arrive_from_worker_threads() {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .build()
        .unwrap();
    let handle = runtime.handle().clone();
    let jobs = Rc::new(RefCell::new(Vec::new()));
    let status = Rc::new(Cell::new(AsyncStatus::Unready));
    let result = Rc::new(Cell::new(0));
    let input = Rc::new(RefCell::new(20));
    let (spawned, shown, seen, arg) = (jobs.clone(), status.clone(), result.clone(), input.clone());

    let mut system = System::new(move |ctx| {
        let doubled = async_signal(
            ctx,
            |reporter, (n,): (i32,)| {
                let job = handle.spawn(async move { reporter.report(n * 2) });
                spawned.borrow_mut().push(job);
            },
            (direct(&*arg),),
        )?;
        shown.set(doubled.status());
        if doubled.has_value() {
            seen.set(doubled.read()?);
        }
        Ok(())
    });

    system.refresh().unwrap();
    assert_eq!(status.get(), AsyncStatus::Launched);
    for job in jobs.borrow_mut().drain(..) {
        runtime.block_on(job).unwrap();
    }
    assert!(system.has_pending_updates());
    assert_eq!(system.process_asynchronous_updates().unwrap(), 1);
    assert_eq!(status.get(), AsyncStatus::Complete);
    assert_eq!(result.get(), 40);

    *input.borrow_mut() = 21;
    system.refresh().unwrap();
    assert_eq!(status.get(), AsyncStatus::Launched);
    for job in jobs.borrow_mut().drain(..) {
        runtime.block_on(job).unwrap();
    }
    system.process_asynchronous_updates().unwrap();
    assert_eq!(result.get(), 42);
}
