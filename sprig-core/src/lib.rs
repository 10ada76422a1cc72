//! Sprig Core
//!
//! This crate provides the core runtime for the Sprig immediate-mode UI
//! framework. Application code (the *controller*) is re-run from scratch on
//! every refresh to declare the current UI, and the runtime supplies what
//! makes that practical:
//!
//! - A data graph that gives each call site stable storage across passes
//! - Signals and actions for reactive values and commands
//! - A component tree that routes targeted events without visiting
//!   unrelated subtrees
//! - Timers and asynchronous signals driven by a pluggable host interface
//!
//! Rendering, layout and platform glue are left to the host.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `id`: Value identities used for change detection
//! - `graph`: Position-keyed storage with garbage collection
//! - `reactive`: Signals and signal combinators
//! - `action`: Actions and action combinators
//! - `flow`: Traversal context, control flow, components and events
//! - `timing`: Tick counts, timer scheduling and timers
//! - `system`: The driver that ties it all together
//!
//! # Example
//!
//! ```rust,ignore
//! use sprig_core::reactive::{get_state, ReadSignal, WriteSignal};
//! use sprig_core::system::System;
//!
//! let mut system = System::new(|ctx| {
//!     let clicks = get_state(ctx, 0)?;
//!     println!("clicked {} times", clicks.read()?);
//!     Ok(())
//! });
//!
//! // Runs the controller; repeats while anything was marked dirty.
//! system.refresh()?;
//! ```

pub mod action;
pub mod error;
pub mod flow;
pub mod graph;
pub mod id;
pub mod reactive;
pub mod system;
pub mod timing;

pub use error::{Error, Result};
