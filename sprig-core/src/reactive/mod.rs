//! Reactive Primitives
//!
//! Signals are the currency of the framework: every piece of data that
//! flows through the controller, whether constant, stored in component
//! state, derived from other signals or produced asynchronously, is
//! exposed through the signal traits.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A signal may or may not have a value at any given moment. Readable
//! signals also expose a *value id*, an identity that changes whenever the
//! value does. Consumers cache work keyed by value ids instead of comparing
//! values, which keeps change detection cheap even for large values.
//!
//! ## Capabilities
//!
//! Reading, writing, clearing and moving are separate traits
//! ([`ReadSignal`], [`WriteSignal`], [`ClearSignal`], [`MoveSignal`]), so a
//! function states exactly what it needs from its arguments and the
//! compiler checks it.
//!
//! ## Adaptors
//!
//! Most of this module is small wrappers that change one aspect of a
//! signal: its type ([`signal_cast`]), its readiness ([`mask`],
//! [`only_if_ready`]), its value ([`scale`], [`add_default`]) or its
//! textual form ([`as_duplex_text`]).
//!
//! ## Operators
//!
//! Arithmetic, comparisons and logic are lifted onto signals by named
//! constructors ([`add`], [`less`], [`logical_or`], ...). Selection
//! ([`conditional`]) and projection ([`field`], [`subscript`]) stay
//! writable when their inputs are.
//!
//! # Implementation Notes
//!
//! Signals are plain values built fresh on every pass. Anything that must
//! outlive a pass (state, cached results) lives in the data graph and is
//! reached through the [`Context`](crate::flow::Context).

mod adaptors;
mod apply;
mod async_signal;
mod basic;
mod lazy;
mod numeric;
mod operators;
mod signal;
mod state;
mod text;

pub use adaptors::{
    add_default, disable_writes, element, fake_readability, fake_writability, mask, mask_writes,
    only_if_ready, presence, signal_cast, simplify_id, unwrap_option, write_readiness, AddDefault,
    Element, FakeReadability, FakeWritability, Masked, MaskedWrites, OnlyIfReady, Presence,
    SignalCast, SimplifyId, UnwrapOption, WriteReadiness,
};
pub use apply::{
    apply, lazy_apply, try_apply, Applied, ApplyResult, LazyApply, SignalArgs, TextArgs,
};
pub use async_signal::{async_signal, AsyncReporter, AsyncResultEvent, AsyncSignal, AsyncStatus};
pub use basic::{
    direct, direct_const, empty, lambda_reader, signalize, value, DirectConstSignal, DirectSignal,
    EmptySignal, IntoReadSignal, LambdaReader, ValueSignal,
};
pub use lazy::LazyReader;
pub use numeric::{
    check_range, offset, round_signal_writes, scale, Arithmetic, LinearOp, Linear, Offset,
    OffsetOp, RoundTo, RoundWrites, ScaleOp, Scaled,
};
pub use operators::{
    add, bit_and, bit_or, bit_xor, conditional, divide, equal, field, greater, greater_or_equal,
    less, less_or_equal, logical_and, logical_not, logical_or, multiply, negate, not_equal,
    remainder, subscript, subtract, Binary, BinaryOp, BitwiseAnd, BitwiseOr, BitwiseXor,
    BranchId, Complement, Conditional, DividedBy, EqualTo, Field, GreaterOrEqual, GreaterThan,
    LessOrEqual, LessThan, Logical, LogicalAnd, LogicalOr, Minus, Modulo, Negation, NotEqualTo,
    Plus, Subscript, Subscriptable, Times, Unary, UnaryOp,
};
pub use signal::{
    read_signal, signal_has_value, signal_ready_to_write, write_signal, ClearSignal,
    DuplexSignal, MoveSignal, ReadSignal, Signal, WriteSignal,
};
pub use state::{get_state, get_transient_state, StateSignal, StateStorage};
pub use text::{
    as_duplex_text, as_text, format_args_text, printf, DuplexText, FormattedText, FromText,
    TextSignal, ToText, EXPECTS_INTEGER, EXPECTS_NUMBER, INTEGER_OUT_OF_RANGE,
};
