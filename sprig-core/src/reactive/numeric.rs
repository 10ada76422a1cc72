//! Numeric Adaptors
//!
//! Duplex signals that present a number through a linear transformation
//! (`scale`, `offset`) and invert the transformation on writes, plus
//! rounding of written values.
//!
//! All arithmetic goes through [`Arithmetic`], which reports overflow and
//! division by zero as `None`. A result that cannot be computed makes the
//! signal valueless, and a write that cannot be inverted is refused with a
//! validation error.

use crate::error::{Error, Result};
use crate::id::{IdPair, IdValue};

use super::basic::IntoReadSignal;
use super::lazy::LazyReader;
use super::signal::{ReadSignal, Signal, WriteSignal};

/// Message for writes that cannot be mapped back onto the underlying signal.
const NOT_REPRESENTABLE: &str = "This value cannot be represented.";

// ----------------------------------------------------------------------------
// Checked arithmetic
// ----------------------------------------------------------------------------

/// Numbers with non-panicking arithmetic.
pub trait Arithmetic: Copy + PartialEq {
    const ZERO: Self;
    const ONE: Self;

    fn checked_add(self, other: Self) -> Option<Self>;
    fn checked_sub(self, other: Self) -> Option<Self>;
    fn checked_mul(self, other: Self) -> Option<Self>;
    /// `None` for a zero divisor.
    fn checked_div(self, other: Self) -> Option<Self>;
    /// `None` for a zero divisor.
    fn checked_rem(self, other: Self) -> Option<Self>;
    fn checked_neg(self) -> Option<Self>;
}

macro_rules! integer_arithmetic {
    ($($t:ty),*) => {
        $(
            impl Arithmetic for $t {
                const ZERO: Self = 0;
                const ONE: Self = 1;

                fn checked_add(self, other: Self) -> Option<Self> {
                    <$t>::checked_add(self, other)
                }

                fn checked_sub(self, other: Self) -> Option<Self> {
                    <$t>::checked_sub(self, other)
                }

                fn checked_mul(self, other: Self) -> Option<Self> {
                    <$t>::checked_mul(self, other)
                }

                fn checked_div(self, other: Self) -> Option<Self> {
                    <$t>::checked_div(self, other)
                }

                fn checked_rem(self, other: Self) -> Option<Self> {
                    <$t>::checked_rem(self, other)
                }

                fn checked_neg(self) -> Option<Self> {
                    <$t>::checked_neg(self)
                }
            }
        )*
    };
}

macro_rules! float_arithmetic {
    ($($t:ty),*) => {
        $(
            impl Arithmetic for $t {
                const ZERO: Self = 0.0;
                const ONE: Self = 1.0;

                fn checked_add(self, other: Self) -> Option<Self> {
                    finite(self + other)
                }

                fn checked_sub(self, other: Self) -> Option<Self> {
                    finite(self - other)
                }

                fn checked_mul(self, other: Self) -> Option<Self> {
                    finite(self * other)
                }

                fn checked_div(self, other: Self) -> Option<Self> {
                    if other == 0.0 {
                        None
                    } else {
                        finite(self / other)
                    }
                }

                fn checked_rem(self, other: Self) -> Option<Self> {
                    if other == 0.0 {
                        None
                    } else {
                        finite(self % other)
                    }
                }

                fn checked_neg(self) -> Option<Self> {
                    Some(-self)
                }
            }
        )*
    };
}

integer_arithmetic!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
float_arithmetic!(f32, f64);

fn finite<T: Into<f64> + Copy>(value: T) -> Option<T> {
    value.into().is_finite().then_some(value)
}

// ----------------------------------------------------------------------------
// Linear transformations
// ----------------------------------------------------------------------------

/// The transformation applied by a [`Linear`] signal.
pub trait LinearOp<T> {
    fn apply(value: T, parameter: T) -> Option<T>;
    fn invert(value: T, parameter: T) -> Option<T>;

    /// Whether written values can be mapped back through `parameter`.
    fn invertible(_parameter: &T) -> bool {
        true
    }
}

/// Multiplies on reads, divides on writes. A zero factor cannot be
/// inverted, so it blocks writes.
pub struct ScaleOp;

impl<T: Arithmetic> LinearOp<T> for ScaleOp {
    fn apply(value: T, factor: T) -> Option<T> {
        value.checked_mul(factor)
    }

    fn invert(value: T, factor: T) -> Option<T> {
        value.checked_div(factor)
    }

    fn invertible(factor: &T) -> bool {
        *factor != T::ZERO
    }
}

/// Adds on reads, subtracts on writes.
pub struct OffsetOp;

impl<T: Arithmetic> LinearOp<T> for OffsetOp {
    fn apply(value: T, offset: T) -> Option<T> {
        value.checked_add(offset)
    }

    fn invert(value: T, offset: T) -> Option<T> {
        value.checked_sub(offset)
    }
}

/// A number transformed by a parameter signal.
pub struct Linear<N: Signal, P, Op> {
    inner: N,
    parameter: P,
    cache: LazyReader<N::Value>,
    op: std::marker::PhantomData<Op>,
}

impl<N, P, Op> Clone for Linear<N, P, Op>
where
    N: Signal + Clone,
    P: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            parameter: self.parameter.clone(),
            cache: LazyReader::default(),
            op: std::marker::PhantomData,
        }
    }
}

pub type Scaled<N, F> = Linear<N, F, ScaleOp>;
pub type Offset<N, O> = Linear<N, O, OffsetOp>;

/// `n * factor` on reads; writes store `value / factor` into `n`.
pub fn scale<N, F>(n: N, factor: F) -> Scaled<N, F::Signal>
where
    N: Signal,
    F: IntoReadSignal,
{
    Linear {
        inner: n,
        parameter: factor.into_read_signal(),
        cache: LazyReader::default(),
        op: std::marker::PhantomData,
    }
}

/// `n + offset` on reads; writes store `value - offset` into `n`.
pub fn offset<N, O>(n: N, offset: O) -> Offset<N, O::Signal>
where
    N: Signal,
    O: IntoReadSignal,
{
    Linear {
        inner: n,
        parameter: offset.into_read_signal(),
        cache: LazyReader::default(),
        op: std::marker::PhantomData,
    }
}

impl<N, P, Op, T> Linear<N, P, Op>
where
    N: ReadSignal<Value = T>,
    P: ReadSignal<Value = T>,
    Op: LinearOp<T>,
    T: Clone,
{
    fn evaluate(&self) -> Result<T> {
        self.cache.read(&self.value_id(), || {
            Op::apply(self.inner.read()?, self.parameter.read()?).ok_or(Error::NoValue)
        })
    }
}

impl<N: Signal, P, Op> Signal for Linear<N, P, Op> {
    type Value = N::Value;
}

impl<N, P, Op, T> ReadSignal for Linear<N, P, Op>
where
    N: ReadSignal<Value = T>,
    P: ReadSignal<Value = T>,
    Op: LinearOp<T>,
    T: Clone,
{
    type Id<'a> = IdPair<N::Id<'a>, P::Id<'a>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.inner.has_value() && self.parameter.has_value() && self.evaluate().is_ok()
    }

    fn value_id(&self) -> Self::Id<'_> {
        IdPair(self.inner.value_id(), self.parameter.value_id())
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        let value = self.evaluate()?;
        Ok(f(&value))
    }
}

impl<N, P, Op, T> WriteSignal for Linear<N, P, Op>
where
    N: WriteSignal<Value = T>,
    P: ReadSignal<Value = T>,
    Op: LinearOp<T>,
    T: Clone,
{
    fn ready_to_write(&self) -> bool {
        self.inner.ready_to_write()
            && self
                .parameter
                .with(|parameter| Op::invertible(parameter))
                .unwrap_or(false)
    }

    fn write(&self, value: T) -> Result<()> {
        let parameter = self.parameter.read()?;
        if !Op::invertible(&parameter) {
            return Err(Error::validation(NOT_REPRESENTABLE));
        }
        let stored =
            Op::invert(value, parameter).ok_or_else(|| Error::validation(NOT_REPRESENTABLE))?;
        self.inner.write(stored)
    }
}

// ----------------------------------------------------------------------------
// Rounding
// ----------------------------------------------------------------------------

/// Numbers that can be rounded to a multiple of a step.
pub trait RoundTo: Copy {
    /// Whether `step` can be rounded to. Only positive steps can.
    fn valid_step(step: Self) -> bool;

    /// Round to the nearest multiple of a valid `step`, halves away from
    /// negative infinity.
    fn round_to(self, step: Self) -> Self;
}

macro_rules! round_floats {
    ($($t:ty),*) => {
        $(
            impl RoundTo for $t {
                fn valid_step(step: Self) -> bool {
                    step > 0.0 && step.is_finite()
                }

                fn round_to(self, step: Self) -> Self {
                    (self / step + 0.5).floor() * step
                }
            }
        )*
    };
}

macro_rules! round_integers {
    ($($t:ty),*) => {
        $(
            impl RoundTo for $t {
                fn valid_step(step: Self) -> bool {
                    step > 0
                }

                fn round_to(self, step: Self) -> Self {
                    let shifted = self.saturating_add(step / 2);
                    let excess = shifted.rem_euclid(step);
                    // Near the minimum, rounding down would leave the range.
                    match shifted.checked_sub(excess) {
                        Some(rounded) => rounded,
                        None => shifted + (step - excess),
                    }
                }
            }
        )*
    };
}

round_floats!(f32, f64);
round_integers!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Rounds written values to the nearest multiple of `step`. Reads pass
/// through. A step that is not positive blocks writes.
pub struct RoundWrites<S: Signal> {
    inner: S,
    step: S::Value,
}

pub fn round_signal_writes<S>(signal: S, step: S::Value) -> RoundWrites<S>
where
    S: WriteSignal,
    S::Value: RoundTo,
{
    RoundWrites {
        inner: signal,
        step,
    }
}

impl<S: Signal> Signal for RoundWrites<S> {
    type Value = S::Value;
}

impl<S: ReadSignal> ReadSignal for RoundWrites<S> {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.inner.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.inner.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&S::Value) -> R) -> Result<R> {
        self.inner.with(f)
    }
}

impl<S> WriteSignal for RoundWrites<S>
where
    S: WriteSignal,
    S::Value: RoundTo,
{
    fn ready_to_write(&self) -> bool {
        S::Value::valid_step(self.step) && self.inner.ready_to_write()
    }

    fn write(&self, value: S::Value) -> Result<()> {
        if !S::Value::valid_step(self.step) {
            return Err(Error::validation("The rounding step must be positive."));
        }
        self.inner.write(value.round_to(self.step))
    }
}

/// Fail with a validation error unless `value` lies in `min..=max`.
pub fn check_range<T: PartialOrd + IdValue>(value: T, min: T, max: T) -> Result<T> {
    if value < min || value > max {
        Err(Error::validation(format!(
            "{value:?} is outside the range {min:?} to {max:?}."
        )))
    } else {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::IdInterface;
    use crate::reactive::{direct, empty};
    use std::cell::RefCell;

    #[test]
    fn scale_round_trips_through_the_factor() {
        let x = RefCell::new(1);
        let scaled = scale(direct(&x), 10);
        assert_eq!(scaled.read().unwrap(), 10);
        scaled.write(20).unwrap();
        assert_eq!(*x.borrow(), 2);
        assert_eq!(scaled.read().unwrap(), 20);
    }

    #[test]
    fn offset_shifts_both_ways() {
        let x = RefCell::new(1.5);
        let shifted = offset(direct(&x), 2.0);
        assert_eq!(shifted.read().unwrap(), 3.5);
        shifted.write(10.0).unwrap();
        assert_eq!(*x.borrow(), 8.0);
    }

    #[test]
    fn missing_parameters_block_reads_and_writes() {
        let x = RefCell::new(1);
        let scaled = scale(direct(&x), empty::<i32>());
        assert!(!scaled.has_value());
        assert!(!scaled.ready_to_write());
    }

    #[test]
    fn ids_change_with_either_input() {
        let x = RefCell::new(1);
        let a = scale(direct(&x), 2);
        let b = scale(direct(&x), 3);
        assert!(!a.value_id().equals(&b.value_id()));
    }

    #[test]
    fn writes_are_rounded() {
        let x = RefCell::new(0.0);
        let rounded = round_signal_writes(direct(&x), 0.25);
        rounded.write(0.4).unwrap();
        assert_eq!(*x.borrow(), 0.5);

        let n = RefCell::new(0);
        let rounded = round_signal_writes(direct(&n), 10);
        rounded.write(14).unwrap();
        assert_eq!(*n.borrow(), 10);
        rounded.write(15).unwrap();
        assert_eq!(*n.borrow(), 20);
    }

    #[test]
    fn zero_factors_refuse_writes() {
        let x = RefCell::new(4i32);
        let scaled = scale(direct(&x), 0);
        assert_eq!(scaled.read().unwrap(), 0);
        assert!(!scaled.ready_to_write());
        assert!(matches!(scaled.write(5), Err(Error::Validation(_))));
        assert_eq!(*x.borrow(), 4);

        let y = RefCell::new(1.5);
        assert!(!scale(direct(&y), 0.0).ready_to_write());
    }

    #[test]
    fn overflowing_results_have_no_value() {
        let x = RefCell::new(i32::MAX);
        let doubled = scale(direct(&x), 2);
        assert!(!doubled.has_value());
        assert!(matches!(doubled.read(), Err(Error::NoValue)));

        let n = RefCell::new(0u8);
        let shifted = offset(direct(&n), 10u8);
        assert!(matches!(shifted.write(5), Err(Error::Validation(_))));
        assert_eq!(*n.borrow(), 0);
    }

    #[test]
    fn non_positive_steps_refuse_writes() {
        let n = RefCell::new(3);
        for step in [0, -1] {
            let rounded = round_signal_writes(direct(&n), step);
            assert!(!rounded.ready_to_write());
            assert!(matches!(rounded.write(i32::MIN), Err(Error::Validation(_))));
        }
        assert_eq!(*n.borrow(), 3);
    }

    #[test]
    fn rounding_near_the_minimum_stays_in_range() {
        assert_eq!(i32::MIN.round_to(10), -2_147_483_640);
        assert_eq!(i8::MIN.round_to(3), -126);
        assert_eq!(7u8.round_to(4), 8);
    }

    #[test]
    fn ranges_are_checked() {
        assert_eq!(check_range(5, 0, 10).unwrap(), 5);
        assert!(matches!(check_range(11, 0, 10), Err(Error::Validation(_))));
    }
}
