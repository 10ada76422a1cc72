//! Signal Operators
//!
//! Arithmetic, comparison and logical operators lifted onto signals, plus
//! selection ([`conditional`]) and projection ([`field`], [`subscript`]).
//!
//! # How Operators Work
//!
//! 1. An operator signal holds its operand signals and a zero-sized
//!    operation type (`Plus`, `LessThan`, ...). Nothing is computed when
//!    it is built.
//!
//! 2. Reading evaluates the operation on the operands' current values.
//!    The value id is the pair of the operands' ids, so consumers only
//!    redo work when an operand changed.
//!
//! 3. An operator has a value when all operands do and the operation is
//!    defined for them. Overflow and division by zero leave it valueless
//!    instead of panicking.
//!
//! # Partial Knowledge
//!
//! [`logical_or`] and [`logical_and`] do not always need both operands.
//! `true || x` is `true` whatever `x` is, so it has a value even while `x`
//! has none. Likewise `false && x` is `false`.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::marker::PhantomData;
use std::ops::{BitAnd, BitOr, BitXor, Not};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::id::{IdInterface, IdPair, IdView, SimpleId};

use super::basic::IntoReadSignal;
use super::numeric::Arithmetic;
use super::signal::{ClearSignal, ReadSignal, Signal, WriteSignal};

type ValueOf<S> = <<S as IntoReadSignal>::Signal as Signal>::Value;

// ----------------------------------------------------------------------------
// Binary operators
// ----------------------------------------------------------------------------

/// An operation on two values.
pub trait BinaryOp<X, Y> {
    type Output;

    /// The result, or `None` where the operation is undefined.
    fn apply(x: &X, y: &Y) -> Option<Self::Output>;
}

/// The result of a binary operator applied to two signals.
pub struct Binary<A, B, Op> {
    a: A,
    b: B,
    op: PhantomData<fn() -> Op>,
}

impl<A: Clone, B: Clone, Op> Clone for Binary<A, B, Op> {
    fn clone(&self) -> Self {
        Self::new(self.a.clone(), self.b.clone())
    }
}

impl<A, B, Op> Binary<A, B, Op> {
    pub fn new(a: A, b: B) -> Self {
        Self {
            a,
            b,
            op: PhantomData,
        }
    }
}

impl<A, B, Op> Binary<A, B, Op>
where
    A: ReadSignal,
    B: ReadSignal,
    Op: BinaryOp<A::Value, B::Value>,
{
    fn evaluate(&self) -> Result<Op::Output> {
        self.a
            .with(|x| self.b.with(|y| Op::apply(x, y)))??
            .ok_or(Error::NoValue)
    }
}

impl<A, B, Op> Signal for Binary<A, B, Op>
where
    A: Signal,
    B: Signal,
    Op: BinaryOp<A::Value, B::Value>,
{
    type Value = Op::Output;
}

impl<A, B, Op> ReadSignal for Binary<A, B, Op>
where
    A: ReadSignal,
    B: ReadSignal,
    Op: BinaryOp<A::Value, B::Value>,
{
    type Id<'a> = IdPair<A::Id<'a>, B::Id<'a>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.a.has_value() && self.b.has_value() && self.evaluate().is_ok()
    }

    fn value_id(&self) -> Self::Id<'_> {
        IdPair(self.a.value_id(), self.b.value_id())
    }

    fn with<R>(&self, f: impl FnOnce(&Op::Output) -> R) -> Result<R> {
        let value = self.evaluate()?;
        Ok(f(&value))
    }
}

macro_rules! binary_operators {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        $(
            $(#[$doc])*
            pub fn $name<A, B>(a: A, b: B) -> Binary<A::Signal, B::Signal, $op>
            where
                A: IntoReadSignal,
                B: IntoReadSignal,
                $op: BinaryOp<ValueOf<A>, ValueOf<B>>,
            {
                Binary::new(a.into_read_signal(), b.into_read_signal())
            }
        )*
    };
}

macro_rules! operations {
    ($($op:ident),*) => {
        $(
            #[derive(Debug, Clone, Copy)]
            pub struct $op;
        )*
    };
}

operations!(
    Plus, Minus, Times, DividedBy, Modulo, EqualTo, NotEqualTo, LessThan, LessOrEqual,
    GreaterThan, GreaterOrEqual, BitwiseAnd, BitwiseOr, BitwiseXor, Negation, Complement
);

macro_rules! checked_operations {
    ($($op:ident => $method:ident),*) => {
        $(
            impl<T: Arithmetic> BinaryOp<T, T> for $op {
                type Output = T;

                fn apply(x: &T, y: &T) -> Option<T> {
                    x.$method(*y)
                }
            }
        )*
    };
}

checked_operations!(
    Plus => checked_add,
    Minus => checked_sub,
    Times => checked_mul,
    DividedBy => checked_div,
    Modulo => checked_rem
);

macro_rules! comparisons {
    ($($op:ident: $bound:ident => $cmp:tt),*) => {
        $(
            impl<X: $bound<Y>, Y> BinaryOp<X, Y> for $op {
                type Output = bool;

                fn apply(x: &X, y: &Y) -> Option<bool> {
                    Some(x $cmp y)
                }
            }
        )*
    };
}

comparisons!(
    EqualTo: PartialEq => ==,
    NotEqualTo: PartialEq => !=,
    LessThan: PartialOrd => <,
    LessOrEqual: PartialOrd => <=,
    GreaterThan: PartialOrd => >,
    GreaterOrEqual: PartialOrd => >=
);

macro_rules! bitwise {
    ($($op:ident: $bound:ident => $method:ident),*) => {
        $(
            impl<X: $bound<Y> + Clone, Y: Clone> BinaryOp<X, Y> for $op {
                type Output = X::Output;

                fn apply(x: &X, y: &Y) -> Option<X::Output> {
                    Some(x.clone().$method(y.clone()))
                }
            }
        )*
    };
}

bitwise!(
    BitwiseAnd: BitAnd => bitand,
    BitwiseOr: BitOr => bitor,
    BitwiseXor: BitXor => bitxor
);

binary_operators! {
    /// `a + b`. No value on overflow.
    add => Plus;
    /// `a - b`. No value on overflow.
    subtract => Minus;
    /// `a * b`. No value on overflow.
    multiply => Times;
    /// `a / b`. No value when `b` is zero.
    divide => DividedBy;
    /// `a % b`. No value when `b` is zero.
    remainder => Modulo;
    equal => EqualTo;
    not_equal => NotEqualTo;
    less => LessThan;
    less_or_equal => LessOrEqual;
    greater => GreaterThan;
    greater_or_equal => GreaterOrEqual;
    bit_and => BitwiseAnd;
    bit_or => BitwiseOr;
    bit_xor => BitwiseXor;
}

// ----------------------------------------------------------------------------
// Unary operators
// ----------------------------------------------------------------------------

/// An operation on one value.
pub trait UnaryOp<X> {
    type Output;

    fn apply(x: &X) -> Option<Self::Output>;
}

impl<T: Arithmetic> UnaryOp<T> for Negation {
    type Output = T;

    fn apply(x: &T) -> Option<T> {
        x.checked_neg()
    }
}

impl<T: Not + Clone> UnaryOp<T> for Complement {
    type Output = T::Output;

    fn apply(x: &T) -> Option<T::Output> {
        Some(!x.clone())
    }
}

/// The result of a unary operator applied to a signal.
pub struct Unary<A, Op> {
    a: A,
    op: PhantomData<fn() -> Op>,
}

impl<A: Clone, Op> Clone for Unary<A, Op> {
    fn clone(&self) -> Self {
        Self {
            a: self.a.clone(),
            op: PhantomData,
        }
    }
}

impl<A: Signal, Op: UnaryOp<A::Value>> Signal for Unary<A, Op> {
    type Value = Op::Output;
}

impl<A: ReadSignal, Op: UnaryOp<A::Value>> ReadSignal for Unary<A, Op> {
    type Id<'a> = A::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.a.with(|x| Op::apply(x).is_some()).unwrap_or(false)
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.a.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&Op::Output) -> R) -> Result<R> {
        let value = self.a.with(|x| Op::apply(x))?.ok_or(Error::NoValue)?;
        Ok(f(&value))
    }
}

/// `-a`. No value when the negation overflows.
pub fn negate<A>(a: A) -> Unary<A::Signal, Negation>
where
    A: IntoReadSignal,
    Negation: UnaryOp<ValueOf<A>>,
{
    Unary {
        a: a.into_read_signal(),
        op: PhantomData,
    }
}

/// `!a`, for booleans and integers.
pub fn logical_not<A>(a: A) -> Unary<A::Signal, Complement>
where
    A: IntoReadSignal,
    Complement: UnaryOp<ValueOf<A>>,
{
    Unary {
        a: a.into_read_signal(),
        op: PhantomData,
    }
}

// ----------------------------------------------------------------------------
// Logical operators
// ----------------------------------------------------------------------------

/// A short-circuiting logical operator. `DOMINANT` is the operand value
/// that decides the result on its own: `true` for or, `false` for and.
#[derive(Clone)]
pub struct Logical<A, B, const DOMINANT: bool> {
    a: A,
    b: B,
}

pub type LogicalOr<A, B> = Logical<A, B, true>;
pub type LogicalAnd<A, B> = Logical<A, B, false>;

fn known<S: ReadSignal<Value = bool>>(signal: &S) -> Option<bool> {
    if signal.has_value() {
        signal.read().ok()
    } else {
        None
    }
}

impl<A, B, const DOMINANT: bool> Logical<A, B, DOMINANT>
where
    A: ReadSignal<Value = bool>,
    B: ReadSignal<Value = bool>,
{
    fn decide(&self) -> Option<bool> {
        let a = known(&self.a);
        if a == Some(DOMINANT) {
            return Some(DOMINANT);
        }
        match (a, known(&self.b)) {
            (_, Some(b)) if b == DOMINANT => Some(DOMINANT),
            (Some(_), Some(_)) => Some(!DOMINANT),
            _ => None,
        }
    }
}

impl<A, B, const DOMINANT: bool> Signal for Logical<A, B, DOMINANT> {
    type Value = bool;
}

impl<A, B, const DOMINANT: bool> ReadSignal for Logical<A, B, DOMINANT>
where
    A: ReadSignal<Value = bool>,
    B: ReadSignal<Value = bool>,
{
    type Id<'a> = IdPair<A::Id<'a>, B::Id<'a>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.decide().is_some()
    }

    fn value_id(&self) -> Self::Id<'_> {
        IdPair(self.a.value_id(), self.b.value_id())
    }

    fn with<R>(&self, f: impl FnOnce(&bool) -> R) -> Result<R> {
        let value = self.decide().ok_or(Error::NoValue)?;
        Ok(f(&value))
    }
}

/// `a || b`, with a value as soon as either side is known to be `true`.
pub fn logical_or<A, B>(a: A, b: B) -> LogicalOr<A::Signal, B::Signal>
where
    A: IntoReadSignal,
    B: IntoReadSignal,
    A::Signal: ReadSignal<Value = bool>,
    B::Signal: ReadSignal<Value = bool>,
{
    Logical {
        a: a.into_read_signal(),
        b: b.into_read_signal(),
    }
}

/// `a && b`, with a value as soon as either side is known to be `false`.
pub fn logical_and<A, B>(a: A, b: B) -> LogicalAnd<A::Signal, B::Signal>
where
    A: IntoReadSignal,
    B: IntoReadSignal,
    A::Signal: ReadSignal<Value = bool>,
    B::Signal: ReadSignal<Value = bool>,
{
    Logical {
        a: a.into_read_signal(),
        b: b.into_read_signal(),
    }
}

// ----------------------------------------------------------------------------
// Selection
// ----------------------------------------------------------------------------

/// The identity of whichever branch a [`Conditional`] selected.
#[derive(Debug, Clone)]
pub enum BranchId<T, F> {
    True(T),
    False(F),
}

impl<T: IdInterface, F: IdInterface> IdInterface for BranchId<T, F> {
    fn view(&self) -> IdView<'_> {
        match self {
            BranchId::True(id) => id.view(),
            BranchId::False(id) => id.view(),
        }
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        match self {
            BranchId::True(id) => id.clone_id(),
            BranchId::False(id) => id.clone_id(),
        }
    }
}

/// Selects one of two signals by a boolean condition. Both branches are
/// built, but only the selected one is read or written.
#[derive(Clone)]
pub struct Conditional<C, T, F> {
    condition: C,
    t: T,
    f: F,
}

/// `if condition { t } else { f }` as a signal. It has no value, and
/// accepts no writes, while `condition` has none.
pub fn conditional<C, T, F>(
    condition: C,
    t: T,
    f: F,
) -> Conditional<C::Signal, T::Signal, F::Signal>
where
    C: IntoReadSignal,
    T: IntoReadSignal,
    F: IntoReadSignal,
    C::Signal: ReadSignal<Value = bool>,
    F::Signal: Signal<Value = ValueOf<T>>,
{
    Conditional {
        condition: condition.into_read_signal(),
        t: t.into_read_signal(),
        f: f.into_read_signal(),
    }
}

impl<C, T: Signal, F> Signal for Conditional<C, T, F> {
    type Value = T::Value;
}

impl<C, T, F> ReadSignal for Conditional<C, T, F>
where
    C: ReadSignal<Value = bool>,
    T: ReadSignal,
    F: ReadSignal<Value = T::Value>,
{
    type Id<'a> = Option<IdPair<SimpleId<bool>, BranchId<T::Id<'a>, F::Id<'a>>>>
    where
        Self: 'a;

    fn has_value(&self) -> bool {
        match known(&self.condition) {
            Some(true) => self.t.has_value(),
            Some(false) => self.f.has_value(),
            None => false,
        }
    }

    fn value_id(&self) -> Self::Id<'_> {
        known(&self.condition).map(|selected| {
            let branch = if selected {
                BranchId::True(self.t.value_id())
            } else {
                BranchId::False(self.f.value_id())
            };
            IdPair(SimpleId(selected), branch)
        })
    }

    fn with<R>(&self, f: impl FnOnce(&T::Value) -> R) -> Result<R> {
        if self.condition.read()? {
            self.t.with(f)
        } else {
            self.f.with(f)
        }
    }
}

impl<C, T, F> WriteSignal for Conditional<C, T, F>
where
    C: ReadSignal<Value = bool>,
    T: WriteSignal,
    F: WriteSignal<Value = T::Value>,
{
    fn ready_to_write(&self) -> bool {
        match known(&self.condition) {
            Some(true) => self.t.ready_to_write(),
            Some(false) => self.f.ready_to_write(),
            None => false,
        }
    }

    fn write(&self, value: T::Value) -> Result<()> {
        match known(&self.condition) {
            Some(true) => self.t.write(value),
            Some(false) => self.f.write(value),
            None => Err(Error::NotReady),
        }
    }
}

impl<C, T, F> ClearSignal for Conditional<C, T, F>
where
    C: ReadSignal<Value = bool>,
    T: ClearSignal,
    F: ClearSignal<Value = T::Value>,
{
    fn clear(&self) -> Result<()> {
        match known(&self.condition) {
            Some(true) => self.t.clear(),
            Some(false) => self.f.clear(),
            None => Err(Error::NotReady),
        }
    }
}

// ----------------------------------------------------------------------------
// Fields
// ----------------------------------------------------------------------------

/// One field of a structure carried by a signal.
pub struct Field<S: Signal, T> {
    structure: S,
    get: fn(&S::Value) -> &T,
    get_mut: fn(&mut S::Value) -> &mut T,
}

impl<S: Signal + Clone, T> Clone for Field<S, T> {
    fn clone(&self) -> Self {
        Self {
            structure: self.structure.clone(),
            get: self.get,
            get_mut: self.get_mut,
        }
    }
}

/// Project `structure` onto one of its fields. Writes read the whole
/// structure, replace the field and write the structure back.
///
/// ```rust,ignore
/// let x = field(point, |p| &p.x, |p| &mut p.x);
/// // or
/// let x = signal_field!(point, x);
/// ```
pub fn field<S: Signal, T>(
    structure: S,
    get: fn(&S::Value) -> &T,
    get_mut: fn(&mut S::Value) -> &mut T,
) -> Field<S, T> {
    Field {
        structure,
        get,
        get_mut,
    }
}

/// `signal_field!(signal, name)` projects `signal` onto its field `name`.
#[macro_export]
macro_rules! signal_field {
    ($structure:expr, $name:ident) => {
        $crate::reactive::field($structure, |s| &s.$name, |s| &mut s.$name)
    };
}

impl<S: Signal, T> Signal for Field<S, T> {
    type Value = T;
}

impl<S: ReadSignal, T> ReadSignal for Field<S, T> {
    type Id<'a> = S::Id<'a> where Self: 'a;

    fn has_value(&self) -> bool {
        self.structure.has_value()
    }

    fn value_id(&self) -> Self::Id<'_> {
        self.structure.value_id()
    }

    fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R> {
        self.structure.with(|structure| f((self.get)(structure)))
    }
}

impl<S, T> WriteSignal for Field<S, T>
where
    S: ReadSignal + WriteSignal,
    S::Value: Clone,
{
    fn ready_to_write(&self) -> bool {
        self.structure.has_value() && self.structure.ready_to_write()
    }

    fn write(&self, value: T) -> Result<()> {
        let mut structure = self.structure.read()?;
        *(self.get_mut)(&mut structure) = value;
        self.structure.write(structure)
    }
}

// ----------------------------------------------------------------------------
// Subscripts
// ----------------------------------------------------------------------------

/// Containers that can be indexed by a key.
pub trait Subscriptable<K> {
    type Item;

    fn item(&self, key: &K) -> Option<&Self::Item>;

    /// Whether [`store`](Self::store) would accept `key`.
    fn can_store(&self, key: &K) -> bool;

    /// Store `item` under `key`. Maps insert; sequences only replace.
    fn store(&mut self, key: K, item: Self::Item) -> Result<()>;
}

impl<T> Subscriptable<usize> for Vec<T> {
    type Item = T;

    fn item(&self, index: &usize) -> Option<&T> {
        self.get(*index)
    }

    fn can_store(&self, index: &usize) -> bool {
        *index < self.len()
    }

    fn store(&mut self, index: usize, item: T) -> Result<()> {
        let slot = self.get_mut(index).ok_or(Error::NotReady)?;
        *slot = item;
        Ok(())
    }
}

macro_rules! subscriptable_maps {
    ($($map:ident: $($bound:ident)+),*) => {
        $(
            impl<K: $($bound +)+, V> Subscriptable<K> for $map<K, V> {
                type Item = V;

                fn item(&self, key: &K) -> Option<&V> {
                    self.get(key)
                }

                fn can_store(&self, _: &K) -> bool {
                    true
                }

                fn store(&mut self, key: K, item: V) -> Result<()> {
                    self.insert(key, item);
                    Ok(())
                }
            }
        )*
    };
}

subscriptable_maps!(HashMap: Eq Hash, BTreeMap: Ord, IndexMap: Eq Hash);

/// The item of a container signal selected by a key signal.
#[derive(Clone)]
pub struct Subscript<S, I> {
    container: S,
    index: I,
}

/// `container[index]` as a signal. It has no value while the key is
/// missing from the container.
pub fn subscript<S, I>(container: S, index: I) -> Subscript<S, I::Signal>
where
    S: Signal,
    I: IntoReadSignal,
    S::Value: Subscriptable<ValueOf<I>>,
{
    Subscript {
        container,
        index: index.into_read_signal(),
    }
}

impl<S, I> Signal for Subscript<S, I>
where
    S: Signal,
    I: Signal,
    S::Value: Subscriptable<I::Value>,
{
    type Value = <S::Value as Subscriptable<I::Value>>::Item;
}

impl<S, I> ReadSignal for Subscript<S, I>
where
    S: ReadSignal,
    I: ReadSignal,
    S::Value: Subscriptable<I::Value>,
{
    type Id<'a> = IdPair<S::Id<'a>, I::Id<'a>> where Self: 'a;

    fn has_value(&self) -> bool {
        self.with(|_| ()).is_ok()
    }

    fn value_id(&self) -> Self::Id<'_> {
        IdPair(self.container.value_id(), self.index.value_id())
    }

    fn with<R>(&self, f: impl FnOnce(&Self::Value) -> R) -> Result<R> {
        self.index
            .with(|key| {
                self.container
                    .with(|container| container.item(key).map(f))
            })??
            .ok_or(Error::NoValue)
    }
}

impl<S, I> WriteSignal for Subscript<S, I>
where
    S: ReadSignal + WriteSignal,
    I: ReadSignal,
    S::Value: Subscriptable<I::Value> + Clone,
    I::Value: Clone,
{
    fn ready_to_write(&self) -> bool {
        self.container.ready_to_write()
            && self
                .index
                .with(|key| {
                    self.container
                        .with(|container| container.can_store(key))
                        .unwrap_or(false)
                })
                .unwrap_or(false)
    }

    fn write(&self, value: Self::Value) -> Result<()> {
        let key = self.index.read()?;
        let mut container = self.container.read()?;
        container.store(key, value)?;
        self.container.write(container)
    }
}
