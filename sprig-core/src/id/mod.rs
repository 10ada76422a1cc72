//! Value Identities
//!
//! Every reactively tracked value carries an *identity*: a cheap token that
//! changes whenever the value changes. Consumers never compare values
//! directly. They capture the identity they last saw and ask "does the new
//! one match?"
//!
//! # How Identities Work
//!
//! 1. A concrete identity exposes a structural [`IdView`]: nothing, a unit
//!    marker, a leaf value, or a pair of two other identities.
//!
//! 2. Equality, ordering and hashing are all defined once, over views. Two
//!    identities of different concrete types are never equal, but they still
//!    order consistently so they can live in sorted containers.
//!
//! 3. Borrowed identities ([`ByRef`], [`IdRef`]) compare by dereferencing,
//!    and clone into owned [`SimpleId`]s, so a [`CapturedId`] never keeps
//!    the referent alive.
//!
//! # Implementation
//!
//! Leaf values go through the [`IdValue`] trait rather than `Eq + Ord + Hash`
//! so that floats (compared bitwise) and other partially ordered values can
//! still serve as identities.

mod captured;

pub use captured::{CapturedId, IdKey};

use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

// ----------------------------------------------------------------------------
// Identity values
// ----------------------------------------------------------------------------

/// A value that can back an identity.
pub trait IdValue: Clone + fmt::Debug + 'static {
    fn id_eq(&self, other: &Self) -> bool;
    fn id_lt(&self, other: &Self) -> bool;
    fn id_hash(&self, state: &mut dyn Hasher);
}

macro_rules! ordered_id_values {
    ($($t:ty),* $(,)?) => {
        $(
            impl IdValue for $t {
                fn id_eq(&self, other: &Self) -> bool {
                    self == other
                }

                fn id_lt(&self, other: &Self) -> bool {
                    self < other
                }

                fn id_hash(&self, mut state: &mut dyn Hasher) {
                    Hash::hash(self, &mut state)
                }
            }
        )*
    };
}

ordered_id_values!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize,
    String, &'static str, ()
);

macro_rules! float_id_values {
    ($($t:ty),*) => {
        $(
            impl IdValue for $t {
                fn id_eq(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }

                fn id_lt(&self, other: &Self) -> bool {
                    self.total_cmp(other) == Ordering::Less
                }

                fn id_hash(&self, state: &mut dyn Hasher) {
                    state.write_u64(self.to_bits() as u64)
                }
            }
        )*
    };
}

float_id_values!(f32, f64);

impl<T: IdValue> IdValue for Option<T> {
    fn id_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.id_eq(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn id_lt(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.id_lt(b),
            (None, Some(_)) => true,
            _ => false,
        }
    }

    fn id_hash(&self, state: &mut dyn Hasher) {
        match self {
            Some(value) => {
                state.write_u8(1);
                value.id_hash(state);
            }
            None => state.write_u8(0),
        }
    }
}

impl<T: IdValue> IdValue for Vec<T> {
    fn id_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.id_eq(b))
    }

    fn id_lt(&self, other: &Self) -> bool {
        for (a, b) in self.iter().zip(other) {
            if a.id_lt(b) {
                return true;
            }
            if b.id_lt(a) {
                return false;
            }
        }
        self.len() < other.len()
    }

    fn id_hash(&self, state: &mut dyn Hasher) {
        state.write_usize(self.len());
        for item in self {
            item.id_hash(state);
        }
    }
}

impl<K: IdValue, V: IdValue> IdValue for BTreeMap<K, V> {
    fn id_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .zip(other)
                .all(|((k1, v1), (k2, v2))| k1.id_eq(k2) && v1.id_eq(v2))
    }

    fn id_lt(&self, other: &Self) -> bool {
        for ((k1, v1), (k2, v2)) in self.iter().zip(other) {
            if k1.id_lt(k2) || (!k2.id_lt(k1) && v1.id_lt(v2)) {
                return true;
            }
            if k2.id_lt(k1) || v2.id_lt(v1) {
                return false;
            }
        }
        self.len() < other.len()
    }

    fn id_hash(&self, state: &mut dyn Hasher) {
        state.write_usize(self.len());
        for (key, value) in self {
            key.id_hash(state);
            value.id_hash(state);
        }
    }
}

impl<A: IdValue, B: IdValue> IdValue for (A, B) {
    fn id_eq(&self, other: &Self) -> bool {
        self.0.id_eq(&other.0) && self.1.id_eq(&other.1)
    }

    fn id_lt(&self, other: &Self) -> bool {
        self.0.id_lt(&other.0) || (!other.0.id_lt(&self.0) && self.1.id_lt(&other.1))
    }

    fn id_hash(&self, state: &mut dyn Hasher) {
        self.0.id_hash(state);
        self.1.id_hash(state);
    }
}

impl<A: IdValue, B: IdValue, C: IdValue> IdValue for (A, B, C) {
    fn id_eq(&self, other: &Self) -> bool {
        self.0.id_eq(&other.0) && self.1.id_eq(&other.1) && self.2.id_eq(&other.2)
    }

    fn id_lt(&self, other: &Self) -> bool {
        let head = (self.0.clone(), self.1.clone());
        let other_head = (other.0.clone(), other.1.clone());
        head.id_lt(&other_head) || (head.id_eq(&other_head) && self.2.id_lt(&other.2))
    }

    fn id_hash(&self, state: &mut dyn Hasher) {
        self.0.id_hash(state);
        self.1.id_hash(state);
        self.2.id_hash(state);
    }
}

/// Object-safe view of an [`IdValue`] so leaves of any type can be compared
/// through a trait object.
pub trait LeafValue: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn leaf_type(&self) -> TypeId;
    fn leaf_eq(&self, other: &dyn LeafValue) -> bool;
    fn leaf_lt(&self, other: &dyn LeafValue) -> bool;
    fn leaf_hash(&self, state: &mut dyn Hasher);
}

impl<T: IdValue> LeafValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn leaf_type(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn leaf_eq(&self, other: &dyn LeafValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self.id_eq(other))
    }

    fn leaf_lt(&self, other: &dyn LeafValue) -> bool {
        match other.as_any().downcast_ref::<T>() {
            Some(other) => self.id_lt(other),
            None => self.leaf_type() < other.leaf_type(),
        }
    }

    fn leaf_hash(&self, state: &mut dyn Hasher) {
        self.leaf_type().hash(&mut &mut *state);
        self.id_hash(state);
    }
}

// ----------------------------------------------------------------------------
// The identity interface
// ----------------------------------------------------------------------------

/// Structural view of an identity.
pub enum IdView<'a> {
    /// No value is available.
    Null,
    /// A value exists, but there is only ever one of it.
    Unit,
    Leaf(&'a dyn LeafValue),
    Pair(&'a dyn IdInterface, &'a dyn IdInterface),
}

impl IdView<'_> {
    fn rank(&self) -> u8 {
        match self {
            IdView::Null => 0,
            IdView::Unit => 1,
            IdView::Leaf(_) => 2,
            IdView::Pair(_, _) => 3,
        }
    }
}

/// A comparable, hashable, cloneable value identity.
pub trait IdInterface {
    fn view(&self) -> IdView<'_>;

    /// Produce an owning copy of this identity.
    fn clone_id(&self) -> Box<dyn IdInterface>;

    fn equals(&self, other: &dyn IdInterface) -> bool {
        match (self.view(), other.view()) {
            (IdView::Null, IdView::Null) | (IdView::Unit, IdView::Unit) => true,
            (IdView::Leaf(a), IdView::Leaf(b)) => a.leaf_eq(b),
            (IdView::Pair(a1, a2), IdView::Pair(b1, b2)) => a1.equals(b1) && a2.equals(b2),
            _ => false,
        }
    }

    fn less_than(&self, other: &dyn IdInterface) -> bool {
        let (mine, theirs) = (self.view(), other.view());
        match (&mine, &theirs) {
            (IdView::Leaf(a), IdView::Leaf(b)) => a.leaf_lt(*b),
            (IdView::Pair(a1, a2), IdView::Pair(b1, b2)) => {
                a1.less_than(*b1) || (!b1.less_than(*a1) && a2.less_than(*b2))
            }
            _ => mine.rank() < theirs.rank(),
        }
    }

    fn hash_id(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hash_view(self.view(), &mut hasher);
        hasher.finish()
    }
}

fn hash_view(view: IdView<'_>, state: &mut dyn Hasher) {
    state.write_u8(view.rank());
    match view {
        IdView::Null | IdView::Unit => {}
        IdView::Leaf(leaf) => leaf.leaf_hash(state),
        IdView::Pair(a, b) => {
            hash_view(a.view(), state);
            hash_view(b.view(), state);
        }
    }
}

impl fmt::Debug for dyn IdInterface + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for dyn IdInterface + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.view() {
            IdView::Null => write!(f, "null"),
            IdView::Unit => write!(f, "unit"),
            IdView::Leaf(leaf) => write!(f, "{leaf:?}"),
            IdView::Pair(a, b) => write!(f, "({a}, {b})"),
        }
    }
}

impl PartialEq for dyn IdInterface + '_ {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl IdInterface for Box<dyn IdInterface> {
    fn view(&self) -> IdView<'_> {
        (**self).view()
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        (**self).clone_id()
    }
}

// ----------------------------------------------------------------------------
// Concrete identities
// ----------------------------------------------------------------------------

/// The identity of a signal with no value.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullId;

impl IdInterface for NullId {
    fn view(&self) -> IdView<'_> {
        IdView::Null
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        Box::new(NullId)
    }
}

/// The identity of a value that never changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitId;

impl IdInterface for UnitId {
    fn view(&self) -> IdView<'_> {
        IdView::Unit
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        Box::new(UnitId)
    }
}

/// An identity holding its own copy of a value.
#[derive(Debug, Clone)]
pub struct SimpleId<T>(pub T);

impl<T: IdValue> IdInterface for SimpleId<T> {
    fn view(&self) -> IdView<'_> {
        IdView::Leaf(&self.0)
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        Box::new(SimpleId(self.0.clone()))
    }
}

/// An identity that borrows its value. Cloning copies the referent.
#[derive(Debug)]
pub struct ByRef<'a, T>(pub &'a T);

impl<T> Clone for ByRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ByRef<'_, T> {}

impl<T: IdValue> IdInterface for ByRef<'_, T> {
    fn view(&self) -> IdView<'_> {
        IdView::Leaf(self.0)
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        Box::new(SimpleId(self.0.clone()))
    }
}

/// A borrowed, type-erased identity.
#[derive(Clone, Copy)]
pub struct IdRef<'a>(pub &'a dyn IdInterface);

impl IdInterface for IdRef<'_> {
    fn view(&self) -> IdView<'_> {
        self.0.view()
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        self.0.clone_id()
    }
}

/// Two identities folded into one.
#[derive(Debug, Clone)]
pub struct IdPair<A, B>(pub A, pub B);

impl<A: IdInterface, B: IdInterface> IdInterface for IdPair<A, B> {
    fn view(&self) -> IdView<'_> {
        IdView::Pair(&self.0, &self.1)
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        Box::new(IdPair(self.0.clone_id(), self.1.clone_id()))
    }
}

/// An identity that may be absent. `None` behaves like [`NullId`].
impl<I: IdInterface> IdInterface for Option<I> {
    fn view(&self) -> IdView<'_> {
        match self {
            Some(id) => id.view(),
            None => IdView::Null,
        }
    }

    fn clone_id(&self) -> Box<dyn IdInterface> {
        match self {
            Some(id) => id.clone_id(),
            None => Box::new(NullId),
        }
    }
}

// ----------------------------------------------------------------------------
// Constructors
// ----------------------------------------------------------------------------

pub fn null_id() -> NullId {
    NullId
}

pub fn unit_id() -> UnitId {
    UnitId
}

pub fn make_id<T: IdValue>(value: T) -> SimpleId<T> {
    SimpleId(value)
}

pub fn make_id_by_reference<T: IdValue>(value: &T) -> ByRef<'_, T> {
    ByRef(value)
}

pub fn combine_ids<A: IdInterface, B: IdInterface>(a: A, b: B) -> IdPair<A, B> {
    IdPair(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(a: &dyn IdInterface, b: &dyn IdInterface) -> bool {
        a.equals(b)
    }

    #[test]
    fn simple_ids_compare_by_value() {
        assert!(eq(&make_id(3), &make_id(3)));
        assert!(!eq(&make_id(3), &make_id(4)));
        assert!(make_id(3).less_than(&make_id(4)));
        assert_eq!(make_id(3).hash_id(), make_id(3).hash_id());
    }

    #[test]
    fn mismatched_types_are_never_equal() {
        assert!(!eq(&make_id(3i32), &make_id(3i64)));
        assert!(!eq(&make_id(0), &UnitId));
        assert!(!eq(&NullId, &UnitId));
        let a = make_id(1i32);
        let b = make_id(1u8);
        assert!(a.less_than(&b) != b.less_than(&a));
    }

    #[test]
    fn reference_ids_match_their_clones() {
        let text = String::from("hello");
        let by_ref = make_id_by_reference(&text);
        let owned = by_ref.clone_id();
        assert!(eq(&*owned, &make_id(String::from("hello"))));
    }

    #[test]
    fn pairs_compare_elementwise() {
        let a = combine_ids(make_id(1), make_id("x"));
        let b = combine_ids(make_id(1), make_id("x"));
        let c = combine_ids(make_id(1), make_id("y"));
        assert!(eq(&a, &b));
        assert!(!eq(&a, &c));
        assert!(a.less_than(&c));
        assert!(!eq(&a, &make_id(1)));
    }

    #[test]
    fn float_ids_compare_bitwise() {
        assert!(eq(&make_id(f64::NAN), &make_id(f64::NAN)));
        assert!(!eq(&make_id(0.0f64), &make_id(-0.0f64)));
    }

    #[test]
    fn display_shows_structure() {
        let id = combine_ids(make_id(7), UnitId);
        let erased: &dyn IdInterface = &id;
        assert_eq!(erased.to_string(), "(7, unit)");
    }
}
