use super::Identity;
use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

/// One-level comparison of two structured values.
///
/// Two values are shallow-equal when they have the same set of top-level
/// fields and every field is [`Identity::same`] as its counterpart. Nested
/// structures are never recursed into: a nested value only counts as equal
/// when it is the exact same reference.
pub trait ShallowEq {
    /// Returns true if `self` and `other` represent no observable change.
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Compare two values with [`ShallowEq`].
///
/// This is the change detector stores run before committing an update.
///
/// # Examples
///
/// ```
/// use snapstore::{shallow_equal, Value};
///
/// let shared = Value::list(vec![Value::from(1)]);
/// let a = Value::object([("a", Value::from(2)), ("f", shared.clone())]);
/// let b = Value::object([("a", Value::from(2)), ("f", shared)]);
/// assert!(shallow_equal(&a, &b));
///
/// let c = Value::object([("a", Value::from(2)), ("f", Value::list(vec![]))]);
/// let d = Value::object([("a", Value::from(2)), ("f", Value::list(vec![]))]);
/// assert!(!shallow_equal(&c, &d));
/// ```
#[inline]
pub fn shallow_equal<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

impl ShallowEq for () {
    #[inline]
    fn shallow_eq(&self, _other: &Self) -> bool {
        true
    }
}

impl<T: ShallowEq> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.shallow_eq(b),
            _ => false,
        }
    }
}

impl<K, V, H> ShallowEq for HashMap<K, V, H>
where
    K: Eq + Hash,
    V: Identity,
    H: BuildHasher,
{
    fn shallow_eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|theirs| value.same(theirs)))
    }
}

impl<K, V> ShallowEq for BTreeMap<K, V>
where
    K: Ord,
    V: Identity,
{
    fn shallow_eq(&self, other: &Self) -> bool {
        if self.len() != other.len() {
            return false;
        }
        self.iter()
            .all(|(key, value)| other.get(key).is_some_and(|theirs| value.same(theirs)))
    }
}
