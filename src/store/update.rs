use crate::error::BoxError;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// One-level merge of a partial update into a state value.
///
/// Fields named by the patch are overwritten; every other field is carried
/// over from `self`. Use [`shallow_state!`](crate::shallow_state) to
/// generate the patch type and this impl for a plain struct.
pub trait Merge: Sized {
    /// Partial value naming the top-level fields to overwrite.
    type Patch;

    /// Build the next state from `self` and `patch`.
    fn merge(&self, patch: Self::Patch) -> Self;
}

impl<K, V, H> Merge for HashMap<K, V, H>
where
    K: Eq + Hash + Clone,
    V: Clone,
    H: BuildHasher + Clone,
{
    type Patch = HashMap<K, V, H>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        next.extend(patch);
        next
    }
}

impl<K, V> Merge for BTreeMap<K, V>
where
    K: Ord + Clone,
    V: Clone,
{
    type Patch = BTreeMap<K, V>;

    fn merge(&self, patch: Self::Patch) -> Self {
        let mut next = self.clone();
        next.extend(patch);
        next
    }
}

/// A partial update: either a literal patch or a function of the previous
/// state that produces one.
pub enum Update<'a, S: Merge> {
    Literal(S::Patch),
    #[allow(clippy::type_complexity)]
    Computed(Box<dyn FnOnce(&S) -> Result<S::Patch, BoxError> + 'a>),
}

impl<'a, S: Merge> Update<'a, S> {
    pub fn literal(patch: S::Patch) -> Self {
        Update::Literal(patch)
    }

    /// Patch computed from the state current at the moment of the update.
    pub fn computed<F>(f: F) -> Self
    where
        F: FnOnce(&S) -> S::Patch + 'a,
    {
        Update::Computed(Box::new(move |prev| Ok(f(prev))))
    }

    /// Like [`computed`](Self::computed), for functions that can fail.
    pub fn try_computed<F, E>(f: F) -> Self
    where
        F: FnOnce(&S) -> Result<S::Patch, E> + 'a,
        E: Into<BoxError>,
    {
        Update::Computed(Box::new(move |prev| f(prev).map_err(Into::into)))
    }

    /// Turn the update into a concrete patch against `current`.
    pub(crate) fn resolve(self, current: &S) -> Result<S::Patch, BoxError> {
        match self {
            Update::Literal(patch) => Ok(patch),
            Update::Computed(compute) => compute(current),
        }
    }
}

impl<S: Merge> fmt::Debug for Update<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Literal(_) => f.write_str("Update::Literal(..)"),
            Update::Computed(_) => f.write_str("Update::Computed(..)"),
        }
    }
}

/// Declare a state struct together with its patch type.
///
/// Generates the struct, a patch struct whose fields are all optional (with
/// one builder method per field), and the [`Merge`] and
/// [`ShallowEq`](crate::ShallowEq) impls. Every field type must implement
/// `Clone` and [`Identity`](crate::Identity).
///
/// # Examples
///
/// ```
/// use snapstore::{shallow_state, Merge, ShallowEq};
///
/// shallow_state! {
///     #[derive(Debug, Clone)]
///     pub struct Counter => CounterPatch {
///         pub counts: i64,
///         pub label: String,
///     }
/// }
///
/// let state = Counter { counts: 2, label: "clicks".into() };
/// let next = state.merge(CounterPatch::default().counts(4));
/// assert_eq!(next.counts, 4);
/// assert_eq!(next.label, "clicks");
/// assert!(!next.shallow_eq(&state));
/// assert!(state.merge(CounterPatch::default().counts(2)).shallow_eq(&state));
/// ```
#[macro_export]
macro_rules! shallow_state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $patch:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field: $ty, )*
        }

        #[doc = concat!(
            "Partial update for [`", stringify!($name), "`]. ",
            "Unset fields keep their previous value."
        )]
        #[derive(Clone, Default)]
        $vis struct $patch {
            $( $fvis $field: ::core::option::Option<$ty>, )*
        }

        impl $patch {
            $(
                #[doc = concat!("Overwrite `", stringify!($field), "`.")]
                #[allow(dead_code)]
                pub fn $field(mut self, value: $ty) -> Self {
                    self.$field = ::core::option::Option::Some(value);
                    self
                }
            )*
        }

        impl $crate::Merge for $name {
            type Patch = $patch;

            fn merge(&self, patch: $patch) -> Self {
                Self {
                    $(
                        $field: patch
                            .$field
                            .unwrap_or_else(|| ::core::clone::Clone::clone(&self.$field)),
                    )*
                }
            }
        }

        impl $crate::ShallowEq for $name {
            fn shallow_eq(&self, other: &Self) -> bool {
                true $( && $crate::Identity::same(&self.$field, &other.$field) )*
            }
        }
    };
}
