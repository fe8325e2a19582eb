//! Shallow equality used to gate selector re-renders.
//!
//! Two values are shallow-equal when they have the same keys (or positions)
//! and every value compares [`Identical`]: primitives by value, shared
//! pointers by address. Nested structures are never recursed into.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};
use std::rc::Rc;

use portable_atomic_util::Arc;

/// Identity or primitive equality of a single value.
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

/// One level of key/value comparison.
///
/// Implemented for scalars, common containers and structs declared with
/// [`record!`](crate::record).
pub trait ShallowEq {
    fn shallow_eq(&self, other: &Self) -> bool;
}

/// Compare two values one level deep.
///
/// # Example
///
/// ```rust
/// use scoped_store::shallow_equal;
///
/// assert!(shallow_equal(&(1, "a"), &(1, "a")));
/// assert!(!shallow_equal(&vec![1, 2], &vec![1, 3]));
/// ```
pub fn shallow_equal<T: ShallowEq + ?Sized>(a: &T, b: &T) -> bool {
    a.shallow_eq(b)
}

macro_rules! by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identical for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }

            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String, str
);

// Bit comparison: NaN matches itself, +0.0 and -0.0 differ.
macro_rules! by_bits {
    ($($ty:ty),*) => {
        $(
            impl Identical for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self.to_bits() == other.to_bits()
                }
            }

            impl ShallowEq for $ty {
                #[inline]
                fn shallow_eq(&self, other: &Self) -> bool {
                    self.identical(other)
                }
            }
        )*
    };
}

by_bits!(f32, f64);

impl<T: Identical + ?Sized> Identical for &T {
    fn identical(&self, other: &Self) -> bool {
        (**self).identical(*other)
    }
}

impl<T: Identical> Identical for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T> Identical for Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identical for std::sync::Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        std::sync::Arc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identical for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for &T {
    fn shallow_eq(&self, other: &Self) -> bool {
        (**self).shallow_eq(*other)
    }
}

impl<T: Identical> ShallowEq for Option<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.identical(other)
    }
}

impl<T: ShallowEq> ShallowEq for Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other) || (**self).shallow_eq(other)
    }
}

impl<T: ShallowEq + ?Sized> ShallowEq for std::sync::Arc<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        std::sync::Arc::ptr_eq(self, other) || (**self).shallow_eq(other)
    }
}

impl<T: Identical> ShallowEq for [T] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.identical(b))
    }
}

impl<T: Identical, const N: usize> ShallowEq for [T; N] {
    fn shallow_eq(&self, other: &Self) -> bool {
        self[..].shallow_eq(&other[..])
    }
}

impl<T: Identical> ShallowEq for Vec<T> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self[..].shallow_eq(&other[..])
    }
}

impl<K: Ord, V: Identical> ShallowEq for BTreeMap<K, V> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|theirs| value.identical(theirs)))
    }
}

impl<K: Eq + Hash, V: Identical, S: BuildHasher> ShallowEq for HashMap<K, V, S> {
    fn shallow_eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(key, value)| other.get(key).is_some_and(|theirs| value.identical(theirs)))
    }
}

macro_rules! tuples {
    ($(($($name:ident $idx:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Identical),+> ShallowEq for ($($name,)+) {
                fn shallow_eq(&self, other: &Self) -> bool {
                    true $(&& self.$idx.identical(&other.$idx))+
                }
            }
        )*
    };
}

tuples!(
    (A 0),
    (A 0, B 1),
    (A 0, B 1, C 2),
    (A 0, B 1, C 2, D 3),
    (A 0, B 1, C 2, D 3, E 4),
    (A 0, B 1, C 2, D 3, E 4, F 5),
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6),
    (A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7),
);

/// Declare a state record together with its partial patch type.
///
/// Generates:
/// - the struct itself, with the attributes given,
/// - a patch struct whose fields are all `Option`, deriving `Default`,
/// - [`Merge`](crate::Merge) for the record, overwriting only the fields set
///   in the patch,
/// - [`ShallowEq`] comparing every field with [`Identical`],
/// - [`Identical`] on the same terms, so records can sit inside the `Vec`,
///   `Option` or map a selector returns.
///
/// # Example
///
/// ```rust
/// use scoped_store::{record, Merge, ShallowEq};
///
/// record! {
///     #[derive(Clone, Debug, PartialEq)]
///     pub struct Form / FormPatch {
///         pub counter: i64,
///         pub value: String,
///     }
/// }
///
/// let mut form = Form { counter: 10, value: "a".into() };
/// form.merge(FormPatch { value: Some("b".into()), ..Default::default() });
///
/// assert_eq!(form, Form { counter: 10, value: "b".into() });
/// assert!(form.shallow_eq(&form.clone()));
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident / $patch:ident {
            $($fvis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $($fvis $field: $ty,)*
        }

        #[derive(Clone, Default)]
        $vis struct $patch {
            $($fvis $field: ::core::option::Option<$ty>,)*
        }

        impl $crate::Merge for $name {
            type Patch = $patch;

            fn merge(&mut self, patch: $patch) {
                $(
                    if let ::core::option::Option::Some(value) = patch.$field {
                        self.$field = value;
                    }
                )*
            }
        }

        impl $crate::Identical for $name {
            fn identical(&self, other: &Self) -> bool {
                true $(&& $crate::Identical::identical(&self.$field, &other.$field))*
            }
        }

        impl $crate::ShallowEq for $name {
            fn shallow_eq(&self, other: &Self) -> bool {
                true $(&& $crate::Identical::identical(&self.$field, &other.$field))*
            }
        }
    };
}
