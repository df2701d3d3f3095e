#![forbid(unsafe_code)]

//! Values an [`ObservableBox`](crate::ObservableBox) can hold.
//!
//! Every box picks its equality policy once, from [`StateValue::SHAPE`]:
//!
//! - [`ValueShape::Primitive`] (`bool`, numbers, `char`, strings) compares by
//!   value. Writing an equal value is a no-op.
//! - [`ValueShape::Reference`] (`Rc<T>`) compares by identity. Writing a
//!   different `Rc` with equal contents still notifies; mutating the shared
//!   contents in place does not, use
//!   [`notify_has_changed`](crate::ObservableBox::notify_has_changed).
//!
//! The absent sentinel is `None` for `Option<T>`. No other value is absent.
//!
//! Values that announce their own mutations (see
//! [`ObservedObject`](crate::ObservedObject)) learn which boxes hold them
//! through [`StateValue::adopt_owner`] and [`StateValue::release_owner`].

use std::fmt::Debug;
use std::rc::Rc;

use crate::registry::SubscriberId;

/// Shape of a value, fixed per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueShape {
    /// Compared by value.
    Primitive,
    /// Compared by identity.
    Reference,
}

impl ValueShape {
    #[must_use]
    pub fn is_primitive(self) -> bool {
        self == Self::Primitive
    }
}

/// A value that can live in an observable box.
pub trait StateValue: Clone + Debug + 'static {
    const SHAPE: ValueShape;

    /// Equality under the box policy for this shape.
    fn same(&self, other: &Self) -> bool;

    /// Whether this is the absent sentinel.
    fn is_absent(&self) -> bool {
        false
    }

    /// Truthiness, used only by [`ParamPolicy::Truthy`](crate::ParamPolicy).
    fn is_truthy(&self) -> bool {
        true
    }

    /// The box `owner` now holds this value.
    fn adopt_owner(&self, owner: SubscriberId) {
        let _ = owner;
    }

    /// The box `owner` no longer holds this value.
    fn release_owner(&self, owner: SubscriberId) {
        let _ = owner;
    }
}

impl StateValue for bool {
    const SHAPE: ValueShape = ValueShape::Primitive;

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn is_truthy(&self) -> bool {
        *self
    }
}

macro_rules! integer_state_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl StateValue for $t {
                const SHAPE: ValueShape = ValueShape::Primitive;

                fn same(&self, other: &Self) -> bool {
                    self == other
                }

                fn is_truthy(&self) -> bool {
                    *self != 0
                }
            }
        )*
    };
}

integer_state_value!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);

macro_rules! float_state_value {
    ($($t:ty),* $(,)?) => {
        $(
            impl StateValue for $t {
                const SHAPE: ValueShape = ValueShape::Primitive;

                // NaN never equals itself, so writing NaN always notifies.
                fn same(&self, other: &Self) -> bool {
                    self == other
                }

                fn is_truthy(&self) -> bool {
                    *self != 0.0 && !self.is_nan()
                }
            }
        )*
    };
}

float_state_value!(f32, f64);

impl StateValue for char {
    const SHAPE: ValueShape = ValueShape::Primitive;

    fn same(&self, other: &Self) -> bool {
        self == other
    }
}

impl StateValue for String {
    const SHAPE: ValueShape = ValueShape::Primitive;

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl StateValue for &'static str {
    const SHAPE: ValueShape = ValueShape::Primitive;

    fn same(&self, other: &Self) -> bool {
        self == other
    }

    fn is_truthy(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Debug + ?Sized + 'static> StateValue for Rc<T> {
    const SHAPE: ValueShape = ValueShape::Reference;

    fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: StateValue> StateValue for Option<T> {
    const SHAPE: ValueShape = T::SHAPE;

    fn same(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same(b),
            (None, None) => true,
            _ => false,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn is_truthy(&self) -> bool {
        self.as_ref().is_some_and(StateValue::is_truthy)
    }

    fn adopt_owner(&self, owner: SubscriberId) {
        if let Some(v) = self {
            v.adopt_owner(owner);
        }
    }

    fn release_owner(&self, owner: SubscriberId) {
        if let Some(v) = self {
            v.release_owner(owner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn primitives_compare_by_value() {
        assert!(5_i32.same(&5));
        assert!(!5_i32.same(&6));
        assert!("a".to_string().same(&"a".to_string()));
        assert_eq!(<String as StateValue>::SHAPE, ValueShape::Primitive);
    }

    #[test]
    fn references_compare_by_identity() {
        let a = Rc::new(RefCell::new(vec![1, 2]));
        let b = Rc::new(RefCell::new(vec![1, 2]));
        assert!(a.same(&Rc::clone(&a)));
        assert!(!a.same(&b));
        assert_eq!(<Rc<RefCell<Vec<i32>>> as StateValue>::SHAPE, ValueShape::Reference);
    }

    #[test]
    fn option_none_is_the_absent_sentinel() {
        assert!(None::<i32>.is_absent());
        assert!(!Some(0).is_absent());
        assert!(!0_i32.is_absent());
    }

    #[test]
    fn nan_is_never_same() {
        assert!(!f64::NAN.same(&f64::NAN));
        assert!(!f64::NAN.is_truthy());
    }

    #[test]
    fn truthiness() {
        assert!(!false.is_truthy());
        assert!(!0_u8.is_truthy());
        assert!(!String::new().is_truthy());
        assert!(!"".is_truthy());
        assert!(1_i64.is_truthy());
        assert!(!Some(0).is_truthy());
        assert!(Rc::new(0).is_truthy());
    }
}
