#![forbid(unsafe_code)]

//! Type-erased access to observable boxes.
//!
//! Stores and views keep boxes of many value types side by side. They hold
//! `Rc<dyn ErasedBox>` and downcast through [`ErasedBox::as_any`] when a
//! caller names the type.

use std::any::{Any, type_name};
use std::fmt;

use tracing::{debug, warn};

use crate::config::ParamPolicy;
use crate::error::{Result, StateError};
use crate::params::ParamValue;
use crate::reactive::{BindingMode, ObservableBox};
use crate::registry::SubscriberId;
use crate::value::{StateValue, ValueShape};

/// Operations on a box that do not depend on its value type.
pub trait ErasedBox {
    fn id(&self) -> SubscriberId;
    fn name(&self) -> Option<String>;
    fn shape(&self) -> ValueShape;
    fn mode(&self) -> BindingMode;
    fn value_type(&self) -> &'static str;
    fn subscriber_count(&self) -> usize;
    fn subscribe(&self, id: SubscriberId) -> bool;
    fn unsubscribe(&self, id: SubscriberId) -> bool;
    fn teardown(&self, for_view: Option<SubscriberId>);
    fn is_torn_down(&self) -> bool;

    /// `Debug` rendering of the current value.
    fn value_debug(&self) -> String;

    /// The concrete [`ObservableBox<T>`], for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Write an erased parameter into the box.
    ///
    /// Returns `Ok(false)` when the value is skipped (absent, or falsy under
    /// [`ParamPolicy::Truthy`]), `Ok(true)` when it was written.
    fn assign_param(&self, value: &dyn ParamValue, policy: ParamPolicy) -> Result<bool>;
}

impl<T: StateValue> ErasedBox for ObservableBox<T> {
    fn id(&self) -> SubscriberId {
        ObservableBox::id(self)
    }

    fn name(&self) -> Option<String> {
        ObservableBox::name(self)
    }

    fn shape(&self) -> ValueShape {
        T::SHAPE
    }

    fn mode(&self) -> BindingMode {
        ObservableBox::mode(self)
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn subscriber_count(&self) -> usize {
        ObservableBox::subscriber_count(self)
    }

    fn subscribe(&self, id: SubscriberId) -> bool {
        ObservableBox::subscribe(self, id)
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        ObservableBox::unsubscribe(self, id)
    }

    fn teardown(&self, for_view: Option<SubscriberId>) {
        ObservableBox::teardown(self, for_view);
    }

    fn is_torn_down(&self) -> bool {
        ObservableBox::is_torn_down(self)
    }

    fn value_debug(&self) -> String {
        self.with(|v| format!("{v:?}"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn assign_param(&self, value: &dyn ParamValue, policy: ParamPolicy) -> Result<bool> {
        let label = ObservableBox::name(self).unwrap_or_else(|| "unknown".to_owned());
        if value.absent() {
            debug!(name = %label, "absent parameter skipped");
            return Ok(false);
        }
        if policy == ParamPolicy::Truthy && !value.truthy() {
            debug!(name = %label, "falsy parameter skipped");
            return Ok(false);
        }
        let Some(typed) = value.as_any().downcast_ref::<T>() else {
            warn!(
                name = %label,
                expected = type_name::<T>(),
                found = value.type_name(),
                "parameter type mismatch"
            );
            return Err(StateError::TypeMismatch {
                name: label,
                expected: type_name::<T>(),
            });
        };
        self.set(typed.clone())?;
        Ok(true)
    }
}

impl fmt::Debug for dyn ErasedBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErasedBox")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("value", &self.value_debug())
            .finish()
    }
}

/// Downcast an erased box to its typed handle.
pub(crate) fn downcast<T: StateValue>(erased: &dyn ErasedBox) -> Option<ObservableBox<T>> {
    erased.as_any().downcast_ref::<ObservableBox<T>>().cloned()
}
