#![forbid(unsafe_code)]

//! Heterogeneous name → value bags used to initialize stores and views.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::Result;
use crate::reactive::{ErasedBox, ObservableBox};
use crate::registry::{SubscriberId, SubscriberRegistry};
use crate::value::{StateValue, ValueShape};

/// Type-erased parameter value.
///
/// Implemented for every [`StateValue`]; the erased form lets a store or
/// view create and assign typed boxes without knowing `T` statically.
pub trait ParamValue {
    fn as_any(&self) -> &dyn Any;
    fn absent(&self) -> bool;
    fn truthy(&self) -> bool;
    fn shape(&self) -> ValueShape;
    fn type_name(&self) -> &'static str;
    fn describe(&self) -> String;

    /// Build a new box holding this value.
    fn create_box(
        &self,
        registry: &SubscriberRegistry,
        owner: Option<SubscriberId>,
        name: &str,
    ) -> Result<Rc<dyn ErasedBox>>;
}

impl<T: StateValue> ParamValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn absent(&self) -> bool {
        StateValue::is_absent(self)
    }

    fn truthy(&self) -> bool {
        StateValue::is_truthy(self)
    }

    fn shape(&self) -> ValueShape {
        T::SHAPE
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn describe(&self) -> String {
        format!("{self:?}")
    }

    fn create_box(
        &self,
        registry: &SubscriberRegistry,
        owner: Option<SubscriberId>,
        name: &str,
    ) -> Result<Rc<dyn ErasedBox>> {
        let cell = ObservableBox::with_owner(registry, self.clone(), owner, name)?;
        Ok(Rc::new(cell))
    }
}

/// Ordered parameter bag. A key may be present with the absent sentinel.
#[derive(Default, Clone)]
pub struct Params {
    entries: Vec<(String, Option<Rc<dyn ParamValue>>)>,
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (name, value) in &self.entries {
            match value {
                Some(v) => map.entry(name, &v.describe()),
                None => map.entry(name, &"<absent>"),
            };
        }
        map.finish()
    }
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a value.
    #[must_use]
    pub fn with<T: StateValue>(mut self, name: impl Into<String>, value: T) -> Self {
        self.insert(name.into(), Some(Rc::new(value)));
        self
    }

    /// Add a key whose value is the absent sentinel.
    #[must_use]
    pub fn with_absent(mut self, name: impl Into<String>) -> Self {
        self.insert(name.into(), None);
        self
    }

    fn insert(&mut self, name: String, value: Option<Rc<dyn ParamValue>>) {
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Present, non-absent value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn ParamValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_deref())
            .filter(|v| !v.absent())
    }

    /// Entries in insertion order; `None` marks an absent value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&dyn ParamValue>)> {
        self.entries
            .iter()
            .map(|(n, v)| (n.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
