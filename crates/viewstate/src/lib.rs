#![forbid(unsafe_code)]

//! Reactive state propagation for declarative views.
//!
//! - [`registry`]: subscriber id space and the process-wide registry handle.
//! - [`reactive`]: [`ObservableBox`] cells, their Link/Prop bindings, and
//!   [`ObservedObject`] content.
//! - [`storage`]: named property stores ([`LocalStorage`]), the
//!   application store ([`storage::app`]), path lookup, and
//!   environment-backed properties.
//! - [`view`]: view lifecycle and render dependency tracking.
//!
//! # Example
//!
//! ```
//! use viewstate::{LocalStorage, SubscriberRegistry};
//!
//! let registry = SubscriberRegistry::new();
//! let store = LocalStorage::new(&registry);
//! assert!(store.set_or_create("volume", 7_i32));
//!
//! let link = store.link::<i32>("volume", None, "vol").unwrap();
//! link.set(9).unwrap();
//! assert_eq!(store.get::<i32>("volume"), Some(9));
//! ```

pub mod config;
pub mod error;
pub mod params;
pub mod reactive;
pub mod registry;
pub mod storage;
pub mod value;
pub mod view;

pub use config::{ParamPolicy, StateConfig};
pub use error::{Result, StateError};
pub use params::{ParamValue, Params};
pub use reactive::{BindingMode, ErasedBox, ObservableBox, ObservedObject};
pub use registry::{
    Change, PropertySubscriber, SubscriberId, SubscriberInfo, SubscriberRegistry,
};
pub use storage::{EnvBackend, EnvValue, Environment, LocalStorage, StorageLookup};
pub use value::{StateValue, ValueShape};
pub use view::{Component, Lifecycle, RenderCx, View, ViewBuilder, ViewCore, ViewScope};
