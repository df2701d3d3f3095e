#![forbid(unsafe_code)]

//! Named property stores.
//!
//! - [`LocalStorage`]: name → box map with Link/Prop access.
//! - [`app`]: the process-wide application store.
//! - [`StorageLookup`]: path → store map.
//! - [`Environment`]: publishes [`EnvBackend`] values into a store.

pub mod app;
pub mod environment;
pub mod local;
pub mod lookup;

pub use environment::{EnvBackend, EnvValue, Environment};
pub use local::LocalStorage;
pub use lookup::StorageLookup;
