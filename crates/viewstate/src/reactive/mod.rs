#![forbid(unsafe_code)]

//! Observable boxes and their derived bindings.
//!
//! - [`ObservableBox`]: a value plus an ordered set of subscriber ids,
//!   registered in a [`SubscriberRegistry`](crate::SubscriberRegistry).
//! - Link (two-way) and Prop (one-way) bindings are boxes whose value is
//!   sourced from another box; see [`ObservableBox::create_link`] and
//!   [`ObservableBox::create_prop`].
//! - [`ErasedBox`]: type-erased view of a box used by stores and views.
//! - [`ObservedObject`]: shared content whose in-place mutations notify
//!   every box holding it.
//!
//! # Architecture
//!
//! Each box is an `Rc` cell. Boxes subscribe to each other through registry
//! ids, never through owning pointers; a binding keeps a `Weak` edge to its
//! source. Ownership flows from the store or view toward the boxes it
//! creates.
//!
//! # Invariants
//!
//! 1. A box never holds the absent sentinel.
//! 2. Writing a value equal under the box's shape policy is a no-op.
//! 3. Subscribers are notified in subscription order, once per change.
//! 4. The subscriber whose write started a propagation is not notified of
//!    that propagation.
//! 5. Every cache touched by a `set` is updated before the first
//!    notification of that `set` fires.

pub mod erased;
pub mod observable;
pub mod observed;

pub use erased::ErasedBox;
pub use observable::{BindingMode, ObservableBox};
pub use observed::ObservedObject;
