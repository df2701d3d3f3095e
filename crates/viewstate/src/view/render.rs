#![forbid(unsafe_code)]

//! Render pass context.

use crate::error::Result;
use crate::reactive::ObservableBox;
use crate::registry::PropertySubscriber;
use crate::value::StateValue;
use crate::view::shared::{Lifecycle, ViewCore};

/// A component's construction-time boxes plus its render body.
pub trait Component: 'static {
    /// Render body. Reads through `cx` become render dependencies.
    fn render(&mut self, cx: &RenderCx<'_>) -> Result<()>;
}

/// Handle given to [`Component::render`].
///
/// Every [`read`](Self::read) records the box's display name in the view's
/// dependency set while a tracked pass is open.
#[derive(Debug, Clone, Copy)]
pub struct RenderCx<'a> {
    core: &'a ViewCore,
}

impl<'a> RenderCx<'a> {
    pub(super) fn new(core: &'a ViewCore) -> Self {
        Self { core }
    }

    /// Tracked read.
    #[must_use]
    pub fn read<T: StateValue>(&self, cell: &ObservableBox<T>) -> T {
        if let Some(name) = cell.name() {
            self.core.property_read(&name);
        }
        cell.get()
    }

    /// Untracked read.
    #[must_use]
    pub fn peek<T: StateValue>(&self, cell: &ObservableBox<T>) -> T {
        cell.get()
    }

    /// Write from inside a render body. The view marks itself dirty if
    /// `cell` notifies it.
    pub fn write<T: StateValue>(&self, cell: &ObservableBox<T>, value: T) -> Result<()> {
        cell.set(value)
    }

    #[must_use]
    pub fn view_id(&self) -> &'a str {
        self.core.id()
    }

    /// Whether reads are being recorded.
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.core.lifecycle() == Lifecycle::Rendering
    }
}
