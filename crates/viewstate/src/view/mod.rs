#![forbid(unsafe_code)]

//! View lifecycle and render dependency tracking.
//!
//! # Architecture
//!
//! A [`View<C>`] pairs a user [`Component`] with a registered [`ViewCore`].
//! The core is what boxes notify: it records which properties a render pass
//! read and marks itself dirty when one of them changes. The host polls
//! [`View::needs_render`] and decides when to re-render.
//!
//! ```text
//! Constructed ──about_to_render──▶ Rendering ──on_render_done──▶ Idle
//!                                     ▲                            │
//!                                     └────────about_to_render─────┘
//!                any state ──about_to_be_deleted──▶ TornDown
//! ```
//!
//! # Invariants
//!
//! 1. `properties_needed_to_render` is exactly the set of names read between
//!    the last `about_to_render` and the following `on_render_done`, plus
//!    reads after any `about_to_continue_render`.
//! 2. A change to a box the view subscribes to marks the view dirty iff the
//!    box's name is in that set or a pass is open.
//! 3. After teardown the view holds no registry id and every box it owned
//!    or consumed is torn down.

pub mod shared;
pub mod render;
pub mod scope;

use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::{Result, StateError};
use crate::params::Params;
use crate::registry::{SubscriberId, SubscriberRegistry};

pub use shared::{Lifecycle, ViewCore};
pub use render::{Component, RenderCx};
pub use scope::{ViewBuilder, ViewScope};

/// A component instance with its lifecycle and dependency tracking.
pub struct View<C> {
    core: Rc<ViewCore>,
    component: C,
}

impl<C> std::fmt::Debug for View<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View").field("core", &self.core).finish_non_exhaustive()
    }
}

impl View<()> {
    /// Start building a view with host-assigned id `id`.
    pub fn builder(registry: &SubscriberRegistry, id: impl Into<String>) -> ViewBuilder {
        ViewBuilder::new(registry, id.into())
    }
}

impl<C: Component> View<C> {
    fn ensure_live(&self) -> Result<()> {
        if self.core.is_torn_down() {
            warn!(view = %self.core.id, "view used after teardown");
            return Err(StateError::after_teardown(self.core.id.clone()));
        }
        Ok(())
    }

    /// Open a tracked pass with an empty dependency set.
    pub fn about_to_render(&self) -> Result<()> {
        self.ensure_live()?;
        if self.core.lifecycle() == Lifecycle::Rendering {
            warn!(view = %self.core.id, "render pass already open");
            return Err(StateError::RenderInProgress {
                view: self.core.id.clone(),
            });
        }
        debug!(view = %self.core.id, "about to render");
        self.core.deps.borrow_mut().clear();
        self.core.needs_render.set(false);
        self.core.state.set(Lifecycle::Rendering);
        Ok(())
    }

    /// Reopen tracking without clearing the dependency set.
    pub fn about_to_continue_render(&self) -> Result<()> {
        self.ensure_live()?;
        self.core.state.set(Lifecycle::Rendering);
        Ok(())
    }

    /// Run the component's render body.
    ///
    /// Outside an open pass the body still runs, but reads are not
    /// recorded.
    pub fn render(&mut self) -> Result<()> {
        self.ensure_live()?;
        if self.core.lifecycle() != Lifecycle::Rendering {
            debug!(view = %self.core.id, "render outside a tracked pass");
        }
        let cx = RenderCx::new(&self.core);
        self.component.render(&cx)
    }

    /// Close the current pass.
    pub fn on_render_done(&self) {
        if self.core.lifecycle() != Lifecycle::Rendering {
            debug!(
                view = %self.core.id,
                state = ?self.core.lifecycle(),
                "render done without an open pass"
            );
            return;
        }
        self.core.state.set(Lifecycle::Idle);
        self.core.render_count.set(self.core.render_count.get() + 1);
        debug!(
            view = %self.core.id,
            deps = ?*self.core.deps.borrow(),
            "render done"
        );
    }

    /// `about_to_render`, `render`, `on_render_done`. The pass is closed even
    /// if the body fails.
    pub fn perform_render(&mut self) -> Result<()> {
        self.about_to_render()?;
        let result = self.render();
        self.on_render_done();
        result
    }

    /// Names read during the last tracked pass.
    #[must_use]
    pub fn properties_needed_to_render(&self) -> BTreeSet<String> {
        self.core.properties_needed_to_render()
    }

    #[must_use]
    pub fn needs_render(&self) -> bool {
        self.core.needs_render()
    }

    pub fn take_needs_render(&self) -> bool {
        self.core.take_needs_render()
    }

    /// Write parameters into the view's own state boxes by name.
    ///
    /// A parameter is applied when its key is present and its value is not
    /// absent. Under [`ParamPolicy::Truthy`](crate::ParamPolicy::Truthy)
    /// falsy values are skipped as well. Names without a matching state box
    /// are ignored.
    pub fn update_with_value_params(&self, params: &Params) -> Result<()> {
        self.ensure_live()?;
        let policy = self.core.policy;
        for (name, value) in params.iter() {
            let Some(value) = value else {
                debug!(view = %self.core.id, name, "absent parameter skipped");
                continue;
            };
            let Some(cell) = self.core.owned_named(name) else {
                debug!(view = %self.core.id, name, "parameter without state box ignored");
                continue;
            };
            cell.assign_param(value, policy)?;
        }
        Ok(())
    }

    /// Tear down every owned box and binding and release the registry id.
    /// A second call fails with [`StateError::UseAfterTeardown`].
    pub fn about_to_be_deleted(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.core.release();
        Ok(())
    }

    #[must_use]
    pub fn id(&self) -> &str {
        self.core.id()
    }

    #[must_use]
    pub fn subscriber_id(&self) -> SubscriberId {
        self.core.subscriber_id()
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.core.lifecycle()
    }

    #[must_use]
    pub fn core(&self) -> &Rc<ViewCore> {
        &self.core
    }

    #[must_use]
    pub fn component(&self) -> &C {
        &self.component
    }

    pub fn component_mut(&mut self) -> &mut C {
        &mut self.component
    }
}
