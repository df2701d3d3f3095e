#![forbid(unsafe_code)]

//! Minimal host framework.
//!
//! The host owns mounted views in mount order (parents before children),
//! renders them, and on [`flush`](Host::flush) re-renders whichever views
//! marked themselves dirty until no view is dirty.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::{debug, warn};
use viewstate::{Component, Lifecycle, Result, View};

/// A view as the host sees it.
pub trait HostedView {
    fn view_id(&self) -> &str;
    fn lifecycle(&self) -> Lifecycle;
    fn needs_render(&self) -> bool;
    fn perform_render(&mut self) -> Result<()>;
    fn about_to_be_deleted(&mut self) -> Result<()>;
}

impl<C: Component> HostedView for View<C> {
    fn view_id(&self) -> &str {
        self.id()
    }

    fn lifecycle(&self) -> Lifecycle {
        View::lifecycle(self)
    }

    fn needs_render(&self) -> bool {
        View::needs_render(self)
    }

    fn perform_render(&mut self) -> Result<()> {
        View::perform_render(self)
    }

    fn about_to_be_deleted(&mut self) -> Result<()> {
        View::about_to_be_deleted(self)
    }
}

pub type SharedView = Rc<RefCell<dyn HostedView>>;

/// Drives render passes for mounted views.
pub struct Host {
    views: Vec<SharedView>,
    max_flush_rounds: usize,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    #[must_use]
    pub fn new() -> Self {
        Self {
            views: Vec::new(),
            max_flush_rounds: 16,
        }
    }

    /// Bound on re-render rounds in one [`flush`](Self::flush).
    #[must_use]
    pub fn with_max_flush_rounds(mut self, rounds: usize) -> Self {
        self.max_flush_rounds = rounds.max(1);
        self
    }

    /// Mount a view. The caller keeps its own handle for inspection.
    pub fn mount<V: HostedView + 'static>(&mut self, view: &Rc<RefCell<V>>) {
        let shared: SharedView = Rc::clone(view) as SharedView;
        debug!(view = view.borrow().view_id(), "mounted");
        self.views.push(shared);
    }

    #[must_use]
    pub fn mounted(&self) -> usize {
        self.views.len()
    }

    /// Render every mounted view once, in mount order.
    pub fn render_all(&mut self) -> Result<()> {
        for view in &self.views {
            view.borrow_mut().perform_render()?;
        }
        Ok(())
    }

    /// Re-render dirty views until none is dirty. Returns the number of
    /// render passes performed.
    pub fn flush(&mut self) -> Result<usize> {
        let mut passes = 0;
        for round in 0..self.max_flush_rounds {
            let dirty: Vec<SharedView> = self
                .views
                .iter()
                .filter(|v| v.borrow().needs_render())
                .cloned()
                .collect();
            if dirty.is_empty() {
                return Ok(passes);
            }
            debug!(round, dirty = dirty.len(), "flush round");
            for view in dirty {
                view.borrow_mut().perform_render()?;
                passes += 1;
            }
        }
        warn!(rounds = self.max_flush_rounds, "flush did not settle");
        Ok(passes)
    }

    /// Tear down the view with `view_id` and forget it. Returns `false` if
    /// no such view is mounted.
    pub fn unmount(&mut self, view_id: &str) -> Result<bool> {
        let Some(pos) = self.views.iter().position(|v| v.borrow().view_id() == view_id) else {
            warn!(view = view_id, "unmount of unknown view");
            return Ok(false);
        };
        let view = self.views.remove(pos);
        view.borrow_mut().about_to_be_deleted()?;
        Ok(true)
    }

    /// Tear down every view, children (later mounts) first.
    pub fn unmount_all(&mut self) -> Result<()> {
        while let Some(view) = self.views.pop() {
            if view.borrow().lifecycle() != Lifecycle::TornDown {
                view.borrow_mut().about_to_be_deleted()?;
            }
        }
        Ok(())
    }
}
