//! Visibility tracking
//!
//! The observer's callbacks arrive as [`Event::Intersection`] messages on the
//! control queue. They are posted into an inbox keyed by node (latest state
//! wins) and folded into the tracked elements at the start of the next pass,
//! so the tracker never triggers computation itself.
//!
//! [`Event::Intersection`]: parallax_platform::Event::Intersection

use parallax_platform::{IntersectionEntry, NodeId, ObserverId, ObserverOptions, Window};
use rustc_hash::FxHashMap;

use crate::geometry::TrackedElement;

/// Keeps each tracked element's `is_visible` flag in sync with the host
#[derive(Debug, Default)]
pub struct VisibilityTracker {
    observer: Option<ObserverId>,
    inbox: FxHashMap<NodeId, bool>,
}

impl VisibilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Observe `elements`, replacing any previous subscription
    pub fn observe<W>(
        &mut self,
        window: &mut W,
        options: &ObserverOptions,
        elements: &[TrackedElement],
    ) where
        W: Window + ?Sized,
    {
        self.disconnect(window);

        let targets: Vec<NodeId> = elements.iter().map(|e| e.node).collect();
        let observer = window.observe(options, &targets);
        tracing::debug!("observing {} elements with {:?}", targets.len(), observer);
        self.observer = Some(observer);
    }

    /// Cancel the current subscription and drop undelivered updates
    pub fn disconnect<W: Window + ?Sized>(&mut self, window: &mut W) {
        if let Some(observer) = self.observer.take() {
            window.disconnect(observer);
        }
        self.inbox.clear();
    }

    /// Active observer, if any
    pub fn observer(&self) -> Option<ObserverId> {
        self.observer
    }

    /// Queue entries reported by `observer`
    ///
    /// Entries from a superseded observer are dropped. Returns whether the
    /// entries were accepted.
    pub fn post(&mut self, observer: ObserverId, entries: &[IntersectionEntry]) -> bool {
        if self.observer != Some(observer) {
            tracing::trace!("dropping entries from stale observer {:?}", observer);
            return false;
        }
        for entry in entries {
            self.inbox.insert(entry.target, entry.is_intersecting);
        }
        true
    }

    /// Number of nodes with an undelivered update
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    /// Fold queued updates into the tracked elements, matching by node
    pub fn apply(&mut self, elements: &mut [TrackedElement]) {
        if self.inbox.is_empty() {
            return;
        }
        for element in elements.iter_mut() {
            if let Some(visible) = self.inbox.get(&element.node) {
                element.is_visible = *visible;
            }
        }
        self.inbox.clear();
    }
}
