//! Parallax engine
//!
//! One pass reads the tracked elements, computes every offset, then writes
//! all offsets in a single batch so no layout read is interleaved with a
//! transform write.
//!
//! # Movement
//!
//! With `viewport_center = scroll_y + inner_height / 2`:
//!
//! - Unpaired element: `(center_y - viewport_center) * speed`
//! - Paired image: `(image_center - viewport_center) * image_speed`
//! - Paired content: `(image_center - content_center)
//!   + (image_center - viewport_center) * content_speed`
//!
//! Content is first aligned on its image's center, then drifts relative to
//! the image's own motion, so captions stay attached to their background.

use std::time::Duration;

use indexmap::IndexMap;
use parallax_platform::{Document, NodeId, Window};
use smallvec::SmallVec;

use crate::geometry::{Role, TrackedElement};

/// A single vertical translation to write
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Update {
    pub node: NodeId,
    pub movement: f32,
}

/// Offsets computed for one pass, before they are written
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramePlan {
    /// Translations in section order
    pub updates: Vec<Update>,
    /// Whether any element that received an update is visible
    pub any_visible: bool,
}

/// Diagnostics for one applied pass
#[derive(Clone, Debug, PartialEq)]
pub struct PassReport {
    /// Number of translations written
    pub updates: usize,
    /// Whether another frame should follow
    pub any_visible: bool,
    /// Wall-clock time spent in the pass
    pub elapsed: Duration,
    /// Whether `elapsed` exceeded the frame budget
    pub over_budget: bool,
}

/// Vertical center of the viewport in document coordinates
pub fn viewport_center(scroll_y: f32, inner_height: f32) -> f32 {
    scroll_y + inner_height / 2.0
}

/// Movement of an element that moves on its own
pub fn independent_movement(element: &TrackedElement, viewport_center: f32) -> f32 {
    (element.center_y() - viewport_center) * element.speed
}

/// Movements of a paired image and content element, as `(image, content)`
pub fn paired_movement(
    image: &TrackedElement,
    content: &TrackedElement,
    viewport_center: f32,
) -> (f32, f32) {
    let image_center = image.center_y();
    let image_distance = image_center - viewport_center;
    let center_offset = image_center - content.center_y();

    (
        image_distance * image.speed,
        center_offset + image_distance * content.speed,
    )
}

/// Compute every offset for the given viewport
///
/// Elements are grouped by section in first-seen order. A section with both
/// an image and a content element moves those two as a pair (further members
/// stay put); any other section moves each member independently. Elements
/// outside every section are not moved.
pub fn plan(elements: &[TrackedElement], viewport_center: f32) -> FramePlan {
    let mut sections: IndexMap<NodeId, SmallVec<[&TrackedElement; 4]>> = IndexMap::new();
    for element in elements {
        if let Some(section) = element.section {
            sections.entry(section).or_default().push(element);
        }
    }

    let mut plan = FramePlan {
        updates: Vec::with_capacity(elements.len()),
        any_visible: false,
    };

    for members in sections.values() {
        let image = members.iter().find(|e| e.role == Role::Image);
        let content = members.iter().find(|e| e.role == Role::Content);

        match (image, content) {
            (Some(image), Some(content)) => {
                let (image_movement, content_movement) =
                    paired_movement(image, content, viewport_center);
                plan.push(image, image_movement);
                plan.push(content, content_movement);
            }
            _ => {
                for element in members {
                    plan.push(element, independent_movement(element, viewport_center));
                }
            }
        }
    }

    plan
}

impl FramePlan {
    fn push(&mut self, element: &TrackedElement, movement: f32) {
        self.updates.push(Update {
            node: element.node,
            movement,
        });
        self.any_visible |= element.is_visible;
    }

    /// Movement planned for `node`, if any
    pub fn movement_of(&self, node: NodeId) -> Option<f32> {
        self.updates
            .iter()
            .find(|update| update.node == node)
            .map(|update| update.movement)
    }

    /// Write every translation
    pub fn apply<D: Document + ?Sized>(&self, document: &mut D) {
        for update in &self.updates {
            document.set_translate_y(update.node, Some(update.movement));
        }
    }
}

/// Runs passes against a host and checks them against the frame budget
#[derive(Clone, Debug)]
pub struct ParallaxEngine {
    budget: Duration,
}

impl ParallaxEngine {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }

    /// Compute and apply one pass over `elements`
    pub fn run<H>(&self, host: &mut H, elements: &[TrackedElement]) -> PassReport
    where
        H: Document + Window + ?Sized,
    {
        let start = host.now();

        let center = viewport_center(host.scroll_y(), host.inner_height());
        let plan = plan(elements, center);
        plan.apply(host);

        let elapsed = host.now().saturating_sub(start);
        let over_budget = elapsed > self.budget;
        if over_budget {
            tracing::warn!(
                "parallax frame took {:.2}ms (budget {}ms)",
                elapsed.as_secs_f64() * 1000.0,
                self.budget.as_millis()
            );
        }
        tracing::trace!(
            "parallax pass: {} updates, visible={}",
            plan.updates.len(),
            plan.any_visible
        );

        PassReport {
            updates: plan.updates.len(),
            any_visible: plan.any_visible,
            elapsed,
            over_budget,
        }
    }
}
