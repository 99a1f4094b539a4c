//! Event queue and platform events

use crate::window::{FrameRequestId, ObserverId, TimerId};
use crate::NodeId;

/// Serial event queue abstraction
///
/// Hosts deliver every platform callback through this queue. Events are
/// consumed one at a time on the control thread, so a handler always sees the
/// state left behind by the previous one.
pub trait EventLoop {
    /// Take the next pending event, if any
    fn poll_event(&mut self) -> Option<Event>;
}

/// Platform events
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The document was scrolled
    ///
    /// Only delivered while a [`ListenerKind::Scroll`](crate::ListenerKind)
    /// listener is bound.
    Scroll,
    /// The viewport was resized
    Resized {
        /// New width in CSS pixels
        width: f32,
        /// New height in CSS pixels
        height: f32,
    },
    /// A requested animation frame is due
    Frame(FrameRequestId),
    /// A timer set with `set_timeout` has elapsed
    Timer(TimerId),
    /// Visibility observation callback
    Intersection {
        /// Observer that produced the entries
        observer: ObserverId,
        /// Changed targets, in observation order
        entries: Vec<IntersectionEntry>,
    },
    /// A watched image finished loading, successfully or not
    ImageSettled {
        /// The image node
        image: NodeId,
        /// How the load ended
        outcome: ImageOutcome,
    },
}

/// How an image load ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageOutcome {
    /// Image decoded successfully
    Loaded,
    /// Image failed to load
    Failed,
}

/// One target's intersection state with the (margin-expanded) viewport
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IntersectionEntry {
    /// Observed node
    pub target: NodeId,
    /// Whether the target intersects the root
    pub is_intersecting: bool,
    /// Visible fraction of the target (0.0 - 1.0)
    pub ratio: f32,
}

impl IntersectionEntry {
    pub fn new(target: NodeId, is_intersecting: bool, ratio: f32) -> Self {
        Self {
            target,
            is_intersecting,
            ratio,
        }
    }
}
