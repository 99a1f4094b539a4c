//! Window services: scroll, viewport, frame clock, timers and observation

use std::time::Duration;

use crate::NodeId;

/// Handle to a pending animation frame request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequestId(pub u64);

/// Handle to a pending timer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Handle to an active visibility observer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(pub u64);

/// Window-level events a listener can be bound for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    /// Document scroll (passive)
    Scroll,
    /// Viewport resize
    Resize,
}

/// Visibility observation options
#[derive(Clone, Debug, PartialEq)]
pub struct ObserverOptions {
    /// Margin added to every side of the viewport, in CSS pixels
    pub root_margin: f32,
    /// Intersection ratios at which the observer reports a change
    pub thresholds: Vec<f32>,
}

impl Default for ObserverOptions {
    fn default() -> Self {
        Self {
            root_margin: 0.0,
            thresholds: vec![0.0],
        }
    }
}

impl ObserverOptions {
    /// Create options with a root margin and thresholds
    pub fn new(root_margin: f32, thresholds: impl Into<Vec<f32>>) -> Self {
        Self {
            root_margin,
            thresholds: thresholds.into(),
        }
    }
}

/// Window abstraction trait
///
/// Implemented by platform backends. Every callback-style service (frames,
/// timers, listeners, observers, image loads) reports back through the
/// host's [`EventLoop`](crate::EventLoop) rather than by invoking a closure.
pub trait Window {
    /// Current vertical scroll offset of the document
    fn scroll_y(&self) -> f32;

    /// Current viewport height in CSS pixels
    fn inner_height(&self) -> f32;

    /// Monotonic time since an arbitrary origin
    fn now(&self) -> Duration;

    /// Request an [`Event::Frame`](crate::Event::Frame) before the next repaint
    fn request_animation_frame(&mut self) -> FrameRequestId;

    /// Cancel a frame request; unknown or already-fired ids are ignored
    fn cancel_animation_frame(&mut self, id: FrameRequestId);

    /// Schedule an [`Event::Timer`](crate::Event::Timer) after `delay`
    fn set_timeout(&mut self, delay: Duration) -> TimerId;

    /// Cancel a timer; unknown or already-fired ids are ignored
    fn clear_timeout(&mut self, id: TimerId);

    /// Start delivering events of the given kind
    fn add_listener(&mut self, kind: ListenerKind);

    /// Stop delivering events of the given kind
    fn remove_listener(&mut self, kind: ListenerKind);

    /// Observe targets' intersection with the viewport
    ///
    /// The host reports the initial state of every target, then changes as
    /// they cross one of the configured thresholds.
    fn observe(&mut self, options: &ObserverOptions, targets: &[NodeId]) -> ObserverId;

    /// Stop an observer; no further entries are delivered for it
    fn disconnect(&mut self, id: ObserverId);

    /// Deliver one [`Event::ImageSettled`](crate::Event::ImageSettled) when
    /// the image finishes loading or fails
    fn watch_image(&mut self, image: NodeId);
}
