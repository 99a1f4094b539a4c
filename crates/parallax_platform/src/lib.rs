//! Parallax Platform Abstraction Layer
//!
//! This crate provides the platform-agnostic traits and types the parallax
//! engine consumes from its host page.
//!
//! # Architecture
//!
//! The host is split into three traits:
//!
//! - [`Document`] - Node queries, geometry, computed style and transform writes
//! - [`Window`] - Scroll offset, viewport, frame clock, timers, listeners and
//!   visibility observation
//! - [`EventLoop`] - The serial queue the host delivers [`Event`]s through
//!
//! Every callback the platform would normally invoke directly (scroll,
//! resize, animation frame, timer, intersection, image load) arrives as an
//! [`Event`] instead, so the engine runs on a single control thread without
//! shared mutable state.
//!
//! # Platform Implementations
//!
//! - `parallax_platform_headless` - Deterministic in-memory page used by
//!   tests and the CLI
//!
//! # Example
//!
//! ```ignore
//! use parallax_platform::prelude::*;
//!
//! fn drive<H: Host + EventLoop>(host: &mut H) {
//!     while let Some(event) = host.poll_event() {
//!         match event {
//!             Event::Scroll => { /* schedule a pass */ }
//!             Event::Frame(id) => { /* run the pass */ }
//!             _ => {}
//!         }
//!     }
//! }
//! ```

mod document;
mod error;
mod event;
mod selector;
mod window;

use slotmap::new_key_type;

// Re-export all public types
pub use document::Document;
pub use error::{PlatformError, Result};
pub use event::{Event, EventLoop, ImageOutcome, IntersectionEntry};
pub use selector::Selector;
pub use window::{FrameRequestId, ListenerKind, ObserverId, ObserverOptions, TimerId, Window};

new_key_type! {
    /// Non-owning handle to a node in the host document
    ///
    /// The host owns the node; holders of a `NodeId` must tolerate the node
    /// disappearing (queries then fail with [`PlatformError::NodeDetached`]).
    pub struct NodeId;
}

/// Everything the engine needs from its host page
pub trait Host: Document + Window {}

impl<T: Document + Window> Host for T {}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::document::Document;
    pub use crate::error::{PlatformError, Result};
    pub use crate::event::{Event, EventLoop, ImageOutcome, IntersectionEntry};
    pub use crate::selector::Selector;
    pub use crate::window::{
        FrameRequestId, ListenerKind, ObserverId, ObserverOptions, TimerId, Window,
    };
    pub use crate::{Host, NodeId};
}
