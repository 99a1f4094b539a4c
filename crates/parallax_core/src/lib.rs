//! Parallax Core Runtime
//!
//! Moves tagged page elements vertically at different rates as the document
//! scrolls, producing a depth effect:
//!
//! - **Geometry Extraction**: Untransformed positions and speeds, re-read on
//!   every layout change
//! - **Visibility Tracking**: Per-element visibility from the host's
//!   intersection observer, delivered as messages
//! - **Frame Scheduling**: Explicit scroll state machine; the frame loop only
//!   runs while something is visible
//! - **Parallax Engine**: Section-aware offsets, computed first and written
//!   in one batch
//! - **Lifecycle**: Image wait, measurement, observation, listeners, teardown
//!
//! # Example
//!
//! ```ignore
//! use parallax_core::{ParallaxConfig, ParallaxController};
//!
//! let mut parallax = ParallaxController::new(ParallaxConfig::default())?;
//! parallax.initialize(&mut page);
//!
//! // On every turn of the host's event loop
//! parallax.pump(&mut page);
//!
//! // On teardown
//! parallax.destroy(&mut page);
//! ```

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod scheduler;
pub mod visibility;

pub use config::ParallaxConfig;
pub use controller::{LifecyclePhase, ParallaxController};
pub use engine::{FramePlan, ParallaxEngine, PassReport, Update};
pub use error::{ParallaxError, Result};
pub use geometry::{resolve_speed, GeometryExtractor, Role, TrackedElement};
pub use scheduler::{Debouncer, FrameScheduler, Schedule, SchedulerEvent, ScrollPhase};
pub use visibility::VisibilityTracker;
