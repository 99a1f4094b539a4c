//! Parallax Headless Platform
//!
//! A deterministic, in-memory page implementing the `parallax_platform`
//! traits. Layout is given rather than computed: every element carries its
//! untransformed document top and height. Time only moves when the caller
//! ticks the virtual frame clock.
//!
//! # Example
//!
//! ```rust
//! use parallax_platform::prelude::*;
//! use parallax_platform_headless::{element, HeadlessPage};
//!
//! let mut page = HeadlessPage::new(1280.0, 800.0);
//! let body = page.body();
//! let section = page.append(body, element("section").class("parallax-section").layout(0.0, 800.0));
//! let layer = page.append(
//!     section,
//!     element("div")
//!         .attr("data-parallax", "")
//!         .attr("data-parallax-speed", "0.3")
//!         .layout(100.0, 400.0),
//! );
//!
//! page.add_listener(ListenerKind::Scroll);
//! page.scroll_to(200.0);
//! assert_eq!(page.poll_event(), Some(Event::Scroll));
//! assert_eq!(page.bounding_top(layer).unwrap(), -100.0);
//! ```

mod element;
mod page;

pub use element::{element, image, ElementBuilder, ImageLoad};
pub use page::{HeadlessPage, DEFAULT_FRAME_INTERVAL};
