//! Geometry extraction
//!
//! Builds the tracked-element set from the host document. Measurement always
//! starts from untransformed geometry: any translation written by a previous
//! pass is cleared and layout is flushed before positions are read.

use std::sync::OnceLock;

use parallax_platform::{Document, NodeId, PlatformError, Selector, Window};
use regex::Regex;

use crate::config::ParallaxConfig;

/// Role of an element inside its section
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Role {
    /// Background image the section's content is aligned to
    Image,
    /// Foreground caption that tracks the image
    Content,
    /// Moves on its own
    #[default]
    Plain,
}

/// An element taking part in the effect, as measured by the last layout pass
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedElement {
    /// Host node (not owned)
    pub node: NodeId,
    /// Enclosing section container, if any
    pub section: Option<NodeId>,
    /// Role within the section
    pub role: Role,
    /// Movement multiplier; 0 keeps the element static
    pub speed: f32,
    /// Untransformed top edge in document coordinates
    pub baseline_top: f32,
    /// Rendered height at measurement time
    pub height: f32,
    /// Last reported visibility; only the visibility tracker writes this
    pub is_visible: bool,
}

impl TrackedElement {
    /// Vertical center in document coordinates
    pub fn center_y(&self) -> f32 {
        self.baseline_top + self.height / 2.0
    }
}

/// Reads the tracked-element set from a document
#[derive(Clone, Debug)]
pub struct GeometryExtractor {
    elements: Selector,
    sections: Selector,
    speed_attribute: String,
    image_class: String,
    content_class: String,
}

impl GeometryExtractor {
    pub fn new(config: &ParallaxConfig) -> crate::Result<Self> {
        Ok(Self {
            elements: config.elements()?,
            sections: config.section()?,
            speed_attribute: config.speed_attribute.clone(),
            image_class: config.image_class.clone(),
            content_class: config.content_class.clone(),
        })
    }

    /// Measure every tagged element
    ///
    /// Any failure is logged and yields an empty set, which makes every later
    /// pass a no-op until the next successful measurement.
    pub fn measure<H>(&self, host: &mut H) -> Vec<TrackedElement>
    where
        H: Document + Window + ?Sized,
    {
        match self.try_measure(host) {
            Ok(elements) => {
                tracing::debug!("measured {} parallax elements", elements.len());
                elements
            }
            Err(err) => {
                tracing::error!("parallax setup failed: {err}");
                Vec::new()
            }
        }
    }

    fn try_measure<H>(&self, host: &mut H) -> Result<Vec<TrackedElement>, PlatformError>
    where
        H: Document + Window + ?Sized,
    {
        let nodes = host.query_all(&self.elements);
        let mut elements = Vec::with_capacity(nodes.len());

        for node in nodes {
            host.set_translate_y(node, None);
            // Reading the height flushes layout so the top below is untransformed
            let height = host.offset_height(node)?;

            let speed = self.read_speed(host, node);
            let baseline_top = host.bounding_top(node)? + host.scroll_y();

            elements.push(TrackedElement {
                node,
                section: host.closest(node, &self.sections),
                role: self.role_of(host, node),
                speed,
                baseline_top,
                height,
                is_visible: false,
            });
        }

        Ok(elements)
    }

    /// An element carrying both role classes is treated as the image
    fn role_of<D: Document + ?Sized>(&self, document: &D, node: NodeId) -> Role {
        if document.has_class(node, &self.image_class) {
            Role::Image
        } else if document.has_class(node, &self.content_class) {
            Role::Content
        } else {
            Role::Plain
        }
    }

    fn read_speed<D: Document + ?Sized>(&self, document: &D, node: NodeId) -> f32 {
        let raw = document
            .attribute(node, &self.speed_attribute)
            .unwrap_or_default();
        resolve_speed(&raw, |name| document.computed_property(node, name))
    }
}

/// Resolve a speed attribute value
///
/// Accepts a literal number (leading numeric prefix, so `"0.5px"` is 0.5) or
/// a `var(--name)` reference looked up through `lookup`. Anything that does
/// not resolve to a finite number is 0.
pub fn resolve_speed(raw: &str, lookup: impl FnOnce(&str) -> Option<String>) -> f32 {
    let raw = raw.trim();

    if raw.starts_with("var(") {
        let Some(name) = var_reference(raw) else {
            return 0.0;
        };
        return lookup(name)
            .and_then(|value| parse_number_prefix(value.trim()))
            .unwrap_or(0.0);
    }

    parse_number_prefix(raw).unwrap_or(0.0)
}

/// Extract `--name` from `var(--name)` (fallbacks are not supported)
fn var_reference(raw: &str) -> Option<&str> {
    static VAR: OnceLock<Regex> = OnceLock::new();
    let re = VAR.get_or_init(|| {
        Regex::new(r"var\((--[^)]+)\)").expect("var() pattern is valid")
    });
    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse the longest numeric prefix of `input`
fn parse_number_prefix(input: &str) -> Option<f32> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?")
            .expect("number pattern is valid")
    });

    let value: f32 = re.find(input.trim_start())?.as_str().parse().ok()?;
    value.is_finite().then_some(value)
}
