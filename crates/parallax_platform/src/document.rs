//! Document abstraction: node queries, geometry and style

use crate::error::Result;
use crate::selector::Selector;
use crate::NodeId;

/// Document abstraction trait
///
/// Implemented by platform backends over their node tree.
pub trait Document {
    /// All nodes matching `selector`, in document order
    fn query_all(&self, selector: &Selector) -> Vec<NodeId>;

    /// Nearest inclusive ancestor of `node` matching `selector`
    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId>;

    /// Attribute value, if present
    fn attribute(&self, node: NodeId, name: &str) -> Option<String>;

    /// Whether the node's class list contains `class`
    fn has_class(&self, node: NodeId, class: &str) -> bool;

    /// Image descendants of `node`, in document order
    fn images_within(&self, node: NodeId) -> Vec<NodeId>;

    /// Whether an image has finished loading with a non-zero natural height
    fn image_complete(&self, image: NodeId) -> bool;

    /// Top edge relative to the viewport, with transforms applied
    fn bounding_top(&self, node: NodeId) -> Result<f32>;

    /// Rendered height; flushes pending layout first
    fn offset_height(&self, node: NodeId) -> Result<f32>;

    /// Computed value of a style property (including custom properties)
    fn computed_property(&self, node: NodeId, name: &str) -> Option<String>;

    /// Write a vertical translation, or clear it with `None`
    fn set_translate_y(&mut self, node: NodeId, offset: Option<f32>);
}
