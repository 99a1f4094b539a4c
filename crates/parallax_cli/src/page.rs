//! Page descriptions
//!
//! A page file lists the viewport, the sections with their layers and
//! images, and a script of steps to play back:
//!
//! ```toml
//! [viewport]
//! width = 1280
//! height = 800
//!
//! [[sections]]
//! top = 900
//! height = 800
//! properties = { "--hero-speed" = "0.3" }
//!
//! [[sections.layers]]
//! name = "hero"
//! role = "image"
//! speed = "var(--hero-speed)"
//! top = 1000
//! height = 400
//!
//! [[sections.images]]
//! name = "hero-src"
//! state = "loading"
//!
//! [[steps]]
//! load_images = "loaded"
//!
//! [[steps]]
//! scroll_to = 800
//! frames = 4
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use parallax_core::ParallaxConfig;
use parallax_platform::{ImageOutcome, NodeId, Selector};
use parallax_platform_headless::{element, image, ElementBuilder, HeadlessPage, ImageLoad};
use serde::Deserialize;

/// Whole page description
#[derive(Debug, Deserialize)]
pub struct PageDescription {
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub initial_scroll: f32,
    #[serde(default)]
    pub sections: Vec<SectionDescription>,
    /// Layers outside any section
    #[serde(default)]
    pub loose_layers: Vec<LayerDescription>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SectionDescription {
    pub top: f32,
    pub height: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub layers: Vec<LayerDescription>,
    #[serde(default)]
    pub images: Vec<ImageDescription>,
}

#[derive(Debug, Deserialize)]
pub struct LayerDescription {
    pub name: String,
    #[serde(default)]
    pub role: LayerRole,
    #[serde(default = "default_speed")]
    pub speed: String,
    pub top: f32,
    pub height: f32,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

fn default_speed() -> String {
    "0".to_string()
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Image,
    Content,
    #[default]
    Plain,
}

#[derive(Debug, Deserialize)]
pub struct ImageDescription {
    pub name: String,
    #[serde(default)]
    pub state: ImageState,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageState {
    #[default]
    Loading,
    Loaded,
    Broken,
}

impl From<ImageState> for ImageLoad {
    fn from(state: ImageState) -> Self {
        match state {
            ImageState::Loading => ImageLoad::Loading,
            ImageState::Loaded => ImageLoad::Loaded,
            ImageState::Broken => ImageLoad::Broken,
        }
    }
}

/// How pending images finish in a `load_images` step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadOutcome {
    Loaded,
    Failed,
}

impl From<LoadOutcome> for ImageOutcome {
    fn from(outcome: LoadOutcome) -> Self {
        match outcome {
            LoadOutcome::Loaded => ImageOutcome::Loaded,
            LoadOutcome::Failed => ImageOutcome::Failed,
        }
    }
}

/// One step of the playback script, applied in field order
#[derive(Debug, Default, Deserialize)]
pub struct Step {
    pub load_images: Option<LoadOutcome>,
    pub resize: Option<[f32; 2]>,
    pub scroll_to: Option<f32>,
    pub scroll_by: Option<f32>,
    /// Frames to advance after the step's inputs (default 1)
    pub frames: Option<usize>,
}

/// A page built from a description, with names for its nodes
pub struct BuiltPage {
    pub page: HeadlessPage,
    pub layers: Vec<(String, NodeId)>,
    pub pending_images: Vec<(String, NodeId)>,
}

impl PageDescription {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let description: PageDescription = toml::from_str(content)?;
        Ok(description)
    }

    /// Build a headless page marked up for `config`
    pub fn build(&self, config: &ParallaxConfig) -> Result<BuiltPage> {
        let section_marker = Selector::parse(&config.section_selector)?;
        let layer_marker = Selector::parse(&config.element_selector)?;

        let mut page = HeadlessPage::new(self.viewport.width, self.viewport.height);
        let body = page.body();
        let mut layers = Vec::new();
        let mut pending_images = Vec::new();

        for section in &self.sections {
            let mut builder =
                marked("section", &section_marker).layout(section.top, section.height);
            for (name, value) in &section.properties {
                builder = builder.property(name, value);
            }
            let section_node = page.append(body, builder);

            for img in &section.images {
                let node = page.append(section_node, image(img.state.into()));
                if img.state == ImageState::Loading {
                    pending_images.push((img.name.clone(), node));
                }
            }
            for layer in &section.layers {
                let node = page.append(section_node, layer.builder(config, &layer_marker));
                layers.push((layer.name.clone(), node));
            }
        }

        for layer in &self.loose_layers {
            let node = page.append(body, layer.builder(config, &layer_marker));
            layers.push((layer.name.clone(), node));
        }

        page.scroll_to(self.initial_scroll);

        Ok(BuiltPage {
            page,
            layers,
            pending_images,
        })
    }
}

impl LayerDescription {
    fn builder(&self, config: &ParallaxConfig, marker: &Selector) -> ElementBuilder {
        let mut builder = marked("div", marker)
            .attr(config.speed_attribute.as_str(), self.speed.as_str())
            .layout(self.top, self.height);
        builder = match self.role {
            LayerRole::Image => builder.class(&config.image_class),
            LayerRole::Content => builder.class(&config.content_class),
            LayerRole::Plain => builder,
        };
        for (name, value) in &self.properties {
            builder = builder.property(name, value);
        }
        builder
    }
}

/// Start an element that `selector` matches
fn marked(tag: &str, selector: &Selector) -> ElementBuilder {
    match selector {
        Selector::Class(name) => element(tag).class(name),
        Selector::Attribute(name) => element(tag).attr(name.as_str(), ""),
        Selector::Id(name) => element(tag).id(name.as_str()),
        Selector::Tag(name) => element(name.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parallax_platform::Document;

    const PAGE: &str = r#"
        initial_scroll = 0

        [viewport]
        width = 1280
        height = 800

        [[sections]]
        top = 900
        height = 800

        [[sections.layers]]
        name = "hero"
        role = "image"
        speed = "0.3"
        top = 1000
        height = 400

        [[sections.layers]]
        name = "caption"
        role = "content"
        speed = "0.1"
        top = 1100
        height = 100

        [[sections.images]]
        name = "hero-src"

        [[steps]]
        load_images = "failed"

        [[steps]]
        scroll_to = 800
        frames = 2
    "#;

    #[test]
    fn test_parse_page() {
        let description = PageDescription::parse(PAGE).unwrap();
        assert_eq!(description.sections.len(), 1);
        assert_eq!(description.sections[0].layers[0].role, LayerRole::Image);
        assert_eq!(description.sections[0].images[0].state, ImageState::Loading);
        assert_eq!(description.steps.len(), 2);
        assert_eq!(description.steps[0].load_images, Some(LoadOutcome::Failed));
        assert_eq!(description.steps[1].scroll_to, Some(800.0));
    }

    #[test]
    fn test_build_marks_elements_for_config() {
        let description = PageDescription::parse(PAGE).unwrap();
        let config = ParallaxConfig::default();
        let built = description.build(&config).unwrap();

        let layers = Selector::parse(&config.element_selector).unwrap();
        let found = built.page.query_all(&layers);
        let named: Vec<NodeId> = built.layers.iter().map(|(_, node)| *node).collect();
        assert_eq!(found, named);

        let (_, hero) = built.layers[0];
        assert!(built.page.has_class(hero, "parallax-image"));
        assert_eq!(
            built.page.attribute(hero, "data-parallax-speed").as_deref(),
            Some("0.3")
        );
        assert_eq!(built.pending_images.len(), 1);
    }

    #[test]
    fn test_rejects_unknown_role() {
        let err = PageDescription::parse(
            r#"
            [[loose_layers]]
            name = "x"
            role = "sky"
            top = 0
            height = 10
            "#,
        );
        assert!(err.is_err());
    }
}
