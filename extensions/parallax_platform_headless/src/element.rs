//! Element descriptions for building a headless page

use rustc_hash::FxHashMap;

/// Load state of an image element
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ImageLoad {
    /// Still downloading
    #[default]
    Loading,
    /// Decoded with a non-zero natural size
    Loaded,
    /// Failed to load
    Broken,
}

/// Builder for an element appended with [`HeadlessPage::append`](crate::HeadlessPage::append)
#[derive(Clone, Debug, Default)]
pub struct ElementBuilder {
    pub(crate) tag: String,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: FxHashMap<String, String>,
    pub(crate) properties: FxHashMap<String, String>,
    pub(crate) top: f32,
    pub(crate) height: f32,
    pub(crate) image: Option<ImageLoad>,
}

/// Start describing an element with the given tag
pub fn element(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into().to_ascii_lowercase(),
        ..Default::default()
    }
}

/// Start describing an `img` element in the given load state
pub fn image(load: ImageLoad) -> ElementBuilder {
    ElementBuilder {
        image: Some(load),
        ..element("img")
    }
}

impl ElementBuilder {
    /// Set the element id
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class (whitespace-separated lists are split)
    pub fn class(mut self, class: &str) -> Self {
        self.classes
            .extend(class.split_whitespace().map(str::to_string));
        self
    }

    /// Set an attribute
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set a style property; `--custom` properties inherit to descendants
    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Set the untransformed document top and the height
    pub fn layout(mut self, top: f32, height: f32) -> Self {
        self.top = top;
        self.height = height;
        self
    }
}
