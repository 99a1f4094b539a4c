//! Engine configuration
//!
//! Every field has a default matching the stock markup contract, so an empty
//! TOML document (or [`ParallaxConfig::default`]) is a working configuration:
//!
//! ```toml
//! section_selector = ".parallax-section"
//! element_selector = "[data-parallax]"
//! speed_attribute = "data-parallax-speed"
//! image_class = "parallax-image"
//! content_class = "parallax-content"
//! root_margin = 100.0
//! thresholds = [0.0, 0.1, 0.5, 0.9, 1.0]
//! scroll_settle_ms = 150
//! resize_debounce_ms = 250
//! frame_budget_ms = 16
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use parallax_platform::{ObserverOptions, Selector};
use serde::{Deserialize, Serialize};

use crate::error::{ParallaxError, Result};

/// Configuration for a [`ParallaxController`](crate::ParallaxController)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ParallaxConfig {
    /// Selector for section containers
    pub section_selector: String,
    /// Selector for elements that take part in the effect
    pub element_selector: String,
    /// Attribute carrying an element's speed (number or `var(--name)`)
    pub speed_attribute: String,
    /// Class marking a section's background image
    pub image_class: String,
    /// Class marking a section's foreground content
    pub content_class: String,
    /// Margin added around the viewport for visibility tracking (px)
    pub root_margin: f32,
    /// Intersection ratios at which visibility is re-reported
    pub thresholds: Vec<f32>,
    /// Quiet period after the last scroll event before the loop cools down
    pub scroll_settle_ms: u64,
    /// Quiet period after the last resize event before re-measuring
    pub resize_debounce_ms: u64,
    /// Pass duration above which a performance warning is logged
    pub frame_budget_ms: u64,
}

impl Default for ParallaxConfig {
    fn default() -> Self {
        Self {
            section_selector: ".parallax-section".to_string(),
            element_selector: "[data-parallax]".to_string(),
            speed_attribute: "data-parallax-speed".to_string(),
            image_class: "parallax-image".to_string(),
            content_class: "parallax-content".to_string(),
            root_margin: 100.0,
            thresholds: vec![0.0, 0.1, 0.5, 0.9, 1.0],
            scroll_settle_ms: 150,
            resize_debounce_ms: 250,
            frame_budget_ms: 16,
        }
    }
}

impl ParallaxConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ParallaxConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Serialize to pretty-printed TOML
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Set the section selector
    pub fn section_selector(mut self, selector: impl Into<String>) -> Self {
        self.section_selector = selector.into();
        self
    }

    /// Set the element selector
    pub fn element_selector(mut self, selector: impl Into<String>) -> Self {
        self.element_selector = selector.into();
        self
    }

    /// Set the image and content role classes
    pub fn role_classes(mut self, image: impl Into<String>, content: impl Into<String>) -> Self {
        self.image_class = image.into();
        self.content_class = content.into();
        self
    }

    /// Set the visibility margin
    pub fn root_margin(mut self, margin: f32) -> Self {
        self.root_margin = margin;
        self
    }

    /// Set the scroll settle window
    pub fn scroll_settle(mut self, window: Duration) -> Self {
        self.scroll_settle_ms = millis(window);
        self
    }

    /// Set the resize debounce window
    pub fn resize_debounce(mut self, window: Duration) -> Self {
        self.resize_debounce_ms = millis(window);
        self
    }

    /// Set the per-pass time budget
    pub fn frame_budget(mut self, budget: Duration) -> Self {
        self.frame_budget_ms = millis(budget);
        self
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    pub fn budget(&self) -> Duration {
        Duration::from_millis(self.frame_budget_ms)
    }

    /// Options for the visibility observer
    pub fn observer_options(&self) -> ObserverOptions {
        ObserverOptions::new(self.root_margin, self.thresholds.clone())
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        Selector::parse(&self.section_selector)?;
        Selector::parse(&self.element_selector)?;

        if self.speed_attribute.trim().is_empty() {
            return Err(invalid("speed_attribute must not be empty"));
        }
        if self.image_class.trim().is_empty() || self.content_class.trim().is_empty() {
            return Err(invalid("role classes must not be empty"));
        }
        if self.image_class == self.content_class {
            return Err(invalid("image_class and content_class must differ"));
        }
        if !self.root_margin.is_finite() || self.root_margin < 0.0 {
            return Err(invalid(format!(
                "root_margin must be a non-negative number, got {}",
                self.root_margin
            )));
        }
        if self.thresholds.is_empty() {
            return Err(invalid("thresholds must not be empty"));
        }
        if self
            .thresholds
            .iter()
            .any(|t| !(0.0..=1.0).contains(t))
        {
            return Err(invalid("thresholds must lie within 0.0..=1.0"));
        }
        if self.thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("thresholds must be strictly increasing"));
        }
        if self.scroll_settle_ms == 0 || self.resize_debounce_ms == 0 {
            return Err(invalid("settle and debounce windows must be non-zero"));
        }

        Ok(())
    }

    pub(crate) fn section(&self) -> Result<Selector> {
        Ok(Selector::parse(&self.section_selector)?)
    }

    pub(crate) fn elements(&self) -> Result<Selector> {
        Ok(Selector::parse(&self.element_selector)?)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn invalid(message: impl Into<String>) -> ParallaxError {
    ParallaxError::InvalidConfig(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = ParallaxConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settle_window(), Duration::from_millis(150));
        assert_eq!(config.debounce_window(), Duration::from_millis(250));
        assert_eq!(config.observer_options().root_margin, 100.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ParallaxConfig::from_toml_str(
            r#"
            section_selector = ".hero"
            resize_debounce_ms = 500
            "#,
        )
        .unwrap();

        assert_eq!(config.section_selector, ".hero");
        assert_eq!(config.resize_debounce_ms, 500);
        assert_eq!(config.scroll_settle_ms, 150);
        assert_eq!(config.thresholds, vec![0.0, 0.1, 0.5, 0.9, 1.0]);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad = [
            ParallaxConfig::default().section_selector("div p"),
            ParallaxConfig::default().root_margin(-1.0),
            ParallaxConfig::default().role_classes("same", "same"),
            ParallaxConfig::default().scroll_settle(Duration::ZERO),
            ParallaxConfig {
                thresholds: vec![0.5, 0.1],
                ..Default::default()
            },
            ParallaxConfig {
                thresholds: vec![0.0, 1.5],
                ..Default::default()
            },
        ];

        for config in bad {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
        }
    }

    #[test]
    fn test_builder_setters() {
        let config = ParallaxConfig::default()
            .section_selector(".hero")
            .element_selector(".layer")
            .resize_debounce(Duration::from_millis(400))
            .frame_budget(Duration::MAX);

        assert!(config.validate().is_ok());
        assert_eq!(config.element_selector, ".layer");
        assert_eq!(config.debounce_window(), Duration::from_millis(400));
        assert_eq!(config.frame_budget_ms, u64::MAX);

        assert!(ParallaxConfig::default()
            .element_selector("")
            .validate()
            .is_err());
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = ParallaxConfig::default().to_toml_string().unwrap();
        let parsed = ParallaxConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, ParallaxConfig::default());
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let err = ParallaxConfig::from_toml_str("root_margin = \"wide\"").unwrap_err();
        assert!(matches!(err, ParallaxError::ConfigParse(_)));
    }
}
