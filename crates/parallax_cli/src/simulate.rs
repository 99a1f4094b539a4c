//! Scripted playback of a page description

use anyhow::Result;
use parallax_core::{LifecyclePhase, ParallaxConfig, ParallaxController};
use parallax_platform::{NodeId, Window};
use parallax_platform_headless::HeadlessPage;
use serde::Serialize;

use crate::page::{BuiltPage, PageDescription, Step};

/// State of the page after one step
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub step: usize,
    pub time_ms: u128,
    pub scroll_y: f32,
    pub lifecycle: String,
    pub scroll_phase: String,
    pub animating: bool,
    pub layers: Vec<LayerOffset>,
}

#[derive(Debug, Serialize)]
pub struct LayerOffset {
    pub name: String,
    pub offset: Option<f32>,
}

/// Run initialization and every step, returning one snapshot per step
///
/// Snapshot 0 is taken right after initialization.
pub fn run(description: &PageDescription, config: ParallaxConfig) -> Result<Vec<Snapshot>> {
    let BuiltPage {
        mut page,
        layers,
        pending_images,
    } = description.build(&config)?;
    let mut parallax = ParallaxController::new(config)?;

    let phase = parallax.initialize(&mut page);
    parallax.pump(&mut page);
    tracing::info!("initialized: {:?}", phase);

    let mut snapshots = vec![snapshot(0, &page, &parallax, &layers)];

    for (index, step) in description.steps.iter().enumerate() {
        apply(step, &mut page, &mut parallax, &pending_images);
        for _ in 0..step.frames.unwrap_or(1) {
            page.tick();
            parallax.pump(&mut page);
        }
        snapshots.push(snapshot(index + 1, &page, &parallax, &layers));
    }

    if parallax.phase() == LifecyclePhase::AwaitingImages {
        tracing::warn!("script ended while images were still loading");
    }
    parallax.destroy(&mut page);

    Ok(snapshots)
}

fn apply(
    step: &Step,
    page: &mut HeadlessPage,
    parallax: &mut ParallaxController,
    pending_images: &[(String, NodeId)],
) {
    if let Some(outcome) = step.load_images {
        for (name, image) in pending_images {
            tracing::debug!("image {name} -> {outcome:?}");
            page.finish_image(*image, outcome.into());
        }
        parallax.pump(page);
    }
    if let Some([width, height]) = step.resize {
        page.resize(width, height);
        parallax.pump(page);
    }
    if let Some(y) = step.scroll_to {
        page.scroll_to(y);
        parallax.pump(page);
    }
    if let Some(dy) = step.scroll_by {
        page.scroll_by(dy);
        parallax.pump(page);
    }
}

fn snapshot(
    step: usize,
    page: &HeadlessPage,
    parallax: &ParallaxController,
    layers: &[(String, NodeId)],
) -> Snapshot {
    Snapshot {
        step,
        time_ms: page.now().as_millis(),
        scroll_y: page.scroll_y(),
        lifecycle: format!("{:?}", parallax.phase()),
        scroll_phase: format!("{:?}", parallax.scroll_phase()),
        animating: parallax.is_animating(),
        layers: layers
            .iter()
            .map(|(name, node)| LayerOffset {
                name: name.clone(),
                offset: page.translate_y(*node),
            })
            .collect(),
    }
}

/// Render snapshots as an aligned text table
pub fn render_table(snapshots: &[Snapshot]) -> String {
    let mut out = String::new();
    for snapshot in snapshots {
        out.push_str(&format!(
            "step {:>3}  t={:>6}ms  scroll={:>8.1}  {} / {}{}\n",
            snapshot.step,
            snapshot.time_ms,
            snapshot.scroll_y,
            snapshot.lifecycle,
            snapshot.scroll_phase,
            if snapshot.animating { "  (animating)" } else { "" }
        ));
        for layer in &snapshot.layers {
            match layer.offset {
                Some(offset) => out.push_str(&format!("    {:<20} {:>10.2}px\n", layer.name, offset)),
                None => out.push_str(&format!("    {:<20} {:>12}\n", layer.name, "-")),
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
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
    "#;

    #[test]
    fn test_script_waits_for_images_then_tracks_scroll() {
        let description = PageDescription::parse(PAGE).unwrap();
        let snapshots = run(&description, ParallaxConfig::default()).unwrap();

        assert_eq!(snapshots.len(), 3);
        assert_eq!(snapshots[0].lifecycle, "AwaitingImages");
        assert!(snapshots[0].layers.iter().all(|l| l.offset.is_none()));

        assert_eq!(snapshots[1].lifecycle, "Running");

        let last = &snapshots[2];
        assert_eq!(last.scroll_y, 800.0);
        assert_eq!(last.layers[0].offset, Some(0.0));
        assert_eq!(last.layers[1].offset, Some(50.0));
    }

    #[test]
    fn test_json_lines_serialize() {
        let description = PageDescription::parse(PAGE).unwrap();
        let snapshots = run(&description, ParallaxConfig::default()).unwrap();
        let line = serde_json::to_string(&snapshots[2]).unwrap();
        assert!(line.contains("\"name\":\"caption\""));
        assert!(line.contains("\"offset\":50.0"));
    }

    #[test]
    fn test_table_marks_unmoved_layers() {
        let description = PageDescription::parse(PAGE).unwrap();
        let snapshots = run(&description, ParallaxConfig::default()).unwrap();
        let table = render_table(&snapshots[..1]);
        assert!(table.contains("AwaitingImages"));
        assert!(table.contains("hero"));
        assert!(table.contains('-'));
    }
}
