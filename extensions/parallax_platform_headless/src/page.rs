//! Headless page: node tree, virtual clock and event queue

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::Duration;

use indexmap::IndexMap;
use parallax_platform::{
    Document, Event, EventLoop, FrameRequestId, ImageOutcome, IntersectionEntry, ListenerKind,
    NodeId, ObserverId, ObserverOptions, PlatformError, Result, Selector, TimerId, Window,
};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::element::{element, ElementBuilder, ImageLoad};

/// Interval between virtual frames (60Hz, rounded down)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Debug)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attributes: FxHashMap<String, String>,
    properties: FxHashMap<String, String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    top: f32,
    height: f32,
    translate_y: Option<f32>,
    image: Option<ImageLoad>,
    attached: bool,
    layout_error: bool,
}

impl Node {
    fn from_builder(builder: ElementBuilder, parent: Option<NodeId>) -> Self {
        Self {
            tag: builder.tag,
            id: builder.id,
            classes: builder.classes,
            attributes: builder.attributes,
            properties: builder.properties,
            parent,
            children: Vec::new(),
            top: builder.top,
            height: builder.height,
            translate_y: None,
            image: builder.image,
            attached: true,
            layout_error: false,
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Class(name) => self.classes.iter().any(|c| c == name),
            Selector::Attribute(name) => self.attributes.contains_key(name),
            Selector::Id(name) => self.id.as_deref() == Some(name.as_str()),
            Selector::Tag(name) => self.tag == *name,
        }
    }

    /// Top edge with the current transform applied
    fn visual_top(&self) -> f32 {
        self.top + self.translate_y.unwrap_or(0.0)
    }
}

#[derive(Debug)]
struct PendingTimer {
    id: TimerId,
    due: Duration,
}

#[derive(Debug)]
struct Observation {
    options: ObserverOptions,
    targets: Vec<NodeId>,
    /// Last reported (intersecting, threshold bucket) per target
    reported: FxHashMap<NodeId, (bool, usize)>,
}

/// Deterministic in-memory page
#[derive(Debug)]
pub struct HeadlessPage {
    nodes: SlotMap<NodeId, Node>,
    body: NodeId,
    scroll_y: f32,
    viewport_width: f32,
    viewport_height: f32,
    clock: Cell<Duration>,
    frame_interval: Duration,
    write_cost: Duration,
    next_id: u64,
    timers: Vec<PendingTimer>,
    frames: Vec<FrameRequestId>,
    listeners: FxHashMap<ListenerKind, usize>,
    observers: IndexMap<ObserverId, Observation>,
    watched_images: FxHashSet<NodeId>,
    events: VecDeque<Event>,
    layout_flushes: Cell<usize>,
    transform_writes: usize,
}

impl HeadlessPage {
    /// Create an empty page with the given viewport size
    pub fn new(viewport_width: f32, viewport_height: f32) -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(Node::from_builder(element("body"), None));

        Self {
            nodes,
            body,
            scroll_y: 0.0,
            viewport_width,
            viewport_height,
            clock: Cell::new(Duration::ZERO),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            write_cost: Duration::ZERO,
            next_id: 1,
            timers: Vec::new(),
            frames: Vec::new(),
            listeners: FxHashMap::default(),
            observers: IndexMap::new(),
            watched_images: FxHashSet::default(),
            events: VecDeque::new(),
            layout_flushes: Cell::new(0),
            transform_writes: 0,
        }
    }

    /// Set the virtual frame interval
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    /// Make every transform write advance the clock, to simulate slow frames
    pub fn with_write_cost(mut self, cost: Duration) -> Self {
        self.write_cost = cost;
        self
    }

    /// The root element
    pub fn body(&self) -> NodeId {
        self.body
    }

    /// Append an element as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, builder: ElementBuilder) -> NodeId {
        let node = self.nodes.insert(Node::from_builder(builder, Some(parent)));
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.push(node);
        }
        node
    }

    /// Remove a node (and its subtree) from the document
    pub fn detach(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(n) = self.nodes.get_mut(current) {
                n.attached = false;
                stack.extend(n.children.iter().copied());
            }
        }
    }

    /// Move or resize an element's untransformed box
    pub fn set_layout(&mut self, node: NodeId, top: f32, height: f32) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.top = top;
            n.height = height;
        }
    }

    /// Make geometry queries for `node` fail
    pub fn set_layout_error(&mut self, node: NodeId, failing: bool) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.layout_error = failing;
        }
    }

    /// Set or replace an attribute
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Set or replace a style property
    pub fn set_property(&mut self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.get_mut(node) {
            n.properties.insert(name.to_string(), value.to_string());
        }
    }

    /// Current translation of `node`
    pub fn translate_y(&self, node: NodeId) -> Option<f32> {
        self.nodes.get(node).and_then(|n| n.translate_y)
    }

    pub fn viewport_width(&self) -> f32 {
        self.viewport_width
    }

    /// Number of listeners bound for `kind`
    pub fn listener_count(&self, kind: ListenerKind) -> usize {
        self.listeners.get(&kind).copied().unwrap_or(0)
    }

    /// Number of synchronous layout flushes performed
    pub fn layout_flushes(&self) -> usize {
        self.layout_flushes.get()
    }

    /// Number of non-clearing transform writes performed
    pub fn transform_writes(&self) -> usize {
        self.transform_writes
    }

    /// Number of outstanding frame requests
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Number of armed timers
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Number of connected observers
    pub fn active_observers(&self) -> usize {
        self.observers.len()
    }

    /// Number of queued, undelivered events
    pub fn queued_events(&self) -> usize {
        self.events.len()
    }

    // =========================================================================
    // Driving the page
    // =========================================================================

    /// Scroll to an absolute offset (clamped at 0)
    pub fn scroll_to(&mut self, y: f32) {
        self.scroll_y = y.max(0.0);
        if self.is_listening(ListenerKind::Scroll) {
            self.events.push_back(Event::Scroll);
        }
        self.update_intersections();
    }

    /// Scroll by a relative amount
    pub fn scroll_by(&mut self, dy: f32) {
        self.scroll_to(self.scroll_y + dy);
    }

    /// Resize the viewport
    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport_width = width;
        self.viewport_height = height;
        if self.is_listening(ListenerKind::Resize) {
            self.events.push_back(Event::Resized { width, height });
        }
        self.update_intersections();
    }

    /// Finish loading an image, queueing its settle event if watched
    pub fn finish_image(&mut self, image: NodeId, outcome: ImageOutcome) {
        if let Some(n) = self.nodes.get_mut(image) {
            n.image = Some(match outcome {
                ImageOutcome::Loaded => ImageLoad::Loaded,
                ImageOutcome::Failed => ImageLoad::Broken,
            });
        }
        if self.watched_images.remove(&image) {
            self.events.push_back(Event::ImageSettled { image, outcome });
        }
    }

    /// Advance the clock by one frame interval
    ///
    /// Due timers fire first (in deadline order), then every frame requested
    /// before this tick, then visibility is re-evaluated.
    pub fn tick(&mut self) {
        let now = self.clock.get() + self.frame_interval;
        self.clock.set(now);

        let (mut due, pending): (Vec<PendingTimer>, Vec<PendingTimer>) =
            std::mem::take(&mut self.timers)
                .into_iter()
                .partition(|timer| timer.due <= now);
        self.timers = pending;
        due.sort_by_key(|timer| (timer.due, timer.id));
        for timer in due {
            tracing::trace!("timer {:?} fired at {:?}", timer.id, now);
            self.events.push_back(Event::Timer(timer.id));
        }

        for frame in self.frames.drain(..) {
            self.events.push_back(Event::Frame(frame));
        }

        self.update_intersections();
    }

    /// Advance the clock by `n` frames
    pub fn tick_n(&mut self, n: usize) {
        for _ in 0..n {
            self.tick();
        }
    }

    fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn is_listening(&self, kind: ListenerKind) -> bool {
        self.listener_count(kind) > 0
    }

    fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = match self.nodes.get(root) {
            Some(n) => n.children.iter().rev().copied().collect(),
            None => return out,
        };
        while let Some(current) = stack.pop() {
            let Some(n) = self.nodes.get(current) else {
                continue;
            };
            if !n.attached {
                continue;
            }
            out.push(current);
            stack.extend(n.children.iter().rev().copied());
        }
        out
    }

    fn attached_node(&self, node: NodeId) -> Result<&Node> {
        match self.nodes.get(node) {
            Some(n) if n.attached => {
                if n.layout_error {
                    Err(PlatformError::Layout(format!("no layout box for {node:?}")))
                } else {
                    Ok(n)
                }
            }
            _ => Err(PlatformError::NodeDetached(node)),
        }
    }

    /// Intersection of `node` with the margin-expanded viewport
    fn intersection(&self, node: NodeId, options: &ObserverOptions) -> (bool, f32, usize) {
        let Some(n) = self.nodes.get(node).filter(|n| n.attached) else {
            return (false, 0.0, 0);
        };

        let root_top = self.scroll_y - options.root_margin;
        let root_bottom = self.scroll_y + self.viewport_height + options.root_margin;
        let top = n.visual_top();
        let bottom = top + n.height;

        let intersecting = top <= root_bottom && bottom >= root_top;
        let ratio = if !intersecting {
            0.0
        } else if n.height > 0.0 {
            ((bottom.min(root_bottom) - top.max(root_top)) / n.height).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let bucket = if intersecting {
            options.thresholds.iter().filter(|&&t| ratio >= t).count()
        } else {
            0
        };

        (intersecting, ratio, bucket)
    }

    fn update_intersections(&mut self) {
        let ids: Vec<ObserverId> = self.observers.keys().copied().collect();
        for id in ids {
            let entries = self.collect_entries(id, false);
            if !entries.is_empty() {
                self.events.push_back(Event::Intersection {
                    observer: id,
                    entries,
                });
            }
        }
    }

    fn collect_entries(&mut self, id: ObserverId, initial: bool) -> Vec<IntersectionEntry> {
        let Some(observation) = self.observers.get(&id) else {
            return Vec::new();
        };

        let mut entries = Vec::new();
        let mut reported = Vec::new();
        for &target in &observation.targets {
            let (intersecting, ratio, bucket) = self.intersection(target, &observation.options);
            let changed = observation.reported.get(&target) != Some(&(intersecting, bucket));
            if initial || changed {
                entries.push(IntersectionEntry::new(target, intersecting, ratio));
                reported.push((target, (intersecting, bucket)));
            }
        }

        if let Some(observation) = self.observers.get_mut(&id) {
            observation.reported.extend(reported);
        }
        entries
    }
}

impl Document for HeadlessPage {
    fn query_all(&self, selector: &Selector) -> Vec<NodeId> {
        self.descendants(self.body)
            .into_iter()
            .filter(|&node| self.nodes[node].matches(selector))
            .collect()
    }

    fn closest(&self, node: NodeId, selector: &Selector) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.nodes.get(id)?;
            if n.matches(selector) {
                return Some(id);
            }
            current = n.parent;
        }
        None
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.nodes.get(node)?.attributes.get(name).cloned()
    }

    fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.nodes
            .get(node)
            .is_some_and(|n| n.classes.iter().any(|c| c == class))
    }

    fn images_within(&self, node: NodeId) -> Vec<NodeId> {
        self.descendants(node)
            .into_iter()
            .filter(|&id| self.nodes[id].tag == "img")
            .collect()
    }

    fn image_complete(&self, image: NodeId) -> bool {
        matches!(
            self.nodes.get(image).and_then(|n| n.image),
            Some(ImageLoad::Loaded)
        )
    }

    fn bounding_top(&self, node: NodeId) -> Result<f32> {
        let n = self.attached_node(node)?;
        Ok(n.visual_top() - self.scroll_y)
    }

    fn offset_height(&self, node: NodeId) -> Result<f32> {
        let n = self.attached_node(node)?;
        self.layout_flushes.set(self.layout_flushes.get() + 1);
        Ok(n.height)
    }

    fn computed_property(&self, node: NodeId, name: &str) -> Option<String> {
        let inherits = name.starts_with("--");
        let mut current = Some(node);
        while let Some(id) = current {
            let n = self.nodes.get(id)?;
            if let Some(value) = n.properties.get(name) {
                return Some(value.clone());
            }
            if !inherits {
                return None;
            }
            current = n.parent;
        }
        None
    }

    fn set_translate_y(&mut self, node: NodeId, offset: Option<f32>) {
        let Some(n) = self.nodes.get_mut(node).filter(|n| n.attached) else {
            return;
        };
        n.translate_y = offset;
        if offset.is_some() {
            self.transform_writes += 1;
            self.clock.set(self.clock.get() + self.write_cost);
        }
    }
}

impl Window for HeadlessPage {
    fn scroll_y(&self) -> f32 {
        self.scroll_y
    }

    fn inner_height(&self) -> f32 {
        self.viewport_height
    }

    fn now(&self) -> Duration {
        self.clock.get()
    }

    fn request_animation_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id());
        self.frames.push(id);
        id
    }

    fn cancel_animation_frame(&mut self, id: FrameRequestId) {
        self.frames.retain(|&frame| frame != id);
    }

    fn set_timeout(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers.push(PendingTimer {
            id,
            due: self.clock.get() + delay,
        });
        id
    }

    fn clear_timeout(&mut self, id: TimerId) {
        self.timers.retain(|timer| timer.id != id);
    }

    fn add_listener(&mut self, kind: ListenerKind) {
        *self.listeners.entry(kind).or_insert(0) += 1;
    }

    fn remove_listener(&mut self, kind: ListenerKind) {
        self.listeners.remove(&kind);
    }

    fn observe(&mut self, options: &ObserverOptions, targets: &[NodeId]) -> ObserverId {
        let id = ObserverId(self.next_id());
        self.observers.insert(
            id,
            Observation {
                options: options.clone(),
                targets: targets.to_vec(),
                reported: FxHashMap::default(),
            },
        );

        let entries = self.collect_entries(id, true);
        if !entries.is_empty() {
            self.events.push_back(Event::Intersection {
                observer: id,
                entries,
            });
        }
        id
    }

    fn disconnect(&mut self, id: ObserverId) {
        self.observers.shift_remove(&id);
    }

    fn watch_image(&mut self, image: NodeId) {
        match self.nodes.get(image).and_then(|n| n.image) {
            Some(ImageLoad::Loaded) => self.events.push_back(Event::ImageSettled {
                image,
                outcome: ImageOutcome::Loaded,
            }),
            // Already failed; no further error event will arrive
            Some(ImageLoad::Broken) => self.events.push_back(Event::ImageSettled {
                image,
                outcome: ImageOutcome::Failed,
            }),
            _ => {
                self.watched_images.insert(image);
            }
        }
    }
}

impl EventLoop for HeadlessPage {
    fn poll_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::image;

    fn page_with_section() -> (HeadlessPage, NodeId, NodeId) {
        let mut page = HeadlessPage::new(1000.0, 800.0);
        let body = page.body();
        let section = page.append(
            body,
            element("section")
                .class("parallax-section")
                .property("--speed", "0.4")
                .layout(0.0, 2000.0),
        );
        let layer = page.append(
            section,
            element("div")
                .class("parallax-image")
                .attr("data-parallax", "")
                .layout(1000.0, 400.0),
        );
        (page, section, layer)
    }

    #[test]
    fn test_query_all_in_document_order() {
        let (mut page, section, layer) = page_with_section();
        let second = page.append(section, element("div").attr("data-parallax", ""));
        let nested = page.append(layer, element("span").attr("data-parallax", ""));

        let selector = Selector::parse("[data-parallax]").unwrap();
        assert_eq!(page.query_all(&selector), vec![layer, nested, second]);

        page.detach(layer);
        assert_eq!(page.query_all(&selector), vec![second]);
    }

    #[test]
    fn test_closest_is_inclusive() {
        let (page, section, layer) = page_with_section();
        let sections = Selector::parse(".parallax-section").unwrap();
        assert_eq!(page.closest(layer, &sections), Some(section));
        assert_eq!(page.closest(section, &sections), Some(section));
        assert_eq!(page.closest(page.body(), &sections), None);
    }

    #[test]
    fn test_custom_properties_inherit() {
        let (mut page, section, layer) = page_with_section();
        assert_eq!(page.computed_property(layer, "--speed").as_deref(), Some("0.4"));

        page.set_property(section, "opacity", "0.5");
        assert_eq!(page.computed_property(layer, "opacity"), None);
    }

    #[test]
    fn test_geometry_includes_scroll_and_transform() {
        let (mut page, _, layer) = page_with_section();
        page.scroll_to(300.0);
        page.set_translate_y(layer, Some(-50.0));

        assert_eq!(page.bounding_top(layer).unwrap(), 650.0);
        assert_eq!(page.offset_height(layer).unwrap(), 400.0);
        assert_eq!(page.layout_flushes(), 1);

        page.set_layout_error(layer, true);
        assert!(matches!(
            page.bounding_top(layer),
            Err(PlatformError::Layout(_))
        ));

        page.detach(layer);
        assert_eq!(
            page.offset_height(layer),
            Err(PlatformError::NodeDetached(layer))
        );
    }

    #[test]
    fn test_events_require_listeners() {
        let (mut page, _, _) = page_with_section();
        page.scroll_to(10.0);
        page.resize(800.0, 600.0);
        assert_eq!(page.poll_event(), None);

        page.add_listener(ListenerKind::Scroll);
        page.add_listener(ListenerKind::Resize);
        page.scroll_by(10.0);
        page.resize(640.0, 480.0);
        assert_eq!(page.poll_event(), Some(Event::Scroll));
        assert_eq!(
            page.poll_event(),
            Some(Event::Resized {
                width: 640.0,
                height: 480.0
            })
        );
        assert_eq!(page.scroll_y(), 20.0);
    }

    #[test]
    fn test_timers_fire_in_deadline_order() {
        let mut page = HeadlessPage::new(100.0, 100.0);
        let late = page.set_timeout(Duration::from_millis(60));
        let early = page.set_timeout(Duration::from_millis(20));
        let cleared = page.set_timeout(Duration::from_millis(10));
        page.clear_timeout(cleared);

        page.tick_n(3);
        assert_eq!(page.poll_event(), Some(Event::Timer(early)));
        assert_eq!(page.poll_event(), None);

        page.tick();
        assert_eq!(page.poll_event(), Some(Event::Timer(late)));
        assert_eq!(page.pending_timers(), 0);
        assert_eq!(page.now(), Duration::from_millis(64));
    }

    #[test]
    fn test_custom_frame_interval() {
        let mut page =
            HeadlessPage::new(100.0, 100.0).with_frame_interval(Duration::from_millis(33));
        let timer = page.set_timeout(Duration::from_millis(50));

        page.tick();
        assert_eq!(page.poll_event(), None);
        page.tick();
        assert_eq!(page.now(), Duration::from_millis(66));
        assert_eq!(page.poll_event(), Some(Event::Timer(timer)));
    }

    #[test]
    fn test_frames_fire_once_on_next_tick() {
        let mut page = HeadlessPage::new(100.0, 100.0);
        let kept = page.request_animation_frame();
        let cancelled = page.request_animation_frame();
        page.cancel_animation_frame(cancelled);

        page.tick();
        assert_eq!(page.poll_event(), Some(Event::Frame(kept)));
        assert_eq!(page.poll_event(), None);
        assert_eq!(page.pending_frames(), 0);
    }

    #[test]
    fn test_observer_reports_initial_state_then_changes() {
        let (mut page, _, layer) = page_with_section();
        let observer = page.observe(&ObserverOptions::new(100.0, vec![0.0, 0.5, 1.0]), &[layer]);

        // Viewport 0..800 plus margin reaches 900; layer starts at 1000
        assert_eq!(
            page.poll_event(),
            Some(Event::Intersection {
                observer,
                entries: vec![IntersectionEntry::new(layer, false, 0.0)],
            })
        );

        page.scroll_to(5.0);
        assert_eq!(page.poll_event(), None);

        page.scroll_to(300.0);
        // root now 200..1200 -> 200 of 400 visible
        assert_eq!(
            page.poll_event(),
            Some(Event::Intersection {
                observer,
                entries: vec![IntersectionEntry::new(layer, true, 0.5)],
            })
        );

        page.disconnect(observer);
        page.scroll_to(0.0);
        assert_eq!(page.poll_event(), None);
    }

    #[test]
    fn test_image_settles_once() {
        let mut page = HeadlessPage::new(100.0, 100.0);
        let body = page.body();
        let pending = page.append(body, image(ImageLoad::Loading));
        let broken = page.append(body, image(ImageLoad::Broken));

        assert!(!page.image_complete(pending));
        assert!(!page.image_complete(broken));
        assert_eq!(page.images_within(body), vec![pending, broken]);

        page.watch_image(pending);
        page.watch_image(broken);
        assert_eq!(
            page.poll_event(),
            Some(Event::ImageSettled {
                image: broken,
                outcome: ImageOutcome::Failed
            })
        );

        page.finish_image(pending, ImageOutcome::Loaded);
        page.finish_image(pending, ImageOutcome::Loaded);
        assert_eq!(
            page.poll_event(),
            Some(Event::ImageSettled {
                image: pending,
                outcome: ImageOutcome::Loaded
            })
        );
        assert_eq!(page.poll_event(), None);
        assert!(page.image_complete(pending));
    }

    #[test]
    fn test_write_cost_advances_clock() {
        let (page, _, layer) = page_with_section();
        let mut page = page.with_write_cost(Duration::from_millis(5));
        page.set_translate_y(layer, None);
        assert_eq!(page.now(), Duration::ZERO);
        page.set_translate_y(layer, Some(3.0));
        assert_eq!(page.now(), Duration::from_millis(5));
        assert_eq!(page.transform_writes(), 1);
    }
}
