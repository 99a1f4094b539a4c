//! Lifecycle management
//!
//! [`ParallaxController`] owns every piece of engine state and is the only
//! thing a host talks to: it calls [`initialize`](ParallaxController::initialize)
//! once, feeds every platform event to
//! [`handle_event`](ParallaxController::handle_event) (or lets
//! [`pump`](ParallaxController::pump) drain its queue), and calls
//! [`destroy`](ParallaxController::destroy) on teardown.
//!
//! Initialization order: wait for section images (loaded or failed) →
//! measure → observe → bind listeners → place elements with one pass.

use parallax_platform::{Event, EventLoop, Host, ListenerKind, NodeId, ObserverId};
use rustc_hash::FxHashSet;

use crate::config::ParallaxConfig;
use crate::engine::{self, ParallaxEngine, PassReport};
use crate::error::Result;
use crate::geometry::{GeometryExtractor, TrackedElement};
use crate::scheduler::{Debouncer, FrameScheduler, Schedule, ScrollPhase};
use crate::visibility::VisibilityTracker;

/// Where the controller is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Never initialized, or the document had no sections
    #[default]
    Uninitialized,
    /// Waiting for section images to settle
    AwaitingImages,
    /// Measured, observing and listening
    Running,
    /// Torn down; may be initialized again
    Destroyed,
}

/// Scroll-synchronized parallax for one document
pub struct ParallaxController {
    config: ParallaxConfig,
    extractor: GeometryExtractor,
    engine: ParallaxEngine,
    visibility: VisibilityTracker,
    scheduler: FrameScheduler,
    resize: Debouncer,
    elements: Vec<TrackedElement>,
    pending_images: FxHashSet<NodeId>,
    phase: LifecyclePhase,
    measurements: usize,
    last_pass: Option<PassReport>,
}

impl ParallaxController {
    /// Create a controller; fails if the configuration is invalid
    pub fn new(config: ParallaxConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            extractor: GeometryExtractor::new(&config)?,
            engine: ParallaxEngine::new(config.budget()),
            visibility: VisibilityTracker::new(),
            scheduler: FrameScheduler::new(config.settle_window()),
            resize: Debouncer::new(config.debounce_window()),
            elements: Vec::new(),
            pending_images: FxHashSet::default(),
            phase: LifecyclePhase::Uninitialized,
            measurements: 0,
            last_pass: None,
            config,
        })
    }

    pub fn config(&self) -> &ParallaxConfig {
        &self.config
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn scroll_phase(&self) -> ScrollPhase {
        self.scheduler.phase()
    }

    /// Elements from the most recent measurement
    pub fn elements(&self) -> &[TrackedElement] {
        &self.elements
    }

    /// Number of measurement passes run so far
    pub fn measurements(&self) -> usize {
        self.measurements
    }

    /// Report of the most recent engine pass
    pub fn last_pass(&self) -> Option<&PassReport> {
        self.last_pass.as_ref()
    }

    /// Current visibility subscription
    pub fn observer(&self) -> Option<ObserverId> {
        self.visibility.observer()
    }

    /// Whether an animation frame is outstanding
    pub fn is_animating(&self) -> bool {
        self.scheduler.pending_frame().is_some()
    }

    /// Start the effect
    ///
    /// Does nothing if the document has no section containers, and warns
    /// without side effects if the controller is already initializing or
    /// running.
    pub fn initialize<H: Host + ?Sized>(&mut self, host: &mut H) -> LifecyclePhase {
        if matches!(
            self.phase,
            LifecyclePhase::AwaitingImages | LifecyclePhase::Running
        ) {
            tracing::warn!("parallax already initialized ({:?}); ignoring", self.phase);
            return self.phase;
        }

        let Ok(section_selector) = self.config.section() else {
            return self.phase;
        };
        let sections = host.query_all(&section_selector);
        if sections.is_empty() {
            tracing::debug!("no {} sections; parallax stays idle", section_selector);
            return self.phase;
        }

        self.pending_images = sections
            .iter()
            .flat_map(|&section| host.images_within(section))
            .filter(|&image| !host.image_complete(image))
            .collect();

        if self.pending_images.is_empty() {
            self.start(host);
        } else {
            tracing::debug!("waiting for {} images", self.pending_images.len());
            let images: Vec<NodeId> = self.pending_images.iter().copied().collect();
            for image in images {
                host.watch_image(image);
            }
            self.phase = LifecyclePhase::AwaitingImages;
        }

        self.phase
    }

    /// Stop the effect and release every subscription, timer and frame request
    pub fn destroy<H: Host + ?Sized>(&mut self, host: &mut H) {
        host.remove_listener(ListenerKind::Resize);
        host.remove_listener(ListenerKind::Scroll);
        self.resize.cancel(host);
        self.scheduler.cancel(host);
        self.visibility.disconnect(host);
        self.pending_images.clear();
        self.elements.clear();
        self.last_pass = None;

        tracing::debug!("parallax destroyed");
        self.phase = LifecyclePhase::Destroyed;
    }

    /// Handle one platform event
    pub fn handle_event<H: Host + ?Sized>(&mut self, host: &mut H, event: Event) {
        match (self.phase, event) {
            (LifecyclePhase::AwaitingImages, Event::ImageSettled { image, outcome }) => {
                if self.pending_images.remove(&image) {
                    tracing::trace!("image {:?} settled: {:?}", image, outcome);
                }
                if self.pending_images.is_empty() {
                    self.start(host);
                }
            }
            (LifecyclePhase::Running, Event::Scroll) => match self.scheduler.on_scroll(host) {
                Schedule::RunPass => self.run_pass(host),
                Schedule::WakeIfVisible => {
                    self.visibility.apply(&mut self.elements);
                    // Movement is irrelevant here, only which elements contribute
                    if engine::plan(&self.elements, 0.0).any_visible {
                        tracing::debug!("element back in view; waking frame loop");
                        self.run_pass(host);
                    }
                }
                Schedule::Skip => {}
            },
            (LifecyclePhase::Running, Event::Resized { .. }) => {
                self.resize.restart(host);
            }
            (LifecyclePhase::Running, Event::Timer(id)) => {
                if self.resize.fire(id) {
                    tracing::debug!("resize settled; re-measuring");
                    self.remeasure(host);
                } else {
                    self.scheduler.on_timer(host, id);
                }
            }
            (LifecyclePhase::Running, Event::Frame(id)) => {
                if self.scheduler.on_frame(id) == Schedule::RunPass {
                    self.run_pass(host);
                }
            }
            (LifecyclePhase::Running, Event::Intersection { observer, entries }) => {
                self.visibility.post(observer, &entries);
            }
            (phase, event) => {
                tracing::trace!("ignoring {:?} while {:?}", event, phase);
            }
        }
    }

    /// Drain the host's event queue; returns the number of events handled
    pub fn pump<H: Host + EventLoop + ?Sized>(&mut self, host: &mut H) -> usize {
        let mut handled = 0;
        while let Some(event) = host.poll_event() {
            self.handle_event(host, event);
            handled += 1;
        }
        handled
    }

    fn start<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.remeasure(host);
        host.add_listener(ListenerKind::Scroll);
        host.add_listener(ListenerKind::Resize);
        self.phase = LifecyclePhase::Running;
        tracing::debug!("parallax running with {} elements", self.elements.len());

        self.run_pass(host);
    }

    /// Rebuild the tracked set from scratch and re-subscribe visibility
    fn remeasure<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.elements = self.extractor.measure(host);
        self.measurements += 1;
        self.visibility
            .observe(host, &self.config.observer_options(), &self.elements);
    }

    fn run_pass<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.visibility.apply(&mut self.elements);

        if self.elements.is_empty() {
            self.scheduler.finish_pass(host, false);
            return;
        }

        let report = self.engine.run(host, &self.elements);
        self.scheduler.finish_pass(host, report.any_visible);
        self.last_pass = Some(report);
    }
}

impl std::fmt::Debug for ParallaxController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallaxController")
            .field("phase", &self.phase)
            .field("scroll_phase", &self.scheduler.phase())
            .field("elements", &self.elements.len())
            .field("measurements", &self.measurements)
            .finish()
    }
}
