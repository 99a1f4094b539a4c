//! Frame scheduling
//!
//! Decides when engine passes run. Scroll tracking is an explicit state
//! machine:
//!
//! ```text
//!            Scroll                 SettleElapsed
//!   Idle ───────────▶ ActiveLoop ─────────────────▶ CoolingDown
//!    ▲                  │  ▲ Scroll (restarts settle)     │
//!    │                  └──┘                              │
//!    └──────────────────────── Cooled ────────────────────┘
//! ```
//!
//! Independently of the phase, at most one animation frame request is
//! outstanding at any time. A pass reschedules itself only while some
//! tracked element is visible.

use std::time::Duration;

use parallax_platform::{FrameRequestId, TimerId, Window};

/// Scroll tracking phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScrollPhase {
    /// Not scrolling; the next scroll event runs a pass immediately
    #[default]
    Idle,
    /// Scroll events are arriving; the settle timer is armed
    ActiveLoop,
    /// Settle timer fired; pending frame work is being cancelled
    CoolingDown,
}

/// Inputs to the scroll phase machine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SchedulerEvent {
    /// A scroll event arrived
    Scroll,
    /// No scroll event for the settle window
    SettleElapsed,
    /// Outstanding frame work has been cancelled
    Cooled,
}

impl ScrollPhase {
    /// Transition table; `None` means the event leaves the phase unchanged
    pub fn on_event(&self, event: SchedulerEvent) -> Option<Self> {
        use SchedulerEvent::*;

        match (self, event) {
            // Idle -> ActiveLoop: first scroll after rest
            (ScrollPhase::Idle, Scroll) => Some(ScrollPhase::ActiveLoop),

            // ActiveLoop -> ActiveLoop: keep scrolling (no change)
            (ScrollPhase::ActiveLoop, Scroll) => None,

            // ActiveLoop -> CoolingDown: scrolling stopped
            (ScrollPhase::ActiveLoop, SettleElapsed) => Some(ScrollPhase::CoolingDown),

            // CoolingDown -> Idle: frame work cancelled
            (ScrollPhase::CoolingDown, Cooled) => Some(ScrollPhase::Idle),

            // CoolingDown -> ActiveLoop: scroll resumed before cooling finished
            (ScrollPhase::CoolingDown, Scroll) => Some(ScrollPhase::ActiveLoop),

            _ => None,
        }
    }

    /// Returns true while scroll events are considered in flight
    pub fn is_scrolling(&self) -> bool {
        !matches!(self, ScrollPhase::Idle)
    }
}

/// Trailing-edge timer: every `restart` pushes the deadline back
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    timer: Option<TimerId>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, timer: None }
    }

    /// Cancel the pending timer (if any) and arm a new one
    pub fn restart<W: Window + ?Sized>(&mut self, window: &mut W) {
        if let Some(timer) = self.timer.take() {
            window.clear_timeout(timer);
        }
        self.timer = Some(window.set_timeout(self.delay));
    }

    /// Consume a timer event; true if it is this debouncer's current timer
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.timer == Some(id) {
            self.timer = None;
            true
        } else {
            false
        }
    }

    pub fn cancel<W: Window + ?Sized>(&mut self, window: &mut W) {
        if let Some(timer) = self.timer.take() {
            window.clear_timeout(timer);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_some()
    }
}

/// What the controller should do after a scheduler input
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Schedule {
    /// Run an engine pass now
    RunPass,
    /// The loop is dormant; run a pass only if some element is visible
    WakeIfVisible,
    /// Nothing to do
    Skip,
}

/// Drives engine passes from scroll events and the frame clock
#[derive(Debug)]
pub struct FrameScheduler {
    phase: ScrollPhase,
    settle: Debouncer,
    frame: Option<FrameRequestId>,
}

impl FrameScheduler {
    pub fn new(settle_window: Duration) -> Self {
        Self {
            phase: ScrollPhase::Idle,
            settle: Debouncer::new(settle_window),
            frame: None,
        }
    }

    pub fn phase(&self) -> ScrollPhase {
        self.phase
    }

    /// Outstanding frame request, if the loop is running
    pub fn pending_frame(&self) -> Option<FrameRequestId> {
        self.frame
    }

    /// Handle a scroll event
    ///
    /// The first scroll after rest runs a pass immediately. Later scrolls only
    /// push the settle deadline back. If the loop went dormant because nothing
    /// was visible, the caller decides whether visibility has changed enough
    /// to wake it.
    pub fn on_scroll<W: Window + ?Sized>(&mut self, window: &mut W) -> Schedule {
        let schedule = match self.transition(SchedulerEvent::Scroll) {
            Some(_) => Schedule::RunPass,
            None if self.frame.is_none() => Schedule::WakeIfVisible,
            None => Schedule::Skip,
        };
        self.settle.restart(window);
        schedule
    }

    /// Handle a timer event; returns false if the timer is not ours
    pub fn on_timer<W: Window + ?Sized>(&mut self, window: &mut W, id: TimerId) -> bool {
        if !self.settle.fire(id) {
            return false;
        }
        self.transition(SchedulerEvent::SettleElapsed);
        if let Some(frame) = self.frame.take() {
            window.cancel_animation_frame(frame);
        }
        self.transition(SchedulerEvent::Cooled);
        true
    }

    /// Handle a frame event; stale or cancelled requests are skipped
    pub fn on_frame(&mut self, id: FrameRequestId) -> Schedule {
        if self.frame == Some(id) {
            self.frame = None;
            Schedule::RunPass
        } else {
            tracing::trace!("ignoring stale frame {:?}", id);
            Schedule::Skip
        }
    }

    /// Called after every pass: keep the loop alive only while something is visible
    pub fn finish_pass<W: Window + ?Sized>(&mut self, window: &mut W, any_visible: bool) {
        if let Some(frame) = self.frame.take() {
            window.cancel_animation_frame(frame);
        }
        if any_visible {
            self.frame = Some(window.request_animation_frame());
        }
    }

    /// Cancel all timers and frame work and return to rest
    pub fn cancel<W: Window + ?Sized>(&mut self, window: &mut W) {
        self.settle.cancel(window);
        if let Some(frame) = self.frame.take() {
            window.cancel_animation_frame(frame);
        }
        self.phase = ScrollPhase::Idle;
    }

    fn transition(&mut self, event: SchedulerEvent) -> Option<ScrollPhase> {
        let next = self.phase.on_event(event)?;
        tracing::debug!("scroll phase {:?} -> {:?} on {:?}", self.phase, next, event);
        self.phase = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_transitions() {
        use SchedulerEvent::*;

        assert_eq!(
            ScrollPhase::Idle.on_event(Scroll),
            Some(ScrollPhase::ActiveLoop)
        );
        assert_eq!(ScrollPhase::ActiveLoop.on_event(Scroll), None);
        assert_eq!(
            ScrollPhase::ActiveLoop.on_event(SettleElapsed),
            Some(ScrollPhase::CoolingDown)
        );
        assert_eq!(
            ScrollPhase::CoolingDown.on_event(Cooled),
            Some(ScrollPhase::Idle)
        );
        assert_eq!(ScrollPhase::Idle.on_event(SettleElapsed), None);
        assert_eq!(ScrollPhase::Idle.on_event(Cooled), None);
    }

    #[test]
    fn test_is_scrolling() {
        assert!(!ScrollPhase::Idle.is_scrolling());
        assert!(ScrollPhase::ActiveLoop.is_scrolling());
        assert!(ScrollPhase::CoolingDown.is_scrolling());
    }

    #[test]
    fn test_default_phase() {
        assert_eq!(ScrollPhase::default(), ScrollPhase::Idle);
    }

    use parallax_platform::{Event, EventLoop};
    use parallax_platform_headless::HeadlessPage;

    #[test]
    fn test_debouncer_only_last_restart_fires() {
        let mut page = HeadlessPage::new(800.0, 600.0);
        let mut debouncer = Debouncer::new(Duration::from_millis(50));

        for _ in 0..5 {
            debouncer.restart(&mut page);
            page.tick();
        }
        assert_eq!(page.pending_timers(), 1);
        assert!(page.poll_event().is_none());

        page.tick_n(4);
        let Some(Event::Timer(id)) = page.poll_event() else {
            panic!("debounced timer should have fired");
        };
        assert!(debouncer.fire(id));
        assert!(!debouncer.fire(id));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_first_scroll_runs_pass_then_settles() {
        let mut page = HeadlessPage::new(800.0, 600.0);
        let mut scheduler = FrameScheduler::new(Duration::from_millis(150));

        assert_eq!(scheduler.on_scroll(&mut page), Schedule::RunPass);
        assert_eq!(scheduler.phase(), ScrollPhase::ActiveLoop);
        scheduler.finish_pass(&mut page, true);
        assert!(scheduler.pending_frame().is_some());

        // Loop is running, so further scrolls only restart the settle timer
        assert_eq!(scheduler.on_scroll(&mut page), Schedule::Skip);
        assert_eq!(page.pending_timers(), 1);

        page.tick_n(10);
        let mut settled = false;
        while let Some(event) = page.poll_event() {
            match event {
                Event::Timer(id) => settled |= scheduler.on_timer(&mut page, id),
                Event::Frame(id) => {
                    if scheduler.on_frame(id) == Schedule::RunPass {
                        scheduler.finish_pass(&mut page, true);
                    }
                }
                _ => {}
            }
        }

        assert!(settled);
        assert_eq!(scheduler.phase(), ScrollPhase::Idle);
        assert_eq!(scheduler.pending_frame(), None);
        assert_eq!(page.pending_frames(), 0);
    }

    #[test]
    fn test_dormant_loop_defers_wake_to_caller() {
        let mut page = HeadlessPage::new(800.0, 600.0);
        let mut scheduler = FrameScheduler::new(Duration::from_millis(150));

        assert_eq!(scheduler.on_scroll(&mut page), Schedule::RunPass);
        scheduler.finish_pass(&mut page, false);
        assert_eq!(scheduler.pending_frame(), None);

        for _ in 0..3 {
            assert_eq!(scheduler.on_scroll(&mut page), Schedule::WakeIfVisible);
        }
        assert_eq!(scheduler.phase(), ScrollPhase::ActiveLoop);
        assert_eq!(page.pending_timers(), 1);

        scheduler.finish_pass(&mut page, true);
        assert_eq!(scheduler.on_scroll(&mut page), Schedule::Skip);
    }

    #[test]
    fn test_finish_pass_keeps_single_request() {
        let mut page = HeadlessPage::new(800.0, 600.0);
        let mut scheduler = FrameScheduler::new(Duration::from_millis(150));

        scheduler.finish_pass(&mut page, true);
        scheduler.finish_pass(&mut page, true);
        assert_eq!(page.pending_frames(), 1);

        let stale = FrameRequestId(9999);
        assert_eq!(scheduler.on_frame(stale), Schedule::Skip);

        scheduler.cancel(&mut page);
        assert_eq!(page.pending_frames(), 0);
        assert_eq!(scheduler.phase(), ScrollPhase::Idle);
    }
}
