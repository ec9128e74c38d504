//! Animation clock for the dashboard.
//!
//! Timers are deadlines on an injected clock, so the dashboard loop can
//! sleep until the next one is due and advance every animation in the same
//! step as the render that follows. Nothing here looks at the display state;
//! the loop only tells the scheduler which animations are currently wanted.

use crate::config::AnimationConfig;
use std::ops::{Deref, DerefMut};
use std::time::{Duration, SystemTime};

pub const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
pub const PENDING_GLYPH: &str = "◌";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationPhase {
    pub spinner_frame: usize,
    pub pulse_on: bool,
    pub cursor_visible: bool,
}

impl Default for AnimationPhase {
    fn default() -> Self {
        Self {
            spinner_frame: 0,
            pulse_on: true,
            cursor_visible: true,
        }
    }
}

impl AnimationPhase {
    /// Spinner glyph while `running`, the static pending glyph otherwise.
    pub fn activity_glyph(&self, running: bool) -> &'static str {
        if running {
            SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
        } else {
            PENDING_GLYPH
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    Spinner,
    Pulse,
    Cursor,
}

#[derive(Debug, Clone)]
struct Timer {
    kind: TimerKind,
    interval: Duration,
    next_due: Option<SystemTime>,
    enabled: bool,
}

impl Timer {
    fn new(kind: TimerKind, interval: Duration) -> Self {
        Self {
            kind,
            interval: interval.max(Duration::from_millis(1)),
            next_due: None,
            enabled: true,
        }
    }

    /// Number of whole intervals that elapsed up to `now`, rescheduling past them.
    fn fire(&mut self, now: SystemTime) -> u64 {
        let Some(due) = self.next_due else {
            return 0;
        };
        if !self.enabled || now < due {
            return 0;
        }
        let late = now.duration_since(due).unwrap_or(Duration::ZERO);
        let missed = (late.as_nanos() / self.interval.as_nanos()) as u64;
        let fired = missed + 1;
        self.next_due = Some(due + self.interval * u32::try_from(fired).unwrap_or(u32::MAX));
        fired
    }
}

pub struct AnimationScheduler {
    timers: Vec<Timer>,
    phase: AnimationPhase,
    started: bool,
}

impl AnimationScheduler {
    pub fn new(config: &AnimationConfig) -> Self {
        Self {
            timers: vec![
                Timer::new(TimerKind::Spinner, Duration::from_millis(config.spinner_interval_ms)),
                Timer::new(TimerKind::Pulse, Duration::from_millis(config.pulse_interval_ms)),
                Timer::new(TimerKind::Cursor, Duration::from_millis(config.cursor_blink_ms)),
            ],
            phase: AnimationPhase::default(),
            started: false,
        }
    }

    /// Starts every timer and returns a guard that stops them again when it
    /// goes out of scope.
    pub fn mount(&mut self, now: SystemTime) -> AnimationGuard<'_> {
        self.start(now);
        AnimationGuard { scheduler: self }
    }

    pub fn start(&mut self, now: SystemTime) {
        for timer in &mut self.timers {
            timer.next_due = Some(now + timer.interval);
        }
        self.started = true;
    }

    pub fn stop(&mut self) {
        for timer in &mut self.timers {
            timer.next_due = None;
        }
        self.started = false;
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    /// The spinner only turns while work is running; otherwise it is parked on
    /// its first frame and the render shows the pending glyph.
    pub fn set_spinner_enabled(&mut self, enabled: bool, now: SystemTime) {
        if !enabled {
            self.phase.spinner_frame = 0;
        }
        self.set_enabled(TimerKind::Spinner, enabled, now);
    }

    /// The cursor only blinks while queue input is being edited.
    pub fn set_cursor_enabled(&mut self, enabled: bool, now: SystemTime) {
        if !enabled {
            self.phase.cursor_visible = true;
        }
        self.set_enabled(TimerKind::Cursor, enabled, now);
    }

    fn set_enabled(&mut self, kind: TimerKind, enabled: bool, now: SystemTime) {
        for timer in self.timers.iter_mut().filter(|timer| timer.kind == kind) {
            if enabled && !timer.enabled {
                // No burst of catch-up ticks for the time spent disabled.
                timer.next_due = timer.next_due.map(|_| now + timer.interval);
            }
            timer.enabled = enabled;
        }
    }

    pub fn next_deadline(&self) -> Option<SystemTime> {
        self.timers
            .iter()
            .filter(|timer| timer.enabled)
            .filter_map(|timer| timer.next_due)
            .min()
    }

    /// Fires every due timer. Returns whether the phase changed.
    pub fn advance(&mut self, now: SystemTime) -> bool {
        let before = self.phase;
        for timer in &mut self.timers {
            let fired = timer.fire(now);
            if fired == 0 {
                continue;
            }
            match timer.kind {
                TimerKind::Spinner => {
                    let steps = (fired % SPINNER_FRAMES.len() as u64) as usize;
                    self.phase.spinner_frame =
                        (self.phase.spinner_frame + steps) % SPINNER_FRAMES.len();
                }
                TimerKind::Pulse => {
                    if fired % 2 == 1 {
                        self.phase.pulse_on = !self.phase.pulse_on;
                    }
                }
                TimerKind::Cursor => {
                    if fired % 2 == 1 {
                        self.phase.cursor_visible = !self.phase.cursor_visible;
                    }
                }
            }
        }
        self.phase != before
    }
}

pub struct AnimationGuard<'a> {
    scheduler: &'a mut AnimationScheduler,
}

impl Deref for AnimationGuard<'_> {
    type Target = AnimationScheduler;

    fn deref(&self) -> &Self::Target {
        self.scheduler
    }
}

impl DerefMut for AnimationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.scheduler
    }
}

impl Drop for AnimationGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.stop();
    }
}

/// A number that eases linearly toward its target instead of jumping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimatedNumber {
    from: f64,
    to: f64,
    started_at: SystemTime,
    duration: Duration,
}

impl AnimatedNumber {
    pub fn new(value: f64, now: SystemTime, duration: Duration) -> Self {
        Self {
            from: value,
            to: value,
            started_at: now,
            duration,
        }
    }

    pub fn target(&self) -> f64 {
        self.to
    }

    pub fn value_at(&self, now: SystemTime) -> f64 {
        if self.duration.is_zero() {
            return self.to;
        }
        let elapsed = now.duration_since(self.started_at).unwrap_or(Duration::ZERO);
        if elapsed >= self.duration {
            return self.to;
        }
        let progress = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        self.from + (self.to - self.from) * progress
    }

    pub fn is_settled(&self, now: SystemTime) -> bool {
        self.value_at(now) == self.to
    }

    /// Restarts the animation from whatever is on screen right now.
    pub fn retarget(&mut self, target: f64, now: SystemTime) {
        if target == self.to {
            return;
        }
        self.from = self.value_at(now);
        self.to = target;
        self.started_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::{AnimatedNumber, AnimationPhase, AnimationScheduler, PENDING_GLYPH, SPINNER_FRAMES};
    use crate::config::AnimationConfig;
    use std::time::{Duration, UNIX_EPOCH};

    fn config() -> AnimationConfig {
        AnimationConfig {
            spinner_interval_ms: 100,
            pulse_interval_ms: 500,
            cursor_blink_ms: 500,
            number_animation_ms: 400,
        }
    }

    #[test]
    fn spinner_advances_once_per_interval() {
        let mut scheduler = AnimationScheduler::new(&config());
        scheduler.start(UNIX_EPOCH);
        assert!(!scheduler.advance(UNIX_EPOCH + Duration::from_millis(99)));
        assert!(scheduler.advance(UNIX_EPOCH + Duration::from_millis(100)));
        assert_eq!(scheduler.phase().spinner_frame, 1);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(350));
        assert_eq!(scheduler.phase().spinner_frame, 3);
        assert_eq!(
            scheduler.next_deadline(),
            Some(UNIX_EPOCH + Duration::from_millis(400))
        );
    }

    #[test]
    fn pulse_and_cursor_toggle_on_their_interval() {
        let mut scheduler = AnimationScheduler::new(&config());
        scheduler.start(UNIX_EPOCH);
        let phase = scheduler.phase();
        assert!(phase.pulse_on && phase.cursor_visible);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(500));
        assert!(!scheduler.phase().pulse_on);
        assert!(!scheduler.phase().cursor_visible);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(1_000));
        assert!(scheduler.phase().pulse_on);
    }

    #[test]
    fn disabled_spinner_is_parked_and_not_scheduled() {
        let mut scheduler = AnimationScheduler::new(&config());
        scheduler.start(UNIX_EPOCH);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(200));
        scheduler.set_spinner_enabled(false, UNIX_EPOCH + Duration::from_millis(200));
        assert_eq!(scheduler.phase().spinner_frame, 0);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(400));
        assert_eq!(scheduler.phase().spinner_frame, 0);
        assert_eq!(scheduler.phase().activity_glyph(false), PENDING_GLYPH);

        scheduler.set_spinner_enabled(true, UNIX_EPOCH + Duration::from_millis(400));
        assert!(!scheduler.advance(UNIX_EPOCH + Duration::from_millis(450)));
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(500));
        assert_eq!(scheduler.phase().spinner_frame, 1);
    }

    #[test]
    fn disabled_cursor_stays_visible() {
        let mut scheduler = AnimationScheduler::new(&config());
        scheduler.start(UNIX_EPOCH);
        scheduler.set_cursor_enabled(false, UNIX_EPOCH);
        scheduler.advance(UNIX_EPOCH + Duration::from_millis(500));
        assert!(scheduler.phase().cursor_visible);
    }

    #[test]
    fn guard_stops_every_timer_on_drop() {
        let mut scheduler = AnimationScheduler::new(&config());
        {
            let guard = scheduler.mount(UNIX_EPOCH);
            assert!(guard.is_started());
            assert!(guard.next_deadline().is_some());
        }
        assert!(!scheduler.is_started());
        assert_eq!(scheduler.next_deadline(), None);
        assert!(!scheduler.advance(UNIX_EPOCH + Duration::from_secs(60)));
    }

    #[test]
    fn activity_glyph_cycles_through_frames() {
        let phase = AnimationPhase {
            spinner_frame: SPINNER_FRAMES.len() + 2,
            ..AnimationPhase::default()
        };
        assert_eq!(phase.activity_glyph(true), SPINNER_FRAMES[2]);
    }

    #[test]
    fn animated_number_interpolates_then_pins() {
        let duration = Duration::from_millis(400);
        let mut number = AnimatedNumber::new(0.0, UNIX_EPOCH, duration);
        number.retarget(4.0, UNIX_EPOCH);
        assert_eq!(number.value_at(UNIX_EPOCH), 0.0);
        assert_eq!(number.value_at(UNIX_EPOCH + Duration::from_millis(100)), 1.0);
        assert_eq!(number.value_at(UNIX_EPOCH + Duration::from_millis(200)), 2.0);
        assert_eq!(number.value_at(UNIX_EPOCH + Duration::from_millis(400)), 4.0);
        assert_eq!(number.value_at(UNIX_EPOCH + Duration::from_secs(9)), 4.0);
        assert!(number.is_settled(UNIX_EPOCH + Duration::from_millis(400)));
    }

    #[test]
    fn retarget_starts_from_the_displayed_value() {
        let duration = Duration::from_millis(400);
        let mut number = AnimatedNumber::new(0.0, UNIX_EPOCH, duration);
        number.retarget(4.0, UNIX_EPOCH);
        let midway = UNIX_EPOCH + Duration::from_millis(200);
        number.retarget(10.0, midway);
        assert_eq!(number.value_at(midway), 2.0);
        assert_eq!(number.value_at(midway + duration), 10.0);
        assert_eq!(number.target(), 10.0);
    }
}
