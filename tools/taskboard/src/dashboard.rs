//! The render loop: polls snapshots, drives the animation timers and hands
//! every changed frame to the terminal.

use crate::animation::{AnimatedNumber, AnimationScheduler};
use crate::config::AppConfig;
use crate::errors::TaskboardError;
use crate::hotkeys::{action_for_input, HotkeyAction};
use crate::logging::{structured_fallback_line, JsonlLogger, LogEvent};
use crate::runtime::{epoch_millis, Clock, KeyInput, ScreenGuard, Terminal};
use crate::snapshot::SnapshotSource;
use crate::theme::Theme;
use crate::tui::{render_frame, RenderContext};
use crate::types::{DisplayState, Geometry};
use serde_json::json;
use std::time::Duration;

/// Frame pacing while the completed count is still easing.
pub const NUMBER_FRAME_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    Complete,
    FrameLimit,
}

impl ExitReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Complete => "complete",
            Self::FrameLimit => "frame_limit",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DashboardOptions {
    /// Stop after this many frames (or fallback lines).
    pub max_frames: Option<usize>,
    /// Render at a fixed size instead of asking the terminal.
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSummary {
    pub frames_drawn: usize,
    pub snapshots_applied: usize,
    pub snapshots_rejected: usize,
    pub exit_reason: ExitReason,
}

pub struct Dashboard<'a> {
    cfg: &'a AppConfig,
    clock: &'a dyn Clock,
    terminal: &'a dyn Terminal,
    logger: Option<JsonlLogger>,
    theme: Theme,
}

#[derive(Default)]
struct Counters {
    frames: usize,
    applied: usize,
    rejected: usize,
}

impl<'a> Dashboard<'a> {
    pub fn new(cfg: &'a AppConfig, clock: &'a dyn Clock, terminal: &'a dyn Terminal) -> Self {
        let logger = cfg.logging.path.as_ref().map(|path| {
            let mut logger = JsonlLogger::new(path);
            logger.max_payload_bytes = cfg.logging.max_payload_bytes;
            logger
        });
        let theme = if cfg.display.monochrome {
            Theme::monochrome()
        } else {
            Theme::default()
        };
        Self {
            cfg,
            clock,
            terminal,
            logger,
            theme,
        }
    }

    pub fn run(
        &self,
        source: &mut dyn SnapshotSource,
        options: &DashboardOptions,
    ) -> Result<DashboardSummary, TaskboardError> {
        let interactive = self.terminal.stdin_is_tty();
        self.log(
            "info",
            "dashboard_started",
            json!({ "interactive": interactive, "max_frames": options.max_frames }),
        )?;
        let summary = if interactive {
            self.run_interactive(source, options)?
        } else {
            self.run_fallback(source, options)?
        };
        self.log(
            "info",
            "dashboard_stopped",
            json!({
                "frames_drawn": summary.frames_drawn,
                "snapshots_applied": summary.snapshots_applied,
                "snapshots_rejected": summary.snapshots_rejected,
                "exit_reason": summary.exit_reason.as_str(),
            }),
        )?;
        Ok(summary)
    }

    fn run_interactive(
        &self,
        source: &mut dyn SnapshotSource,
        options: &DashboardOptions,
    ) -> Result<DashboardSummary, TaskboardError> {
        let start = self.clock.now();
        let _screen = ScreenGuard::acquire(self.terminal)?;
        let mut scheduler = AnimationScheduler::new(&self.cfg.animation);
        let mut animation = scheduler.mount(start);
        let mut completed = AnimatedNumber::new(
            0.0,
            start,
            Duration::from_millis(self.cfg.animation.number_animation_ms),
        );
        let poll_interval = Duration::from_millis(self.cfg.snapshot.poll_interval_ms);

        let mut state = DisplayState::default();
        let mut counters = Counters::default();
        let mut next_poll = start;
        let mut last_geometry: Option<Geometry> = None;
        let mut last_completed: Option<usize> = None;
        let mut dirty = true;

        let exit_reason = loop {
            let now = self.clock.now();
            if now >= next_poll {
                if let Some(next) = self.poll_source(source, &mut counters)? {
                    state = next;
                    dirty = true;
                    animation.set_spinner_enabled(state.running, now);
                    animation.set_cursor_enabled(state.queue_input_active, now);
                    completed.retarget(state.completed_count() as f64, now);
                }
                next_poll = now + poll_interval;
            }
            dirty |= animation.advance(now);

            let geometry = match options.geometry {
                Some(geometry) => geometry,
                None => self.terminal.size()?,
            };
            dirty |= last_geometry != Some(geometry);
            let shown = completed.value_at(now).round() as usize;
            dirty |= last_completed != Some(shown);

            if dirty {
                let ctx = RenderContext {
                    geometry,
                    phase: animation.phase(),
                    now_ms: epoch_millis(now),
                    theme: &self.theme,
                    bar_width: self.cfg.display.bar_width,
                    message_history: self.cfg.display.message_history,
                    displayed_completed: Some(shown),
                };
                self.terminal.draw(&render_frame(&state, &ctx))?;
                counters.frames += 1;
                last_geometry = Some(geometry);
                last_completed = Some(shown);
                dirty = false;
            }

            if self.cfg.display.exit_on_complete && state.complete && completed.is_settled(now) {
                break ExitReason::Complete;
            }
            if options.max_frames.is_some_and(|max| counters.frames >= max) {
                break ExitReason::FrameLimit;
            }

            let mut wake = next_poll;
            if let Some(deadline) = animation.next_deadline() {
                wake = wake.min(deadline);
            }
            if !completed.is_settled(now) {
                wake = wake.min(now + NUMBER_FRAME_INTERVAL);
            }
            let timeout = wake.duration_since(now).unwrap_or(Duration::ZERO);
            match self.terminal.poll_key(timeout)? {
                Some(input) if action_for_input(input) == Some(HotkeyAction::Quit) => {
                    break ExitReason::Quit;
                }
                Some(KeyInput::Resize) => dirty = true,
                Some(_) => {}
                None => self.clock.sleep_until(wake)?,
            }
        };

        Ok(DashboardSummary {
            frames_drawn: counters.frames,
            snapshots_applied: counters.applied,
            snapshots_rejected: counters.rejected,
            exit_reason,
        })
    }

    /// Non-interactive output: one structured line per applied snapshot.
    fn run_fallback(
        &self,
        source: &mut dyn SnapshotSource,
        options: &DashboardOptions,
    ) -> Result<DashboardSummary, TaskboardError> {
        let poll_interval = Duration::from_millis(self.cfg.snapshot.poll_interval_ms);
        let mut counters = Counters::default();
        let exit_reason = loop {
            if let Some(state) = self.poll_source(source, &mut counters)? {
                self.terminal.write_line(&fallback_line(&state))?;
                counters.frames += 1;
                if self.cfg.display.exit_on_complete && state.complete {
                    break ExitReason::Complete;
                }
            }
            if options.max_frames.is_some_and(|max| counters.frames >= max) {
                break ExitReason::FrameLimit;
            }
            let now = self.clock.now();
            self.clock.sleep_until(now + poll_interval)?;
        };
        Ok(DashboardSummary {
            frames_drawn: counters.frames,
            snapshots_applied: counters.applied,
            snapshots_rejected: counters.rejected,
            exit_reason,
        })
    }

    /// A rejected snapshot is logged and the previous one stays on screen.
    fn poll_source(
        &self,
        source: &mut dyn SnapshotSource,
        counters: &mut Counters,
    ) -> Result<Option<DisplayState>, TaskboardError> {
        match source.poll() {
            Ok(Some(state)) => {
                counters.applied += 1;
                Ok(Some(state))
            }
            Ok(None) => Ok(None),
            Err(error) => {
                counters.rejected += 1;
                self.log("warn", "snapshot_rejected", json!({ "error": error.to_string() }))?;
                Ok(None)
            }
        }
    }

    fn log(
        &self,
        level: &str,
        event_type: &str,
        payload: serde_json::Value,
    ) -> Result<(), TaskboardError> {
        let Some(logger) = &self.logger else {
            return Ok(());
        };
        logger.append(&LogEvent {
            ts_ms: epoch_millis(self.clock.now()),
            level,
            event_type,
            payload,
        })
    }
}

pub fn fallback_line(state: &DisplayState) -> String {
    let status = if state.error.is_some() {
        "error"
    } else if state.complete {
        "complete"
    } else if state.running {
        "running"
    } else {
        "waiting"
    };
    let mut message = format!(
        "{}/{} stories",
        state.completed_count(),
        state.stories.len()
    );
    if let Some(story) = &state.current_story {
        message.push_str(&format!(" current={}", story.id));
    }
    if let Some(error) = &state.error {
        message.push_str(&format!(" error={error}"));
    }
    structured_fallback_line(&state.feature_name, status, &message)
}
