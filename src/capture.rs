//! Capture loop controller.
//!
//! The loop never drives itself. A host calls [`CaptureLoop::pass`] from its
//! refresh callback; each call runs at most one sample → detect → render
//! pass, so passes for a source are strictly sequential. Continuous sources
//! ask to be rescheduled; an image source runs once and then idles until
//! stopped.
//!
//! Cancellation is cooperative through a [`StopHandle`]. The flag is checked
//! right before detection and right before asking for a reschedule. A pass
//! that is already detecting when the flag drops still renders its result
//! once, then the loop halts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};

use crate::detect::ModelGateway;
use crate::render::{render, update_summary, Canvas, InfoPanel};
use crate::source::FrameSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopping,
}

/// Shared "keep detecting" flag. Cloning shares the flag.
#[derive(Clone, Debug, Default)]
pub struct StopHandle {
    active: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn activate(&self) {
        self.active.store(true, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    /// A frame was rendered. `reschedule` is false for single-shot sources
    /// and for passes cancelled mid-flight.
    Rendered { detections: usize, reschedule: bool },
    /// Nothing to do: not running, or an image source already rendered.
    Idle,
    /// Cancellation was observed before detection; nothing was rendered.
    Halted,
}

pub struct CaptureLoop {
    state: LoopState,
    stop: StopHandle,
    single_pass_done: bool,
    passes: u64,
    runs: u64,
}

impl CaptureLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            stop: StopHandle::default(),
            single_pass_done: false,
            passes: 0,
            runs: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// True once the stop flag dropped, whoever dropped it.
    pub fn cancel_requested(&self) -> bool {
        !self.stop.is_active()
    }

    /// Rendered passes since the current run started.
    pub fn passes(&self) -> u64 {
        self.passes
    }

    /// Number of runs started over the loop's lifetime.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Idle → Running. Refuses to start a second, overlapping run.
    pub fn start(&mut self) -> Result<()> {
        if self.state != LoopState::Idle {
            return Err(anyhow!("capture loop already {:?}", self.state));
        }
        self.stop.activate();
        self.state = LoopState::Running;
        self.single_pass_done = false;
        self.passes = 0;
        self.runs += 1;
        log::debug!("capture loop run #{} started", self.runs);
        Ok(())
    }

    /// Run one pass against `source`.
    ///
    /// Errors from sampling or detection halt the loop before returning, so a
    /// failing source is never spun on.
    pub fn pass(
        &mut self,
        source: &mut (dyn FrameSource + '_),
        gateway: &mut ModelGateway,
        canvas: &mut Canvas,
        panel: &mut InfoPanel,
    ) -> Result<PassOutcome> {
        if self.state != LoopState::Running {
            return Ok(PassOutcome::Idle);
        }
        let continuous = source.mode().is_continuous();
        if !continuous && self.single_pass_done {
            return Ok(PassOutcome::Idle);
        }

        let frame = match source.current_frame() {
            Ok(frame) => frame,
            Err(err) => {
                self.halt();
                return Err(err);
            }
        };

        if !self.stop.is_active() {
            self.halt();
            return Ok(PassOutcome::Halted);
        }

        let detections = match gateway.detect(frame.view()) {
            Ok(detections) => detections,
            Err(err) => {
                self.halt();
                return Err(err);
            }
        };

        render(canvas, &frame, &detections);
        update_summary(panel, &detections);
        self.passes += 1;

        let reschedule = if continuous {
            self.stop.is_active()
        } else {
            self.single_pass_done = true;
            false
        };
        if continuous && !reschedule {
            self.halt();
        }

        Ok(PassOutcome::Rendered {
            detections: detections.len(),
            reschedule,
        })
    }

    /// Running → Stopping → Idle, releasing the source on the way.
    pub fn stop(&mut self, source: Option<&mut (dyn FrameSource + '_)>) {
        self.stop.stop();
        if self.state == LoopState::Running {
            self.state = LoopState::Stopping;
        }
        if let Some(source) = source {
            source.release();
        }
        if self.state != LoopState::Idle {
            log::debug!("capture loop stopped after {} passes", self.passes);
        }
        self.state = LoopState::Idle;
    }

    /// Stop requested from inside a pass; the owner releases the source.
    fn halt(&mut self) {
        self.stop.stop();
        self.state = LoopState::Stopping;
    }
}

impl Default for CaptureLoop {
    fn default() -> Self {
        Self::new()
    }
}

/// Paces refresh callbacks at a fixed rate, standing in for a display's
/// vsync. The wait happens between passes, never during one.
pub struct RefreshDriver {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl RefreshDriver {
    pub fn new(fps: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / fps.max(1),
            last_tick: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until the next refresh slot.
    pub fn wait_for_next(&mut self) {
        if let Some(last) = self.last_tick {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last_tick = Some(Instant::now());
    }
}
