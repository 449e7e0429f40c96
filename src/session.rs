//! Session context: the UI state machine that ties sources, detector,
//! capture loop, and view together.
//!
//! A `Session` is an explicit context object; a process may hold several.
//! All user-facing failures flow through [`Session::report`], which logs the
//! error and raises the matching notice.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::capture::{CaptureLoop, LoopState, PassOutcome, StopHandle};
use crate::config::AppConfig;
use crate::detect::ModelGateway;
use crate::error::{notice_for, ObjectLensError};
use crate::render::{capture_snapshot, Canvas, InfoPanel};
use crate::source::{
    FrameSource, ImageSource, InputMode, VideoConfig, VideoSource, WebcamConfig, WebcamSource,
};
use crate::ui::{Notifier, Ui};
use crate::view::{ViewState, Widget};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub mode: InputMode,
    pub active: bool,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let activity = if self.active { "active" } else { "idle" };
        write!(f, "mode={} {}", self.mode, activity)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A loop is already running; nothing was changed.
    AlreadyActive,
}

pub struct Session {
    state: SessionState,
    view: ViewState,
    gateway: ModelGateway,
    capture: CaptureLoop,
    source: Option<Box<dyn FrameSource>>,
    image_file: Option<PathBuf>,
    video_file: Option<PathBuf>,
    canvas: Canvas,
    panel: InfoPanel,
    camera: WebcamConfig,
    snapshot_path: PathBuf,
    ui: Ui,
    notifier: Box<dyn Notifier>,
}

impl Session {
    pub fn new(
        config: &AppConfig,
        gateway: ModelGateway,
        ui: Ui,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let mode = InputMode::default();
        Self {
            state: SessionState {
                mode,
                active: false,
            },
            view: ViewState::idle(mode),
            gateway,
            capture: CaptureLoop::new(),
            source: None,
            image_file: None,
            video_file: None,
            canvas: Canvas::new(),
            panel: InfoPanel::default(),
            camera: config.camera.clone().into(),
            snapshot_path: config.snapshot_path.clone(),
            ui,
            notifier,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> InputMode {
        self.state.mode
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn panel(&self) -> &InfoPanel {
        &self.panel
    }

    pub fn gateway(&self) -> &ModelGateway {
        &self.gateway
    }

    pub fn loop_state(&self) -> LoopState {
        self.capture.state()
    }

    /// Capture runs started over the session's lifetime.
    pub fn loop_runs(&self) -> u64 {
        self.capture.runs()
    }

    /// Live media tracks held by the current source.
    pub fn active_tracks(&self) -> usize {
        self.source.as_ref().map_or(0, |source| source.active_tracks())
    }

    pub fn source_acquired(&self) -> bool {
        self.source.is_some()
    }

    /// Handle a signal handler can use to halt the loop.
    pub fn stop_handle(&self) -> StopHandle {
        self.capture.stop_handle()
    }

    pub fn chosen_file(&self, mode: InputMode) -> Option<&Path> {
        match mode {
            InputMode::Webcam => None,
            InputMode::Image => self.image_file.as_deref(),
            InputMode::Video => self.video_file.as_deref(),
        }
    }

    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// Switch input mode. Ignored while a loop is active; never acquires a source.
    pub fn select_mode(&mut self, mode: InputMode) -> bool {
        if self.state.active {
            log::warn!("mode change to {} ignored while detection is active", mode);
            return false;
        }
        self.state.mode = mode;
        self.view.select_picker(mode);
        log::debug!("input mode set to {}", mode);
        true
    }

    /// Record the file chosen in the current mode's picker.
    pub fn choose_file(&mut self, path: Option<PathBuf>) -> Result<()> {
        let mode = self.state.mode;
        let result: Result<()> = match path {
            Some(path) if !path.as_os_str().is_empty() => match mode {
                InputMode::Image => {
                    self.image_file = Some(path);
                    Ok(())
                }
                InputMode::Video => {
                    self.video_file = Some(path);
                    Ok(())
                }
                InputMode::Webcam => Err(ObjectLensError::InvalidInput(
                    "webcam mode does not take a file".to_string(),
                )
                .into()),
            },
            _ => Err(ObjectLensError::InvalidInput("no file selected".to_string()).into()),
        };
        if let Err(err) = &result {
            self.report(err);
        } else {
            log::info!("{} file selected", mode);
        }
        result
    }

    /// Load the model, acquire the source for the current mode, and start
    /// the capture loop.
    ///
    /// Any failure is reported, leaves the session idle with the pre-Start
    /// controls, and is returned.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.state.active || self.capture.state() != LoopState::Idle {
            log::warn!("start ignored: detection already active");
            return Ok(StartOutcome::AlreadyActive);
        }

        self.view.hide(Widget::InputSelection);
        self.view.show(Widget::LoadingIndicator);

        match self.acquire() {
            Ok(()) => {
                self.state.active = true;
                self.view.enter_running(self.state.mode);
                log::info!("detection started ({})", self.state.mode);
                Ok(StartOutcome::Started)
            }
            Err(err) => {
                self.report(&err);
                self.stop();
                Err(err)
            }
        }
    }

    fn acquire(&mut self) -> Result<()> {
        {
            let mut stage = self.ui.stage("Loading model");
            if let Err(err) = self.gateway.load() {
                stage.fail();
                return Err(err);
            }
        }

        if let Some(mut previous) = self.source.take() {
            previous.release();
        }
        let mut source = self.build_source()?;
        if let Err(err) = source.open() {
            source.release();
            return Err(err);
        }
        log::info!("Source: {}", source.describe());
        self.capture.start()?;
        self.source = Some(source);
        Ok(())
    }

    fn build_source(&self) -> Result<Box<dyn FrameSource>> {
        let source: Box<dyn FrameSource> = match self.state.mode {
            InputMode::Webcam => Box::new(WebcamSource::new(self.camera.clone())),
            InputMode::Image => Box::new(ImageSource::new(Some(self.require_file(InputMode::Image)?))),
            InputMode::Video => {
                let path = self.require_file(InputMode::Video)?;
                Box::new(VideoSource::new(VideoConfig {
                    path: path.to_string_lossy().into_owned(),
                }))
            }
        };
        Ok(source)
    }

    fn require_file(&self, mode: InputMode) -> Result<PathBuf> {
        self.chosen_file(mode).map(Path::to_path_buf).ok_or_else(|| {
            ObjectLensError::InvalidInput(format!("no {} file selected", mode)).into()
        })
    }

    /// Refresh callback: run one capture pass if a loop is active.
    pub fn on_refresh(&mut self) -> Result<PassOutcome> {
        if !self.state.active {
            return Ok(PassOutcome::Idle);
        }
        let Some(source) = self.source.as_deref_mut() else {
            return Ok(PassOutcome::Idle);
        };

        let result = self
            .capture
            .pass(source, &mut self.gateway, &mut self.canvas, &mut self.panel);
        match result {
            Ok(outcome) => {
                if let PassOutcome::Rendered { .. } = outcome {
                    self.view.show(Widget::OutputSurface);
                    self.view.set_visible(Widget::InfoPanel, self.panel.active);
                }
                if !self.capture.is_running() || self.capture.cancel_requested() {
                    self.stop();
                }
                Ok(outcome)
            }
            Err(err) => {
                self.report(&err);
                self.stop();
                Err(err)
            }
        }
    }

    /// Halt the loop, release the source, and restore the pre-Start layout.
    /// Safe to call at any time.
    pub fn stop(&mut self) {
        let was_active = self.state.active;
        self.capture.stop(self.source.as_deref_mut());
        self.source = None;
        self.state.active = false;
        self.canvas.hide();
        self.panel.deactivate();
        self.view.reset_to_idle();
        if was_active {
            log::info!("detection stopped");
        }
    }

    /// Export the displayed render as a PNG at the snapshot path.
    pub fn capture(&mut self) -> Result<PathBuf> {
        let result = capture_snapshot(&self.canvas, &self.snapshot_path);
        if let Err(err) = &result {
            self.report(err);
        }
        result
    }

    /// Log an error and raise its notice.
    pub fn report(&mut self, err: &anyhow::Error) {
        log::error!("{:#}", err);
        self.notifier.notify(notice_for(err));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(source) = self.source.as_mut() {
            source.release();
        }
    }
}
