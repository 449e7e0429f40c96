//! objectlens
//!
//! Drives an object detector over webcam, image, or video input and draws
//! labelled bounding boxes onto an output surface.
//!
//! # Architecture
//!
//! A [`Session`] owns everything one viewer needs:
//!
//! 1. **Source**: a [`FrameSource`] for the selected input mode.
//! 2. **Gateway**: a lazily loaded detector backend ([`ModelGateway`]).
//! 3. **Loop**: a [`CaptureLoop`] ticked by the host's refresh callback.
//! 4. **Surface**: a raster [`Canvas`] plus the summary [`InfoPanel`].
//! 5. **View**: widget visibility and control enablement ([`ViewState`]).
//!
//! # Module Structure
//!
//! - `source`: webcam, still image, and video inputs
//! - `detect`: detector backends, registry, and the model gateway
//! - `capture`: loop controller, stop handle, refresh pacing
//! - `render`: box/label drawing, summary panel, PNG snapshots
//! - `session` / `view`: the UI state machine
//! - `config`, `error`, `ui`: configuration, error taxonomy, terminal feedback

pub mod capture;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod host;
pub mod render;
pub mod session;
pub mod source;
pub mod ui;
pub mod view;

pub use capture::{CaptureLoop, LoopState, PassOutcome, RefreshDriver, StopHandle};
pub use config::{AppConfig, CameraSettings, ModelSettings};
pub use detect::{BackendRegistry, BoundingBox, Detection, DetectorBackend, ModelGateway};
pub use error::{classify, notice_for, ObjectLensError};
pub use frame::{Frame, FrameView};
pub use host::{run_interactive, run_session, run_ticks, HostEvent, Inbox, TickEnd, TickReport};
pub use render::{capture_snapshot, render, update_summary, Canvas, DrawSurface, InfoPanel};
pub use session::{Session, SessionState, StartOutcome};
pub use source::{FrameSource, ImageSource, InputMode, VideoSource, WebcamConfig, WebcamSource};
pub use ui::{Notifier, RecordingNotifier, StderrNotifier, Ui, UiMode};
pub use view::{Control, ViewState, Widget};
