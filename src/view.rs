//! Widget visibility and control enablement.
//!
//! `ViewState` is the host-independent picture of the screen: which panels
//! are shown and which buttons accept input. The session mutates it on every
//! transition; a host renders it however it likes.

use std::collections::BTreeSet;
use std::fmt;

use crate::source::InputMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Widget {
    InputSelection,
    ImagePicker,
    VideoPicker,
    WebcamView,
    ImageView,
    VideoView,
    OutputSurface,
    InfoPanel,
    LoadingIndicator,
}

impl Widget {
    /// The widget that displays a given input mode's media.
    pub fn media_view(mode: InputMode) -> Widget {
        match mode {
            InputMode::Webcam => Widget::WebcamView,
            InputMode::Image => Widget::ImageView,
            InputMode::Video => Widget::VideoView,
        }
    }

    /// The file picker for a mode, if it has one.
    pub fn picker(mode: InputMode) -> Option<Widget> {
        match mode {
            InputMode::Webcam => None,
            InputMode::Image => Some(Widget::ImagePicker),
            InputMode::Video => Some(Widget::VideoPicker),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Control {
    Start,
    Stop,
    Capture,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewState {
    visible: BTreeSet<Widget>,
    enabled: BTreeSet<Control>,
}

impl ViewState {
    /// Pre-Start layout: input selection shown, only Start enabled.
    pub fn idle(mode: InputMode) -> Self {
        let mut view = Self {
            visible: BTreeSet::new(),
            enabled: BTreeSet::new(),
        };
        view.reset_to_idle();
        view.select_picker(mode);
        view
    }

    pub fn is_visible(&self, widget: Widget) -> bool {
        self.visible.contains(&widget)
    }

    pub fn is_enabled(&self, control: Control) -> bool {
        self.enabled.contains(&control)
    }

    pub fn show(&mut self, widget: Widget) {
        self.visible.insert(widget);
    }

    pub fn hide(&mut self, widget: Widget) {
        self.visible.remove(&widget);
    }

    pub fn set_visible(&mut self, widget: Widget, visible: bool) {
        if visible {
            self.show(widget);
        } else {
            self.hide(widget);
        }
    }

    pub fn visible_widgets(&self) -> impl Iterator<Item = Widget> + '_ {
        self.visible.iter().copied()
    }

    /// Show only the picker matching `mode`.
    pub fn select_picker(&mut self, mode: InputMode) {
        self.hide(Widget::ImagePicker);
        self.hide(Widget::VideoPicker);
        if let Some(picker) = Widget::picker(mode) {
            self.show(picker);
        }
    }

    /// Controls while a capture loop runs.
    pub fn enter_running(&mut self, mode: InputMode) {
        self.hide(Widget::InputSelection);
        self.hide(Widget::LoadingIndicator);
        for view in [Widget::WebcamView, Widget::ImageView, Widget::VideoView] {
            self.hide(view);
        }
        self.show(Widget::media_view(mode));
        self.enabled.clear();
        self.enabled.insert(Control::Stop);
        self.enabled.insert(Control::Capture);
    }

    /// Hide media, output and info; show input selection; only Start enabled.
    /// Picker visibility is left alone so the chosen mode stays reflected.
    pub fn reset_to_idle(&mut self) {
        for widget in [
            Widget::WebcamView,
            Widget::ImageView,
            Widget::VideoView,
            Widget::OutputSurface,
            Widget::InfoPanel,
            Widget::LoadingIndicator,
        ] {
            self.hide(widget);
        }
        self.show(Widget::InputSelection);
        self.enabled.clear();
        self.enabled.insert(Control::Start);
    }
}

impl fmt::Display for ViewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: Vec<String> = self.visible.iter().map(|w| format!("{:?}", w)).collect();
        let enabled: Vec<String> = self.enabled.iter().map(|c| format!("{:?}", c)).collect();
        write!(
            f,
            "visible=[{}] enabled=[{}]",
            visible.join(", "),
            enabled.join(", ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_layout() {
        let view = ViewState::idle(InputMode::Webcam);
        assert!(view.is_visible(Widget::InputSelection));
        assert!(!view.is_visible(Widget::ImagePicker));
        assert!(!view.is_visible(Widget::VideoPicker));
        assert!(view.is_enabled(Control::Start));
        assert!(!view.is_enabled(Control::Stop));
        assert!(!view.is_enabled(Control::Capture));
    }

    #[test]
    fn picker_follows_mode() {
        let mut view = ViewState::idle(InputMode::Webcam);
        view.select_picker(InputMode::Video);
        assert!(view.is_visible(Widget::VideoPicker));
        view.select_picker(InputMode::Image);
        assert!(view.is_visible(Widget::ImagePicker));
        assert!(!view.is_visible(Widget::VideoPicker));
        view.select_picker(InputMode::Webcam);
        assert!(!view.is_visible(Widget::ImagePicker));
    }

    #[test]
    fn running_then_idle_round_trip() {
        let mut view = ViewState::idle(InputMode::Image);
        view.enter_running(InputMode::Image);
        view.show(Widget::OutputSurface);
        assert!(!view.is_visible(Widget::InputSelection));
        assert!(view.is_visible(Widget::ImageView));
        assert!(view.is_enabled(Control::Stop));
        assert!(!view.is_enabled(Control::Start));

        view.reset_to_idle();
        assert_eq!(view, ViewState::idle(InputMode::Image));
    }
}
