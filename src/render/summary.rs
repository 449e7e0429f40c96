use crate::detect::Detection;

/// Top-detection readout shown next to the output surface.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoPanel {
    pub label: String,
    pub confidence: String,
    pub active: bool,
}

impl InfoPanel {
    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

/// Show the first detection, or hide the panel when there is none.
///
/// Only the primary detection is summarized even when several boxes are drawn.
pub fn update_summary(panel: &mut InfoPanel, detections: &[Detection]) {
    match detections.first() {
        Some(primary) => {
            panel.label = primary.label.clone();
            panel.confidence = primary.percent_text();
            panel.active = true;
        }
        None => panel.active = false,
    }
}
