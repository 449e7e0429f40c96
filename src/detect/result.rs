use serde::{Deserialize, Serialize};

/// Axis-aligned box in frame pixel units, origin at the top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Clip the box to a `width` x `height` frame.
    pub fn clamp_to(self, width: u32, height: u32) -> Self {
        let (fw, fh) = (width as f32, height as f32);
        let x0 = self.x.clamp(0.0, fw);
        let y0 = self.y.clamp(0.0, fh);
        let x1 = (self.x + self.width).clamp(0.0, fw);
        let y1 = (self.y + self.height).clamp(0.0, fh);
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// One detector output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    /// Score in `0.0..=1.0`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32, bbox: BoundingBox) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label: label.into(),
            confidence,
            bbox,
        }
    }

    /// Confidence as a percentage with one decimal, e.g. `87.3%`.
    ///
    /// Ties round up (`0.5625` is `56.3%`), not to even.
    pub fn percent_text(&self) -> String {
        let tenths = (f64::from(self.confidence) * 1000.0).round();
        format!("{:.1}%", tenths / 10.0)
    }

    /// Overlay caption, e.g. `person (87.3%)`.
    pub fn caption(&self) -> String {
        format!("{} ({})", self.label, self.percent_text())
    }
}
