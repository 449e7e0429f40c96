use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::FrameView;

const BRIGHT_LUMA: u32 = 220;
const SAMPLE_STEP: u32 = 2;
const MIN_BRIGHT_SAMPLES: usize = 16;

/// Stub backend for tests and demos.
///
/// With a script, each call returns the next scripted list (the last one
/// repeats). Without a script it reports one box around the bright region
/// of the frame, which is what the synthetic sources draw.
pub struct StubBackend {
    label: String,
    script: VecDeque<Vec<Detection>>,
    last: Option<Vec<Detection>>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            label: "person".to_string(),
            script: VecDeque::new(),
            last: None,
        }
    }

    pub fn scripted(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: script.into(),
            ..Self::new()
        }
    }

    /// Override the label reported for bright regions.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    fn bright_region(&self, frame: FrameView<'_>) -> Option<Detection> {
        let (mut min_x, mut min_y) = (u32::MAX, u32::MAX);
        let (mut max_x, mut max_y) = (0u32, 0u32);
        let mut hits = 0usize;

        for y in (0..frame.height()).step_by(SAMPLE_STEP as usize) {
            for x in (0..frame.width()).step_by(SAMPLE_STEP as usize) {
                let Some([r, g, b]) = frame.pixel(x, y) else {
                    continue;
                };
                let luma = (299 * r as u32 + 587 * g as u32 + 114 * b as u32) / 1000;
                if luma >= BRIGHT_LUMA {
                    hits += 1;
                    min_x = min_x.min(x);
                    min_y = min_y.min(y);
                    max_x = max_x.max(x);
                    max_y = max_y.max(y);
                }
            }
        }

        if hits < MIN_BRIGHT_SAMPLES {
            return None;
        }

        let width = (max_x - min_x + SAMPLE_STEP) as f32;
        let height = (max_y - min_y + SAMPLE_STEP) as f32;
        let samples_in_box = (width * height) / (SAMPLE_STEP * SAMPLE_STEP) as f32;
        let fill = (hits as f32 / samples_in_box).min(1.0);
        let bbox = BoundingBox::new(min_x as f32, min_y as f32, width, height)
            .clamp_to(frame.width(), frame.height());

        Some(Detection::new(self.label.clone(), 0.5 + 0.5 * fill, bbox))
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, frame: FrameView<'_>) -> Result<Vec<Detection>> {
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next.clone());
            return Ok(next);
        }
        if let Some(last) = &self.last {
            return Ok(last.clone());
        }
        Ok(self.bright_region(frame).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn frame_with_square(size: u32, x0: u32, y0: u32, side: u32) -> Frame {
        let mut data = vec![20u8; (size * size * 3) as usize];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                let idx = ((y * size + x) * 3) as usize;
                data[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        Frame::from_rgb(data, size, size).unwrap()
    }

    #[test]
    fn finds_bright_square() {
        let frame = frame_with_square(64, 16, 24, 20);
        let mut backend = StubBackend::new();
        let detections = backend.detect(frame.view()).unwrap();
        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.label, "person");
        assert_eq!(det.bbox.x, 16.0);
        assert_eq!(det.bbox.y, 24.0);
        assert_eq!(det.bbox.width, 20.0);
        assert_eq!(det.bbox.height, 20.0);
        assert!(det.confidence > 0.9);
    }

    #[test]
    fn dark_frame_has_no_detections() {
        let frame = Frame::from_rgb(vec![10u8; 32 * 32 * 3], 32, 32).unwrap();
        let mut backend = StubBackend::new().with_label("cat");
        assert!(backend.detect(frame.view()).unwrap().is_empty());
    }

    #[test]
    fn script_plays_in_order_then_repeats_last() {
        let frame = Frame::from_rgb(vec![0u8; 3], 1, 1).unwrap();
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
        let mut backend = StubBackend::scripted(vec![
            vec![Detection::new("dog", 0.9, bbox)],
            vec![],
        ]);
        assert_eq!(backend.detect(frame.view()).unwrap()[0].label, "dog");
        assert!(backend.detect(frame.view()).unwrap().is_empty());
        assert!(backend.detect(frame.view()).unwrap().is_empty());
    }
}
