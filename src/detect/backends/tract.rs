#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use image::imageops::{self, FilterType};
use tract_onnx::prelude::*;

use crate::config::ModelSettings;
use crate::detect::backend::DetectorBackend;
use crate::detect::labels::coco_label;
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::FrameView;

/// Tract-based backend for SSD-style ONNX detectors.
///
/// Expects a uint8 NHWC input and `detection_boxes` (normalized
/// `[ymin, xmin, ymax, xmax]`), `detection_classes` (COCO ids) and
/// `detection_scores` outputs, as exported by the TensorFlow object
/// detection API. Output tensors are matched by name.
pub struct TractBackend {
    model: SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>,
    outputs: OutputSlots,
    width: u32,
    height: u32,
    confidence_threshold: f32,
    max_detections: usize,
}

#[derive(Clone, Copy, Debug)]
struct OutputSlots {
    boxes: usize,
    classes: usize,
    scores: usize,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    pub fn new<P: AsRef<Path>>(model_path: P, width: u32, height: u32) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    u8::datum_type(),
                    tvec!(1, height as usize, width as usize, 3),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?;
        let outputs = resolve_outputs(&model)?;
        let model = model
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        Ok(Self {
            model,
            outputs,
            width,
            height,
            confidence_threshold: 0.5,
            max_detections: 20,
        })
    }

    pub fn from_settings(settings: &ModelSettings) -> Result<Self> {
        let path = settings
            .path
            .as_ref()
            .ok_or_else(|| anyhow!("the tract backend requires model.path"))?;
        Ok(Self::new(path, settings.input_width, settings.input_height)?
            .with_threshold(settings.threshold)
            .with_max_detections(settings.max_detections))
    }

    /// Override the default confidence threshold.
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    fn build_input(&self, frame: FrameView<'_>) -> Tensor {
        let rgb = frame.to_rgb_image();
        let resized = if rgb.dimensions() == (self.width, self.height) {
            rgb
        } else {
            imageops::resize(&rgb, self.width, self.height, FilterType::Triangle)
        };
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, self.height as usize, self.width as usize, 3),
            |(_, y, x, channel)| resized.get_pixel(x as u32, y as u32)[channel],
        );
        input.into_tensor()
    }

    fn extract_detections(
        &self,
        outputs: TVec<TValue>,
        frame_width: u32,
        frame_height: u32,
    ) -> Result<Vec<Detection>> {
        let tensor = |idx: usize| {
            outputs
                .get(idx)
                .ok_or_else(|| anyhow!("model produced no output #{}", idx))
        };
        let boxes = tensor(self.outputs.boxes)?
            .as_slice::<f32>()
            .context("detection_boxes was not f32")?;
        let classes = tensor(self.outputs.classes)?
            .as_slice::<f32>()
            .context("detection_classes was not f32")?;
        let scores = tensor(self.outputs.scores)?
            .as_slice::<f32>()
            .context("detection_scores was not f32")?;

        let count = scores.len().min(classes.len()).min(boxes.len() / 4);
        let (fw, fh) = (frame_width as f32, frame_height as f32);
        let mut detections = Vec::new();
        for i in 0..count {
            if detections.len() >= self.max_detections {
                break;
            }
            let score = scores[i];
            if score < self.confidence_threshold {
                continue;
            }
            let Some(label) = coco_label(classes[i].round() as u32) else {
                continue;
            };
            let [ymin, xmin, ymax, xmax] = [
                boxes[i * 4],
                boxes[i * 4 + 1],
                boxes[i * 4 + 2],
                boxes[i * 4 + 3],
            ];
            let bbox = BoundingBox::new(
                xmin * fw,
                ymin * fh,
                (xmax - xmin) * fw,
                (ymax - ymin) * fh,
            )
            .clamp_to(frame_width, frame_height);
            detections.push(Detection::new(label, score, bbox));
        }
        Ok(detections)
    }
}

fn resolve_outputs(model: &TypedModel) -> Result<OutputSlots> {
    let mut boxes = None;
    let mut classes = None;
    let mut scores = None;
    for (idx, outlet) in model.output_outlets()?.iter().enumerate() {
        let name = model
            .outlet_label(*outlet)
            .unwrap_or(model.node(outlet.node).name.as_str())
            .to_ascii_lowercase();
        if name.contains("boxes") {
            boxes = Some(idx);
        } else if name.contains("classes") {
            classes = Some(idx);
        } else if name.contains("scores") {
            scores = Some(idx);
        }
    }
    Ok(OutputSlots {
        boxes: boxes.ok_or_else(|| anyhow!("model has no detection_boxes output"))?,
        classes: classes.ok_or_else(|| anyhow!("model has no detection_classes output"))?,
        scores: scores.ok_or_else(|| anyhow!("model has no detection_scores output"))?,
    })
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn detect(&mut self, frame: FrameView<'_>) -> Result<Vec<Detection>> {
        let input = self.build_input(frame);
        let outputs = self
            .model
            .run(tvec!(input.into()))
            .context("ONNX inference failed")?;
        self.extract_detections(outputs, frame.width(), frame.height())
    }

    fn warm_up(&mut self) -> Result<()> {
        let blank = tract_ndarray::Array4::<u8>::zeros((
            1,
            self.height as usize,
            self.width as usize,
            3,
        ));
        self.model
            .run(tvec!(blank.into_tensor().into()))
            .context("ONNX warm-up run failed")?;
        Ok(())
    }
}
