//! Overlay rendering, the summary info panel, and snapshot export.

mod canvas;
mod glyphs;
mod snapshot;
mod summary;

use image::Rgba;

use crate::detect::{BoundingBox, Detection};
use crate::frame::Frame;

pub use canvas::{Canvas, DrawSurface, TextAnnotation};
pub use snapshot::{capture_snapshot, encode_png};
pub use summary::{update_summary, InfoPanel};

pub const BOX_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);
pub const BOX_LINE_WIDTH: u32 = 2;
/// Captions sit this far above the box top.
pub const LABEL_OFFSET: f32 = 5.0;
/// Boxes whose top is above this line get their caption pinned to it.
pub const LABEL_MIN_Y: f32 = 10.0;

/// Caption anchor (baseline) for a box.
pub fn label_position(bbox: &BoundingBox) -> (f32, f32) {
    let y = if bbox.y < LABEL_MIN_Y {
        LABEL_MIN_Y
    } else {
        bbox.y - LABEL_OFFSET
    };
    (bbox.x, y)
}

/// Draw `frame` with every detection boxed and captioned, then present it.
///
/// The surface is resized to the frame and cleared first, so nothing from a
/// previous pass survives.
pub fn render<S: DrawSurface + ?Sized>(surface: &mut S, frame: &Frame, detections: &[Detection]) {
    surface.resize(frame.width, frame.height);
    surface.clear();
    surface.draw_frame(frame);
    for detection in detections {
        surface.stroke_rect(&detection.bbox, BOX_LINE_WIDTH, BOX_COLOR);
        let (x, y) = label_position(&detection.bbox);
        surface.fill_text(&detection.caption(), x, y, BOX_COLOR);
    }
    surface.present();
}
