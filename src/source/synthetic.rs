use crate::frame::Frame;

const BACKGROUND: u8 = 32;

/// Dark frame with a white square sliding left to right, one step per index.
pub(crate) fn synthetic_frame(width: u32, height: u32, index: u64) -> Frame {
    let (w, h) = (width as usize, height as usize);
    let side = (w.min(h) / 4).max(1);
    let travel = w.saturating_sub(side).max(1);
    let x0 = ((index as usize) * 4) % travel;
    let y0 = (h.saturating_sub(side)) / 2;

    let mut pixels = vec![BACKGROUND; w * h * 3];
    for y in y0..(y0 + side).min(h) {
        let row = y * w * 3;
        for x in x0..(x0 + side).min(w) {
            let idx = row + x * 3;
            pixels[idx..idx + 3].copy_from_slice(&[255, 255, 255]);
        }
    }
    // Dimensions are consistent with the buffer by construction.
    Frame::from_rgb(pixels, width, height).unwrap_or_else(|_| blank(width, height))
}

fn blank(width: u32, height: u32) -> Frame {
    Frame::from_image(&image::DynamicImage::new_rgb8(width, height))
}
