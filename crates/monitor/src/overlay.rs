//! Frame annotation: labelled object boxes, a status banner and the
//! gaze/status readout

use ab_glyph::FontRef;
use camera_capture::VideoFrame;
use dms::{DetectedObject, DistractionStatus, FaceReport};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::MonitorError;

const FONT_DATA: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
const NO_FACE_COLOR: Rgb<u8> = Rgb([128, 128, 128]);
const BANNER_HEIGHT: u32 = 12;
const CLIP_MARGIN: i64 = 3;

const TEXT_SCALE: f32 = 16.0;
const LABEL_SCALE: f32 = 12.0;
const TEXT_X: i32 = 8;
const GAZE_Y: i32 = BANNER_HEIGHT as i32 + 4;
const STATUS_Y: i32 = GAZE_Y + TEXT_SCALE as i32 + 4;

/// Banner colour for a status
pub fn status_color(status: Option<DistractionStatus>) -> Rgb<u8> {
    match status {
        Some(DistractionStatus::Distracted) => Rgb([220, 0, 0]),
        Some(DistractionStatus::NotDistracted) => Rgb([255, 176, 0]),
        Some(DistractionStatus::Focused) => Rgb([0, 200, 0]),
        None => NO_FACE_COLOR,
    }
}

/// Draw every object with its label, the status banner, and the
/// `Gaze:`/`Status:` lines for `face`
pub fn annotate(
    frame: &mut VideoFrame,
    objects: &[DetectedObject],
    face: Option<&FaceReport>,
) -> Result<(), MonitorError> {
    let font = FontRef::try_from_slice(FONT_DATA)?;
    let mut image = frame.to_image().map_err(MonitorError::Render)?;
    if image.width() == 0 || image.height() == 0 {
        return Ok(());
    }

    for object in objects {
        draw_object(&mut image, &font, object);
    }

    let status = face.map(|f| f.status);
    let banner = Rect::at(0, 0).of_size(image.width(), BANNER_HEIGHT.min(image.height()));
    draw_filled_rect_mut(&mut image, banner, status_color(status));

    if let Some(face) = face {
        let gaze = format!("Gaze: {}", face.gaze.label());
        draw_text_mut(&mut image, BOX_COLOR, TEXT_X, GAZE_Y, TEXT_SCALE, &font, &gaze);
        let status_text = format!("Status: {}", face.status.label());
        draw_text_mut(
            &mut image,
            status_color(status),
            TEXT_X,
            STATUS_Y,
            TEXT_SCALE,
            &font,
            &status_text,
        );
    }

    frame.data = image.into_raw();
    Ok(())
}

/// Clamp a box to just beyond the image on each side; edges (and their
/// 2px inset) that fall outside stay outside.
fn clamp_box(image: &RgbImage, object: &DetectedObject) -> (i32, i32, i32, i32) {
    let b = object.bbox;
    let max_x = i64::from(image.width());
    let max_y = i64::from(image.height());
    let cx = |v: i32| i64::from(v).clamp(-CLIP_MARGIN, max_x + CLIP_MARGIN) as i32;
    let cy = |v: i32| i64::from(v).clamp(-CLIP_MARGIN, max_y + CLIP_MARGIN) as i32;

    let (x1, x2) = (cx(b.x1.min(b.x2)), cx(b.x1.max(b.x2)));
    let (y1, y2) = (cy(b.y1.min(b.y2)), cy(b.y1.max(b.y2)));
    (x1, y1, x2, y2)
}

fn draw_object(image: &mut RgbImage, font: &FontRef<'_>, object: &DetectedObject) {
    let (x1, y1, x2, y2) = clamp_box(image, object);

    for inset in 0..2 {
        let w = (x2 - x1 - 2 * inset).max(1) as u32;
        let h = (y2 - y1 - 2 * inset).max(1) as u32;
        draw_hollow_rect_mut(image, Rect::at(x1 + inset, y1 + inset).of_size(w, h), BOX_COLOR);
    }

    // above the box, or just inside it when there is no room
    let above = y1 - LABEL_SCALE as i32 - 2;
    let label_y = if above >= 0 { above } else { y1.max(0) + 2 };
    draw_text_mut(image, BOX_COLOR, x1.max(0), label_y, LABEL_SCALE, font, &object.label);
}
