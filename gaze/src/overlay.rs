//! Drawing primitives for annotated frames.

use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut};

use crate::{
    Frame,
    reading::{GazeRatio, GazeReading},
};

pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const LABEL: Rgb<u8> = Rgb([31, 58, 147]);

const GLYPH_SIZE: u32 = 8;
const PUPIL_CROSS: f32 = 5.;
const COVER_RADIUS: i32 = 15;
const CENTER_MARKER_RADIUS: i32 = 50;
const STROKE: i32 = 2;

/// Creates an all black frame.
pub fn black_frame(width: u32, height: u32) -> Frame {
    Frame::new(width, height)
}

/// Draws a circle outline `thickness` pixels wide.
pub fn draw_ring(
    frame: &mut Frame,
    center: (i32, i32),
    radius: i32,
    thickness: i32,
    color: Rgb<u8>,
) {
    let first = radius - thickness / 2;
    for r in first..first + thickness.max(1) {
        if r > 0 {
            draw_hollow_circle_mut(frame, center, r, color);
        }
    }
}

/// Returns the size in pixels `text` takes when drawn at `scale`.
pub fn text_size(text: &str, scale: u32) -> (u32, u32) {
    let scale = scale.max(1);
    let glyphs = text.chars().count() as u32;
    (glyphs * GLYPH_SIZE * scale, GLYPH_SIZE * scale)
}

/// Draws `text` with its top left corner at `origin`. Pixels falling outside
/// of the frame are clipped, characters without a glyph are drawn as `?`.
pub fn draw_text(frame: &mut Frame, text: &str, origin: (i32, i32), scale: u32, color: Rgb<u8>) {
    let scale = scale.max(1) as i32;
    let (width, height) = (frame.width() as i32, frame.height() as i32);
    let advance = GLYPH_SIZE as i32 * scale;

    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(c).or_else(|| BASIC_FONTS.get('?')) else {
            continue;
        };

        let gx = origin.0 + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE as i32 {
                if bits & (1 << col) == 0 {
                    continue;
                }

                for dy in 0..scale {
                    for dx in 0..scale {
                        let x = gx + col * scale + dx;
                        let y = origin.1 + row as i32 * scale + dy;
                        if (0..width).contains(&x) && (0..height).contains(&y) {
                            frame.put_pixel(x as u32, y as u32, color);
                        }
                    }
                }
            }
        }
    }
}

/// Draws `text` centered on the frame.
pub fn draw_centered_text(frame: &mut Frame, text: &str, scale: u32, color: Rgb<u8>) {
    let (tw, th) = text_size(text, scale);
    let x = (frame.width() as i32 - tw as i32) / 2;
    let y = (frame.height() as i32 - th as i32) / 2;
    draw_text(frame, text, (x, y), scale, color);
}

/// Maps a ratio into frame coordinates.
pub fn ratio_to_point(frame: &Frame, ratio: GazeRatio) -> (i32, i32) {
    (
        (ratio.horizontal * frame.width() as f32) as i32,
        (ratio.vertical * frame.height() as f32) as i32,
    )
}

/// Draws a circle where the user is looking.
pub fn show_gaze_location(frame: &mut Frame, ratio: GazeRatio, radius: i32, color: Rgb<u8>) {
    let center = ratio_to_point(frame, ratio);
    draw_ring(frame, center, radius, STROKE, color);
}

/// Draws a circle on every calibration marker.
pub fn draw_markers(frame: &mut Frame, markers: &[GazeRatio], radius: i32, color: Rgb<u8>) {
    for &marker in markers {
        show_gaze_location(frame, marker, radius, color);
    }
}

fn pupils(reading: &GazeReading) -> impl Iterator<Item = (f32, f32)> {
    [reading.left_pupil, reading.right_pupil]
        .into_iter()
        .flatten()
        .map(|(x, y)| (x as f32, y as f32))
}

/// Draws a small cross over every located pupil.
pub fn draw_pupils(frame: &mut Frame, reading: &GazeReading) {
    for (x, y) in pupils(reading) {
        draw_line_segment_mut(frame, (x - PUPIL_CROSS, y), (x + PUPIL_CROSS, y), GREEN);
        draw_line_segment_mut(frame, (x, y - PUPIL_CROSS), (x, y + PUPIL_CROSS), GREEN);
    }
}

/// Hides every located pupil behind a red disc.
pub fn cover_eyes(frame: &mut Frame, reading: &GazeReading) {
    for (x, y) in pupils(reading) {
        draw_filled_circle_mut(frame, (x as i32, y as i32), COVER_RADIUS, RED);
    }
}

/// Draws a wide circle in the middle of the frame.
pub fn draw_center_marker(frame: &mut Frame) {
    let center = (frame.width() as i32 / 2, frame.height() as i32 / 2);
    draw_ring(frame, center, CENTER_MARKER_RADIUS, STROKE, GREEN);
}
