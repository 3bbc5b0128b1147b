// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stroke width transform (Epshtein, Ofek & Wexler, 2010) for dark text on a
// light background.
//
// 1. Canny edge map plus Sobel gradients of the luma image.
// 2. From every edge pixel, cast a ray against the gradient (into the dark
//    stroke) until another edge pixel is hit whose gradient roughly opposes
//    the starting one. Every pixel on an accepted ray gets the ray length as
//    its stroke width, keeping the minimum when rays cross.
// 3. Second pass: clamp each ray's pixels to the ray's median width, which
//    repairs corners where a long diagonal ray overestimated the stroke.
// 4. Pixels that received a width no larger than `MAX_STROKE_WIDTH` are drawn
//    black, everything else white.

use image::{GrayImage, Luma};
use imageproc::edges::canny;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use tracing::debug;

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;

/// Rays longer than this are abandoned.
const MAX_RAY_LEN: usize = 100;

/// Strokes wider than this are treated as blobs, not text.
const MAX_STROKE_WIDTH: f32 = 40.0;

/// Minimum `-cos` of the angle between the two edge gradients for a ray to
/// count (opposing within ~60 degrees).
const OPPOSITION: f32 = 0.5;

/// Run the stroke width transform over `gray`.
pub fn stroke_width_transform(gray: &GrayImage) -> GrayImage {
    let (width, height) = gray.dimensions();
    let mut output = GrayImage::from_pixel(width, height, Luma([255u8]));
    if width < 3 || height < 3 {
        return output;
    }

    let edges = canny(gray, CANNY_LOW, CANNY_HIGH);
    let gx = horizontal_sobel(gray);
    let gy = vertical_sobel(gray);

    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let is_edge = |x: u32, y: u32| edges.get_pixel(x, y).0[0] > 0;
    let unit_gradient = |x: u32, y: u32| -> Option<(f32, f32)> {
        let dx = gx.get_pixel(x, y).0[0] as f32;
        let dy = gy.get_pixel(x, y).0[0] as f32;
        let norm = (dx * dx + dy * dy).sqrt();
        (norm > f32::EPSILON).then(|| (dx / norm, dy / norm))
    };

    let mut widths = vec![f32::INFINITY; (width * height) as usize];
    let mut rays: Vec<Vec<(u32, u32)>> = Vec::new();

    for (x, y, pixel) in edges.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        let Some((dx, dy)) = unit_gradient(x, y) else {
            continue;
        };
        // Gradient points from dark to light; walk the other way.
        let (step_x, step_y) = (-dx, -dy);

        let mut ray = vec![(x, y)];
        let (mut fx, mut fy) = (x as f32 + 0.5, y as f32 + 0.5);
        let (mut last_x, mut last_y) = (x, y);
        let mut accepted = false;

        for _ in 0..MAX_RAY_LEN * 2 {
            fx += step_x * 0.5;
            fy += step_y * 0.5;
            if fx < 0.0 || fy < 0.0 || fx >= width as f32 || fy >= height as f32 {
                break;
            }
            let (cx, cy) = (fx as u32, fy as u32);
            if (cx, cy) == (last_x, last_y) {
                continue;
            }
            last_x = cx;
            last_y = cy;
            ray.push((cx, cy));
            if ray.len() > MAX_RAY_LEN {
                break;
            }
            if is_edge(cx, cy) {
                if let Some((ox, oy)) = unit_gradient(cx, cy) {
                    accepted = dx * ox + dy * oy <= -OPPOSITION;
                }
                break;
            }
        }

        if !accepted {
            continue;
        }

        let (ex, ey) = ray[ray.len() - 1];
        let length = ((ex as f32 - x as f32).powi(2) + (ey as f32 - y as f32).powi(2)).sqrt();
        for &(px, py) in &ray {
            let slot = &mut widths[idx(px, py)];
            *slot = slot.min(length);
        }
        rays.push(ray);
    }

    for ray in &rays {
        let mut along: Vec<f32> = ray.iter().map(|&(px, py)| widths[idx(px, py)]).collect();
        along.sort_by(|a, b| a.total_cmp(b));
        let median = along[along.len() / 2];
        for &(px, py) in ray {
            let slot = &mut widths[idx(px, py)];
            *slot = slot.min(median);
        }
    }

    let mut stroke_pixels = 0usize;
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if widths[idx(x, y)] <= MAX_STROKE_WIDTH {
            *pixel = Luma([0u8]);
            stroke_pixels += 1;
        }
    }
    debug!(rays = rays.len(), stroke_pixels, "Stroke width transform complete");
    output
}
