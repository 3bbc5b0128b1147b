// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine-native frame: tightly packed 8-bit pixels plus resolution metadata.

use lesewerk_core::error::LesewerkError;

/// A decoded frame in the layout OCR engines take directly: rows of
/// `width * bytes_per_pixel` bytes, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    bytes_per_pixel: u8,
    /// Horizontal resolution reported to the engine (pixels per inch).
    pub x_res: u32,
    /// Vertical resolution reported to the engine (pixels per inch).
    pub y_res: u32,
}

impl NativeBuffer {
    /// Wrap packed pixel data. Resolution starts unset (0).
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        bytes_per_pixel: u8,
    ) -> Result<Self, LesewerkError> {
        if width == 0 || height == 0 {
            return Err(LesewerkError::Image(format!(
                "empty frame ({width}x{height})"
            )));
        }
        if !matches!(bytes_per_pixel, 1 | 3 | 4) {
            return Err(LesewerkError::Image(format!(
                "unsupported pixel size: {bytes_per_pixel} bytes"
            )));
        }
        let expected = width as usize * height as usize * bytes_per_pixel as usize;
        if data.len() != expected {
            return Err(LesewerkError::Image(format!(
                "frame holds {} bytes, {width}x{height}x{bytes_per_pixel} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            bytes_per_pixel,
            x_res: 0,
            y_res: 0,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bytes_per_pixel(&self) -> u8 {
        self.bytes_per_pixel
    }

    pub fn bytes_per_line(&self) -> u32 {
        self.width * self.bytes_per_pixel as u32
    }
}
