//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use image::ImageReader;
use std::convert::TryFrom;
use std::io::Cursor;

/// Pixel size of encoded tiles
pub trait TileDecoder {
    /// Width and height in pixels, `None` for undecodable data
    fn dimensions(&self, data: &[u8]) -> Option<(u16, u16)>;
}

/// Reads PNG and JPEG headers
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn dimensions(&self, data: &[u8]) -> Option<(u16, u16)> {
        let reader = match ImageReader::new(Cursor::new(data)).with_guessed_format() {
            Ok(reader) => reader,
            Err(e) => {
                debug!("Unknown tile format: {}", e);
                return None;
            }
        };
        match reader.into_dimensions() {
            Ok((width, height)) => Some((u16::try_from(width).ok()?, u16::try_from(height).ok()?)),
            Err(e) => {
                debug!("Tile decoding error: {}", e);
                None
            }
        }
    }
}
