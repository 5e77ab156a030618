//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::progress::ProgressSink;
use gpkg_core::store::GeoPackage;
use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use tile_grid::{BoundingBox, Grid, Unit};

pub fn temp_path(name: &str) -> String {
    let path = std::env::temp_dir().join(format!(
        "gpkg_service_{}_{}.gpkg",
        name,
        std::process::id()
    ));
    for suffix in &["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
    path.to_string_lossy().to_string()
}

pub fn temp_gpkg(name: &str) -> GeoPackage {
    GeoPackage::create(&temp_path(name)).unwrap()
}

pub fn png_tile(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// PNG followed by the tile address
pub fn marked_tile(column: u32, row: u32) -> Vec<u8> {
    let mut data = png_tile(256, 256, 0);
    data.push(column as u8);
    data.push(row as u8);
    data
}

pub fn marker(data: &[u8]) -> (u32, u32) {
    let n = data.len();
    (data[n - 2] as u32, data[n - 1] as u32)
}

/// Square user grid [0,0,40,40], 10 units per tile at zoom 2
pub fn user_grid() -> Grid {
    Grid::new(
        256,
        256,
        BoundingBox::new(0.0, 0.0, 40.0, 40.0),
        2056,
        Unit::Meters,
    )
}

/// Cancels after `limit` tiles
pub struct CancelAfter {
    pub limit: u64,
    pub done: u64,
    pub total: u64,
    pub cleanup: bool,
}

impl CancelAfter {
    pub fn new(limit: u64) -> CancelAfter {
        CancelAfter {
            limit,
            done: 0,
            total: 0,
            cleanup: true,
        }
    }
}

impl ProgressSink for CancelAfter {
    fn set_total(&mut self, total: u64) {
        self.total = total;
    }
    fn add_progress(&mut self, count: u64) {
        self.done += count;
    }
    fn is_active(&self) -> bool {
        self.done < self.limit
    }
    fn cleanup_on_cancel(&self) -> bool {
        self.cleanup
    }
}
