//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Conversions between container extents, tile matrices and tile indices.
//!
//! Tile matrices follow the GeoPackage orientation: column 0 starts at the
//! container `minx`, row 0 starts at the container `maxy`. Cells are
//! closed-open: a max edge lying on a cell boundary does not reach into the
//! next cell.

use crate::grid::{BoundingBox, TileGrid};

/// Edge tolerance relative to the coordinate magnitude of the container.
///
/// Reprojected coordinates may land a few ulps outside the cell they belong
/// to. The value is empirical, callers dealing with other reference systems
/// can pass their own to [`tile_grid_with_tolerance`].
pub const DEFAULT_TOLERANCE: f64 = 1.0e-14;

/// Highest supported zoom level (`2^30` tiles per side fit into `u32`)
pub const MAX_ZOOM: u8 = 30;

/// Tiles per side of a globally aligned matrix
pub fn tiles_per_side(zoom: u8) -> u64 {
    debug_assert!(zoom < 64);
    1u64 << zoom
}

/// Union of two boxes
pub fn union(a: &BoundingBox, b: &BoundingBox) -> BoundingBox {
    a.union(b)
}

/// Intersection of two boxes, touching edges count as overlap
pub fn overlap(a: &BoundingBox, b: &BoundingBox) -> Option<BoundingBox> {
    a.overlap(b)
}

fn clamp_index(cells: f64, matrix: u32) -> u32 {
    let last = matrix.saturating_sub(1);
    if cells <= 0.0 {
        0
    } else if cells >= last as f64 {
        last
    } else {
        cells as u32
    }
}

fn is_degenerate(container: &BoundingBox, matrix_width: u32, matrix_height: u32) -> bool {
    matrix_width == 0
        || matrix_height == 0
        || !(container.width() > 0.0)
        || !(container.height() > 0.0)
}

/// Column containing `x`, clamped to the matrix
pub fn column(container: &BoundingBox, matrix_width: u32, x: f64) -> u32 {
    let tile_width = container.width() / matrix_width as f64;
    clamp_index(((x - container.minx) / tile_width).floor(), matrix_width)
}

/// Row containing `y`, clamped to the matrix
pub fn row(container: &BoundingBox, matrix_height: u32, y: f64) -> u32 {
    let tile_height = container.height() / matrix_height as f64;
    clamp_index(((container.maxy - y) / tile_height).floor(), matrix_height)
}

/// Tiles of a `matrix_width x matrix_height` matrix covering `request`
pub fn tile_grid(
    container: &BoundingBox,
    matrix_width: u32,
    matrix_height: u32,
    request: &BoundingBox,
) -> Option<TileGrid> {
    tile_grid_with_tolerance(
        container,
        matrix_width,
        matrix_height,
        request,
        DEFAULT_TOLERANCE,
    )
}

/// Like [`tile_grid`] with an explicit edge tolerance
pub fn tile_grid_with_tolerance(
    container: &BoundingBox,
    matrix_width: u32,
    matrix_height: u32,
    request: &BoundingBox,
    tolerance: f64,
) -> Option<TileGrid> {
    if is_degenerate(container, matrix_width, matrix_height) {
        return None;
    }
    let clipped = overlap(container, request)?;
    let tile_width = container.width() / matrix_width as f64;
    let tile_height = container.height() / matrix_height as f64;
    // tolerance in cell units
    let eps_x = tolerance * container.minx.abs().max(container.maxx.abs()) / tile_width;
    let eps_y = tolerance * container.miny.abs().max(container.maxy.abs()) / tile_height;

    let min_col = clamp_index(
        ((clipped.minx - container.minx) / tile_width + eps_x).floor(),
        matrix_width,
    );
    let max_col = clamp_index(
        ((clipped.maxx - container.minx) / tile_width - eps_x).ceil() - 1.0,
        matrix_width,
    )
    .max(min_col);
    let min_row = clamp_index(
        ((container.maxy - clipped.maxy) / tile_height + eps_y).floor(),
        matrix_height,
    );
    let max_row = clamp_index(
        ((container.maxy - clipped.miny) / tile_height - eps_y).ceil() - 1.0,
        matrix_height,
    )
    .max(min_row);

    Some(TileGrid::new(min_col, min_row, max_col, max_row))
}

/// Ground extent of the tiles in `grid`
pub fn bounding_box(
    container: &BoundingBox,
    matrix_width: u32,
    matrix_height: u32,
    grid: &TileGrid,
) -> BoundingBox {
    let tile_width = container.width() / matrix_width as f64;
    let tile_height = container.height() / matrix_height as f64;
    BoundingBox {
        minx: container.minx + tile_width * grid.min_col as f64,
        miny: container.maxy - tile_height * (grid.max_row as f64 + 1.0),
        maxx: container.minx + tile_width * (grid.max_col as f64 + 1.0),
        maxy: container.maxy - tile_height * grid.min_row as f64,
    }
}

/// Ground extent of a single tile
pub fn tile_bounding_box(
    container: &BoundingBox,
    matrix_width: u32,
    matrix_height: u32,
    column: u32,
    row: u32,
) -> BoundingBox {
    bounding_box(
        container,
        matrix_width,
        matrix_height,
        &TileGrid::new(column, row, column, row),
    )
}
