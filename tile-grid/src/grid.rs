//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//!Tile grids

use crate::bounds::{bounding_box, tile_grid_with_tolerance, tiles_per_side};
use crate::grid_iterator::GridIterator;
use std::f64::consts;

/// Geographic extent in the units of its spatial reference system
#[derive(PartialEq, Clone, Copy, Debug)]
pub struct BoundingBox {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl BoundingBox {
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> BoundingBox {
        BoundingBox {
            minx,
            miny,
            maxx,
            maxy,
        }
    }
    pub fn width(&self) -> f64 {
        self.maxx - self.minx
    }
    pub fn height(&self) -> f64 {
        self.maxy - self.miny
    }
    pub fn centroid(&self) -> (f64, f64) {
        (
            self.minx + self.width() / 2.0,
            self.miny + self.height() / 2.0,
        )
    }
    /// minx <= maxx and miny <= maxy
    pub fn is_valid(&self) -> bool {
        self.minx <= self.maxx && self.miny <= self.maxy
    }
    /// Smallest box containing both boxes
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            minx: self.minx.min(other.minx),
            miny: self.miny.min(other.miny),
            maxx: self.maxx.max(other.maxx),
            maxy: self.maxy.max(other.maxy),
        }
    }
    /// Intersection of both boxes. Boxes sharing only an edge overlap.
    pub fn overlap(&self, other: &BoundingBox) -> Option<BoundingBox> {
        let overlap = BoundingBox {
            minx: self.minx.max(other.minx),
            miny: self.miny.max(other.miny),
            maxx: self.maxx.min(other.maxx),
            maxy: self.maxy.min(other.maxy),
        };
        if overlap.is_valid() {
            Some(overlap)
        } else {
            None
        }
    }
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.minx <= other.minx
            && self.miny <= other.miny
            && self.maxx >= other.maxx
            && self.maxy >= other.maxy
    }
    /// Coordinate-wise comparison, `tolerance` relative to the coordinate magnitude
    pub fn approx_eq(&self, other: &BoundingBox, tolerance: f64) -> bool {
        fn eq(a: f64, b: f64, tolerance: f64) -> bool {
            (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
        }
        eq(self.minx, other.minx, tolerance)
            && eq(self.miny, other.miny, tolerance)
            && eq(self.maxx, other.maxx, tolerance)
            && eq(self.maxy, other.maxy, tolerance)
    }
}

/// Inclusive min and max tile indices (columns and rows)
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct TileGrid {
    pub min_col: u32,
    pub min_row: u32,
    pub max_col: u32,
    pub max_row: u32,
}

impl TileGrid {
    pub fn new(min_col: u32, min_row: u32, max_col: u32, max_row: u32) -> TileGrid {
        debug_assert!(min_col <= max_col && min_row <= max_row);
        TileGrid {
            min_col,
            min_row,
            max_col,
            max_row,
        }
    }
    /// Number of columns
    pub fn width(&self) -> u32 {
        self.max_col - self.min_col + 1
    }
    /// Number of rows
    pub fn height(&self) -> u32 {
        self.max_row - self.min_row + 1
    }
    pub fn count(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
    pub fn contains(&self, column: u32, row: u32) -> bool {
        column >= self.min_col
            && column <= self.max_col
            && row >= self.min_row
            && row <= self.max_row
    }
    pub fn union(&self, other: &TileGrid) -> TileGrid {
        TileGrid {
            min_col: self.min_col.min(other.min_col),
            min_row: self.min_row.min(other.min_row),
            max_col: self.max_col.max(other.max_col),
            max_row: self.max_row.max(other.max_row),
        }
    }
    /// Cells shared with `other`, `None` if disjoint
    pub fn intersection(&self, other: &TileGrid) -> Option<TileGrid> {
        let min_col = self.min_col.max(other.min_col);
        let min_row = self.min_row.max(other.min_row);
        let max_col = self.max_col.min(other.max_col);
        let max_row = self.max_row.min(other.max_row);
        if min_col <= max_col && min_row <= max_row {
            Some(TileGrid::new(min_col, min_row, max_col, max_row))
        } else {
            None
        }
    }
    /// Row-major iterator over `(column, row)`
    pub fn iter(&self) -> GridIterator {
        GridIterator::new(self)
    }
}

/// Grid units
#[derive(PartialEq, Clone, Debug)]
pub enum Unit {
    Meters,
    Degrees,
    Feet,
}

/// Alignment grid of a spatial reference system.
///
/// Zoom level `z` divides the grid extent into `2^z x 2^z` tiles anchored at
/// the top-left corner. Globally aligned pyramids use the whole extent as
/// container, data-bounded pyramids use a tile-aligned sub-rectangle of it.
#[derive(Clone, Debug)]
pub struct Grid {
    /// The width of an individual tile, in pixels.
    pub width: u16,
    /// The height of an individual tile, in pixels.
    pub height: u16,
    /// The addressable world of the reference system, in ground units.
    pub extent: BoundingBox,
    /// Spatial reference system (GeoPackage srs_id).
    pub srid: i32,
    /// Grid units
    pub units: Unit,
}

impl Grid {
    /// WGS84 grid
    pub fn wgs84() -> Grid {
        Grid::new(
            256,
            256,
            BoundingBox {
                minx: -180.0,
                miny: -90.0,
                maxx: 180.0,
                maxy: 90.0,
            },
            4326,
            Unit::Degrees,
        )
    }

    /// Web Mercator grid (Google maps compatible)
    pub fn web_mercator() -> Grid {
        Grid::new(
            256,
            256,
            BoundingBox {
                minx: -20037508.3427892480,
                miny: -20037508.3427892480,
                maxx: 20037508.3427892480,
                maxy: 20037508.3427892480,
            },
            3857,
            Unit::Meters,
        )
    }

    pub fn new(width: u16, height: u16, extent: BoundingBox, srid: i32, units: Unit) -> Grid {
        Grid {
            width,
            height,
            extent,
            srid,
            units,
        }
    }
    /// Matrix width and height of the whole extent at `zoom`
    pub fn level_dimensions(&self, zoom: u8) -> (u32, u32) {
        let tiles = tiles_per_side(zoom) as u32;
        (tiles, tiles)
    }
    /// Ground width and height of one tile at `zoom`
    pub fn tile_span(&self, zoom: u8) -> (f64, f64) {
        let tiles = tiles_per_side(zoom) as f64;
        (self.extent.width() / tiles, self.extent.height() / tiles)
    }
    /// Ground units per pixel at `zoom`
    pub fn pixel_size(&self, zoom: u8) -> (f64, f64) {
        let (span_x, span_y) = self.tile_span(zoom);
        (span_x / self.width as f64, span_y / self.height as f64)
    }
    /// Smallest tile-aligned rectangle at `zoom` covering `request`
    pub fn aligned_extent(
        &self,
        request: &BoundingBox,
        zoom: u8,
        tolerance: f64,
    ) -> Option<BoundingBox> {
        let (matrix_width, matrix_height) = self.level_dimensions(zoom);
        let grid = tile_grid_with_tolerance(
            &self.extent,
            matrix_width,
            matrix_height,
            request,
            tolerance,
        )?;
        Some(bounding_box(
            &self.extent,
            matrix_width,
            matrix_height,
            &grid,
        ))
    }
    /// Whether the edges of `container` fall on tile boundaries at `zoom`
    pub fn is_aligned(&self, container: &BoundingBox, zoom: u8, tolerance: f64) -> bool {
        self.aligned_extent(container, zoom, tolerance)
            .map_or(false, |aligned| aligned.approx_eq(container, 1e-12))
    }
    /// Matrix width and height of a tile-aligned container at `zoom`
    pub fn matrix_dimensions(&self, container: &BoundingBox, zoom: u8) -> (u32, u32) {
        let (span_x, span_y) = self.tile_span(zoom);
        (
            (container.width() / span_x).round().max(1.0) as u32,
            (container.height() / span_y).round().max(1.0) as u32,
        )
    }
}

const EARTH_RADIUS: f64 = 6378137.0;
/// Latitude limit of the square Web Mercator world
pub const MERCATOR_MAX_LAT: f64 = 85.0511287798066;

/// Returns the Spherical Mercator (x, y) in meters
pub fn lonlat_to_merc(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.max(-MERCATOR_MAX_LAT).min(MERCATOR_MAX_LAT);
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * ((consts::PI * 0.25) + (0.5 * lat.to_radians())).tan().ln();
    (x, y)
}

/// Returns (lon, lat) in degrees of a Spherical Mercator point
pub fn merc_to_lonlat(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - consts::PI * 0.5).to_degrees();
    (lon, lat)
}

/// Projected extent
pub fn extent_wgs84_to_merc(extent: &BoundingBox) -> BoundingBox {
    let (minx, miny) = lonlat_to_merc(extent.minx, extent.miny);
    let (maxx, maxy) = lonlat_to_merc(extent.maxx, extent.maxy);
    BoundingBox {
        minx,
        miny,
        maxx,
        maxy,
    }
}

/// Geographic extent of a Web Mercator extent
pub fn extent_merc_to_wgs84(extent: &BoundingBox) -> BoundingBox {
    let (minx, miny) = merc_to_lonlat(extent.minx, extent.miny);
    let (maxx, maxy) = merc_to_lonlat(extent.maxx, extent.maxy);
    BoundingBox {
        minx,
        miny,
        maxx,
        maxy,
    }
}
