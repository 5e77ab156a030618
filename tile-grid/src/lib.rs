//! A library for tile matrix calculations of GeoPackage tile pyramids
//!
//! ## Tile grids of a container
//!
//! ```rust
//! use tile_grid::{bounding_box, tile_grid, BoundingBox, TileGrid};
//!
//! let container = BoundingBox::new(-180.0, -90.0, 180.0, 90.0);
//! let grid = tile_grid(&container, 4, 4, &BoundingBox::new(0.0, 0.0, 10.0, 10.0));
//! assert_eq!(grid, Some(TileGrid::new(2, 1, 2, 1)));
//! assert_eq!(
//!     bounding_box(&container, 4, 4, &grid.unwrap()),
//!     BoundingBox::new(0.0, 0.0, 90.0, 45.0)
//! );
//! ```
//!
//! ## Alignment grids
//!
//! ```rust
//! use tile_grid::{BoundingBox, Grid, DEFAULT_TOLERANCE};
//!
//! let grid = Grid::wgs84();
//! assert_eq!(grid.level_dimensions(3), (8, 8));
//! let aligned = grid
//!     .aligned_extent(&BoundingBox::new(1.0, 1.0, 2.0, 2.0), 2, DEFAULT_TOLERANCE)
//!     .unwrap();
//! assert_eq!(aligned, BoundingBox::new(0.0, 0.0, 90.0, 45.0));
//! ```
//!
//! ## Grid iterators
//!
//! ```rust
//! use tile_grid::TileGrid;
//!
//! for (column, row) in TileGrid::new(0, 0, 1, 1).iter() {
//!     println!("Tile {}/{}", column, row);
//! }
//! ```

mod bounds;
mod grid;
mod grid_iterator;

pub use bounds::{
    bounding_box, column, overlap, row, tile_bounding_box, tile_grid, tile_grid_with_tolerance,
    tiles_per_side, union, DEFAULT_TOLERANCE, MAX_ZOOM,
};
pub use grid::{
    extent_merc_to_wgs84, extent_wgs84_to_merc, lonlat_to_merc, merc_to_lonlat, BoundingBox, Grid,
    TileGrid, Unit, MERCATOR_MAX_LAT,
};
pub use grid_iterator::GridIterator;
