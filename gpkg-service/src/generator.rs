//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Tile pyramid generation.
//!
//! A build resolves the container extent of the pyramid, creates the tile
//! table or extends the bounds of an existing one, and then fetches every
//! tile of the requested zoom levels from a [`TileSource`].
//!
//! Extending the bounds of an existing pyramid renumbers its tiles. This
//! happens in a single transaction: matrix dimensions grow by the ratio of
//! the new to the old container extent and every tile is moved to the cell
//! containing the centroid of its old cell. Tiles are processed from the
//! last row and column backwards, since new indices are never smaller than
//! old ones no tile is moved onto a key which is still occupied.

use crate::decoder::{ImageDecoder, TileDecoder};
use crate::progress::ProgressSink;
use crate::projection::{BuiltinTransform, ProjectionTransform};
use crate::source::TileSource;
use gpkg_core::core::stats::Statistics;
use gpkg_core::store::contents::Contents;
use gpkg_core::store::geopackage::Connection;
use gpkg_core::store::{
    validate_table_name, GeoPackage, StoreError, TileKey, TileMatrix, TileMatrixSet, TileTable,
};
use std::fmt;
use thiserror::Error;
use tile_grid::{
    column, row, tile_bounding_box, tile_grid_with_tolerance, BoundingBox, Grid, TileGrid,
    DEFAULT_TOLERANCE, MAX_ZOOM,
};

/// Tolerance for detecting a changed container extent
const EXTENT_EPSILON: f64 = 1.0e-12;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PyramidMode {
    /// Container is the whole grid extent, `2^z x 2^z` tiles per level
    GloballyAligned,
    /// Container is the tile aligned extent of the data at the lowest zoom level
    DataBounded,
}

impl PyramidMode {
    pub fn from_name(name: &str) -> Result<PyramidMode, String> {
        match name {
            "aligned" => Ok(PyramidMode::GloballyAligned),
            "bounded" => Ok(PyramidMode::DataBounded),
            _ => Err(format!("Unknown pyramid mode '{}'", name)),
        }
    }
    pub fn name(&self) -> &'static str {
        match self {
            PyramidMode::GloballyAligned => "aligned",
            PyramidMode::DataBounded => "bounded",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GenerateState {
    Initializing,
    CreatingTable,
    UpdatingTable,
    GeneratingZoom(u8),
    Finalizing,
    Completed,
    Cancelled,
    Failed,
}

#[derive(Debug, Error)]
pub enum PyramidError {
    #[error("Invalid zoom range {min_zoom}-{max_zoom}")]
    InvalidZoomRange { min_zoom: u8, max_zoom: u8 },
    #[error("Tile table '{table}' has SRS {table_srid}, cannot add tiles in SRS {grid_srid}")]
    ProjectionMismatch {
        table: String,
        table_srid: i32,
        grid_srid: i32,
    },
    #[error("No transformation from SRS {from} to SRS {to}")]
    Projection { from: i32, to: i32 },
    #[error("Extent {0:?} outside of grid")]
    OutsideGrid(BoundingBox),
    #[error("No tile data for {zoom}/{column}/{row}")]
    TileDecode { zoom: u8, column: u32, row: u32 },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Failed build
#[derive(Debug, Error)]
#[error("{error} ({tiles_committed} tiles committed)")]
pub struct GenerateFailure {
    #[source]
    pub error: PyramidError,
    /// Tiles remaining in the GeoPackage
    pub tiles_committed: u64,
}

impl GenerateFailure {
    fn new<E: Into<PyramidError>>(error: E, tiles_committed: u64) -> GenerateFailure {
        GenerateFailure {
            error: error.into(),
            tiles_committed,
        }
    }
}

/// Completed or cancelled build
pub struct GenerateReport {
    pub table: String,
    /// `Completed` or `Cancelled`
    pub state: GenerateState,
    pub tiles_written: u64,
    /// Tiles the source could not deliver
    pub tiles_skipped: u64,
    /// Zoom levels without tile size, rows removed
    pub levels_discarded: Vec<u8>,
    /// Tiles moved by a bounds extension
    pub tiles_moved: u64,
    /// Container extent of the pyramid
    pub bbox: BoundingBox,
    /// Table was created by this build and removed after cancellation
    pub table_dropped: bool,
    /// Tile sizes per level
    pub stats: Statistics,
}

impl fmt::Debug for GenerateReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("GenerateReport")
            .field("table", &self.table)
            .field("state", &self.state)
            .field("tiles_written", &self.tiles_written)
            .field("tiles_skipped", &self.tiles_skipped)
            .field("levels_discarded", &self.levels_discarded)
            .field("tiles_moved", &self.tiles_moved)
            .field("bbox", &self.bbox)
            .field("table_dropped", &self.table_dropped)
            .finish()
    }
}

/// Parameters of a pyramid build
#[derive(Clone, Debug)]
pub struct PyramidRequest {
    pub table: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    /// Extent of the data to generate
    pub bbox: BoundingBox,
    /// Spatial reference system of `bbox`
    pub srid: i32,
    pub mode: PyramidMode,
    pub description: Option<String>,
}

/// Builds and extends tile pyramids on a grid.
///
/// Builds of the same table must not run concurrently.
pub struct PyramidGenerator<'a> {
    gpkg: &'a GeoPackage,
    grid: Grid,
    transform: Box<dyn ProjectionTransform + 'a>,
    decoder: Box<dyn TileDecoder + 'a>,
    tolerance: f64,
}

struct Pyramid {
    table: TileTable,
    set: TileMatrixSet,
    created: bool,
    tiles_moved: u64,
}

/// Level in generation
struct Level {
    zoom: u8,
    /// Alignment grid cells of the request
    grid: TileGrid,
    matrix_width: u32,
    matrix_height: u32,
    tile_size: Option<(u16, u16)>,
    written: u64,
}

#[derive(Default)]
struct Progress {
    written: u64,
    skipped: u64,
    discarded: Vec<u8>,
    cancelled: bool,
}

impl<'a> PyramidGenerator<'a> {
    pub fn new(gpkg: &'a GeoPackage, grid: Grid) -> PyramidGenerator<'a> {
        PyramidGenerator {
            gpkg,
            grid,
            transform: Box::new(BuiltinTransform),
            decoder: Box::new(ImageDecoder),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
    pub fn with_transform<T: ProjectionTransform + 'a>(mut self, transform: T) -> Self {
        self.transform = Box::new(transform);
        self
    }
    pub fn with_decoder<D: TileDecoder + 'a>(mut self, decoder: D) -> Self {
        self.decoder = Box::new(decoder);
        self
    }
    /// Edge tolerance relative to the coordinate magnitude
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn generate(
        &self,
        request: &PyramidRequest,
        source: &dyn TileSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<GenerateReport, GenerateFailure> {
        debug!("{}: {:?}", request.table, GenerateState::Initializing);
        if request.min_zoom > request.max_zoom || request.max_zoom > MAX_ZOOM {
            return Err(GenerateFailure::new(
                PyramidError::InvalidZoomRange {
                    min_zoom: request.min_zoom,
                    max_zoom: request.max_zoom,
                },
                0,
            ));
        }
        validate_table_name(&request.table).map_err(|e| GenerateFailure::new(e, 0))?;
        let extent = self
            .request_extent(request)
            .map_err(|e| GenerateFailure::new(e, 0))?;
        debug!("{}: request extent {:?}", request.table, extent);

        let mut pyramid = self
            .open_pyramid(request, &extent)
            .map_err(|e| GenerateFailure::new(e, 0))?;
        let mut stats = Statistics::new();
        let mut result = Progress::default();
        let generated = self.generate_levels(
            request,
            &extent,
            &pyramid,
            source,
            progress,
            &mut result,
            &mut stats,
        );

        debug!("{}: {:?}", request.table, GenerateState::Finalizing);
        if let Err(e) = generated {
            error!("{}: {}", request.table, e);
            debug!("{}: {:?}", request.table, GenerateState::Failed);
            let committed = if pyramid.created {
                self.drop_created(&request.table);
                0
            } else {
                result.written
            };
            return Err(GenerateFailure::new(e, committed));
        }

        if result.cancelled && pyramid.created && progress.cleanup_on_cancel() {
            info!("{}: build cancelled, removing table", request.table);
            self.drop_created(&request.table);
            pyramid.tiles_moved = 0;
            return Ok(self.report(request, pyramid, result, stats, true));
        }
        if let Err(e) = self.update_contents(&pyramid, &extent) {
            error!("{}: {}", request.table, e);
            return Err(GenerateFailure::new(e, result.written));
        }
        Ok(self.report(request, pyramid, result, stats, false))
    }

    /// Request extent in grid SRS, clipped to the grid
    fn request_extent(&self, request: &PyramidRequest) -> Result<BoundingBox, PyramidError> {
        let extent = self
            .transform
            .transform(&request.bbox, request.srid, self.grid.srid)
            .ok_or(PyramidError::Projection {
                from: request.srid,
                to: self.grid.srid,
            })?;
        match self.grid.extent.overlap(&extent) {
            Some(clipped) if clipped.width() > 0.0 && clipped.height() > 0.0 => Ok(clipped),
            _ => Err(PyramidError::OutsideGrid(extent)),
        }
    }

    /// Container of a new pyramid or of the request part of an extension
    fn container(
        &self,
        mode: PyramidMode,
        extent: &BoundingBox,
        zoom: u8,
    ) -> Result<BoundingBox, PyramidError> {
        match mode {
            PyramidMode::GloballyAligned => Ok(self.grid.extent),
            PyramidMode::DataBounded => self
                .grid
                .aligned_extent(extent, zoom, self.tolerance)
                .ok_or(PyramidError::OutsideGrid(*extent)),
        }
    }

    fn open_pyramid(
        &self,
        request: &PyramidRequest,
        extent: &BoundingBox,
    ) -> Result<Pyramid, PyramidError> {
        match self.gpkg.matrix_set(&request.table)? {
            None => {
                debug!("{}: {:?}", request.table, GenerateState::CreatingTable);
                let container = self.container(request.mode, extent, request.min_zoom)?;
                self.create_pyramid(request, &container)
            }
            Some(set) => {
                debug!("{}: {:?}", request.table, GenerateState::UpdatingTable);
                if set.srs_id != self.grid.srid {
                    return Err(PyramidError::ProjectionMismatch {
                        table: request.table.clone(),
                        table_srid: set.srs_id,
                        grid_srid: self.grid.srid,
                    });
                }
                let table = self.gpkg.tile_table(&request.table)?;
                self.extend_pyramid(request, extent, table, set)
            }
        }
    }

    fn create_pyramid(
        &self,
        request: &PyramidRequest,
        container: &BoundingBox,
    ) -> Result<Pyramid, PyramidError> {
        info!(
            "{}: creating tile pyramid with extent {:?}",
            request.table, container
        );
        let set = TileMatrixSet::new(&request.table, self.grid.srid, *container);
        let table = self.gpkg.transaction(|tx| {
            gpkg_core::store::schema::ensure_srs(tx, self.grid.srid)?;
            let table = TileTable::create(tx, &request.table)?;
            Contents::tiles(
                &request.table,
                self.grid.srid,
                *container,
                request.description.clone(),
            )
            .insert(tx)?;
            set.insert(tx)?;
            Ok(table)
        })?;
        self.gpkg.cache().invalidate(&request.table);
        Ok(Pyramid {
            table,
            set,
            created: true,
            tiles_moved: 0,
        })
    }

    /// Grow the container of an existing pyramid to include `extent`
    fn extend_pyramid(
        &self,
        request: &PyramidRequest,
        extent: &BoundingBox,
        table: TileTable,
        set: TileMatrixSet,
    ) -> Result<Pyramid, PyramidError> {
        let matrices = self.gpkg.matrices(&request.table)?;
        let old = set.bbox;
        let existing_min_zoom = matrices.min_zoom().unwrap_or(request.min_zoom);
        let align_zoom = existing_min_zoom.min(request.min_zoom);
        let requested = self.container(request.mode, extent, align_zoom)?;
        let mut new = old.union(&requested);
        if request.mode == PyramidMode::DataBounded
            && self.grid.is_aligned(&old, existing_min_zoom, self.tolerance)
        {
            if let Some(aligned) = self.grid.aligned_extent(&new, align_zoom, self.tolerance) {
                new = aligned;
            }
        }
        if new.approx_eq(&old, EXTENT_EPSILON) {
            return Ok(Pyramid {
                table,
                set,
                created: false,
                tiles_moved: 0,
            });
        }

        info!(
            "{}: extending pyramid from {:?} to {:?}",
            request.table, old, new
        );
        let mut set = set;
        set.bbox = new;
        let result = self.gpkg.transaction(|tx| {
            let remap = |zoom: u8, old_dims: (u32, u32), new_dims: (u32, u32)| {
                let mut moved = 0;
                for (id, key) in table.keys_descending(tx, zoom)? {
                    let cell = tile_bounding_box(
                        &old,
                        old_dims.0,
                        old_dims.1,
                        key.tile_column,
                        key.tile_row,
                    );
                    let (x, y) = cell.centroid();
                    let new_column = column(&new, new_dims.0, x);
                    let new_row = row(&new, new_dims.1, y);
                    if new_column != key.tile_column || new_row != key.tile_row {
                        table.update_position(tx, id, new_column, new_row)?;
                        moved += 1;
                    }
                }
                Ok::<u64, StoreError>(moved)
            };
            let mut moved = 0;
            for matrix in matrices.iter() {
                let extended = matrix.extended(&old, &new);
                moved += remap(
                    matrix.zoom_level,
                    (matrix.matrix_width, matrix.matrix_height),
                    (extended.matrix_width, extended.matrix_height),
                )?;
                debug!(
                    "{}: level {} resized from {}x{} to {}x{}",
                    request.table,
                    matrix.zoom_level,
                    matrix.matrix_width,
                    matrix.matrix_height,
                    extended.matrix_width,
                    extended.matrix_height
                );
                extended.update(tx)?;
            }
            // rows of levels without tile matrix, placed like a build would place them
            for zoom in table.zoom_levels(tx)? {
                if matrices.get(zoom).is_some() {
                    continue;
                }
                warn!(
                    "{}: level {} has tiles without tile matrix",
                    request.table, zoom
                );
                moved += remap(
                    zoom,
                    self.grid.matrix_dimensions(&old, zoom),
                    self.grid.matrix_dimensions(&new, zoom),
                )?;
            }
            set.update(tx)?;
            Ok(moved)
        });
        self.gpkg.cache().invalidate(&request.table);
        let moved = result?;
        info!("{}: {} tiles moved", request.table, moved);
        Ok(Pyramid {
            table,
            set,
            created: false,
            tiles_moved: moved,
        })
    }

    /// Matrix dimensions of a level without tile matrix
    fn level_dimensions(
        &self,
        mode: PyramidMode,
        container: &BoundingBox,
        zoom: u8,
    ) -> (u32, u32) {
        match mode {
            PyramidMode::GloballyAligned
                if container.approx_eq(&self.grid.extent, EXTENT_EPSILON) =>
            {
                self.grid.level_dimensions(zoom)
            }
            _ => self.grid.matrix_dimensions(container, zoom),
        }
    }

    fn generate_levels(
        &self,
        request: &PyramidRequest,
        extent: &BoundingBox,
        pyramid: &Pyramid,
        source: &dyn TileSource,
        progress: &mut dyn ProgressSink,
        result: &mut Progress,
        stats: &mut Statistics,
    ) -> Result<(), PyramidError> {
        let table_name = &request.table;
        let container = &pyramid.set.bbox;
        let world = &self.grid.extent;
        let matrices = self.gpkg.matrices(table_name)?;

        let mut total = 0;
        for zoom in request.min_zoom..=request.max_zoom {
            let (n, _) = self.grid.level_dimensions(zoom);
            if let Some(grid) = tile_grid_with_tolerance(world, n, n, extent, self.tolerance) {
                total += grid.count();
            }
        }
        progress.set_total(total);

        let conn = self.gpkg.conn()?;
        for zoom in request.min_zoom..=request.max_zoom {
            if !progress.is_active() {
                result.cancelled = true;
                break;
            }
            debug!("{}: {:?}", table_name, GenerateState::GeneratingZoom(zoom));
            let existing = matrices.get(zoom);
            let (matrix_width, matrix_height) = match existing {
                Some(matrix) => (matrix.matrix_width, matrix.matrix_height),
                None => self.level_dimensions(request.mode, container, zoom),
            };
            let (n, _) = self.grid.level_dimensions(zoom);
            let grid = match tile_grid_with_tolerance(world, n, n, extent, self.tolerance) {
                Some(grid) => grid,
                None => continue,
            };
            debug!(
                "{}: level {} tiles {:?} into {}x{} matrix",
                table_name, zoom, grid, matrix_width, matrix_height
            );
            let mut level = Level {
                zoom,
                grid,
                matrix_width,
                matrix_height,
                tile_size: existing.map(|m| (m.tile_width, m.tile_height)),
                written: 0,
            };

            let fetched = self.fetch_level(
                table_name, &mut level, pyramid, &conn, source, progress, result, stats,
            );
            // partially written levels are finished before a storage fault is reported
            let finished = if existing.is_none() {
                self.finish_level(table_name, &level, pyramid, &conn, result)
            } else {
                Ok(())
            };
            if let Err(e) = fetched {
                if let Err(finish_error) = finished {
                    error!(
                        "{}: finishing level {} failed: {}",
                        table_name, zoom, finish_error
                    );
                }
                return Err(e.into());
            }
            finished?;
            info!(
                "{}: level {} finished, {} tiles written",
                table_name, zoom, level.written
            );
            if result.cancelled {
                break;
            }
        }
        Ok(())
    }

    /// Fetch and store the tiles of one level
    fn fetch_level(
        &self,
        table_name: &str,
        level: &mut Level,
        pyramid: &Pyramid,
        conn: &Connection,
        source: &dyn TileSource,
        progress: &mut dyn ProgressSink,
        result: &mut Progress,
        stats: &mut Statistics,
    ) -> Result<(), StoreError> {
        let world = &self.grid.extent;
        let container = &pyramid.set.bbox;
        let (n, _) = self.grid.level_dimensions(level.zoom);
        for (x, y) in level.grid.iter() {
            if !progress.is_active() {
                result.cancelled = true;
                break;
            }
            match source.tile(level.zoom, x, y) {
                None => {
                    let e = PyramidError::TileDecode {
                        zoom: level.zoom,
                        column: x,
                        row: y,
                    };
                    debug!("{}: {}", table_name, e);
                    result.skipped += 1;
                }
                Some(data) => {
                    if level.tile_size.is_none() {
                        level.tile_size = self.decoder.dimensions(&data);
                    }
                    let (cx, cy) = tile_bounding_box(world, n, n, x, y).centroid();
                    let key = TileKey::new(
                        level.zoom,
                        column(container, level.matrix_width, cx),
                        row(container, level.matrix_height, cy),
                    );
                    pyramid.table.replace_tile(conn, &key, &data)?;
                    stats.add(
                        format!("tile_bytes.{}.{}", table_name, level.zoom),
                        data.len() as u64,
                    );
                    result.written += 1;
                    level.written += 1;
                }
            }
            progress.add_progress(1);
        }
        Ok(())
    }

    /// Tile matrix of a new level, or removal of its rows without tile size
    fn finish_level(
        &self,
        table_name: &str,
        level: &Level,
        pyramid: &Pyramid,
        conn: &Connection,
        result: &mut Progress,
    ) -> Result<(), StoreError> {
        match level.tile_size {
            Some((tile_width, tile_height)) => {
                if level.written > 0 {
                    TileMatrix::new(
                        table_name,
                        level.zoom,
                        &pyramid.set.bbox,
                        level.matrix_width,
                        level.matrix_height,
                        tile_width,
                        tile_height,
                    )
                    .insert(conn)?;
                    self.gpkg.cache().invalidate(table_name);
                }
            }
            None => {
                let deleted = pyramid.table.delete_zoom_level(conn, level.zoom)?;
                if level.written > 0 {
                    warn!(
                        "{}: no tile size at level {}, {} tiles discarded",
                        table_name, level.zoom, deleted
                    );
                }
                result.written -= level.written;
                result.discarded.push(level.zoom);
            }
        }
        Ok(())
    }

    fn update_contents(&self, pyramid: &Pyramid, extent: &BoundingBox) -> Result<(), StoreError> {
        let table = &pyramid.table.name;
        let contents = self.gpkg.contents(table)?;
        let data_extent = match contents.and_then(|c| c.bbox) {
            Some(bbox) if !pyramid.created => bbox.union(extent),
            _ => *extent,
        };
        let data_extent = pyramid.set.bbox.overlap(&data_extent).unwrap_or(pyramid.set.bbox);
        let conn = self.gpkg.conn()?;
        Contents::update_extent(&conn, table, &data_extent)
    }

    fn drop_created(&self, table: &str) {
        if let Err(e) = self.gpkg.drop_pyramid(table) {
            error!("{}: removing table failed: {}", table, e);
        }
    }

    fn report(
        &self,
        request: &PyramidRequest,
        pyramid: Pyramid,
        result: Progress,
        stats: Statistics,
        table_dropped: bool,
    ) -> GenerateReport {
        let state = if result.cancelled {
            GenerateState::Cancelled
        } else {
            GenerateState::Completed
        };
        debug!("{}: {:?}", request.table, state);
        GenerateReport {
            table: request.table.clone(),
            state,
            tiles_written: if table_dropped { 0 } else { result.written },
            tiles_skipped: result.skipped,
            levels_discarded: result.discarded,
            tiles_moved: pyramid.tiles_moved,
            bbox: pyramid.set.bbox,
            table_dropped,
            stats,
        }
    }
}
