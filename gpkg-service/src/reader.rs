//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use gpkg_core::store::{
    GeoPackage, StoreError, TileKey, TileMatrices, TileMatrix, TileMatrixSet, TileRow, TileTable,
};
use std::sync::Arc;
use tile_grid::{bounding_box, tile_grid_with_tolerance, BoundingBox, TileGrid, DEFAULT_TOLERANCE};

/// Tile access of a pyramid.
///
/// Every query takes its own pooled connection, tile matrices are shared
/// through the matrix cache of the GeoPackage. Readers can be opened and
/// used from any number of threads while a build extends the pyramid.
#[derive(Clone)]
pub struct PyramidReader {
    gpkg: GeoPackage,
    table: TileTable,
}

impl PyramidReader {
    pub fn open(gpkg: &GeoPackage, table: &str) -> Result<PyramidReader, StoreError> {
        if gpkg.matrix_set(table)?.is_none() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }
        let table = gpkg.tile_table(table)?;
        Ok(PyramidReader {
            gpkg: gpkg.clone(),
            table,
        })
    }
    pub fn table_name(&self) -> &str {
        &self.table.name
    }
    pub fn tile_table(&self) -> &TileTable {
        &self.table
    }
    pub fn matrix_set(&self) -> Result<TileMatrixSet, StoreError> {
        self.gpkg
            .matrix_set(&self.table.name)?
            .ok_or_else(|| StoreError::TableNotFound(self.table.name.clone()))
    }
    pub fn matrices(&self) -> Result<Arc<TileMatrices>, StoreError> {
        self.gpkg.matrices(&self.table.name)
    }
    pub fn matrix(&self, zoom: u8) -> Result<Option<TileMatrix>, StoreError> {
        Ok(self.matrices()?.get(zoom).cloned())
    }
    pub fn zoom_levels(&self) -> Result<Vec<u8>, StoreError> {
        Ok(self.matrices()?.zoom_levels())
    }
    /// Level with the pixel size closest to `units_per_pixel`.
    ///
    /// Equidistant levels resolve to the coarser one.
    pub fn matrix_for_resolution(
        &self,
        units_per_pixel: f64,
    ) -> Result<Option<TileMatrix>, StoreError> {
        let matrices = self.matrices()?;
        let mut levels: Vec<&TileMatrix> = matrices.iter().collect();
        levels.sort_by(|a, b| {
            b.pixel_x_size
                .partial_cmp(&a.pixel_x_size)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let mut best: Option<(&TileMatrix, f64)> = None;
        for matrix in levels {
            let distance = (matrix.pixel_x_size - units_per_pixel).abs();
            match best {
                Some((_, best_distance)) if !(distance < best_distance) => {}
                _ => best = Some((matrix, distance)),
            }
        }
        Ok(best.map(|(matrix, _)| matrix.clone()))
    }
    pub fn tile_at(&self, zoom: u8, column: u32, row: u32) -> Result<Option<TileRow>, StoreError> {
        let conn = self.gpkg.conn()?;
        self.table.tile(&conn, &TileKey::new(zoom, column, row))
    }
    /// Tiles of `grid`, clipped to the tile matrix of `zoom`
    pub fn tiles_in(
        &self,
        grid: &TileGrid,
        zoom: u8,
    ) -> Result<impl Iterator<Item = TileRow>, StoreError> {
        let clipped = match self.matrix(zoom)? {
            Some(matrix) if matrix.matrix_width > 0 && matrix.matrix_height > 0 => grid
                .intersection(&TileGrid::new(
                    0,
                    0,
                    matrix.matrix_width - 1,
                    matrix.matrix_height - 1,
                )),
            _ => None,
        };
        let tiles = match clipped {
            Some(clipped) => {
                let conn = self.gpkg.conn()?;
                self.table.tiles_in(&conn, zoom, &clipped)?
            }
            None => Vec::new(),
        };
        Ok(tiles.into_iter())
    }
    /// Tiles of level `zoom` covering `bbox`
    pub fn tile_grid(&self, zoom: u8, bbox: &BoundingBox) -> Result<Option<TileGrid>, StoreError> {
        let set = self.matrix_set()?;
        Ok(self.matrix(zoom)?.and_then(|matrix| {
            tile_grid_with_tolerance(
                &set.bbox,
                matrix.matrix_width,
                matrix.matrix_height,
                bbox,
                DEFAULT_TOLERANCE,
            )
        }))
    }
    pub fn count(&self, zoom: Option<u8>) -> Result<u64, StoreError> {
        let conn = self.gpkg.conn()?;
        self.table.count(&conn, zoom)
    }
    /// Extent of the tiles actually present at `zoom`
    pub fn bounding_box_of_present_tiles(
        &self,
        zoom: u8,
    ) -> Result<Option<BoundingBox>, StoreError> {
        let mut conn = self.gpkg.conn()?;
        // container, matrix and tiles from the same snapshot
        let tx = conn.transaction()?;
        let set = TileMatrixSet::read(&tx, &self.table.name)?
            .ok_or_else(|| StoreError::TableNotFound(self.table.name.clone()))?;
        let matrices = TileMatrix::read_all(&tx, &self.table.name)?;
        let matrix = match matrices.get(zoom) {
            Some(matrix) => matrix,
            None => return Ok(None),
        };
        let present = self.table.present_grid(&tx, zoom)?;
        Ok(present.map(|grid| {
            bounding_box(&set.bbox, matrix.matrix_width, matrix.matrix_height, &grid)
        }))
    }
    /// Union of the present tile extents of all levels
    pub fn bounding_box_of_present_tiles_all(&self) -> Result<Option<BoundingBox>, StoreError> {
        let mut extent: Option<BoundingBox> = None;
        for zoom in self.zoom_levels()? {
            if let Some(bbox) = self.bounding_box_of_present_tiles(zoom)? {
                extent = Some(match extent {
                    Some(e) => e.union(&bbox),
                    None => bbox,
                });
            }
        }
        Ok(extent)
    }
}
