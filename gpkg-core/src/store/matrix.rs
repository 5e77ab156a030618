//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Tile matrix set and per zoom level tile matrix records

use crate::store::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::btree_map;
use std::collections::BTreeMap;
use tile_grid::BoundingBox;

/// Tolerance of the matrix extent invariant, relative to the container size
pub const MATRIX_EXTENT_TOLERANCE: f64 = 1.0e-10;

/// Container extent and reference system of a tile pyramid
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrixSet {
    pub table_name: String,
    pub srs_id: i32,
    pub bbox: BoundingBox,
}

impl TileMatrixSet {
    pub fn new(table_name: &str, srs_id: i32, bbox: BoundingBox) -> TileMatrixSet {
        TileMatrixSet {
            table_name: table_name.to_string(),
            srs_id,
            bbox,
        }
    }
    pub fn read(conn: &Connection, table: &str) -> Result<Option<TileMatrixSet>, StoreError> {
        let set = conn
            .query_row(
                "SELECT table_name, srs_id, min_x, min_y, max_x, max_y \
                 FROM gpkg_tile_matrix_set WHERE table_name = ?1",
                params![table],
                |row| {
                    Ok(TileMatrixSet {
                        table_name: row.get(0)?,
                        srs_id: row.get(1)?,
                        bbox: BoundingBox::new(row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?),
                    })
                },
            )
            .optional()?;
        Ok(set)
    }
    pub fn insert(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO gpkg_tile_matrix_set (table_name, srs_id, min_x, min_y, max_x, max_y) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                self.table_name,
                self.srs_id,
                self.bbox.minx,
                self.bbox.miny,
                self.bbox.maxx,
                self.bbox.maxy
            ],
        )?;
        Ok(())
    }
    /// Persist the container extent
    pub fn update(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE gpkg_tile_matrix_set SET min_x = ?2, min_y = ?3, max_x = ?4, max_y = ?5 \
             WHERE table_name = ?1",
            params![
                self.table_name,
                self.bbox.minx,
                self.bbox.miny,
                self.bbox.maxx,
                self.bbox.maxy
            ],
        )?;
        Ok(())
    }
    pub fn delete(conn: &Connection, table: &str) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM gpkg_tile_matrix_set WHERE table_name = ?1",
            params![table],
        )?;
        Ok(())
    }
}

/// Tile matrix of one zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrix {
    pub table_name: String,
    pub zoom_level: u8,
    /// Number of columns
    pub matrix_width: u32,
    /// Number of rows
    pub matrix_height: u32,
    /// Tile width in pixels
    pub tile_width: u16,
    /// Tile height in pixels
    pub tile_height: u16,
    /// Ground units per pixel
    pub pixel_x_size: f64,
    pub pixel_y_size: f64,
}

impl TileMatrix {
    /// Matrix covering `container`, pixel sizes derived from its extent
    pub fn new(
        table_name: &str,
        zoom_level: u8,
        container: &BoundingBox,
        matrix_width: u32,
        matrix_height: u32,
        tile_width: u16,
        tile_height: u16,
    ) -> TileMatrix {
        TileMatrix {
            table_name: table_name.to_string(),
            zoom_level,
            matrix_width,
            matrix_height,
            tile_width,
            tile_height,
            pixel_x_size: container.width() / matrix_width as f64 / tile_width as f64,
            pixel_y_size: container.height() / matrix_height as f64 / tile_height as f64,
        }
    }
    /// Matrix of the same resolution after growing the container from `old` to `new`
    pub fn extended(&self, old: &BoundingBox, new: &BoundingBox) -> TileMatrix {
        let matrix_width = (self.matrix_width as f64 * new.width() / old.width())
            .round()
            .max(1.0) as u32;
        let matrix_height = (self.matrix_height as f64 * new.height() / old.height())
            .round()
            .max(1.0) as u32;
        TileMatrix::new(
            &self.table_name,
            self.zoom_level,
            new,
            matrix_width,
            matrix_height,
            self.tile_width,
            self.tile_height,
        )
    }
    /// Whether the matrix spans exactly `container`
    pub fn is_consistent(&self, container: &BoundingBox) -> bool {
        let width =
            self.matrix_width as f64 * self.tile_width as f64 * self.pixel_x_size;
        let height =
            self.matrix_height as f64 * self.tile_height as f64 * self.pixel_y_size;
        let tol_x = MATRIX_EXTENT_TOLERANCE * container.width().abs().max(1.0);
        let tol_y = MATRIX_EXTENT_TOLERANCE * container.height().abs().max(1.0);
        (width - container.width()).abs() <= tol_x && (height - container.height()).abs() <= tol_y
    }
    pub fn read_all(conn: &Connection, table: &str) -> Result<TileMatrices, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT table_name, zoom_level, matrix_width, matrix_height, tile_width, tile_height, \
             pixel_x_size, pixel_y_size FROM gpkg_tile_matrix WHERE table_name = ?1",
        )?;
        let matrices = stmt
            .query_map(params![table], |row| {
                Ok(TileMatrix {
                    table_name: row.get(0)?,
                    zoom_level: row.get(1)?,
                    matrix_width: row.get(2)?,
                    matrix_height: row.get(3)?,
                    tile_width: row.get(4)?,
                    tile_height: row.get(5)?,
                    pixel_x_size: row.get(6)?,
                    pixel_y_size: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let mut levels = TileMatrices::empty(table);
        for matrix in matrices {
            levels.insert(matrix);
        }
        Ok(levels)
    }
    pub fn insert(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO gpkg_tile_matrix (table_name, zoom_level, matrix_width, matrix_height, \
             tile_width, tile_height, pixel_x_size, pixel_y_size) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                self.table_name,
                self.zoom_level,
                self.matrix_width,
                self.matrix_height,
                self.tile_width,
                self.tile_height,
                self.pixel_x_size,
                self.pixel_y_size
            ],
        )?;
        Ok(())
    }
    pub fn update(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE gpkg_tile_matrix SET matrix_width = ?3, matrix_height = ?4, \
             tile_width = ?5, tile_height = ?6, pixel_x_size = ?7, pixel_y_size = ?8 \
             WHERE table_name = ?1 AND zoom_level = ?2",
            params![
                self.table_name,
                self.zoom_level,
                self.matrix_width,
                self.matrix_height,
                self.tile_width,
                self.tile_height,
                self.pixel_x_size,
                self.pixel_y_size
            ],
        )?;
        Ok(())
    }
    pub fn delete(conn: &Connection, table: &str, zoom_level: u8) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM gpkg_tile_matrix WHERE table_name = ?1 AND zoom_level = ?2",
            params![table, zoom_level],
        )?;
        Ok(())
    }
    pub fn delete_all(conn: &Connection, table: &str) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM gpkg_tile_matrix WHERE table_name = ?1",
            params![table],
        )?;
        Ok(())
    }
}

/// Tile matrices of a pyramid ordered by zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct TileMatrices {
    pub table_name: String,
    levels: BTreeMap<u8, TileMatrix>,
}

impl TileMatrices {
    pub fn empty(table_name: &str) -> TileMatrices {
        TileMatrices {
            table_name: table_name.to_string(),
            levels: BTreeMap::new(),
        }
    }
    pub fn insert(&mut self, matrix: TileMatrix) {
        self.levels.insert(matrix.zoom_level, matrix);
    }
    pub fn get(&self, zoom: u8) -> Option<&TileMatrix> {
        self.levels.get(&zoom)
    }
    pub fn min_zoom(&self) -> Option<u8> {
        self.levels.keys().next().cloned()
    }
    pub fn max_zoom(&self) -> Option<u8> {
        self.levels.keys().next_back().cloned()
    }
    pub fn zoom_levels(&self) -> Vec<u8> {
        self.levels.keys().cloned().collect()
    }
    pub fn len(&self) -> usize {
        self.levels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
    /// Matrices from the coarsest to the finest level
    pub fn iter(&self) -> btree_map::Values<u8, TileMatrix> {
        self.levels.values()
    }
}
