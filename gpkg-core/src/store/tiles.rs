//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Tile rows of a pyramid table

use crate::store::error::StoreError;
use crate::store::schema::TileTable;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tile_grid::TileGrid;

/// Unique key of a tile
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub zoom_level: u8,
    pub tile_column: u32,
    pub tile_row: u32,
}

impl TileKey {
    pub fn new(zoom_level: u8, tile_column: u32, tile_row: u32) -> TileKey {
        TileKey {
            zoom_level,
            tile_column,
            tile_row,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TileRow {
    pub id: i64,
    pub key: TileKey,
    pub data: Vec<u8>,
}

fn tile_row(row: &Row) -> rusqlite::Result<TileRow> {
    Ok(TileRow {
        id: row.get(0)?,
        key: TileKey {
            zoom_level: row.get(1)?,
            tile_column: row.get(2)?,
            tile_row: row.get(3)?,
        },
        data: row.get(4)?,
    })
}

impl TileTable {
    pub fn tile(&self, conn: &Connection, key: &TileKey) -> Result<Option<TileRow>, StoreError> {
        let sql = format!(
            r#"SELECT id, zoom_level, tile_column, tile_row, tile_data FROM "{}"
               WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3"#,
            self.name
        );
        let tile = conn
            .query_row(
                &sql,
                params![key.zoom_level, key.tile_column, key.tile_row],
                tile_row,
            )
            .optional()?;
        Ok(tile)
    }
    /// Tiles of `grid` at `zoom` in row-major order
    pub fn tiles_in(
        &self,
        conn: &Connection,
        zoom: u8,
        grid: &TileGrid,
    ) -> Result<Vec<TileRow>, StoreError> {
        let sql = format!(
            r#"SELECT id, zoom_level, tile_column, tile_row, tile_data FROM "{}"
               WHERE zoom_level = ?1 AND tile_column BETWEEN ?2 AND ?3
               AND tile_row BETWEEN ?4 AND ?5
               ORDER BY tile_row, tile_column"#,
            self.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let tiles = stmt
            .query_map(
                params![zoom, grid.min_col, grid.max_col, grid.min_row, grid.max_row],
                tile_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tiles)
    }
    /// Row ids and keys of a level, from the last row and column backwards
    pub fn keys_descending(
        &self,
        conn: &Connection,
        zoom: u8,
    ) -> Result<Vec<(i64, TileKey)>, StoreError> {
        let sql = format!(
            r#"SELECT id, zoom_level, tile_column, tile_row FROM "{}"
               WHERE zoom_level = ?1 ORDER BY tile_row DESC, tile_column DESC"#,
            self.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let keys = stmt
            .query_map(params![zoom], |row| {
                Ok((
                    row.get(0)?,
                    TileKey {
                        zoom_level: row.get(1)?,
                        tile_column: row.get(2)?,
                        tile_row: row.get(3)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
    /// Move a tile to a new column and row
    pub fn update_position(
        &self,
        conn: &Connection,
        id: i64,
        tile_column: u32,
        tile_row: u32,
    ) -> Result<(), StoreError> {
        let sql = format!(
            r#"UPDATE "{}" SET tile_column = ?2, tile_row = ?3 WHERE id = ?1"#,
            self.name
        );
        conn.execute(&sql, params![id, tile_column, tile_row])?;
        Ok(())
    }
    /// Number of tiles, optionally of a single level
    pub fn count(&self, conn: &Connection, zoom: Option<u8>) -> Result<u64, StoreError> {
        let count: i64 = match zoom {
            Some(zoom) => conn.query_row(
                &format!(
                    r#"SELECT COUNT(*) FROM "{}" WHERE zoom_level = ?1"#,
                    self.name
                ),
                params![zoom],
                |row| row.get(0),
            )?,
            None => conn.query_row(
                &format!(r#"SELECT COUNT(*) FROM "{}""#, self.name),
                [],
                |row| row.get(0),
            )?,
        };
        Ok(count as u64)
    }
    /// Distinct zoom levels with tiles
    pub fn zoom_levels(&self, conn: &Connection) -> Result<Vec<u8>, StoreError> {
        let sql = format!(
            r#"SELECT DISTINCT zoom_level FROM "{}" ORDER BY zoom_level"#,
            self.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let levels = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<u8>, _>>()?;
        Ok(levels)
    }
    /// Zoom level and byte size of every tile
    pub fn tile_sizes(&self, conn: &Connection) -> Result<Vec<(u8, u64)>, StoreError> {
        let sql = format!(
            r#"SELECT zoom_level, length(tile_data) FROM "{}" ORDER BY zoom_level"#,
            self.name
        );
        let mut stmt = conn.prepare(&sql)?;
        let sizes = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sizes)
    }
    /// Smallest grid containing all tiles present at `zoom`
    pub fn present_grid(
        &self,
        conn: &Connection,
        zoom: u8,
    ) -> Result<Option<TileGrid>, StoreError> {
        let sql = format!(
            r#"SELECT MIN(tile_column), MIN(tile_row), MAX(tile_column), MAX(tile_row)
               FROM "{}" WHERE zoom_level = ?1"#,
            self.name
        );
        let (min_col, min_row, max_col, max_row): (
            Option<u32>,
            Option<u32>,
            Option<u32>,
            Option<u32>,
        ) = conn.query_row(&sql, params![zoom], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?;
        Ok(match (min_col, min_row, max_col, max_row) {
            (Some(min_col), Some(min_row), Some(max_col), Some(max_row)) => {
                Some(TileGrid::new(min_col, min_row, max_col, max_row))
            }
            _ => None,
        })
    }
    /// Store `data` at `key`, removing any previous tile at the same key.
    ///
    /// Runs in a savepoint: a failed insert keeps the previous tile.
    pub fn replace_tile(
        &self,
        conn: &Connection,
        key: &TileKey,
        data: &[u8],
    ) -> Result<i64, StoreError> {
        let sql = format!(
            r#"INSERT INTO "{}" (zoom_level, tile_column, tile_row, tile_data)
               VALUES (?1, ?2, ?3, ?4)"#,
            self.name
        );
        conn.execute_batch("SAVEPOINT replace_tile")?;
        let replaced = self.delete_tile(conn, key).and_then(|_| {
            conn.execute(
                &sql,
                params![key.zoom_level, key.tile_column, key.tile_row, data],
            )?;
            Ok(conn.last_insert_rowid())
        });
        match replaced {
            Ok(id) => {
                conn.execute_batch("RELEASE replace_tile")?;
                Ok(id)
            }
            Err(e) => {
                if let Err(rollback) =
                    conn.execute_batch("ROLLBACK TO replace_tile; RELEASE replace_tile")
                {
                    warn!("Rollback of tile {:?} failed: {}", key, rollback);
                }
                Err(e)
            }
        }
    }
    /// Returns whether a tile was deleted
    pub fn delete_tile(&self, conn: &Connection, key: &TileKey) -> Result<bool, StoreError> {
        let sql = format!(
            r#"DELETE FROM "{}" WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3"#,
            self.name
        );
        let deleted = conn.execute(&sql, params![key.zoom_level, key.tile_column, key.tile_row])?;
        Ok(deleted > 0)
    }
    /// Returns the number of deleted tiles
    pub fn delete_zoom_level(&self, conn: &Connection, zoom: u8) -> Result<u64, StoreError> {
        let sql = format!(r#"DELETE FROM "{}" WHERE zoom_level = ?1"#, self.name);
        let deleted = conn.execute(&sql, params![zoom])?;
        Ok(deleted as u64)
    }
}
