//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::store::error::StoreError;
use rusqlite::{params, Connection, OptionalExtension};
use tile_grid::BoundingBox;

pub const TILES_DATA_TYPE: &str = "tiles";

/// Row of `gpkg_contents`
#[derive(Clone, Debug, PartialEq)]
pub struct Contents {
    pub table_name: String,
    pub data_type: String,
    pub identifier: Option<String>,
    pub description: Option<String>,
    /// ISO 8601 timestamp in UTC
    pub last_change: String,
    pub bbox: Option<BoundingBox>,
    pub srs_id: Option<i32>,
}

impl Contents {
    pub fn tiles(
        table_name: &str,
        srs_id: i32,
        bbox: BoundingBox,
        description: Option<String>,
    ) -> Contents {
        Contents {
            table_name: table_name.to_string(),
            data_type: TILES_DATA_TYPE.to_string(),
            identifier: Some(table_name.to_string()),
            description,
            last_change: String::new(),
            bbox: Some(bbox),
            srs_id: Some(srs_id),
        }
    }
    pub fn read(conn: &Connection, table: &str) -> Result<Option<Contents>, StoreError> {
        let contents = conn
            .query_row(
                "SELECT table_name, data_type, identifier, description, last_change, \
                 min_x, min_y, max_x, max_y, srs_id FROM gpkg_contents WHERE table_name = ?1",
                params![table],
                |row| {
                    let minx: Option<f64> = row.get(5)?;
                    let miny: Option<f64> = row.get(6)?;
                    let maxx: Option<f64> = row.get(7)?;
                    let maxy: Option<f64> = row.get(8)?;
                    let bbox = match (minx, miny, maxx, maxy) {
                        (Some(minx), Some(miny), Some(maxx), Some(maxy)) => {
                            Some(BoundingBox::new(minx, miny, maxx, maxy))
                        }
                        _ => None,
                    };
                    Ok(Contents {
                        table_name: row.get(0)?,
                        data_type: row.get(1)?,
                        identifier: row.get(2)?,
                        description: row.get(3)?,
                        last_change: row.get(4)?,
                        bbox,
                        srs_id: row.get(9)?,
                    })
                },
            )
            .optional()?;
        Ok(contents)
    }
    /// Insert with `last_change` set to now
    pub fn insert(&self, conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO gpkg_contents (table_name, data_type, identifier, description, \
             min_x, min_y, max_x, max_y, srs_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                self.table_name,
                self.data_type,
                self.identifier,
                self.description.as_ref().map(|s| s.as_str()).unwrap_or(""),
                self.bbox.map(|b| b.minx),
                self.bbox.map(|b| b.miny),
                self.bbox.map(|b| b.maxx),
                self.bbox.map(|b| b.maxy),
                self.srs_id
            ],
        )?;
        Ok(())
    }
    /// Set the data extent and touch `last_change`
    pub fn update_extent(
        conn: &Connection,
        table: &str,
        bbox: &BoundingBox,
    ) -> Result<(), StoreError> {
        conn.execute(
            "UPDATE gpkg_contents SET min_x = ?2, min_y = ?3, max_x = ?4, max_y = ?5, \
             last_change = strftime('%Y-%m-%dT%H:%M:%fZ','now') WHERE table_name = ?1",
            params![table, bbox.minx, bbox.miny, bbox.maxx, bbox.maxy],
        )?;
        Ok(())
    }
    pub fn delete(conn: &Connection, table: &str) -> Result<(), StoreError> {
        conn.execute(
            "DELETE FROM gpkg_contents WHERE table_name = ?1",
            params![table],
        )?;
        Ok(())
    }
}
