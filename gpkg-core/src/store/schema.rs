//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! GeoPackage table definitions

use crate::store::error::StoreError;
use regex::Regex;
use rusqlite::{params, Connection};

/// 'GPKG' in ASCII
pub const GPKG_APPLICATION_ID: i32 = 0x4750_4B47;
/// GeoPackage 1.3.0
pub const GPKG_USER_VERSION: i32 = 10300;

pub const TILE_MATRIX_SET_TABLE: &str = "gpkg_tile_matrix_set";
pub const TILE_MATRIX_TABLE: &str = "gpkg_tile_matrix";
pub const CONTENTS_TABLE: &str = "gpkg_contents";

pub(crate) const CREATE_CORE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS gpkg_spatial_ref_sys (
  srs_name TEXT NOT NULL,
  srs_id INTEGER NOT NULL PRIMARY KEY,
  organization TEXT NOT NULL,
  organization_coordsys_id INTEGER NOT NULL,
  definition TEXT NOT NULL,
  description TEXT
);
CREATE TABLE IF NOT EXISTS gpkg_contents (
  table_name TEXT NOT NULL PRIMARY KEY,
  data_type TEXT NOT NULL,
  identifier TEXT UNIQUE,
  description TEXT DEFAULT '',
  last_change DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
  min_x DOUBLE,
  min_y DOUBLE,
  max_x DOUBLE,
  max_y DOUBLE,
  srs_id INTEGER,
  CONSTRAINT fk_gc_r_srs_id FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys(srs_id)
);
CREATE TABLE IF NOT EXISTS gpkg_tile_matrix_set (
  table_name TEXT NOT NULL PRIMARY KEY,
  srs_id INTEGER NOT NULL,
  min_x DOUBLE NOT NULL,
  min_y DOUBLE NOT NULL,
  max_x DOUBLE NOT NULL,
  max_y DOUBLE NOT NULL,
  CONSTRAINT fk_gtms_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name),
  CONSTRAINT fk_gtms_srs FOREIGN KEY (srs_id) REFERENCES gpkg_spatial_ref_sys (srs_id)
);
CREATE TABLE IF NOT EXISTS gpkg_tile_matrix (
  table_name TEXT NOT NULL,
  zoom_level INTEGER NOT NULL,
  matrix_width INTEGER NOT NULL,
  matrix_height INTEGER NOT NULL,
  tile_width INTEGER NOT NULL,
  tile_height INTEGER NOT NULL,
  pixel_x_size DOUBLE NOT NULL,
  pixel_y_size DOUBLE NOT NULL,
  CONSTRAINT pk_ttm PRIMARY KEY (table_name, zoom_level),
  CONSTRAINT fk_tmm_table_name FOREIGN KEY (table_name) REFERENCES gpkg_contents(table_name)
);
"#;

const WGS84_WKT: &str = r#"GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]]"#;
const WEB_MERCATOR_WKT: &str = r#"PROJCS["WGS 84 / Pseudo-Mercator",GEOGCS["WGS 84",DATUM["WGS_1984",SPHEROID["WGS 84",6378137,298.257223563,AUTHORITY["EPSG","7030"]],AUTHORITY["EPSG","6326"]],PRIMEM["Greenwich",0,AUTHORITY["EPSG","8901"]],UNIT["degree",0.0174532925199433,AUTHORITY["EPSG","9122"]],AUTHORITY["EPSG","4326"]],PROJECTION["Mercator_1SP"],PARAMETER["central_meridian",0],PARAMETER["scale_factor",1],PARAMETER["false_easting",0],PARAMETER["false_northing",0],UNIT["metre",1,AUTHORITY["EPSG","9001"]],AXIS["X",EAST],AXIS["Y",NORTH],EXTENSION["PROJ4","+proj=merc +a=6378137 +b=6378137 +lat_ts=0.0 +lon_0=0.0 +x_0=0.0 +y_0=0 +k=1.0 +units=m +nadgrids=@null +wktext +no_defs"],AUTHORITY["EPSG","3857"]]"#;

/// Required rows of gpkg_spatial_ref_sys plus Web Mercator
pub(crate) fn seed_spatial_ref_sys(conn: &Connection) -> Result<(), StoreError> {
    let rows = [
        (
            "Undefined cartesian SRS",
            -1,
            "NONE",
            -1,
            "undefined",
            "undefined cartesian coordinate reference system",
        ),
        (
            "Undefined geographic SRS",
            0,
            "NONE",
            0,
            "undefined",
            "undefined geographic coordinate reference system",
        ),
        (
            "WGS 84 geodetic",
            4326,
            "EPSG",
            4326,
            WGS84_WKT,
            "longitude/latitude coordinates in decimal degrees on the WGS 84 spheroid",
        ),
        (
            "WGS 84 / Pseudo-Mercator",
            3857,
            "EPSG",
            3857,
            WEB_MERCATOR_WKT,
            "Spherical Mercator projection used by web maps",
        ),
    ];
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
         (srs_name, srs_id, organization, organization_coordsys_id, definition, description) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for (name, srs_id, org, org_id, definition, description) in rows.iter() {
        stmt.execute(params![name, srs_id, org, org_id, definition, description])?;
    }
    Ok(())
}

/// Register an srs_id unknown to the GeoPackage with an undefined definition
pub fn ensure_srs(conn: &Connection, srs_id: i32) -> Result<(), StoreError> {
    conn.execute(
        "INSERT OR IGNORE INTO gpkg_spatial_ref_sys \
         (srs_name, srs_id, organization, organization_coordsys_id, definition) \
         VALUES (?1, ?2, 'EPSG', ?2, 'undefined')",
        params![format!("EPSG:{}", srs_id), srs_id],
    )?;
    Ok(())
}

lazy_static! {
    static ref TABLE_NAME: Regex = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// Tile table names are used as SQL identifiers and must not need escaping
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    if TABLE_NAME.is_match(name) && !name.to_lowercase().starts_with("gpkg_") {
        Ok(())
    } else {
        Err(StoreError::InvalidTableName(name.to_string()))
    }
}

pub(crate) fn create_tile_table_sql(name: &str) -> String {
    format!(
        r#"CREATE TABLE "{}" (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  zoom_level INTEGER NOT NULL,
  tile_column INTEGER NOT NULL,
  tile_row INTEGER NOT NULL,
  tile_data BLOB NOT NULL,
  UNIQUE (zoom_level, tile_column, tile_row)
)"#,
        name
    )
}

const REQUIRED_COLUMNS: [(&str, &str); 5] = [
    ("id", "INTEGER"),
    ("zoom_level", "INTEGER"),
    ("tile_column", "INTEGER"),
    ("tile_row", "INTEGER"),
    ("tile_data", "BLOB"),
];

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub not_null: bool,
    pub primary_key: bool,
}

/// Column layout of a tile pyramid table.
///
/// Read once with `PRAGMA table_info` when the table is opened and passed by
/// value afterwards.
#[derive(Clone, Debug)]
pub struct TileTable {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

impl TileTable {
    /// Create the table and describe it
    pub fn create(conn: &Connection, name: &str) -> Result<TileTable, StoreError> {
        validate_table_name(name)?;
        conn.execute_batch(&create_tile_table_sql(name))?;
        TileTable::describe(conn, name)
    }
    /// Read the column layout of an existing tile table
    pub fn describe(conn: &Connection, name: &str) -> Result<TileTable, StoreError> {
        validate_table_name(name)?;
        let mut stmt = conn.prepare(&format!(r#"PRAGMA table_info("{}")"#, name))?;
        let columns = stmt
            .query_map([], |row| {
                Ok(ColumnInfo {
                    name: row.get(1)?,
                    data_type: row.get::<_, String>(2)?.to_uppercase(),
                    not_null: row.get::<_, i64>(3)? != 0,
                    primary_key: row.get::<_, i64>(5)? != 0,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        if columns.is_empty() {
            return Err(StoreError::TableNotFound(name.to_string()));
        }
        let table = TileTable {
            name: name.to_string(),
            columns,
        };
        table.verify()?;
        Ok(table)
    }
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|col| col.name == name)
    }
    fn verify(&self) -> Result<(), StoreError> {
        for (name, data_type) in REQUIRED_COLUMNS.iter() {
            match self.column(name) {
                None => {
                    return Err(StoreError::Schema {
                        table: self.name.clone(),
                        detail: format!("missing column '{}'", name),
                    })
                }
                Some(col) if col.data_type != *data_type => {
                    return Err(StoreError::Schema {
                        table: self.name.clone(),
                        detail: format!(
                            "column '{}' has type {}, expected {}",
                            name, col.data_type, data_type
                        ),
                    })
                }
                _ => {}
            }
        }
        if !self.column("id").map_or(false, |col| col.primary_key) {
            return Err(StoreError::Schema {
                table: self.name.clone(),
                detail: "column 'id' is not the primary key".to_string(),
            });
        }
        Ok(())
    }
}
