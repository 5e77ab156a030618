//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("GeoPackage file '{0}' not found")]
    NotFound(String),
    #[error("Tile table '{0}' not found")]
    TableNotFound(String),
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),
    #[error("Table '{table}': {detail}")]
    Schema { table: String, detail: String },
}
