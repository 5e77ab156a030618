//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! GeoPackage tile storage

pub mod cache;
pub mod contents;
pub mod error;
pub mod geopackage;
pub mod matrix;
pub mod schema;
pub mod tiles;

#[cfg(test)]
mod cache_test;
#[cfg(test)]
mod geopackage_test;
#[cfg(test)]
mod tiles_test;

pub use self::cache::MatrixCache;
pub use self::contents::Contents;
pub use self::error::StoreError;
pub use self::geopackage::GeoPackage;
pub use self::matrix::{TileMatrices, TileMatrix, TileMatrixSet};
pub use self::schema::{validate_table_name, ColumnInfo, TileTable};
pub use self::tiles::{TileKey, TileRow};

#[cfg(test)]
pub(crate) fn temp_geopackage(name: &str) -> GeoPackage {
    let path = std::env::temp_dir().join(format!("gpkg_core_{}_{}.gpkg", name, std::process::id()));
    for suffix in &["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
    GeoPackage::create(&path.to_string_lossy()).expect("create GeoPackage")
}
