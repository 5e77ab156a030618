//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::GeoPackageCfg;
use crate::core::Config;
use crate::store::contents::Contents;
use crate::store::matrix::{TileMatrix, TileMatrixSet};
use crate::store::schema::{validate_table_name, TileTable};
use crate::store::tiles::TileKey;
use crate::store::{temp_geopackage, GeoPackage, StoreError};
use tile_grid::BoundingBox;

fn create_pyramid(gpkg: &GeoPackage, table: &str) -> TileTable {
    let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
    gpkg.transaction(|tx| {
        let tile_table = TileTable::create(tx, table)?;
        Contents::tiles(table, 4326, bbox, None).insert(tx)?;
        TileMatrixSet::new(table, 4326, bbox).insert(tx)?;
        Ok(tile_table)
    })
    .unwrap()
}

#[test]
fn test_create_core_tables() {
    let gpkg = temp_geopackage("core_tables");
    let conn = gpkg.conn().unwrap();
    let application_id: i32 = conn
        .query_row("PRAGMA application_id", [], |row| row.get(0))
        .unwrap();
    assert_eq!(application_id, 0x47504B47);
    let user_version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(user_version, 10300);
    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode", [], |row| row.get(0))
        .unwrap();
    assert_eq!(journal_mode.to_lowercase(), "wal");
    let srs_ids: Vec<i32> = conn
        .prepare("SELECT srs_id FROM gpkg_spatial_ref_sys ORDER BY srs_id")
        .unwrap()
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(srs_ids, vec![-1, 0, 3857, 4326]);
    assert!(gpkg.tile_tables().unwrap().is_empty());
}

#[test]
fn test_reopen() {
    let gpkg = temp_geopackage("reopen");
    create_pyramid(&gpkg, "imagery");
    let path = gpkg.path.clone();
    drop(gpkg);

    let gpkg = GeoPackage::open(&path).unwrap();
    assert_eq!(gpkg.tile_tables().unwrap(), vec!["imagery".to_string()]);
    // seeding twice does not duplicate
    let conn = gpkg.conn().unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM gpkg_spatial_ref_sys", [], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(count, 4);
}

#[test]
fn test_open_missing() {
    let path = std::env::temp_dir().join("gpkg_core_does_not_exist.gpkg");
    match GeoPackage::open(&path.to_string_lossy()) {
        Err(StoreError::NotFound(p)) => assert!(p.ends_with("gpkg_core_does_not_exist.gpkg")),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("missing file opened"),
    }
}

#[test]
fn test_ensure_srs() {
    let gpkg = temp_geopackage("ensure_srs");
    gpkg.ensure_srs(2056).unwrap();
    gpkg.ensure_srs(2056).unwrap();
    gpkg.ensure_srs(4326).unwrap();
    let conn = gpkg.conn().unwrap();
    let (name, definition): (String, String) = conn
        .query_row(
            "SELECT srs_name, definition FROM gpkg_spatial_ref_sys WHERE srs_id = 2056",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(name, "EPSG:2056");
    assert_eq!(definition, "undefined");
    let wgs84: String = conn
        .query_row(
            "SELECT srs_name FROM gpkg_spatial_ref_sys WHERE srs_id = 4326",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(wgs84, "WGS 84 geodetic");
}

#[test]
fn test_table_names() {
    assert!(validate_table_name("imagery").is_ok());
    assert!(validate_table_name("_tiles_2019").is_ok());
    assert!(validate_table_name("2019").is_err());
    assert!(validate_table_name("tiles; DROP TABLE x").is_err());
    assert!(validate_table_name("my tiles").is_err());
    assert!(validate_table_name("").is_err());
    assert!(validate_table_name("gpkg_tile_matrix").is_err());
}

#[test]
fn test_describe_table() {
    let gpkg = temp_geopackage("describe");
    let table = create_pyramid(&gpkg, "imagery");
    assert_eq!(table.name, "imagery");
    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["id", "zoom_level", "tile_column", "tile_row", "tile_data"]
    );
    assert!(table.column("id").unwrap().primary_key);
    assert!(table.column("tile_data").unwrap().not_null);

    let conn = gpkg.conn().unwrap();
    match TileTable::describe(&conn, "missing") {
        Err(StoreError::TableNotFound(name)) => assert_eq!(name, "missing"),
        other => panic!("unexpected {:?}", other.map(|t| t.name)),
    }
    conn.execute_batch("CREATE TABLE broken (id INTEGER PRIMARY KEY, zoom_level INTEGER)")
        .unwrap();
    match TileTable::describe(&conn, "broken") {
        Err(StoreError::Schema { table, detail }) => {
            assert_eq!(table, "broken");
            assert_eq!(detail, "missing column 'tile_column'");
        }
        other => panic!("unexpected {:?}", other.map(|t| t.name)),
    }
}

#[test]
fn test_transaction_rollback() {
    let gpkg = temp_geopackage("rollback");
    let table = create_pyramid(&gpkg, "imagery");
    let result: Result<(), StoreError> = gpkg.transaction(|tx| {
        table.replace_tile(tx, &TileKey::new(0, 0, 0), b"tile")?;
        Err(StoreError::InvalidTableName("abort".to_string()))
    });
    assert!(result.is_err());
    let conn = gpkg.conn().unwrap();
    assert_eq!(table.count(&conn, None).unwrap(), 0);
}

#[test]
fn test_drop_pyramid() {
    let gpkg = temp_geopackage("drop");
    let table = create_pyramid(&gpkg, "imagery");
    {
        let conn = gpkg.conn().unwrap();
        table
            .replace_tile(&conn, &TileKey::new(0, 0, 0), b"tile")
            .unwrap();
        TileMatrix::new("imagery", 0, &BoundingBox::new(0.0, 0.0, 10.0, 10.0), 1, 1, 256, 256)
            .insert(&conn)
            .unwrap();
    }
    assert_eq!(gpkg.matrices("imagery").unwrap().len(), 1);

    gpkg.drop_pyramid("imagery").unwrap();
    assert!(gpkg.tile_tables().unwrap().is_empty());
    assert!(gpkg.matrix_set("imagery").unwrap().is_none());
    assert!(gpkg.contents("imagery").unwrap().is_none());
    assert!(gpkg.matrices("imagery").unwrap().is_empty());
    match gpkg.tile_table("imagery") {
        Err(StoreError::TableNotFound(_)) => {}
        other => panic!("unexpected {:?}", other.map(|t| t.name)),
    }
}

#[test]
fn test_contents() {
    let gpkg = temp_geopackage("contents");
    create_pyramid(&gpkg, "imagery");
    let contents = gpkg.contents("imagery").unwrap().unwrap();
    assert_eq!(contents.data_type, "tiles");
    assert_eq!(contents.identifier, Some("imagery".to_string()));
    assert_eq!(contents.srs_id, Some(4326));
    assert_eq!(contents.bbox, Some(BoundingBox::new(0.0, 0.0, 10.0, 10.0)));
    assert!(contents.last_change.ends_with('Z'));

    let extent = BoundingBox::new(1.0, 2.0, 3.0, 4.0);
    let conn = gpkg.conn().unwrap();
    Contents::update_extent(&conn, "imagery", &extent).unwrap();
    assert_eq!(gpkg.contents("imagery").unwrap().unwrap().bbox, Some(extent));
}

#[test]
fn test_from_config() {
    let path = std::env::temp_dir().join(format!("gpkg_core_config_{}.gpkg", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let cfg = GeoPackageCfg {
        path: path.to_string_lossy().to_string(),
        pool: Some(2),
        connection_timeout: Some(5000),
    };
    let gpkg = GeoPackage::from_config(&cfg).unwrap();
    assert_eq!(gpkg.pool_size(), 2);
    let runtime = gpkg.gen_runtime_config();
    assert!(runtime.contains("pool = 2"));
    assert!(runtime.contains("connection_timeout = 5000"));
    assert!(GeoPackage::gen_config().starts_with("\n[geopackage]\n"));
}
