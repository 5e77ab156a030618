//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::store::schema::TileTable;
use crate::store::temp_geopackage;
use crate::store::tiles::TileKey;
use tile_grid::TileGrid;

#[test]
fn test_replace_tile() {
    let gpkg = temp_geopackage("replace_tile");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    let key = TileKey::new(3, 2, 5);

    assert!(table.tile(&conn, &key).unwrap().is_none());
    table.replace_tile(&conn, &key, b"first").unwrap();
    table.replace_tile(&conn, &key, b"second").unwrap();
    assert_eq!(table.count(&conn, Some(3)).unwrap(), 1);
    let tile = table.tile(&conn, &key).unwrap().unwrap();
    assert_eq!(tile.key, key);
    assert_eq!(tile.data, b"second".to_vec());

    assert!(table.delete_tile(&conn, &key).unwrap());
    assert!(!table.delete_tile(&conn, &key).unwrap());
    assert_eq!(table.count(&conn, None).unwrap(), 0);
}

#[test]
fn test_unique_key() {
    let gpkg = temp_geopackage("unique_key");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    table.replace_tile(&conn, &TileKey::new(1, 0, 0), b"a").unwrap();
    let err = conn.execute(
        "INSERT INTO imagery (zoom_level, tile_column, tile_row, tile_data) VALUES (1, 0, 0, x'00')",
        [],
    );
    assert!(err.is_err());
}

#[test]
fn test_range_queries() {
    let gpkg = temp_geopackage("range_queries");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    for col in 0..4 {
        for row in 0..4 {
            table
                .replace_tile(&conn, &TileKey::new(2, col, row), &[col as u8, row as u8])
                .unwrap();
        }
    }
    table.replace_tile(&conn, &TileKey::new(1, 1, 1), b"z1").unwrap();

    let tiles = table
        .tiles_in(&conn, 2, &TileGrid::new(1, 2, 2, 3))
        .unwrap();
    let keys: Vec<(u32, u32)> = tiles
        .iter()
        .map(|t| (t.key.tile_column, t.key.tile_row))
        .collect();
    assert_eq!(keys, vec![(1, 2), (2, 2), (1, 3), (2, 3)]);
    assert_eq!(tiles[0].data, vec![1, 2]);

    assert_eq!(table.count(&conn, None).unwrap(), 17);
    assert_eq!(table.count(&conn, Some(2)).unwrap(), 16);
    assert_eq!(table.zoom_levels(&conn).unwrap(), vec![1, 2]);

    let keys = table.keys_descending(&conn, 2).unwrap();
    assert_eq!(keys.len(), 16);
    assert_eq!(keys[0].1, TileKey::new(2, 3, 3));
    assert_eq!(keys[1].1, TileKey::new(2, 2, 3));
    assert_eq!(keys[15].1, TileKey::new(2, 0, 0));
}

#[test]
fn test_present_grid() {
    let gpkg = temp_geopackage("present_grid");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    assert_eq!(table.present_grid(&conn, 4).unwrap(), None);

    table.replace_tile(&conn, &TileKey::new(4, 3, 7), b"a").unwrap();
    table.replace_tile(&conn, &TileKey::new(4, 9, 5), b"b").unwrap();
    table.replace_tile(&conn, &TileKey::new(5, 0, 0), b"c").unwrap();
    assert_eq!(
        table.present_grid(&conn, 4).unwrap(),
        Some(TileGrid::new(3, 5, 9, 7))
    );

    assert_eq!(table.delete_zoom_level(&conn, 4).unwrap(), 2);
    assert_eq!(table.present_grid(&conn, 4).unwrap(), None);
    assert_eq!(table.count(&conn, None).unwrap(), 1);
}

#[test]
fn test_update_position() {
    let gpkg = temp_geopackage("update_position");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    let id = table.replace_tile(&conn, &TileKey::new(2, 0, 0), b"a").unwrap();
    table.update_position(&conn, id, 1, 3).unwrap();
    assert!(table.tile(&conn, &TileKey::new(2, 0, 0)).unwrap().is_none());
    let tile = table.tile(&conn, &TileKey::new(2, 1, 3)).unwrap().unwrap();
    assert_eq!(tile.id, id);
    assert_eq!(tile.data, b"a".to_vec());
}

#[test]
fn test_replace_tile_failed_insert() {
    let gpkg = temp_geopackage("replace_tile_failed_insert");
    let conn = gpkg.conn().unwrap();
    let table = TileTable::create(&conn, "imagery").unwrap();
    let key = TileKey::new(2, 1, 1);
    table.replace_tile(&conn, &key, b"old").unwrap();

    conn.execute_batch(
        "CREATE TRIGGER full_disk BEFORE INSERT ON imagery
         BEGIN SELECT RAISE(ABORT, 'disk full'); END",
    )
    .unwrap();
    assert!(table.replace_tile(&conn, &key, b"new").is_err());
    let tile = table.tile(&conn, &key).unwrap().unwrap();
    assert_eq!(tile.data, b"old".to_vec());
    assert!(conn.is_autocommit());

    // inside an outer transaction
    let replaced = gpkg.transaction(|tx| table.replace_tile(tx, &key, b"new"));
    assert!(replaced.is_err());
    assert_eq!(table.tile(&conn, &key).unwrap().unwrap().data, b"old".to_vec());

    conn.execute_batch("DROP TRIGGER full_disk").unwrap();
    table.replace_tile(&conn, &key, b"new").unwrap();
    assert_eq!(table.tile(&conn, &key).unwrap().unwrap().data, b"new".to_vec());
    assert_eq!(table.count(&conn, None).unwrap(), 1);
}
