//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::generator::{PyramidGenerator, PyramidMode, PyramidRequest};
use crate::progress::NoProgress;
use crate::reader::PyramidReader;
use crate::test_utils::*;
use gpkg_core::store::{GeoPackage, StoreError, TileKey};
use std::thread;
use tile_grid::{BoundingBox, Grid, TileGrid};

fn world_pyramid(name: &str, max_zoom: u8) -> GeoPackage {
    let gpkg = temp_gpkg(name);
    let request = PyramidRequest {
        table: "world".to_string(),
        min_zoom: 0,
        max_zoom,
        bbox: BoundingBox::new(-180.0, -90.0, 180.0, 90.0),
        srid: 4326,
        mode: PyramidMode::GloballyAligned,
        description: None,
    };
    let source = |_z: u8, x: u32, y: u32| Some(marked_tile(x, y));
    PyramidGenerator::new(&gpkg, Grid::wgs84())
        .generate(&request, &source, &mut NoProgress)
        .unwrap();
    gpkg
}

#[test]
fn test_open() {
    let gpkg = world_pyramid("reader_open", 1);
    let reader = PyramidReader::open(&gpkg, "world").unwrap();
    assert_eq!(reader.table_name(), "world");
    assert_eq!(reader.zoom_levels().unwrap(), vec![0, 1]);
    assert_eq!(reader.count(None).unwrap(), 5);
    assert!(matches!(
        PyramidReader::open(&gpkg, "unknown"),
        Err(StoreError::TableNotFound(_))
    ));
}

#[test]
fn test_matrix_for_resolution() {
    let gpkg = world_pyramid("reader_resolution", 2);
    let reader = PyramidReader::open(&gpkg, "world").unwrap();
    let (z0, z1, z2) = (360.0 / 256.0, 180.0 / 256.0, 90.0 / 256.0);

    let exact = reader.matrix_for_resolution(z1).unwrap().unwrap();
    assert_eq!(exact.zoom_level, 1);
    let between = reader.matrix_for_resolution(z2 * 1.1).unwrap().unwrap();
    assert_eq!(between.zoom_level, 2);
    assert_eq!(
        reader.matrix_for_resolution(1000.0).unwrap().unwrap().zoom_level,
        0
    );
    assert_eq!(
        reader.matrix_for_resolution(0.0001).unwrap().unwrap().zoom_level,
        2
    );
    // equidistant to level 0 and 1
    let tie = reader
        .matrix_for_resolution((z0 + z1) / 2.0)
        .unwrap()
        .unwrap();
    assert_eq!(tie.zoom_level, 0);
}

#[test]
fn test_tile_access() {
    let gpkg = world_pyramid("reader_tiles", 2);
    let reader = PyramidReader::open(&gpkg, "world").unwrap();
    let tile = reader.tile_at(2, 3, 1).unwrap().unwrap();
    assert_eq!(tile.key, TileKey::new(2, 3, 1));
    assert_eq!(marker(&tile.data), (3, 1));
    assert!(reader.tile_at(2, 4, 0).unwrap().is_none());
    assert!(reader.tile_at(5, 0, 0).unwrap().is_none());

    // clipped to the 4x4 matrix
    let tiles: Vec<_> = reader
        .tiles_in(&TileGrid::new(2, 2, 10, 10), 2)
        .unwrap()
        .map(|t| (t.key.tile_column, t.key.tile_row))
        .collect();
    assert_eq!(tiles, vec![(2, 2), (3, 2), (2, 3), (3, 3)]);
    assert_eq!(
        reader
            .tiles_in(&TileGrid::new(5, 5, 6, 6), 2)
            .unwrap()
            .count(),
        0
    );
    assert_eq!(
        reader
            .tiles_in(&TileGrid::new(0, 0, 1, 1), 7)
            .unwrap()
            .count(),
        0
    );

    assert_eq!(
        reader
            .tile_grid(2, &BoundingBox::new(0.0, 0.0, 10.0, 10.0))
            .unwrap(),
        Some(TileGrid::new(2, 1, 2, 1))
    );
    assert_eq!(
        reader
            .tile_grid(9, &BoundingBox::new(0.0, 0.0, 10.0, 10.0))
            .unwrap(),
        None
    );
}

#[test]
fn test_present_tiles() {
    let gpkg = world_pyramid("reader_present", 2);
    let reader = PyramidReader::open(&gpkg, "world").unwrap();
    assert_eq!(
        reader.bounding_box_of_present_tiles(2).unwrap(),
        Some(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
    );

    // keep the two tiles of the upper right quarter at level 2
    let conn = gpkg.conn().unwrap();
    for (column, row) in TileGrid::new(0, 0, 3, 3).iter() {
        if !(column >= 2 && row == 0) {
            reader
                .tile_table()
                .delete_tile(&conn, &TileKey::new(2, column, row))
                .unwrap();
        }
    }
    assert_eq!(
        reader.bounding_box_of_present_tiles(2).unwrap(),
        Some(BoundingBox::new(0.0, 45.0, 180.0, 90.0))
    );
    assert_eq!(
        reader.bounding_box_of_present_tiles_all().unwrap(),
        Some(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
    );

    reader.tile_table().delete_zoom_level(&conn, 2).unwrap();
    assert_eq!(reader.bounding_box_of_present_tiles(2).unwrap(), None);
    assert_eq!(reader.bounding_box_of_present_tiles(12).unwrap(), None);

    reader.tile_table().delete_zoom_level(&conn, 0).unwrap();
    reader.tile_table().delete_zoom_level(&conn, 1).unwrap();
    assert_eq!(reader.bounding_box_of_present_tiles_all().unwrap(), None);
}

#[test]
fn test_concurrent_readers() {
    let gpkg = world_pyramid("reader_concurrent", 3);
    let handles: Vec<_> = (0..32)
        .map(|i| {
            let gpkg = gpkg.clone();
            thread::spawn(move || {
                let reader = PyramidReader::open(&gpkg, "world").unwrap();
                let zoom = (i % 4) as u8;
                let matrix = reader.matrix(zoom).unwrap().unwrap();
                assert_eq!(matrix.matrix_width, 1 << zoom);
                let n = reader.count(Some(zoom)).unwrap();
                let tiles = reader
                    .tiles_in(&TileGrid::new(0, 0, 7, 7), zoom)
                    .unwrap()
                    .count() as u64;
                assert_eq!(n, tiles);
                n
            })
        })
        .collect();
    let total: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(total, 8 * (1 + 4 + 16 + 64));
}

#[test]
fn test_read_while_extending() {
    let gpkg = temp_gpkg("reader_extending");
    let grid = user_grid();
    let first = PyramidRequest {
        table: "growing".to_string(),
        min_zoom: 2,
        max_zoom: 3,
        bbox: BoundingBox::new(10.0, 0.0, 40.0, 30.0),
        srid: 2056,
        mode: PyramidMode::DataBounded,
        description: None,
    };
    let source = |_z: u8, x: u32, y: u32| Some(marked_tile(x, y));
    PyramidGenerator::new(&gpkg, grid.clone())
        .generate(&first, &source, &mut NoProgress)
        .unwrap();

    let readers: Vec<_> = (0..16)
        .map(|_| {
            let gpkg = gpkg.clone();
            thread::spawn(move || {
                for _ in 0..10 {
                    let reader = PyramidReader::open(&gpkg, "growing").unwrap();
                    let present = reader.bounding_box_of_present_tiles(3).unwrap().unwrap();
                    // the data never moves on the ground
                    assert!(present.approx_eq(&BoundingBox::new(10.0, 0.0, 40.0, 30.0), 1e-9));
                    assert_eq!(reader.count(Some(3)).unwrap(), 36);
                }
            })
        })
        .collect();

    let second = PyramidRequest {
        bbox: BoundingBox::new(0.0, 30.0, 10.0, 40.0),
        max_zoom: 2,
        ..first
    };
    let none = |_z: u8, _x: u32, _y: u32| None;
    PyramidGenerator::new(&gpkg, grid)
        .generate(&second, &none, &mut NoProgress)
        .unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
}
