//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::store::cache::MatrixCache;
use crate::store::matrix::{TileMatrices, TileMatrix};
use crate::store::StoreError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use tile_grid::BoundingBox;

fn matrices(table: &str, levels: u8) -> TileMatrices {
    let container = BoundingBox::new(0.0, 0.0, 1.0, 1.0);
    let mut matrices = TileMatrices::empty(table);
    for zoom in 0..levels {
        matrices.insert(TileMatrix::new(table, zoom, &container, 1, 1, 256, 256));
    }
    matrices
}

#[test]
fn test_load_once() {
    let cache = MatrixCache::new();
    let loads = AtomicUsize::new(0);
    for _ in 0..3 {
        let m = cache
            .get_or_load("t", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(matrices("t", 2))
            })
            .unwrap();
        assert_eq!(m.len(), 2);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);

    cache.invalidate("t");
    assert!(cache.get("t").is_none());
    let m = cache.get_or_load("t", || Ok(matrices("t", 3))).unwrap();
    assert_eq!(m.len(), 3);
}

#[test]
fn test_load_error_not_cached() {
    let cache = MatrixCache::new();
    let result = cache.get_or_load("t", || Err(StoreError::TableNotFound("t".to_string())));
    assert!(result.is_err());
    assert!(cache.is_empty());
}

#[test]
fn test_invalidated_while_loading() {
    let cache = MatrixCache::new();
    let m = cache
        .get_or_load("t", || {
            // metadata changed by a writer during the load
            cache.invalidate("t");
            Ok(matrices("t", 1))
        })
        .unwrap();
    assert_eq!(m.len(), 1);
    assert!(cache.get("t").is_none());
}

#[test]
fn test_concurrent_lookups() {
    let cache = Arc::new(MatrixCache::new());
    let handles: Vec<_> = (0..32)
        .map(|i| {
            let cache = cache.clone();
            thread::spawn(move || {
                for j in 0..100 {
                    let table = format!("t{}", (i + j) % 4);
                    let m = cache
                        .get_or_load(&table, || Ok(matrices(&table, 2)))
                        .unwrap();
                    assert_eq!(m.table_name, table);
                    if j % 10 == 0 {
                        cache.invalidate(&table);
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(cache.len() <= 4);
}
