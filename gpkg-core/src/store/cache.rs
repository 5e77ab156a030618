//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::store::error::StoreError;
use crate::store::matrix::TileMatrices;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

struct CacheState {
    /// Bumped by every invalidation
    generation: u64,
    tables: HashMap<String, Arc<TileMatrices>>,
}

/// Read-mostly cache of the tile matrices of each table.
///
/// A single mutex guards the map and nothing else. Lookups clone an `Arc`
/// and release the lock, loading from the database happens unlocked. A load
/// racing with an invalidation is returned to its caller but not cached.
pub struct MatrixCache {
    state: Mutex<CacheState>,
}

impl MatrixCache {
    pub fn new() -> MatrixCache {
        MatrixCache {
            state: Mutex::new(CacheState {
                generation: 0,
                tables: HashMap::new(),
            }),
        }
    }
    fn lock(&self) -> MutexGuard<CacheState> {
        // The map stays consistent even if a holder panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
    pub fn get(&self, table: &str) -> Option<Arc<TileMatrices>> {
        self.lock().tables.get(table).cloned()
    }
    pub fn get_or_load<F>(&self, table: &str, load: F) -> Result<Arc<TileMatrices>, StoreError>
    where
        F: FnOnce() -> Result<TileMatrices, StoreError>,
    {
        let generation = {
            let state = self.lock();
            if let Some(matrices) = state.tables.get(table) {
                return Ok(matrices.clone());
            }
            state.generation
        };
        let matrices = Arc::new(load()?);
        let mut state = self.lock();
        if state.generation == generation {
            let cached = state
                .tables
                .entry(table.to_string())
                .or_insert_with(|| matrices.clone());
            Ok(cached.clone())
        } else {
            debug!("Matrix cache of '{}' invalidated while loading", table);
            Ok(matrices)
        }
    }
    pub fn invalidate(&self, table: &str) {
        let mut state = self.lock();
        state.generation += 1;
        state.tables.remove(table);
    }
    pub fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.tables.clear();
    }
    pub fn len(&self) -> usize {
        self.lock().tables.len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MatrixCache {
    fn default() -> Self {
        MatrixCache::new()
    }
}
