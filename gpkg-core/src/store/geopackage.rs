//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::GeoPackageCfg;
use crate::core::Config;
use crate::store::cache::MatrixCache;
use crate::store::contents::Contents;
use crate::store::error::StoreError;
use crate::store::matrix::{TileMatrices, TileMatrix, TileMatrixSet};
use crate::store::schema::{self, TileTable};
use r2d2;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub type Connection = r2d2::PooledConnection<SqliteConnectionManager>;

const DEFAULT_POOL_SIZE: u16 = 8;
const DEFAULT_CONNECTION_TIMEOUT: u64 = 30_000;
/// Time a connection waits for a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

/// GeoPackage file with a pool of SQLite connections.
///
/// Cloning is cheap and shares the pool and the tile matrix cache, so one
/// handle can be passed to any number of reader threads.
#[derive(Clone)]
pub struct GeoPackage {
    pub path: String,
    pool_size: u16,
    connection_timeout: u64,
    pool: r2d2::Pool<SqliteConnectionManager>,
    cache: Arc<MatrixCache>,
}

impl GeoPackage {
    /// Open a GeoPackage, creating the file and its core tables when missing
    pub fn create(path: &str) -> Result<GeoPackage, StoreError> {
        GeoPackage::connect(path, None, None, true)
    }
    /// Open an existing GeoPackage
    pub fn open(path: &str) -> Result<GeoPackage, StoreError> {
        GeoPackage::connect(path, None, None, false)
    }
    pub fn connect(
        path: &str,
        pool_size: Option<u16>,
        connection_timeout: Option<u64>,
        create: bool,
    ) -> Result<GeoPackage, StoreError> {
        let exists = Path::new(path).exists();
        if !exists && !create {
            return Err(StoreError::NotFound(path.to_string()));
        }
        debug!("Connecting to {}", path);
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| {
                conn.busy_timeout(BUSY_TIMEOUT)?;
                conn.pragma_update(None, "synchronous", "NORMAL")
            });
        let pool_size = pool_size.unwrap_or(DEFAULT_POOL_SIZE);
        let connection_timeout = connection_timeout.unwrap_or(DEFAULT_CONNECTION_TIMEOUT);
        let pool = r2d2::Pool::builder()
            .max_size(pool_size as u32)
            .connection_timeout(Duration::from_millis(connection_timeout))
            .build(manager)
            .map_err(|e| {
                error!("Connection pool manager creation error: {}", e);
                e
            })?;
        let gpkg = GeoPackage {
            path: path.to_string(),
            pool_size,
            connection_timeout,
            pool,
            cache: Arc::new(MatrixCache::new()),
        };
        gpkg.init_schema()?;
        if !exists {
            info!("Created GeoPackage {}", path);
        }
        Ok(gpkg)
    }
    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.conn()?;
        // Readers never see a half-written transaction and do not block the writer
        let mode = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        if !mode.eq_ignore_ascii_case("wal") {
            warn!("{}: journal_mode {} instead of WAL", self.path, mode);
        }
        let application_id: i32 = conn.query_row("PRAGMA application_id", [], |row| row.get(0))?;
        if application_id == 0 {
            conn.pragma_update(None, "application_id", schema::GPKG_APPLICATION_ID)?;
            conn.pragma_update(None, "user_version", schema::GPKG_USER_VERSION)?;
        } else if application_id != schema::GPKG_APPLICATION_ID {
            warn!(
                "{}: unexpected application_id {:#x}",
                self.path, application_id
            );
        }
        conn.execute_batch(schema::CREATE_CORE_TABLES)?;
        schema::seed_spatial_ref_sys(&conn)?;
        Ok(())
    }
    /// Pooled connection
    pub fn conn(&self) -> Result<Connection, StoreError> {
        self.pool.get().map_err(|e| {
            error!("Connection pool error: {}", e);
            StoreError::from(e)
        })
    }
    /// Run `f` in a write transaction. Commits on `Ok`, rolls back otherwise.
    pub fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction) -> Result<T, StoreError>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }
    pub fn cache(&self) -> &MatrixCache {
        &self.cache
    }
    pub fn pool_size(&self) -> u16 {
        self.pool_size
    }
    /// Register a spatial reference system id unknown to the GeoPackage
    pub fn ensure_srs(&self, srs_id: i32) -> Result<(), StoreError> {
        let conn = self.conn()?;
        schema::ensure_srs(&conn, srs_id)
    }
    /// Names of all tile pyramids
    pub fn tile_tables(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT c.table_name FROM gpkg_contents c \
             JOIN gpkg_tile_matrix_set s ON s.table_name = c.table_name \
             WHERE c.data_type = 'tiles' ORDER BY c.table_name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }
    pub fn matrix_set(&self, table: &str) -> Result<Option<TileMatrixSet>, StoreError> {
        let conn = self.conn()?;
        TileMatrixSet::read(&conn, table)
    }
    pub fn contents(&self, table: &str) -> Result<Option<Contents>, StoreError> {
        let conn = self.conn()?;
        Contents::read(&conn, table)
    }
    /// Column layout of an existing tile table
    pub fn tile_table(&self, table: &str) -> Result<TileTable, StoreError> {
        let conn = self.conn()?;
        TileTable::describe(&conn, table)
    }
    /// Tile matrices of `table`, shared through the matrix cache
    pub fn matrices(&self, table: &str) -> Result<Arc<TileMatrices>, StoreError> {
        self.cache.get_or_load(table, || {
            let conn = self.conn()?;
            TileMatrix::read_all(&conn, table)
        })
    }
    /// Remove a tile table with all its metadata
    pub fn drop_pyramid(&self, table: &str) -> Result<(), StoreError> {
        schema::validate_table_name(table)?;
        info!("Dropping tile pyramid '{}'", table);
        let result = self.transaction(|tx| {
            tx.execute_batch(&format!(r#"DROP TABLE IF EXISTS "{}""#, table))?;
            TileMatrix::delete_all(tx, table)?;
            TileMatrixSet::delete(tx, table)?;
            Contents::delete(tx, table)?;
            Ok(())
        });
        self.cache.invalidate(table);
        result
    }
}

impl<'a> Config<'a, GeoPackageCfg> for GeoPackage {
    fn from_config(cfg: &GeoPackageCfg) -> Result<Self, String> {
        GeoPackage::connect(&cfg.path, cfg.pool, cfg.connection_timeout, true)
            .map_err(|e| format!("{}", e))
    }
    fn gen_config() -> String {
        let toml = r#"
[geopackage]
# GeoPackage file, created when missing
path = "tiles.gpkg"
# Maximal number of pooled SQLite connections
#pool = 8
# Milliseconds to wait for a free connection
#connection_timeout = 30000
"#;
        toml.to_string()
    }
    fn gen_runtime_config(&self) -> String {
        format!(
            r#"
[geopackage]
path = "{}"
pool = {}
connection_timeout = {}
"#,
            self.path, self.pool_size, self.connection_timeout
        )
    }
}
