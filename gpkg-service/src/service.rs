//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::generator::{GenerateReport, PyramidGenerator, PyramidMode, PyramidRequest};
use crate::progress::{ConsoleProgress, NoProgress, ProgressSink};
use crate::reader::PyramidReader;
use crate::source::{FileTileSource, TileSource};
use gpkg_core::core::config::PyramidCfg;
use gpkg_core::core::stats::Statistics;
use gpkg_core::core::{ApplicationCfg, Config};
use gpkg_core::store::GeoPackage;
use std::fmt::Write;
use tile_grid::{BoundingBox, Grid, DEFAULT_TOLERANCE};

/// Configured pyramid of the service
#[derive(Clone, Debug)]
pub struct Pyramid {
    pub table: String,
    pub minzoom: u8,
    pub maxzoom: u8,
    pub mode: PyramidMode,
    pub extent: Option<BoundingBox>,
    pub extent_srid: Option<i32>,
    pub tolerance: f64,
    pub description: Option<String>,
}

impl<'a> Config<'a, PyramidCfg> for Pyramid {
    fn from_config(cfg: &PyramidCfg) -> Result<Self, String> {
        if cfg.minzoom > cfg.maxzoom {
            return Err(format!(
                "Pyramid '{}': minzoom {} > maxzoom {}",
                cfg.table, cfg.minzoom, cfg.maxzoom
            ));
        }
        Ok(Pyramid {
            table: cfg.table.clone(),
            minzoom: cfg.minzoom,
            maxzoom: cfg.maxzoom,
            mode: PyramidMode::from_name(&cfg.mode)?,
            extent: cfg.extent.as_ref().map(BoundingBox::from),
            extent_srid: cfg.extent_srid,
            tolerance: cfg.tolerance.unwrap_or(DEFAULT_TOLERANCE),
            description: cfg.description.clone(),
        })
    }
    fn gen_config() -> String {
        let toml = r#"
[[pyramid]]
# Tile table name
table = "tiles"
minzoom = 0
maxzoom = 5
# aligned: whole grid extent, bounded: data extent only
mode = "aligned"
# Data extent (default: grid extent)
#extent = { minx = 5.96, miny = 45.82, maxx = 10.49, maxy = 47.81 }
#extent_srid = 4326
"#;
        toml.to_string()
    }
    fn gen_runtime_config(&self) -> String {
        let mut config = format!(
            r#"
[[pyramid]]
table = "{}"
minzoom = {}
maxzoom = {}
mode = "{}"
"#,
            self.table,
            self.minzoom,
            self.maxzoom,
            self.mode.name()
        );
        if let Some(ref e) = self.extent {
            config.push_str(&format!(
                "extent = {{ minx = {:?}, miny = {:?}, maxx = {:?}, maxy = {:?} }}\n",
                e.minx, e.miny, e.maxx, e.maxy
            ));
        }
        if let Some(srid) = self.extent_srid {
            config.push_str(&format!("extent_srid = {}\n", srid));
        }
        if self.tolerance != DEFAULT_TOLERANCE {
            config.push_str(&format!("tolerance = {:e}\n", self.tolerance));
        }
        if let Some(ref description) = self.description {
            config.push_str(&format!("description = {:?}\n", description));
        }
        config
    }
}

/// Tile pyramids of a GeoPackage
#[derive(Clone)]
pub struct TileService {
    pub gpkg: GeoPackage,
    pub grid: Grid,
    pub pyramids: Vec<Pyramid>,
    pub source: Option<FileTileSource>,
}

impl TileService {
    fn get_pyramid(&self, name: &str) -> Option<&Pyramid> {
        self.pyramids.iter().find(|p| p.table == name)
    }
    /// Seed pyramids from the tile source
    pub fn generate(
        &self,
        pyramid_name: Option<&str>,
        minzoom: Option<u8>,
        maxzoom: Option<u8>,
        extent: Option<BoundingBox>,
        extent_srid: Option<i32>,
        progress: bool,
    ) -> Result<Vec<GenerateReport>, String> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| "No tile source configured".to_string())?;
        if let Some(name) = pyramid_name {
            if self.get_pyramid(name).is_none() {
                return Err(format!("Unknown pyramid '{}'", name));
            }
        }
        info!("{}", source.info());
        let mut reports = Vec::new();
        for pyramid in &self.pyramids {
            if pyramid_name.is_some() && pyramid_name != Some(pyramid.table.as_str()) {
                continue;
            }
            let request = match self.request(pyramid, minzoom, maxzoom, extent, extent_srid) {
                Some(request) => request,
                None => continue,
            };
            if progress {
                println!("Generating pyramid '{}'...", pyramid.table);
            }
            let report = if progress {
                let mut pb = ConsoleProgress::new(&format!("{}: ", pyramid.table));
                let report = self.generate_pyramid(pyramid, &request, source, &mut pb);
                pb.finish();
                report
            } else {
                self.generate_pyramid(pyramid, &request, source, &mut NoProgress)
            }?;
            info!(
                "{}: {} tiles written, {} skipped",
                report.table, report.tiles_written, report.tiles_skipped
            );
            reports.push(report);
        }
        Ok(reports)
    }
    /// Build request, `None` when no requested zoom level is configured for the pyramid
    fn request(
        &self,
        pyramid: &Pyramid,
        minzoom: Option<u8>,
        maxzoom: Option<u8>,
        extent: Option<BoundingBox>,
        extent_srid: Option<i32>,
    ) -> Option<PyramidRequest> {
        let minzoom = minzoom.unwrap_or(pyramid.minzoom).max(pyramid.minzoom);
        let maxzoom = maxzoom.unwrap_or(pyramid.maxzoom).min(pyramid.maxzoom);
        if minzoom > maxzoom {
            warn!(
                "{}: zoom levels outside of {}-{}, skipping pyramid",
                pyramid.table, pyramid.minzoom, pyramid.maxzoom
            );
            return None;
        }
        let (bbox, srid) = match (extent, pyramid.extent) {
            (Some(bbox), _) => (bbox, extent_srid.unwrap_or(self.grid.srid)),
            (None, Some(bbox)) => (bbox, pyramid.extent_srid.unwrap_or(self.grid.srid)),
            (None, None) => {
                warn!(
                    "{}: building pyramid for the whole grid, please fill in the pyramid extent",
                    pyramid.table
                );
                (self.grid.extent, self.grid.srid)
            }
        };
        Some(PyramidRequest {
            table: pyramid.table.clone(),
            min_zoom: minzoom,
            max_zoom: maxzoom,
            bbox,
            srid,
            mode: pyramid.mode,
            description: pyramid.description.clone(),
        })
    }
    fn generate_pyramid(
        &self,
        pyramid: &Pyramid,
        request: &PyramidRequest,
        source: &dyn TileSource,
        progress: &mut dyn ProgressSink,
    ) -> Result<GenerateReport, String> {
        PyramidGenerator::new(&self.gpkg, self.grid.clone())
            .with_tolerance(pyramid.tolerance)
            .generate(request, source, progress)
            .map_err(|e| format!("Pyramid '{}': {}", request.table, e))
    }
    /// Summary of all pyramids in the GeoPackage
    pub fn info(&self) -> Result<String, String> {
        let mut out = String::new();
        let tables = self.gpkg.tile_tables().map_err(|e| e.to_string())?;
        let _ = writeln!(out, "GeoPackage {}", self.gpkg.path);
        for table in tables {
            let reader = PyramidReader::open(&self.gpkg, &table).map_err(|e| e.to_string())?;
            let set = reader.matrix_set().map_err(|e| e.to_string())?;
            let _ = writeln!(
                out,
                "{}: SRS {} extent {:?} {} tiles",
                table,
                set.srs_id,
                set.bbox,
                reader.count(None).map_err(|e| e.to_string())?
            );
            for matrix in reader.matrices().map_err(|e| e.to_string())?.iter() {
                let _ = writeln!(
                    out,
                    "  level {:>2}: {}x{} tiles of {}x{} px, {:e} units/px, {} tiles present",
                    matrix.zoom_level,
                    matrix.matrix_width,
                    matrix.matrix_height,
                    matrix.tile_width,
                    matrix.tile_height,
                    matrix.pixel_x_size,
                    reader
                        .count(Some(matrix.zoom_level))
                        .map_err(|e| e.to_string())?
                );
            }
        }
        Ok(out)
    }
    /// Tile size statistics of all pyramids
    pub fn stats(&self) -> Result<Statistics, String> {
        let mut stats = Statistics::new();
        for table in self.gpkg.tile_tables().map_err(|e| e.to_string())? {
            let reader = PyramidReader::open(&self.gpkg, &table).map_err(|e| e.to_string())?;
            let conn = self.gpkg.conn().map_err(|e| e.to_string())?;
            let sizes = reader
                .tile_table()
                .tile_sizes(&conn)
                .map_err(|e| e.to_string())?;
            for (zoom, size) in sizes {
                stats.add(format!("tile_bytes.{}.{}", table, zoom), size);
            }
        }
        Ok(stats)
    }
}

impl<'a> Config<'a, ApplicationCfg> for TileService {
    fn from_config(config: &ApplicationCfg) -> Result<Self, String> {
        let grid = Grid::from_config(&config.grid)?;
        let pyramids = config
            .pyramids
            .iter()
            .map(Pyramid::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        let source = match config.source.as_ref().and_then(|s| s.file.as_ref()) {
            Some(cfg) => Some(FileTileSource::from_config(cfg)?),
            None => None,
        };
        let gpkg = GeoPackage::from_config(&config.geopackage)?;
        Ok(TileService {
            gpkg,
            grid,
            pyramids,
            source,
        })
    }
    fn gen_config() -> String {
        let mut config = String::new();
        config.push_str(TOML_HEADER);
        config.push_str(&GeoPackage::gen_config());
        config.push_str(&Grid::gen_config());
        config.push_str(&Pyramid::gen_config());
        config.push_str(&FileTileSource::gen_config());
        config
    }
    fn gen_runtime_config(&self) -> String {
        let mut config = String::new();
        config.push_str(TOML_HEADER);
        config.push_str(&self.gpkg.gen_runtime_config());
        config.push_str(&self.grid.gen_runtime_config());
        for pyramid in &self.pyramids {
            config.push_str(&pyramid.gen_runtime_config());
        }
        if let Some(ref source) = self.source {
            config.push_str(&source.gen_runtime_config());
        }
        config
    }
}

const TOML_HEADER: &'static str = "# gpkg-tiles configuration\n";

