//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use gpkg_core::core::config::FileSourceCfg;
use gpkg_core::core::Config;
use std::fs::File;
use std::io::Read;
use tile_grid::tiles_per_side;

/// Supplier of encoded tile images.
///
/// Tiles are addressed in the alignment grid: `2^zoom x 2^zoom` tiles with
/// row 0 at the top. A missing or unreadable tile is `None`.
pub trait TileSource {
    fn tile(&self, zoom: u8, column: u32, row: u32) -> Option<Vec<u8>>;
    fn info(&self) -> String {
        "Tile source".to_string()
    }
}

impl<F> TileSource for F
where
    F: Fn(u8, u32, u32) -> Option<Vec<u8>>,
{
    fn tile(&self, zoom: u8, column: u32, row: u32) -> Option<Vec<u8>> {
        self(zoom, column, row)
    }
}

/// Tile tree in a directory (`{base}/{z}/{x}/{y}.{extension}`)
#[derive(Clone, Debug)]
pub struct FileTileSource {
    pub basepath: String,
    pub extension: String,
    /// Rows counted from the bottom
    pub tms: bool,
}

impl FileTileSource {
    pub fn new(basepath: &str, extension: &str) -> FileTileSource {
        FileTileSource {
            basepath: basepath.trim_end_matches('/').to_string(),
            extension: extension.to_string(),
            tms: false,
        }
    }
    pub fn path(&self, zoom: u8, column: u32, row: u32) -> String {
        let y = if self.tms {
            tiles_per_side(zoom) - 1 - row as u64
        } else {
            row as u64
        };
        format!(
            "{}/{}/{}/{}.{}",
            self.basepath, zoom, column, y, self.extension
        )
    }
}

impl TileSource for FileTileSource {
    fn tile(&self, zoom: u8, column: u32, row: u32) -> Option<Vec<u8>> {
        let fullpath = self.path(zoom, column, row);
        let mut data = Vec::new();
        match File::open(&fullpath).and_then(|mut f| f.read_to_end(&mut data)) {
            Ok(_) => Some(data),
            Err(e) => {
                debug!("FileTileSource.tile {}: {}", fullpath, e);
                None
            }
        }
    }
    fn info(&self) -> String {
        format!("Tile directory: {}", self.basepath)
    }
}

impl<'a> Config<'a, FileSourceCfg> for FileTileSource {
    fn from_config(cfg: &FileSourceCfg) -> Result<Self, String> {
        if cfg.base.is_empty() {
            return Err("Empty tile source directory".to_string());
        }
        let mut source = FileTileSource::new(&cfg.base, &cfg.extension);
        source.tms = cfg.tms;
        Ok(source)
    }
    fn gen_config() -> String {
        let toml = r#"
[source.file]
# Tile tree {base}/{z}/{x}/{y}.{extension}
base = "/tmp/tiles"
extension = "png"
# Rows counted from the bottom
#tms = true
"#;
        toml.to_string()
    }
    fn gen_runtime_config(&self) -> String {
        format!(
            r#"
[source.file]
base = "{}"
extension = "{}"
tms = {}
"#,
            self.basepath, self.extension, self.tms
        )
    }
}
