//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::gridcfg::ExtentCfg;
use regex::Regex;
use serde::Deserialize;
use std;
use std::collections::HashMap;
use std::env;
use std::error::Error;
use std::fs::File;
use std::io::prelude::*;
use tera::{Context, Tera};
use toml::Value;

pub trait Config<'a, C: Deserialize<'a>>
where
    Self: std::marker::Sized,
{
    /// Read configuration
    fn from_config(config: &C) -> Result<Self, String>;
    /// Generate configuration template
    fn gen_config() -> String;
    /// Generate configuration template with runtime information
    fn gen_runtime_config(&self) -> String {
        Self::gen_config()
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ApplicationCfg {
    pub geopackage: GeoPackageCfg,
    pub grid: GridCfg,
    #[serde(rename = "pyramid", default)]
    pub pyramids: Vec<PyramidCfg>,
    pub source: Option<SourceCfg>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GeoPackageCfg {
    /// Path of the GeoPackage file, created when missing
    pub path: String,
    /// Maximal number of pooled SQLite connections
    pub pool: Option<u16>,
    /// Timeout in milliseconds waiting for a pooled connection (default: 30s)
    pub connection_timeout: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct GridCfg {
    pub predefined: Option<String>,
    pub user: Option<UserGridCfg>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct UserGridCfg {
    /// The width and height of an individual tile, in pixels.
    pub width: u16,
    pub height: u16,
    /// The addressable world of the reference system, in ground units.
    /// Zoom level `z` divides it into `2^z x 2^z` tiles anchored at (minx, maxy).
    pub extent: ExtentCfg,
    /// Spatial reference system (GeoPackage srs_id).
    pub srid: i32,
    /// Grid units (m: meters, dd: decimal degrees, ft: feet)
    pub units: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct PyramidCfg {
    /// Tile table name
    pub table: String,
    #[serde(default)]
    pub minzoom: u8,
    pub maxzoom: u8,
    /// `aligned` (whole grid extent, 2^z tiles per side) or `bounded` (data extent only)
    #[serde(default = "default_mode")]
    pub mode: String,
    /// Request extent (default: grid extent)
    pub extent: Option<ExtentCfg>,
    /// Spatial reference system of `extent` (default: grid srid)
    pub extent_srid: Option<i32>,
    /// Edge tolerance of tile grid calculations, relative to coordinate magnitude
    pub tolerance: Option<f64>,
    pub description: Option<String>,
}

pub fn default_mode() -> String {
    "aligned".to_string()
}

#[derive(Deserialize, Clone, Debug)]
pub struct SourceCfg {
    pub file: Option<FileSourceCfg>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct FileSourceCfg {
    /// Root directory of a `{z}/{x}/{y}.{extension}` tile tree
    pub base: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Rows counted from the bottom (TMS) instead of the top (XYZ)
    #[serde(default)]
    pub tms: bool,
}

pub fn default_extension() -> String {
    "png".to_string()
}

pub const DEFAULT_CONFIG: &'static str = r#"
[geopackage]
path = "tiles.gpkg"

[grid]
predefined = "web_mercator"

[[pyramid]]
table = "tiles"
minzoom = 0
maxzoom = 5
mode = "aligned"

[source.file]
base = "/tmp/tiles"
extension = "png"
"#;

/// Load and parse the config file into an config struct.
pub fn read_config<'a, T: Deserialize<'a>>(path: &str) -> Result<T, String> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(_) => {
            return Err("Could not find config file!".to_string());
        }
    };
    let mut config_toml = String::new();
    if let Err(err) = file.read_to_string(&mut config_toml) {
        return Err(format!("Error while reading config: [{}]", err));
    };

    parse_config(config_toml, path)
}

lazy_static! {
    static ref OLD_ENV_VAR: Regex = Regex::new(r"\$\{([[:alnum:]]+)\}").unwrap();
}

/// Parse the configuration into an config struct.
pub fn parse_config<'a, T: Deserialize<'a>>(config_toml: String, path: &str) -> Result<T, String> {
    // Check for old ${var} expressions
    if OLD_ENV_VAR.is_match(&config_toml) {
        return Err(
            "Replace old environment variable syntax ${VARNAME} with `{{env.VARNAME}}`".to_string(),
        );
    }

    // Parse template
    let mut tera = Tera::default();
    tera.add_raw_template(path, &config_toml)
        .map_err(|e| format!("Template error: {}", e))?;
    let mut context = Context::new();
    let mut env = HashMap::new();
    for (key, value) in env::vars() {
        env.insert(key, value);
    }
    context.insert("env", &env);
    let toml = tera.render(path, &context).map_err(|e| match e.source() {
        Some(source) => format!("Template error: {}", source),
        None => format!("Template error: {}", e),
    })?;

    toml.parse::<Value>()
        .and_then(|cfg| cfg.try_into::<T>())
        .map_err(|err| format!("{} - {}", path, err))
}
