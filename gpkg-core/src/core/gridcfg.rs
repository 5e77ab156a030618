//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::GridCfg;
use crate::core::Config;
use tile_grid::{BoundingBox, Grid, Unit};

#[derive(Deserialize, Clone, Debug)]
pub struct ExtentCfg {
    pub minx: f64,
    pub miny: f64,
    pub maxx: f64,
    pub maxy: f64,
}

impl From<&ExtentCfg> for BoundingBox {
    fn from(cfg: &ExtentCfg) -> BoundingBox {
        BoundingBox {
            minx: cfg.minx,
            miny: cfg.miny,
            maxx: cfg.maxx,
            maxy: cfg.maxy,
        }
    }
}

impl<'a> Config<'a, GridCfg> for Grid {
    fn from_config(grid_cfg: &GridCfg) -> Result<Self, String> {
        if let Some(ref gridname) = grid_cfg.predefined {
            match gridname.as_str() {
                "wgs84" => Ok(Grid::wgs84()),
                "web_mercator" => Ok(Grid::web_mercator()),
                _ => Err(format!("Unkown grid '{}'", gridname)),
            }
        } else if let Some(ref usergrid) = grid_cfg.user {
            let units = match &usergrid.units.to_lowercase() as &str {
                "m" => Ok(Unit::Meters),
                "dd" => Ok(Unit::Degrees),
                "ft" => Ok(Unit::Feet),
                _ => Err(format!("Unexpected enum value '{}'", usergrid.units)),
            };
            let extent = BoundingBox::from(&usergrid.extent);
            if !(extent.width() > 0.0 && extent.height() > 0.0) {
                return Err(format!("Empty grid extent {:?}", extent));
            }
            let grid = Grid::new(
                usergrid.width,
                usergrid.height,
                extent,
                usergrid.srid,
                units?,
            );
            Ok(grid)
        } else {
            Err("Invalid grid definition".to_string())
        }
    }
    fn gen_config() -> String {
        let toml = r#"
[grid]
# Predefined grids: web_mercator, wgs84
predefined = "web_mercator"
#[grid.user]
#width = 256
#height = 256
#extent = { minx = 2420000.0, miny = 1030000.0, maxx = 2900000.0, maxy = 1350000.0 }
#srid = 2056
#units = "m"
"#;
        toml.to_string()
    }
    fn gen_runtime_config(&self) -> String {
        format!(
            r#"
[grid.user]
width = {}
height = {}
extent = {{ minx = {:?}, miny = {:?}, maxx = {:?}, maxy = {:?} }}
srid = {}
units = "{}"
"#,
            self.width,
            self.height,
            self.extent.minx,
            self.extent.miny,
            self.extent.maxx,
            self.extent.maxy,
            self.srid,
            match self.units {
                Unit::Meters => "m",
                Unit::Degrees => "dd",
                Unit::Feet => "ft",
            }
        )
    }
}
