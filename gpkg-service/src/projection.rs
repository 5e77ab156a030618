//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use tile_grid::{extent_merc_to_wgs84, extent_wgs84_to_merc, BoundingBox};

/// Reprojection of extents between spatial reference systems
pub trait ProjectionTransform {
    /// `None` if the transformation is not supported
    fn transform(&self, bbox: &BoundingBox, from_srid: i32, to_srid: i32) -> Option<BoundingBox>;
}

/// Identity and WGS84 <-> Web Mercator
#[derive(Clone, Copy, Debug, Default)]
pub struct BuiltinTransform;

impl ProjectionTransform for BuiltinTransform {
    fn transform(&self, bbox: &BoundingBox, from_srid: i32, to_srid: i32) -> Option<BoundingBox> {
        match (from_srid, to_srid) {
            (from, to) if from == to => Some(*bbox),
            (4326, 3857) => Some(extent_wgs84_to_merc(bbox)),
            (3857, 4326) => Some(extent_merc_to_wgs84(bbox)),
            _ => None,
        }
    }
}
