//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
extern crate log;

pub mod decoder;
pub mod generator;
pub mod progress;
pub mod projection;
pub mod reader;
pub mod service;
pub mod source;

#[cfg(test)]
mod reader_test;
#[cfg(test)]
mod test_utils;

pub use decoder::{ImageDecoder, TileDecoder};
pub use generator::{
    GenerateFailure, GenerateReport, GenerateState, PyramidError, PyramidGenerator, PyramidMode,
    PyramidRequest,
};
pub use progress::{ConsoleProgress, NoProgress, ProgressSink};
pub use projection::{BuiltinTransform, ProjectionTransform};
pub use reader::PyramidReader;
pub use service::TileService;
pub use source::{FileTileSource, TileSource};
