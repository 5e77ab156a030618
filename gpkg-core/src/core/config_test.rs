//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

use crate::core::config::read_config;
use crate::core::config::ApplicationCfg;

#[test]
fn test_load_config() {
    let config = read_config("src/test/example.toml");
    println!("{:#?}", config);
    let config: ApplicationCfg = config.expect("load_config returned Err");
    assert_eq!(config.geopackage.path, "/tmp/gpkg_tiles_example.gpkg");
    assert_eq!(config.geopackage.pool, Some(4));
    assert_eq!(config.grid.predefined, Some("wgs84".to_string()));
    assert_eq!(config.pyramids.len(), 2);
    assert_eq!(config.pyramids[0].table, "imagery");
    assert_eq!(config.pyramids[0].mode, "bounded");
    assert_eq!(config.pyramids[0].minzoom, 2);
    assert_eq!(config.pyramids[0].extent_srid, Some(4326));
    assert_eq!(config.pyramids[0].extent.as_ref().map(|e| e.maxy), Some(47.81));
    // defaults
    assert_eq!(config.pyramids[1].minzoom, 0);
    assert_eq!(config.pyramids[1].mode, "aligned");
    assert!(config.pyramids[1].extent.is_none());
    let source = config.source.expect("source").file.expect("file source");
    assert_eq!(source.extension, "jpg");
    assert!(!source.tms);
}

#[test]
fn test_parse_error() {
    let config: Result<ApplicationCfg, _> = read_config("src/core/mod.rs");
    let err = config.err().unwrap();
    assert!(err.starts_with("src/core/mod.rs - "));
    assert!(err.contains("unexpected character found: `/`"));

    let config: Result<ApplicationCfg, _> = read_config("wrongfile");
    assert_eq!("Could not find config file!", config.err().unwrap());
}

#[test]
fn test_env_template() {
    use crate::core::parse_config;
    use std::env;

    env::set_var("GPKG_TILES_TEST_PATH", "/data/test.gpkg");
    let toml = r#"
        [geopackage]
        path = "{{ env.GPKG_TILES_TEST_PATH }}"

        [grid]
        predefined = "web_mercator"
        "#;
    let config: ApplicationCfg = parse_config(toml.to_string(), "").unwrap();
    assert_eq!(config.geopackage.path, "/data/test.gpkg");
    assert!(config.pyramids.is_empty());

    // variable syntax before templating
    let toml = r#"
        [geopackage]
        path = "${GPKG_TILES_TEST_PATH}"
        "#;
    let config: Result<ApplicationCfg, _> = parse_config(toml.to_string(), "");
    assert_eq!(
        "Replace old environment variable syntax ${VARNAME} with `{{env.VARNAME}}`",
        config.err().unwrap()
    );
}

#[test]
fn test_missing_section() {
    use crate::core::parse_config;
    let toml = r#"
        [grid]
        predefined = "web_mercator"
        "#;
    let config: Result<ApplicationCfg, _> = parse_config(toml.to_string(), "");
    assert!(config
        .err()
        .unwrap()
        .contains("missing field `geopackage`"));
}
