//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

#[macro_use]
extern crate clap;
#[macro_use]
extern crate log;

use clap::{App, AppSettings, ArgMatches, SubCommand};
use dotenv::dotenv;
use env_logger::Builder;
use gpkg_core::core::config::DEFAULT_CONFIG;
use gpkg_core::core::{parse_config, read_config, ApplicationCfg, Config};
use gpkg_service::TileService;
use log::Record;
use std::env;
use std::io::Write;
use std::process;
use tile_grid::BoundingBox;
use time;

fn init_logger(args: &ArgMatches<'_>) {
    let mut builder = Builder::new();
    builder.format(|buf, record: &Record<'_>| {
        let t = time::now();
        writeln!(
            buf,
            "{}.{:03} {} {}",
            time::strftime("%Y-%m-%d %H:%M:%S", &t).unwrap_or_default(),
            t.tm_nsec / 1000_000,
            record.level(),
            record.args()
        )
    });

    let rust_log_env = env::var("RUST_LOG");
    let rust_log = match (args.value_of("loglevel"), rust_log_env.as_ref()) {
        (None, Ok(env_level)) => env_level.as_str(),
        (level, _) => level.unwrap_or("info"),
    };
    builder.parse_filters(rust_log);

    builder.init();
}

fn exit_with_error(msg: &str) -> ! {
    println!("{}", msg);
    process::exit(1)
}

fn config_from_args(args: &ArgMatches<'_>) -> ApplicationCfg {
    let mut config: ApplicationCfg = if let Some(cfgpath) = args.value_of("config") {
        info!("Reading configuration from '{}'", cfgpath);
        read_config(cfgpath)
            .unwrap_or_else(|err| exit_with_error(&format!("Error reading configuration - {}", err)))
    } else {
        parse_config(DEFAULT_CONFIG.to_string(), "")
            .unwrap_or_else(|err| exit_with_error(&format!("Invalid default configuration - {}", err)))
    };
    if let Some(path) = args.value_of("gpkg") {
        config.geopackage.path = path.to_string();
    }
    if let Some(dir) = args.value_of("tiles") {
        if let Some(file) = config.source.as_mut().and_then(|s| s.file.as_mut()) {
            file.base = dir.to_string();
        }
    }
    config
}

fn service_from_args(config: &ApplicationCfg) -> TileService {
    TileService::from_config(config)
        .unwrap_or_else(|err| exit_with_error(&format!("Error reading configuration - {}", err)))
}

fn parse_arg<T: std::str::FromStr>(args: &ArgMatches<'_>, name: &str, what: &str) -> Option<T> {
    args.value_of(name).map(|s| {
        s.parse::<T>().unwrap_or_else(|_| {
            exit_with_error(&format!("Error parsing '{}' as {}", name, what))
        })
    })
}

/// `minx,miny,maxx,maxy[,srid]`
fn parse_extent(numlist: &str) -> Result<(BoundingBox, Option<i32>), String> {
    let parts: Vec<&str> = numlist.split(",").map(|v| v.trim()).collect();
    if parts.len() != 4 && parts.len() != 5 {
        return Err("Error parsing 'extent': expected minx,miny,maxx,maxy[,srid]".to_string());
    }
    let coords = parts[0..4]
        .iter()
        .map(|v| v.parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|_| "Error parsing 'extent' as list of float values".to_string())?;
    let srid = match parts.get(4) {
        Some(srid) => Some(
            srid.parse::<i32>()
                .map_err(|_| "Error parsing 'srid' in 'extent' as integer".to_string())?,
        ),
        None => None,
    };
    Ok((
        BoundingBox::new(coords[0], coords[1], coords[2], coords[3]),
        srid,
    ))
}

fn generate(args: &ArgMatches<'_>) {
    let config = config_from_args(args);
    let service = service_from_args(&config);
    let pyramid = args.value_of("pyramid");
    let minzoom = parse_arg::<u8>(args, "minzoom", "integer value");
    let maxzoom = parse_arg::<u8>(args, "maxzoom", "integer value");
    let (extent, extent_srid) = match args.value_of("extent").map(parse_extent) {
        Some(Ok((extent, srid))) => (Some(extent), srid),
        Some(Err(e)) => exit_with_error(&e),
        None => (None, None),
    };
    let progress = parse_arg::<bool>(args, "progress", "boolean value").unwrap_or(true);
    let print_stats = parse_arg::<bool>(args, "stats", "boolean value").unwrap_or(false);

    let reports = service
        .generate(pyramid, minzoom, maxzoom, extent, extent_srid, progress)
        .unwrap_or_else(|e| exit_with_error(&e));
    for report in &reports {
        println!(
            "{}: {:?}, {} tiles written, {} skipped, {} moved",
            report.table,
            report.state,
            report.tiles_written,
            report.tiles_skipped,
            report.tiles_moved
        );
        if !report.levels_discarded.is_empty() {
            println!(
                "{}: levels without tiles {:?}",
                report.table, report.levels_discarded
            );
        }
    }
    if print_stats {
        match service.stats() {
            Ok(stats) => print!("{}", stats.as_csv()),
            Err(e) => exit_with_error(&e),
        }
    }
}

fn info(args: &ArgMatches<'_>) {
    let config = config_from_args(args);
    let service = service_from_args(&config);
    match service.info() {
        Ok(info) => print!("{}", info),
        Err(e) => exit_with_error(&e),
    }
}

fn gen_config(args: &ArgMatches<'_>) -> String {
    if args.value_of("config").is_some() || args.value_of("gpkg").is_some() {
        service_from_args(&config_from_args(args)).gen_runtime_config()
    } else {
        TileService::gen_config()
    }
}

fn main() {
    dotenv().ok();
    // http://kbknapp.github.io/clap-rs/clap/
    let mut app = App::new("gpkg_tiles")
        .version(crate_version!())
        .author("Pirmin Kalberer <pka@sourcepole.ch>")
        .about("Raster tile pyramids in GeoPackage files")
        .subcommand(SubCommand::with_name("generate")
                        .setting(AppSettings::AllowLeadingHyphen)
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --gpkg=[FILE] 'GeoPackage file'
                                              --tiles=[DIR] 'Source tile directory'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'
                                              --pyramid=[NAME] 'Pyramid (tile table) name'
                                              --minzoom=[LEVEL] 'Minimum zoom level'
                                              --maxzoom=[LEVEL] 'Maximum zoom level'
                                              --extent=[minx,miny,maxx,maxy[,srid]] 'Extent of tiles'
                                              --progress=[true|false] 'Show progress bar'
                                              --stats=[false|true] 'Print tile size statistics'")
                        .about("Generate tile pyramids from the tile source"))
        .subcommand(SubCommand::with_name("info")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --gpkg=[FILE] 'GeoPackage file'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'")
                        .about("Show tile pyramids of a GeoPackage"))
        .subcommand(SubCommand::with_name("genconfig")
                        .args_from_usage("-c, --config=[FILE] 'Load from custom config file'
                                              --gpkg=[FILE] 'GeoPackage file'
                                              --tiles=[DIR] 'Source tile directory'
                                              --loglevel=[error|warn|info|debug|trace] 'Log level (Default: info)'")
                        .about("Generate configuration template"));

    match app.get_matches_from_safe_borrow(env::args()) {
        //app.get_matches() prohibits later call of app.print_help()
        Result::Err(e) => {
            println!("{}", e);
        }
        Result::Ok(matches) => match matches.subcommand() {
            ("generate", Some(sub_m)) => {
                init_logger(sub_m);
                generate(sub_m);
            }
            ("info", Some(sub_m)) => {
                init_logger(sub_m);
                info(sub_m);
            }
            ("genconfig", Some(sub_m)) => {
                init_logger(sub_m);
                println!("{}", gen_config(sub_m));
            }
            _ => {
                let _ = app.print_help();
                println!("");
            }
        },
    }
}

#[test]
fn test_parse_extent() {
    assert_eq!(
        parse_extent("5.9,45.8,10.5,47.8"),
        Ok((BoundingBox::new(5.9, 45.8, 10.5, 47.8), None))
    );
    assert_eq!(
        parse_extent("-10, -10, 10, 10, 4326"),
        Ok((BoundingBox::new(-10.0, -10.0, 10.0, 10.0), Some(4326)))
    );
    assert!(parse_extent("1,2,3").is_err());
    assert!(parse_extent("1,2,3,x").is_err());
    assert!(parse_extent("1,2,3,4,EPSG").is_err());
}
