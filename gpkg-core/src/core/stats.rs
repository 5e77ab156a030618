//
// Copyright (c) Pirmin Kalberer. All rights reserved.
// Licensed under the MIT License. See LICENSE file in the project root for full license information.
//

//! Statistics collector
//!
//! Keys are dot separated paths like `tile_bytes.<table>.<zoom>`.

use stats::{MinMax, OnlineStats};
use std::collections::BTreeMap;
use std::fmt;

type MeasurementType = u64;

struct StatCollector {
    online: OnlineStats,
    minmax: MinMax<MeasurementType>,
}

pub struct StatResults {
    pub len: usize,
    pub min: MeasurementType,
    pub max: MeasurementType,
    pub mean: f64,
    pub stddev: f64,
    pub variance: f64,
}

pub struct Statistics(BTreeMap<String, StatCollector>);

impl Statistics {
    pub fn new() -> Statistics {
        Statistics(BTreeMap::new())
    }
    fn collector(&mut self, key: String) -> &mut StatCollector {
        self.0.entry(key.to_string()).or_insert(StatCollector {
            online: OnlineStats::new(),
            minmax: MinMax::new(),
        })
    }
    pub fn add(&mut self, key: String, value: MeasurementType) {
        let collector = self.collector(key);
        collector.online.add(value);
        collector.minmax.add(value);
    }
    /// Return the current results.
    pub fn results(&self, key: &str) -> StatResults {
        if let Some(collector) = self.0.get(key) {
            StatResults {
                len: collector.minmax.len(),
                min: *collector.minmax.min().unwrap_or(&0),
                max: *collector.minmax.max().unwrap_or(&0),
                mean: collector.online.mean(),
                stddev: collector.online.stddev(),
                variance: collector.online.variance(),
            }
        } else {
            StatResults {
                len: 0,
                min: 0,
                max: 0,
                mean: 0.0,
                stddev: 0.0,
                variance: 0.0,
            }
        }
    }
}

impl Statistics {
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    /// Results as CSV with header line
    pub fn as_csv(&self) -> String {
        let mut csv = "key,count,min,max,mean,stddev\n".to_string();
        for key in self.0.keys() {
            let res = self.results(key);
            csv.push_str(&format!(
                "{},{},{},{},{:.1},{:.1}\n",
                key, res.len, res.min, res.max, res.mean, res.stddev
            ));
        }
        csv
    }
}

impl fmt::Debug for StatResults {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "#measurements: {}, min: {}, max: {}, mean: {:.10} +/- {:.10}",
            self.len, self.min, self.max, self.mean, self.stddev
        )
    }
}

impl fmt::Debug for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for key in self.0.keys() {
            let res = self.results(&key);
            let _ = write!(f, "{}: {:?}\n", key, res);
        }
        Ok(())
    }
}

#[test]
fn usage() {
    let mut stats = Statistics::new();
    stats.add("tile_bytes.osm.3".to_string(), 1);
    assert_eq!(stats.results("tile_bytes.osm.3").mean, 1.0);
    stats.add("tile_bytes.osm.3".to_string(), 2);
    assert_eq!(stats.results("tile_bytes.osm.3").mean, 1.5);
    stats.add("tile_bytes.osm.4".to_string(), 2);
    assert_eq!(stats.results("tile_bytes.osm.4").mean, 2.0);
    stats.add("tile_bytes.osm.3".to_string(), 3);
    assert_eq!(stats.results("tile_bytes.osm.3").mean, 2.0);
    assert_eq!(stats.results("tile_bytes.osm.3").stddev, 0.816496580927726);
    assert_eq!(stats.results("tile_bytes.osm.3").variance, 0.6666666666666666);
    assert_eq!(stats.results("tile_bytes.osm.3").len, 3);
    assert_eq!(stats.results("tile_bytes.osm.3").min, 1);
    assert_eq!(stats.results("tile_bytes.osm.3").max, 3);

    assert_eq!(stats.results("tile_bytes.osm.9").mean, 0.0);
}

#[test]
fn csv_output() {
    let mut stats = Statistics::new();
    assert!(stats.is_empty());
    stats.add("tile_bytes.t.1".to_string(), 100);
    stats.add("tile_bytes.t.1".to_string(), 300);
    stats.add("tile_bytes.t.0".to_string(), 50);
    assert_eq!(
        stats.as_csv(),
        "key,count,min,max,mean,stddev\n\
         tile_bytes.t.0,1,50,50,50.0,0.0\n\
         tile_bytes.t.1,2,100,300,200.0,100.0\n"
    );
    assert_eq!(stats.keys().count(), 2);
}
