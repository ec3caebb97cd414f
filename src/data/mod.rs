use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use geojson::{GeoJson, Geometry, Value};
use log::{info, warn};
use rayon::prelude::*;
use serde::Deserialize;

use crate::geo::Coordinate;
use crate::map::renderer::{Detail, LineString, MapRenderer};
use crate::region::{Region, RegionKind, RegionSnapshot, Report, Statistic};

/// One row of the region snapshot feed. Rows without an update timestamp
/// count as not-yet-reported: the region is kept but carries no report.
#[derive(Debug, Deserialize)]
pub struct RegionRecord {
    pub country: String,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub confirmed: u64,
    #[serde(default)]
    pub recovered: u64,
    #[serde(default)]
    pub deaths: u64,
    #[serde(default)]
    pub updated: Option<DateTime<Utc>>,
}

/// Load and aggregate a region snapshot from a JSON file.
pub fn load_snapshot(path: &Path) -> Result<RegionSnapshot> {
    let mut bytes = fs::read(path)
        .with_context(|| format!("reading region snapshot {}", path.display()))?;
    let records: Vec<RegionRecord> = simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("parsing region snapshot {}", path.display()))?;

    info!("loaded {} region records from {}", records.len(), path.display());
    snapshot_from_records(records)
}

/// Turn feed rows into the engine's working set. A row without a province
/// stands for the whole country and becomes its single province. Rows at
/// exactly (0, 0) are dropped; feeds use the null island for "no location"
/// and a marker there is worse than none.
pub fn snapshot_from_records(records: Vec<RegionRecord>) -> Result<RegionSnapshot> {
    let provinces = records
        .into_iter()
        .filter(|rec| !Coordinate::new(rec.latitude, rec.longitude).is_zero())
        .map(|rec| {
            let name = rec.province.unwrap_or_else(|| rec.country.clone());
            Region {
                name,
                kind: RegionKind::Province,
                country: Some(rec.country),
                location: Coordinate::new(rec.latitude, rec.longitude),
                report: rec.updated.map(|updated| {
                    Report::new(
                        updated,
                        Statistic::new(rec.confirmed, rec.recovered, rec.deaths),
                    )
                }),
            }
        })
        .collect();

    Ok(RegionSnapshot::from_provinces(provinces)?)
}

/// Load Natural Earth coastlines from a data directory, in parallel. Files
/// that are missing or fail to parse are skipped with a warning; the caller
/// falls back to the built-in outline when nothing loads.
pub fn load_coastlines(renderer: &mut MapRenderer, data_dir: &Path) -> Result<()> {
    let files = [
        ("ne_110m_coastline.json", Detail::Low),
        ("ne_50m_coastline.json", Detail::High),
    ];

    let loaded: Vec<(Detail, Vec<LineString>)> = files
        .par_iter()
        .filter_map(|&(name, detail)| {
            let path = data_dir.join(name);
            if !path.exists() {
                return None;
            }
            match parse_coastlines(&path) {
                Ok(lines) => Some((detail, lines)),
                Err(err) => {
                    warn!("failed to load {}: {:#}", name, err);
                    None
                }
            }
        })
        .collect();

    for (detail, lines) in loaded {
        for line in lines {
            renderer.add_coastline(line, detail);
        }
    }

    Ok(())
}

fn parse_coastlines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;

    let mut lines = Vec::new();
    collect_lines(&geojson, &mut lines);
    Ok(lines)
}

/// Extract all linework from a GeoJSON document: line strings directly,
/// polygons by their exterior ring.
fn collect_lines(geojson: &GeoJson, out: &mut Vec<LineString>) {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    collect_geometry_lines(geometry, out);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_geometry_lines(geometry, out);
            }
        }
        GeoJson::Geometry(geometry) => collect_geometry_lines(geometry, out),
    }
}

fn collect_geometry_lines(geometry: &Geometry, out: &mut Vec<LineString>) {
    let positions_to_line =
        |coords: &[Vec<f64>]| coords.iter().map(|c| (c[0], c[1])).collect::<LineString>();

    match &geometry.value {
        Value::LineString(coords) => out.push(positions_to_line(coords)),
        Value::MultiLineString(lines) => {
            out.extend(lines.iter().map(|coords| positions_to_line(coords)));
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                out.push(positions_to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    out.push(positions_to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_geometry_lines(g, out);
            }
        }
        _ => {}
    }
}

/// Rough continent outlines used when no coastline data is on disk.
pub fn builtin_world(renderer: &mut MapRenderer) {
    let outlines: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-140.0, 60.0), (-125.0, 48.0), (-117.0, 32.0),
            (-97.0, 25.0), (-81.0, 25.0), (-75.0, 35.0), (-67.0, 45.0),
            (-55.0, 50.0), (-70.0, 62.0), (-95.0, 66.0), (-130.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 9.0), (-60.0, 5.0), (-35.0, -7.0), (-40.0, -22.0),
            (-58.0, -38.0), (-70.0, -52.0), (-72.0, -30.0), (-80.0, -5.0),
            (-80.0, 9.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (3.0, 40.0), (15.0, 44.0), (25.0, 37.0),
            (35.0, 42.0), (40.0, 55.0), (25.0, 65.0), (15.0, 70.0),
            (5.0, 60.0), (-5.0, 50.0), (-10.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 20.0), (-10.0, 5.0), (8.0, 4.0), (15.0, -5.0),
            (28.0, -15.0), (32.0, -28.0), (20.0, -35.0), (12.0, -18.0),
            (9.0, 0.0), (-8.0, 8.0), (-17.0, 12.0), (-17.0, 20.0),
            (-13.0, 28.0), (0.0, 35.0), (20.0, 32.0), (32.0, 31.0),
            (43.0, 11.0), (51.0, 11.0), (40.0, -2.0), (35.0, -20.0),
        ],
        // Asia
        &[
            (40.0, 43.0), (55.0, 37.0), (62.0, 25.0), (72.0, 20.0),
            (78.0, 8.0), (88.0, 22.0), (98.0, 12.0), (108.0, 10.0),
            (118.0, 24.0), (122.0, 31.0), (130.0, 35.0), (142.0, 45.0),
            (145.0, 55.0), (130.0, 50.0), (110.0, 45.0), (85.0, 50.0),
            (60.0, 55.0), (45.0, 48.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (114.0, -22.0), (128.0, -13.0), (142.0, -11.0), (148.0, -20.0),
            (153.0, -28.0), (147.0, -38.0), (135.0, -35.0), (122.0, -34.0),
            (114.0, -30.0), (114.0, -22.0),
        ],
    ];

    for outline in outlines {
        renderer.add_coastline(outline.to_vec(), Detail::Low);
    }
}

/// A small bundled snapshot so the binary is usable with no data file.
pub fn sample_snapshot() -> Result<RegionSnapshot> {
    let updated = Utc::now() - Duration::hours(2);
    let rows: [(&str, Option<&str>, f64, f64, u64, u64, u64); 16] = [
        ("China", Some("Hubei"), 30.97, 112.27, 67800, 58946, 3133),
        ("China", Some("Guangdong"), 23.34, 113.42, 1400, 1311, 8),
        ("China", Some("Henan"), 33.88, 113.61, 1273, 1250, 22),
        ("China", Some("Zhejiang"), 29.18, 120.09, 1236, 1216, 1),
        ("Italy", None, 41.87, 12.57, 59138, 7024, 5476),
        ("US", Some("New York"), 42.17, -74.95, 15168, 0, 114),
        ("US", Some("Washington"), 47.40, -121.49, 1996, 0, 95),
        ("US", Some("California"), 36.12, -119.68, 1642, 0, 30),
        ("Spain", None, 40.46, -3.75, 28572, 2575, 1720),
        ("Germany", None, 51.17, 10.45, 24873, 266, 94),
        ("Iran", None, 32.43, 53.69, 21638, 7913, 1685),
        ("France", Some("France"), 46.23, 2.21, 16018, 2200, 674),
        ("France", Some("Reunion"), -21.12, 55.54, 47, 0, 0),
        ("Korea, South", None, 35.91, 127.77, 8897, 2909, 104),
        ("Australia", Some("New South Wales"), -33.87, 151.21, 669, 4, 6),
        ("Australia", Some("Victoria"), -37.81, 144.96, 296, 0, 0),
    ];

    let records = rows
        .iter()
        .map(|&(country, province, lat, lon, confirmed, recovered, deaths)| RegionRecord {
            country: country.to_string(),
            province: province.map(str::to_string),
            latitude: lat,
            longitude: lon,
            confirmed,
            recovered,
            deaths,
            updated: Some(updated),
        })
        .collect();

    snapshot_from_records(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::StatKind;

    #[test]
    fn test_records_become_provinces_and_countries() {
        let snapshot = sample_snapshot().unwrap();

        let china = snapshot
            .of_kind(RegionKind::Country)
            .find(|r| r.name == "China")
            .unwrap();
        assert_eq!(china.number(StatKind::Confirmed), 67800 + 1400 + 1273 + 1236);

        // A row without a province becomes the country's single province.
        assert!(snapshot
            .of_kind(RegionKind::Province)
            .any(|r| r.name == "Italy" && r.country.as_deref() == Some("Italy")));
    }

    #[test]
    fn test_record_without_timestamp_has_no_report() {
        let snapshot = snapshot_from_records(vec![RegionRecord {
            country: "Atlantis".to_string(),
            province: None,
            latitude: 0.0,
            longitude: -30.0,
            confirmed: 99,
            recovered: 0,
            deaths: 0,
            updated: None,
        }])
        .unwrap();

        let country = snapshot
            .of_kind(RegionKind::Country)
            .find(|r| r.name == "Atlantis")
            .unwrap();
        assert!(country.report.is_none());
    }

    #[test]
    fn test_null_island_rows_are_dropped() {
        let snapshot = snapshot_from_records(vec![RegionRecord {
            country: "Ghost".to_string(),
            province: None,
            latitude: 0.0,
            longitude: 0.0,
            confirmed: 10,
            recovered: 0,
            deaths: 0,
            updated: Some(Utc::now()),
        }])
        .unwrap();
        assert!(snapshot.regions().is_empty());
    }

    #[test]
    fn test_builtin_world_has_coastlines() {
        let mut renderer = MapRenderer::new();
        assert!(!renderer.has_data());
        builtin_world(&mut renderer);
        assert!(renderer.has_data());
    }

    #[test]
    fn test_snapshot_json_parses() {
        let mut raw = br#"[
            {"country": "Italy", "latitude": 41.87, "longitude": 12.57,
             "confirmed": 59138, "recovered": 7024, "deaths": 5476,
             "updated": "2020-03-22T10:00:00Z"},
            {"country": "France", "province": "Reunion",
             "latitude": -21.12, "longitude": 55.54, "confirmed": 47}
        ]"#
        .to_vec();
        let records: Vec<RegionRecord> = simd_json::serde::from_slice(&mut raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].confirmed, 59138);
        assert!(records[1].updated.is_none());

        let snapshot = snapshot_from_records(records).unwrap();
        assert_eq!(snapshot.worldwide().number(StatKind::Confirmed), 59138);
    }
}
