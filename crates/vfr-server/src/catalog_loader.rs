//! Dataset loading: OurAirports CSV tables and airspace GeoJSON.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use vfr_core::{
    AirportFacility, AirportKind, Airspace, AirspacePolygon, Catalog, Node, NodeCategory,
    Position, Runway,
};

use crate::config::Config;

const METRES_PER_FOOT: f64 = 0.3048;

#[derive(Debug, Error)]
pub enum CatalogLoadError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to parse airspace GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("airspace GeoJSON is not a FeatureCollection")]
    NotFeatureCollection,
}

#[derive(Debug, Deserialize)]
struct AirportRecord {
    ident: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    name: String,
    latitude_deg: f64,
    longitude_deg: f64,
    #[serde(default)]
    elevation_ft: Option<f64>,
    #[serde(default)]
    scheduled_service: String,
    /// Not an OurAirports column; honoured when a curated table carries it.
    #[serde(default)]
    fuel: Option<String>,
    #[serde(default)]
    private: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RunwayRecord {
    airport_ident: String,
    #[serde(default)]
    length_ft: Option<f64>,
    #[serde(default)]
    surface: String,
    #[serde(default)]
    closed: String,
}

#[derive(Debug, Deserialize)]
struct NavaidRecord {
    ident: String,
    #[serde(default)]
    name: String,
    latitude_deg: f64,
    longitude_deg: f64,
    #[serde(default)]
    elevation_ft: Option<f64>,
}

/// Load every dataset named in `config` and build the catalog.
///
/// The airports table is required. Missing runway, navaid or airspace files are
/// logged and treated as empty.
pub fn load_catalog(config: &Config) -> Result<Catalog, CatalogLoadError> {
    let airports = open(&config.airports_csv)?;
    let runways = match open_optional(&config.runways_csv)? {
        Some(file) => read_runways(file)?,
        None => HashMap::new(),
    };
    let mut nodes = read_airports(airports, &runways)?;
    let airport_count = nodes.len();

    if let Some(file) = open_optional(&config.navaids_csv)? {
        let taken: HashSet<String> = nodes.iter().map(|node| node.id.to_uppercase()).collect();
        nodes.extend(read_navaids(file, &taken)?);
    }
    let navaid_count = nodes.len() - airport_count;

    let airspaces = match open_optional(&config.airspaces_geojson)? {
        Some(file) => read_airspaces(file)?,
        None => Vec::new(),
    };

    let catalog = Catalog::with_graph_cutoff(nodes, airspaces, config.planner.graph_max_dist_nm);
    info!(
        airports = airport_count,
        navaids = navaid_count,
        airspaces = catalog.airspaces().len(),
        edges = catalog.graph().edge_count(),
        rejected = ?catalog.rejects(),
        "Catalog loaded"
    );
    Ok(catalog)
}

fn open(path: &Path) -> Result<File, CatalogLoadError> {
    File::open(path).map_err(|source| CatalogLoadError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn open_optional(path: &Path) -> Result<Option<File>, CatalogLoadError> {
    if !path.exists() {
        warn!("Dataset {} not found, skipping", path.display());
        return Ok(None);
    }
    open(path).map(Some)
}

/// Runways keyed by uppercase airport ident.
pub fn read_runways<R: Read>(reader: R) -> Result<HashMap<String, Vec<Runway>>, CatalogLoadError> {
    let mut runways: HashMap<String, Vec<Runway>> = HashMap::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (row, record) in rdr.deserialize::<RunwayRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(row, "Skipping malformed runway row: {}", err);
                continue;
            }
        };
        let Some(length_ft) = record.length_ft.filter(|len| len.is_finite() && *len > 0.0) else {
            continue;
        };
        runways
            .entry(record.airport_ident.trim().to_uppercase())
            .or_default()
            .push(Runway {
                length_m: length_ft * METRES_PER_FOOT,
                surface: record.surface,
                closed: is_truthy(&record.closed),
            });
    }
    Ok(runways)
}

pub fn read_airports<R: Read>(
    reader: R,
    runways: &HashMap<String, Vec<Runway>>,
) -> Result<Vec<Node>, CatalogLoadError> {
    let mut nodes = Vec::new();
    let mut rdr = csv::Reader::from_reader(reader);
    for (row, record) in rdr.deserialize::<AirportRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(row, "Skipping malformed airport row: {}", err);
                continue;
            }
        };
        let ident = record.ident.trim().to_uppercase();
        let kind = AirportKind::parse(&record.kind);
        let scheduled = is_truthy(&record.scheduled_service);
        // Without a fuel column, scheduled service is the best available proxy.
        let fuel = record
            .fuel
            .as_deref()
            .map(is_truthy)
            .unwrap_or(scheduled);
        let private = record
            .private
            .as_deref()
            .map(is_truthy)
            .unwrap_or_else(|| ident.starts_with("US-"));

        nodes.push(Node {
            name: record.name,
            lat: record.latitude_deg,
            lon: record.longitude_deg,
            category: NodeCategory::Airport,
            elevation_ft: record.elevation_ft,
            airport: Some(AirportFacility {
                kind,
                private,
                fuel,
                runways: runways.get(&ident).cloned().unwrap_or_default(),
            }),
            id: ident,
        });
    }
    Ok(nodes)
}

/// Navaids whose ident is not already taken. Navaid idents repeat worldwide, so
/// the first occurrence wins.
pub fn read_navaids<R: Read>(reader: R, taken: &HashSet<String>) -> Result<Vec<Node>, CatalogLoadError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut nodes = Vec::new();
    let mut skipped = 0usize;
    let mut rdr = csv::Reader::from_reader(reader);
    for (row, record) in rdr.deserialize::<NavaidRecord>().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(row, "Skipping malformed navaid row: {}", err);
                continue;
            }
        };
        let ident = record.ident.trim().to_uppercase();
        if taken.contains(&ident) || !seen.insert(ident.clone()) {
            skipped += 1;
            continue;
        }
        nodes.push(Node {
            id: ident,
            name: record.name,
            lat: record.latitude_deg,
            lon: record.longitude_deg,
            category: NodeCategory::Navaid,
            elevation_ft: record.elevation_ft,
            airport: None,
        });
    }
    if skipped > 0 {
        tracing::debug!(skipped, "Navaids with repeated idents dropped");
    }
    Ok(nodes)
}

/// Airspaces from a GeoJSON FeatureCollection of Polygon / MultiPolygon features.
pub fn read_airspaces<R: Read>(reader: R) -> Result<Vec<Airspace>, CatalogLoadError> {
    let root: Value = serde_json::from_reader(reader)?;
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or(CatalogLoadError::NotFeatureCollection)?;

    let mut airspaces = Vec::with_capacity(features.len());
    for (idx, feature) in features.iter().enumerate() {
        let props = feature.get("properties").cloned().unwrap_or(Value::Null);
        let name = property_str(&props, &["name", "Name", "NAME"])
            .unwrap_or_else(|| format!("airspace-{idx}"));
        let polygons = feature
            .get("geometry")
            .map(parse_geometry)
            .unwrap_or_default();
        if polygons.is_empty() {
            warn!("Skipping airspace {:?}: no usable polygon", name);
            continue;
        }
        airspaces.push(Airspace {
            name,
            class: property_str(&props, &["class", "Class", "CLASS", "icao_class", "icaoClass"])
                .unwrap_or_default(),
            category: property_str(&props, &["category", "Category", "type", "Type", "TYPE"])
                .unwrap_or_default(),
            lower_limit_ft: property_value(
                &props,
                &["lower_limit_ft", "lowerLimit", "lower_limit", "LowerLimit", "floor"],
            )
            .and_then(parse_limit_ft)
            .unwrap_or(0.0),
            polygons,
        });
    }
    Ok(airspaces)
}

fn parse_geometry(geometry: &Value) -> Vec<AirspacePolygon> {
    let coords = geometry.get("coordinates");
    match (geometry.get("type").and_then(Value::as_str), coords) {
        (Some("Polygon"), Some(rings)) => parse_polygon(rings).into_iter().collect(),
        (Some("MultiPolygon"), Some(Value::Array(polygons))) => {
            polygons.iter().filter_map(parse_polygon).collect()
        }
        _ => Vec::new(),
    }
}

/// GeoJSON rings are `[lon, lat]`; the first ring is the exterior.
fn parse_polygon(rings: &Value) -> Option<AirspacePolygon> {
    let mut rings = rings.as_array()?.iter().map(parse_ring);
    let exterior = rings.next()??;
    let holes = rings.flatten().collect();
    AirspacePolygon::new(exterior, holes)
}

fn parse_ring(ring: &Value) -> Option<Vec<Position>> {
    ring.as_array()?
        .iter()
        .map(|pair| {
            let pair = pair.as_array()?;
            Some(Position::new(pair.get(1)?.as_f64()?, pair.first()?.as_f64()?))
        })
        .collect()
}

fn property_value<'a>(props: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|key| props.get(*key).filter(|v| !v.is_null()))
}

fn property_str(props: &Value, keys: &[&str]) -> Option<String> {
    property_value(props, keys).map(|value| match value {
        Value::String(text) => text.trim().to_string(),
        other => other.to_string(),
    })
}

/// Vertical limit in feet from a number (feet) or text such as `FL95`, `GND`,
/// `2500 ft AMSL` or `600 m`.
pub fn parse_limit_ft(value: &Value) -> Option<f64> {
    if let Some(feet) = value.as_f64() {
        return Some(feet);
    }
    let text = value.as_str()?.trim().to_uppercase();
    if text.is_empty() {
        return None;
    }
    if matches!(text.as_str(), "GND" | "SFC" | "SURFACE") {
        return Some(0.0);
    }
    if let Some(level) = text.strip_prefix("FL") {
        return level.trim().parse::<f64>().ok().map(|fl| fl * 100.0);
    }
    let digits: String = text
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let number: f64 = digits.parse().ok()?;
    let unit = text[digits.len()..].trim_start();
    if unit.starts_with('M') && !unit.starts_with("MSL") {
        Some(number / METRES_PER_FOOT)
    } else {
        Some(number)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "yes" | "y" | "true" | "t"
    )
}
