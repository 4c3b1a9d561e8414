use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Latitude column name variants, in priority order. Order is observable:
/// the first variant that matches wins, so `lat` beats `latitude`.
const LAT_CANDIDATES: &[&str] = &["lat", "latitude", "Latitude", "Lat", "LATITUDE"];
const LON_CANDIDATES: &[&str] = &["LON", "lon", "Longitude", "Long", "Lng", "longitude"];
/// Portuguese variants deliberately outrank English ones.
const COST_CANDIDATES: &[&str] = &[
    "custo",
    "cost",
    "preço",
    "preco",
    "price",
    "valor",
    "valor_total",
];
const NAME_CANDIDATES: &[&str] = &[
    "nome",
    "descricao",
    "titulo",
    "name",
    "title",
    "local",
    "place",
];

/// Raised when a table has no detectable latitude or longitude column.
/// Carries the full input column list so the caller can see what was there.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("no latitude and/or longitude column found among columns {columns:?}")]
    MissingCoordinates { columns: Vec<String> },
}

/// One normalized listing. `lat`/`lon` are always finite, `cost` is always
/// filled (median or 0.1 fallback) and `name` is never null — synthetic
/// `Point {i}` when the source had no name-like column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub lat: f64,
    pub lon: f64,
    pub cost: f64,
    pub name: String,
}

/// Ordered, densely renumbered output of [`normalize`]. Owned by a single
/// pipeline invocation; never shared across cities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    pub records: Vec<CanonicalRecord>,
}

impl CanonicalTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Two-pass column detection over explicit sequences.
///
/// Pass 1 scans `candidates` in priority order for an exact (case-sensitive)
/// match against any column name. Pass 2 falls back to a case-insensitive
/// substring match: candidates in priority order, columns in original order.
/// Returns the matched column's index, or `None` — absence is the caller's
/// call to judge.
pub fn pick_column(columns: &[String], candidates: &[&str]) -> Option<usize> {
    for c in candidates {
        if let Some(idx) = columns.iter().position(|col| col == c) {
            return Some(idx);
        }
    }
    for c in candidates {
        let needle = c.to_lowercase();
        for (idx, col) in columns.iter().enumerate() {
            if col.to_lowercase().contains(&needle) {
                return Some(idx);
            }
        }
    }
    None
}

/// Coerce one raw cell to a number. Empty cells, unparseable text and NaN
/// are all "missing" — never a hard failure.
fn coerce_numeric(raw: &str) -> Option<f64> {
    let v = raw.trim().trim_matches('"');
    if v.is_empty() {
        return None;
    }
    v.parse::<f64>().ok().filter(|x| !x.is_nan())
}

/// Median of an unordered, non-empty slice; mean of the two middle values
/// for even lengths.
fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Map a raw table with arbitrary column naming onto the canonical
/// `{lat, lon, cost, name}` shape.
///
/// Latitude and longitude columns are mandatory; everything else degrades
/// gracefully. Rows whose lat or lon fails numeric coercion (or is
/// non-finite) are dropped and the survivors renumbered densely from 0.
/// Missing costs are filled with the median of the surviving non-missing
/// costs, or the constant 0.1 when there are none (non-finite median also
/// falls back to 0.1).
#[tracing::instrument(level = "debug", skip(raw), fields(rows = raw.rows.len()))]
pub fn normalize(raw: &crate::ingest::RawTable) -> Result<CanonicalTable, SchemaError> {
    let lat_col = pick_column(&raw.headers, LAT_CANDIDATES);
    let lon_col = pick_column(&raw.headers, LON_CANDIDATES);
    let cost_col = pick_column(&raw.headers, COST_CANDIDATES);
    let name_col = pick_column(&raw.headers, NAME_CANDIDATES);

    let (lat_col, lon_col) = match (lat_col, lon_col) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ => {
            return Err(SchemaError::MissingCoordinates {
                columns: raw.headers.clone(),
            })
        }
    };
    if cost_col.is_none() {
        debug!("no cost-like column, all costs will use the 0.1 default");
    }
    if name_col.is_none() {
        debug!("no name-like column, generating placeholder names");
    }

    // Coerce + filter in one walk. Cost stays optional until the fill pass.
    let mut survivors: Vec<(f64, f64, Option<f64>, Option<String>)> = Vec::new();
    for row in &raw.rows {
        let lat = row
            .get(lat_col)
            .and_then(|c| coerce_numeric(c))
            .filter(|v| v.is_finite());
        let lon = row
            .get(lon_col)
            .and_then(|c| coerce_numeric(c))
            .filter(|v| v.is_finite());
        let (lat, lon) = match (lat, lon) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => continue,
        };
        let cost = cost_col.and_then(|i| row.get(i)).and_then(|c| coerce_numeric(c));
        let name = name_col.and_then(|i| row.get(i)).map(|c| c.to_string());
        survivors.push((lat, lon, cost, name));
    }

    let present: Vec<f64> = survivors.iter().filter_map(|(_, _, c, _)| *c).collect();
    let fill = if present.is_empty() {
        0.1
    } else {
        let med = median(&present);
        if med.is_finite() {
            med
        } else {
            warn!("median cost is not finite, falling back to 0.1");
            0.1
        }
    };

    let records = survivors
        .into_iter()
        .enumerate()
        .map(|(i, (lat, lon, cost, name))| CanonicalRecord {
            lat,
            lon,
            cost: cost.unwrap_or(fill),
            name: name.unwrap_or_else(|| format!("Point {}", i)),
        })
        .collect();

    Ok(CanonicalTable { records })
}
