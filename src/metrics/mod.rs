use serde::Serialize;
use thiserror::Error;

use crate::normalize::CanonicalTable;

/// Marker sizing bounds for the point display mode.
const SIZE_MIN: f64 = 6.0;
const SIZE_MAX: f64 = 26.0;
/// Fixed size when the cost distribution is degenerate (all equal or
/// non-finite), including the common all-default-0.1 case.
const SIZE_FLAT: f64 = 10.0;

/// Deriving a center or size scale over zero records is a caller bug, not
/// a recoverable condition; fail fast instead of dividing by zero.
#[derive(Debug, Error)]
#[error("cannot derive {what} from an empty table")]
pub struct EmptyTableError {
    what: &'static str,
}

/// Mean coordinate of one city's surviving records, used to center the
/// viewport. Recomputed on demand, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CityCenter {
    pub lat: f64,
    pub lon: f64,
}

/// Arithmetic mean of lat and, independently, lon over all records.
pub fn city_center(table: &CanonicalTable) -> Result<CityCenter, EmptyTableError> {
    if table.is_empty() {
        return Err(EmptyTableError { what: "center" });
    }
    let n = table.len() as f64;
    let (lat_sum, lon_sum) = table
        .records
        .iter()
        .fold((0.0, 0.0), |(la, lo), r| (la + r.lat, lo + r.lon));
    Ok(CityCenter {
        lat: lat_sum / n,
        lon: lon_sum / n,
    })
}

/// Per-record marker sizes scaled from the cost column, in record order.
///
/// Degenerate distributions (min/max non-finite, or spread below 1e-9) get
/// the flat size 10.0. Otherwise `(c - c_min) / c_max * 20 + 6`, clamped
/// into [6, 26]. The divisor is `c_max`, not the range: compatibility with
/// the observed scaling rule wins over textbook min-max normalization.
pub fn marker_sizes(table: &CanonicalTable) -> Result<Vec<f64>, EmptyTableError> {
    if table.is_empty() {
        return Err(EmptyTableError { what: "marker sizes" });
    }

    let costs: Vec<f64> = table.records.iter().map(|r| r.cost).collect();
    let c_min = costs.iter().cloned().fold(f64::INFINITY, f64::min);
    let c_max = costs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if !c_min.is_finite() || !c_max.is_finite() || (c_max - c_min).abs() < 1e-9 {
        return Ok(vec![SIZE_FLAT; costs.len()]);
    }

    Ok(costs
        .iter()
        .map(|c| ((c - c_min) / c_max * 20.0 + 6.0).clamp(SIZE_MIN, SIZE_MAX))
        .collect())
}
