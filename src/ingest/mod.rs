use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

/// One loaded CSV file, column names as the file claims them.
///
/// Cells are kept as raw strings; all typing decisions happen in the
/// normalizer. A row shorter than the header is padded with empty cells so
/// every row has one cell per header.
#[derive(Debug)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a whole CSV file into a `RawTable`.
///
/// Header names are whitespace-trimmed; rows longer than the header are
/// truncated with a warning (once per file).
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<RawTable> {
    let file = File::open(&path)
        .with_context(|| format!("failed to open CSV file {:?}", path.as_ref()))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read headers of {:?}", path.as_ref()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    let mut warned_long = false;
    for record in reader.records() {
        let record =
            record.with_context(|| format!("failed to read row of {:?}", path.as_ref()))?;
        if record.len() > headers.len() && !warned_long {
            warn!(
                "rows with more cells than headers ({} headers), extra cells ignored",
                headers.len()
            );
            warned_long = true;
        }
        let mut row: Vec<String> = record
            .iter()
            .take(headers.len())
            .map(|s| s.to_string())
            .collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    debug!(rows = rows.len(), cols = headers.len(), "loaded CSV");
    Ok(RawTable { headers, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_csv_pads_short_rows() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "lat,lon,price")?;
        writeln!(f, "-22.97,-43.18,350")?;
        writeln!(f, "-22.98,-43.20")?;

        let table = load_csv(f.path())?;
        assert_eq!(table.headers, vec!["lat", "lon", "price"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["-22.98", "-43.20", ""]);
        Ok(())
    }

    #[test]
    fn test_load_csv_trims_headers() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, " lat , lon ")?;
        writeln!(f, "1.0,2.0")?;

        let table = load_csv(f.path())?;
        assert_eq!(table.headers, vec!["lat", "lon"]);
        Ok(())
    }

    #[test]
    fn test_load_csv_missing_file_is_error() {
        assert!(load_csv("definitely/not/here.csv").is_err());
    }
}
