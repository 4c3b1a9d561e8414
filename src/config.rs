use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One city dataset to ingest and draw, deserialized from the config YAML.
///
/// Zoom is a caller-owned presentation value (e.g. 9 for a sprawling city,
/// 10 for a compact one); the pipeline never computes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitySpec {
    /// Path to the source CSV file.
    pub path: PathBuf,
    /// Human-readable name shown in trace legends and buttons.
    pub name: String,
    /// Initial map zoom level when this city is selected.
    pub zoom: f64,
}

/// Full pipeline configuration: which cities to process and where the
/// rendered map goes. Replaces any baked-in folder constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub cities: Vec<CitySpec>,
    /// Output path for the self-contained HTML artifact.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

fn default_output() -> PathBuf {
    PathBuf::from("map.html")
}

impl PipelineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config {:?}", path.as_ref()))?;
        let cfg: PipelineConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config {:?}", path.as_ref()))?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_yaml() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(
            f,
            "cities:\n  - path: data/ny.csv\n    name: New York\n    zoom: 9\n  - path: data/rj.csv\n    name: Rio de Janeiro\n    zoom: 10\noutput: out/map.html"
        )?;

        let cfg = PipelineConfig::load(f.path())?;
        assert_eq!(cfg.cities.len(), 2);
        assert_eq!(cfg.cities[0].name, "New York");
        assert_eq!(cfg.cities[1].zoom, 10.0);
        assert_eq!(cfg.output, PathBuf::from("out/map.html"));
        Ok(())
    }

    #[test]
    fn test_output_defaults_when_absent() -> Result<()> {
        let mut f = NamedTempFile::new()?;
        writeln!(f, "cities:\n  - path: rj.csv\n    name: Rio\n    zoom: 10")?;

        let cfg = PipelineConfig::load(f.path())?;
        assert_eq!(cfg.output, PathBuf::from("map.html"));
        Ok(())
    }
}
