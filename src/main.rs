use anyhow::{bail, Context, Result};
use listmap::{
    config::PipelineConfig,
    ingest, metrics, normalize,
    render::{self, CityLayers},
};
use rayon::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) load configuration ───────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cities.yaml".to_string());
    let config = PipelineConfig::load(&config_path)
        .with_context(|| format!("cannot load pipeline config from {}", config_path))?;
    if config.cities.is_empty() {
        bail!("config {} lists no cities", config_path);
    }
    info!(cities = config.cities.len(), "configuration loaded");

    // ─── 3) run per-city pipelines ───────────────────────────────────
    // Cities share no state, so they fan out; one city failing must not
    // take the others down.
    let mut layers: Vec<(usize, CityLayers)> = config
        .cities
        .par_iter()
        .enumerate()
        .filter_map(|(i, spec)| match run_city(spec) {
            Ok(city) => Some((i, city)),
            Err(e) => {
                error!("{} failed: {:#}", spec.name, e);
                None
            }
        })
        .collect();
    layers.sort_by_key(|(i, _)| *i);
    let layers: Vec<CityLayers> = layers.into_iter().map(|(_, c)| c).collect();

    if layers.is_empty() {
        bail!("every city failed; nothing to render");
    }

    // ─── 4) write the map artifact ───────────────────────────────────
    render::write_map(&config.output, &layers)?;
    info!("all done");
    Ok(())
}

/// One city end to end: load → normalize → derive metrics.
fn run_city(spec: &listmap::CitySpec) -> Result<CityLayers> {
    let raw = ingest::load_csv(&spec.path)?;
    let table = normalize::normalize(&raw)
        .with_context(|| format!("cannot normalize {:?}", spec.path))?;
    info!(city = %spec.name, records = table.len(), "normalized");

    let center = metrics::city_center(&table)?;
    let sizes = metrics::marker_sizes(&table)?;
    Ok(CityLayers {
        name: spec.name.clone(),
        zoom: spec.zoom,
        center,
        table,
        sizes,
    })
}
