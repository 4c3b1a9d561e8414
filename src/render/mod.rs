use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::metrics::CityCenter;
use crate::normalize::CanonicalTable;

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-3.0.1.min.js";

/// Everything the figure needs for one city, handed over by the core.
#[derive(Debug)]
pub struct CityLayers {
    pub name: String,
    pub zoom: f64,
    pub center: CityCenter,
    pub table: CanonicalTable,
    pub sizes: Vec<f64>,
}

/// Discrete-marker trace for one city: markers sized by the derived scale
/// and colored by cost (Viridis), name + cost exposed through customdata
/// for the hover label.
fn point_trace(city: &CityLayers, visible: bool) -> Value {
    let lats: Vec<f64> = city.table.records.iter().map(|r| r.lat).collect();
    let lons: Vec<f64> = city.table.records.iter().map(|r| r.lon).collect();
    let costs: Vec<f64> = city.table.records.iter().map(|r| r.cost).collect();
    let custom: Vec<Value> = city
        .table
        .records
        .iter()
        .map(|r| json!([r.name, r.cost]))
        .collect();

    json!({
        "type": "scattermap",
        "name": format!("{} - Pontos", city.name),
        "lat": lats,
        "lon": lons,
        "mode": "markers",
        "marker": {
            "size": city.sizes,
            "color": costs,
            "colorscale": "Viridis",
            "colorbar": { "title": "custo" },
        },
        "customdata": custom,
        "hovertemplate": "<b>%{customdata[0]}</b><br>custo: %{customdata[1]}<br>Lat: %{lat:.5f} - Lon: %{lon:.5f}<extra></extra>",
        "visible": visible,
    })
}

/// Density-heatmap trace for the same coordinates, weighted by cost.
fn density_trace(city: &CityLayers, visible: bool) -> Value {
    let lats: Vec<f64> = city.table.records.iter().map(|r| r.lat).collect();
    let lons: Vec<f64> = city.table.records.iter().map(|r| r.lon).collect();
    let costs: Vec<f64> = city.table.records.iter().map(|r| r.cost).collect();

    json!({
        "type": "densitymap",
        "name": format!("{} - Densidade", city.name),
        "lat": lats,
        "lon": lons,
        "z": costs,
        "radius": 20,
        "colorscale": "Viridis",
        "showscale": false,
        "visible": visible,
    })
}

/// One selector button per (city, display mode) pair: shows exactly one
/// trace and re-centers/zooms the viewport to that city.
fn mode_buttons(cities: &[CityLayers]) -> Vec<Value> {
    let n_traces = cities.len() * 2;
    let mut buttons = Vec::with_capacity(n_traces);
    for (i, city) in cities.iter().enumerate() {
        for (offset, label) in [(0usize, "Pontos"), (1usize, "Densidade")] {
            let visible: Vec<bool> = (0..n_traces).map(|t| t == i * 2 + offset).collect();
            buttons.push(json!({
                "label": format!("{} - {}", city.name, label),
                "method": "update",
                "args": [
                    { "visible": visible },
                    {
                        "map.center": { "lat": city.center.lat, "lon": city.center.lon },
                        "map.zoom": city.zoom,
                    }
                ],
            }));
        }
    }
    buttons
}

/// Assemble the full plotly figure: two traces per city plus the in-page
/// city/mode selector. The first city's point layer starts visible.
pub fn build_figure(cities: &[CityLayers]) -> Value {
    let mut data = Vec::with_capacity(cities.len() * 2);
    for (i, city) in cities.iter().enumerate() {
        data.push(point_trace(city, i == 0));
        data.push(density_trace(city, false));
    }

    let (center, zoom) = cities
        .first()
        .map(|c| (c.center, c.zoom))
        .unwrap_or((CityCenter { lat: 0.0, lon: 0.0 }, 1.0));

    json!({
        "data": data,
        "layout": {
            "map": {
                "style": "open-street-map",
                "center": { "lat": center.lat, "lon": center.lon },
                "zoom": zoom,
            },
            "margin": { "l": 0, "r": 0, "t": 30, "b": 0 },
            "title": { "text": "Listings" },
            "updatemenus": [{
                "type": "buttons",
                "direction": "right",
                "x": 0.0,
                "y": 1.08,
                "buttons": mode_buttons(cities),
            }],
        },
    })
}

/// Embed the figure in a self-contained page loading plotly.js from CDN.
pub fn render_html(figure: &Value) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8"/>
<script src="{cdn}"></script>
<style>html, body, #map {{ height: 100%; margin: 0; }}</style>
</head>
<body>
<div id="map"></div>
<script>
var fig = {figure};
Plotly.newPlot("map", fig.data, fig.layout, {{responsive: true}});
</script>
</body>
</html>
"#,
        cdn = PLOTLY_CDN,
        figure = figure
    )
}

/// Build and write the final artifact.
#[tracing::instrument(level = "info", skip(cities, path), fields(path = %path.as_ref().display()))]
pub fn write_map<P: AsRef<Path>>(path: P, cities: &[CityLayers]) -> Result<()> {
    let figure = build_figure(cities);
    let html = render_html(&figure);
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create output dir {:?}", parent))?;
        }
    }
    fs::write(&path, html)
        .with_context(|| format!("failed to write map to {:?}", path.as_ref()))?;
    info!(cities = cities.len(), "wrote map");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::CanonicalRecord;

    fn city(name: &str, zoom: f64) -> CityLayers {
        let table = CanonicalTable {
            records: vec![
                CanonicalRecord {
                    lat: -22.97,
                    lon: -43.18,
                    cost: 350.0,
                    name: "Ipanema Studio".into(),
                },
                CanonicalRecord {
                    lat: -22.98,
                    lon: -43.20,
                    cost: 120.0,
                    name: "Leblon Flat".into(),
                },
            ],
        };
        let sizes = crate::metrics::marker_sizes(&table).unwrap();
        let center = crate::metrics::city_center(&table).unwrap();
        CityLayers {
            name: name.to_string(),
            zoom,
            center,
            table,
            sizes,
        }
    }

    #[test]
    fn test_two_traces_per_city_and_first_points_visible() {
        let cities = vec![city("Rio de Janeiro", 10.0), city("New York", 9.0)];
        let fig = build_figure(&cities);

        let data = fig["data"].as_array().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data[0]["type"], "scattermap");
        assert_eq!(data[1]["type"], "densitymap");
        assert_eq!(data[0]["visible"], true);
        assert!(data[1..].iter().all(|t| t["visible"] == false));
    }

    #[test]
    fn test_one_button_per_city_mode_pair() {
        let cities = vec![city("Rio de Janeiro", 10.0), city("New York", 9.0)];
        let fig = build_figure(&cities);

        let buttons = fig["layout"]["updatemenus"][0]["buttons"].as_array().unwrap();
        assert_eq!(buttons.len(), 4);
        assert_eq!(buttons[0]["label"], "Rio de Janeiro - Pontos");
        assert_eq!(buttons[3]["label"], "New York - Densidade");

        // each button shows exactly its own trace and moves the viewport
        let visible = buttons[2]["args"][0]["visible"].as_array().unwrap();
        assert_eq!(visible, &vec![false, false, true, false]);
        assert_eq!(buttons[2]["args"][1]["map.zoom"], 9.0);
    }

    #[test]
    fn test_point_trace_exposes_name_and_cost_for_hover() {
        let c = city("Rio", 10.0);
        let trace = point_trace(&c, true);
        assert_eq!(trace["customdata"][0][0], "Ipanema Studio");
        assert_eq!(trace["customdata"][0][1], 350.0);
        assert_eq!(trace["marker"]["size"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_csv_to_figure_end_to_end() -> Result<()> {
        use std::io::Write;

        let mut f = tempfile::NamedTempFile::new()?;
        writeln!(f, "Latitude,Lng,price,title")?;
        writeln!(f, "-22.97,-43.18,350,Ipanema Studio")?;
        writeln!(f, "-22.98,-43.20,,Leblon Flat")?;
        writeln!(f, "N/A,-43.21,120,never shows up")?;

        let raw = crate::ingest::load_csv(f.path())?;
        let table = crate::normalize::normalize(&raw)?;
        assert_eq!(table.len(), 2);

        let center = crate::metrics::city_center(&table)?;
        let sizes = crate::metrics::marker_sizes(&table)?;
        // both surviving costs equal 350 after the median fill
        assert_eq!(sizes, vec![10.0, 10.0]);

        let fig = build_figure(&[CityLayers {
            name: "Rio de Janeiro".into(),
            zoom: 10.0,
            center,
            table,
            sizes,
        }]);
        let lats = fig["data"][0]["lat"].as_array().unwrap();
        assert_eq!(lats.len(), 2);
        assert_eq!(fig["layout"]["map"]["zoom"], 10.0);
        Ok(())
    }

    #[test]
    fn test_write_map_produces_html_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("map.html");
        write_map(&out, &[city("Rio", 10.0)])?;

        let html = std::fs::read_to_string(&out)?;
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("scattermap"));
        Ok(())
    }
}
