use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use globe::{GlobeConfig, GlobeView, LevelOfDetail, PinSource, PinSourceError, ZoomMapper};
use layers::{MarkerDescriptor, MarkerLayer, Pin, PinId};
use serde::Serialize;
use spatial::ClusterId;

fn main() {
    match real_main() {
        Ok(out) => println!("{out}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

fn real_main() -> Result<String, String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "markers" => cmd_markers(args),
        "zoom" => cmd_zoom(args),
        "cluster" => cmd_cluster(args),
        _ => Err(usage()),
    }
}

/// A JSON array of pin rows on disk.
struct PinFile<'a> {
    path: &'a Path,
}

impl PinSource for PinFile<'_> {
    fn fetch_pins(&self) -> Result<Vec<Pin>, PinSourceError> {
        let raw = fs::read_to_string(self.path)
            .map_err(|e| PinSourceError::Unavailable(format!("read {:?}: {e}", self.path)))?;
        serde_json::from_str(&raw).map_err(|e| PinSourceError::Malformed(e.to_string()))
    }
}

#[derive(Debug, Default)]
struct CommonArgs {
    positional: Vec<String>,
    config: Option<PathBuf>,
    altitude: Option<f64>,
    limit: Option<usize>,
    offset: Option<usize>,
    pretty: bool,
}

fn parse_args(args: &[String]) -> Result<CommonArgs, String> {
    let mut parsed = CommonArgs::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => parsed.config = Some(PathBuf::from(flag_value(args, &mut i)?)),
            "--altitude" => {
                parsed.altitude = Some(parse_num(flag_value(args, &mut i)?, "--altitude")?);
            }
            "--limit" => {
                parsed.limit = Some(parse_num(flag_value(args, &mut i)?, "--limit")?);
            }
            "--offset" => {
                parsed.offset = Some(parse_num(flag_value(args, &mut i)?, "--offset")?);
            }
            "--pretty" => parsed.pretty = true,
            s if s.starts_with("--") => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            s => parsed.positional.push(s.to_string()),
        }
        i += 1;
    }
    Ok(parsed)
}

fn flag_value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, String> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

fn parse_num<T: std::str::FromStr>(raw: &str, flag: &str) -> Result<T, String> {
    raw.parse().map_err(|_| format!("{flag}: not a valid number: {raw}"))
}

fn load_config(args: &CommonArgs) -> Result<GlobeConfig, String> {
    match &args.config {
        Some(path) => GlobeConfig::load(path).map_err(|e| format!("{path:?}: {e}")),
        None => Ok(GlobeConfig::default()),
    }
}

fn load_view(args: &CommonArgs) -> Result<GlobeView, String> {
    let pins_path = args
        .positional
        .first()
        .ok_or_else(|| format!("missing <pins.json>\n\n{}", usage()))?;
    let pins = PinFile {
        path: Path::new(pins_path),
    }
    .fetch_pins()
    .map_err(|e| e.to_string())?;

    let mut view = GlobeView::new(load_config(args)?);
    view.replace_pins(&pins);
    Ok(view)
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, String> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    out.map_err(|e| format!("json: {e}"))
}

#[derive(Debug, Serialize)]
struct MarkersReport {
    altitude: f64,
    level_of_detail: LevelOfDetail,
    pin_count: usize,
    markers: Vec<MarkerDescriptor>,
}

fn cmd_markers(args: Vec<String>) -> Result<String, String> {
    // pinglobe markers <pins.json> [--altitude A] [--config FILE] [--pretty]
    let args = parse_args(&args)?;
    let view = load_view(&args)?;
    let altitude = args
        .altitude
        .unwrap_or(view.config().camera.overview_altitude);

    let report = MarkersReport {
        altitude,
        level_of_detail: view.config().zoom.level_of_detail(altitude),
        pin_count: view.pin_count(),
        markers: view.markers_at(altitude),
    };
    to_json(&report, args.pretty)
}

#[derive(Debug, Serialize)]
struct ZoomReport {
    altitude: f64,
    zoom: u8,
    level_of_detail: LevelOfDetail,
    /// Altitude the zoom level maps back to.
    band_altitude: f64,
}

fn cmd_zoom(args: Vec<String>) -> Result<String, String> {
    // pinglobe zoom <altitude> [--config FILE]
    let args = parse_args(&args)?;
    let raw = args
        .positional
        .first()
        .ok_or_else(|| format!("missing <altitude>\n\n{}", usage()))?;
    let altitude: f64 = parse_num(raw, "altitude")?;
    let mapper: ZoomMapper = load_config(&args)?.zoom;

    let zoom = mapper.zoom_from_altitude(altitude);
    let report = ZoomReport {
        altitude,
        zoom,
        level_of_detail: mapper.level_of_detail(altitude),
        band_altitude: mapper.altitude_from_zoom(zoom),
    };
    to_json(&report, args.pretty)
}

#[derive(Debug, Serialize)]
struct ClusterReport {
    cluster_id: ClusterId,
    expansion_zoom: u8,
    children: Vec<MarkerDescriptor>,
    leaves: Vec<PinId>,
}

fn cmd_cluster(args: Vec<String>) -> Result<String, String> {
    // pinglobe cluster <pins.json> <cluster_id> [--limit N] [--offset N] [--config FILE]
    let args = parse_args(&args)?;
    let raw_id = args
        .positional
        .get(1)
        .ok_or_else(|| format!("missing <cluster_id>\n\n{}", usage()))?;
    let cluster = ClusterId(parse_num(raw_id, "cluster_id")?);
    let view = load_view(&args)?;
    let index = view.index();

    let children = index.children(cluster).map_err(|e| e.to_string())?;
    let layer = MarkerLayer::new(view.config().markers.clone());
    let leaves = index
        .leaves(cluster, args.limit.unwrap_or(10), args.offset.unwrap_or(0))
        .map_err(|e| e.to_string())?;

    let report = ClusterReport {
        cluster_id: cluster,
        expansion_zoom: index.expansion_zoom(cluster).map_err(|e| e.to_string())?,
        children: layer.project(&children, view.pin_count()),
        leaves: leaves
            .into_iter()
            .map(|f| f.properties.pin_id.clone())
            .collect(),
    };
    to_json(&report, args.pretty)
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "pinglobe".to_string());
    format!(
        "Usage:\n  {exe} markers <pins.json> [--altitude A] [--config FILE] [--pretty]\n  {exe} zoom <altitude> [--config FILE]\n  {exe} cluster <pins.json> <cluster_id> [--limit N] [--offset N] [--config FILE] [--pretty]\n\nNotes:\n- <pins.json> is an array of pin rows as served by GET /api/pins.\n- Altitude is in globe radii; the default is the overview altitude.\n- Cluster ids come from `markers` output and are only valid for the same pin file and config.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::{cmd_cluster, cmd_markers, cmd_zoom};
    use std::path::PathBuf;

    const PINS: &str = r#"[
        {"id": "1", "username": "Alice", "lat": 48.85, "lng": 2.30, "location": "Paris"},
        {"id": "2", "username": "Ana", "lat": 48.85, "lng": 2.31},
        {"id": "3", "username": "Aline", "lat": 48.86, "lng": 2.32, "is_anonymous": true},
        {"id": 4, "username": "Bob", "lat": 40.71, "lng": -74.0}
    ]"#;

    fn write_pins(dir: &tempfile::TempDir) -> String {
        let path: PathBuf = dir.path().join("pins.json");
        std::fs::write(&path, PINS).unwrap();
        path.to_string_lossy().into_owned()
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn markers_cluster_at_overview_and_split_up_close() {
        let dir = tempfile::tempdir().unwrap();
        let pins = write_pins(&dir);
        let pins = pins.as_str();

        let far: serde_json::Value =
            serde_json::from_str(&cmd_markers(args(&[pins])).unwrap()).unwrap();
        assert_eq!(far["pin_count"], 4);
        assert_eq!(far["level_of_detail"]["mode"], "clustered");
        let markers = far["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0]["kind"], "cluster");
        assert_eq!(markers[0]["count"], 3);

        let near: serde_json::Value =
            serde_json::from_str(&cmd_markers(args(&[pins, "--altitude", "0.3"])).unwrap())
                .unwrap();
        assert_eq!(near["level_of_detail"]["mode"], "individual");
        let markers = near["markers"].as_array().unwrap();
        assert_eq!(markers.len(), 4);
        assert_eq!(markers[2]["display_name"], "Anonymous");
    }

    #[test]
    fn cluster_command_lists_children_and_leaves() {
        let dir = tempfile::tempdir().unwrap();
        let pins = write_pins(&dir);
        let pins = pins.as_str();
        let overview: serde_json::Value =
            serde_json::from_str(&cmd_markers(args(&[pins])).unwrap()).unwrap();
        let id = overview["markers"][0]["cluster_id"].as_u64().unwrap().to_string();

        let report: serde_json::Value =
            serde_json::from_str(&cmd_cluster(args(&[pins, id.as_str(), "--limit", "2"])).unwrap())
                .unwrap();
        assert_eq!(report["leaves"].as_array().unwrap().len(), 2);
        let children = report["children"].as_array().unwrap();
        let total: u64 = children
            .iter()
            .map(|c| c["count"].as_u64().unwrap_or(1))
            .sum();
        assert_eq!(total, 3);
        assert!(report["expansion_zoom"].as_u64().unwrap() > 1);
    }

    #[test]
    fn zoom_reports_band() {
        let out: serde_json::Value =
            serde_json::from_str(&cmd_zoom(args(&["1.25"])).unwrap()).unwrap();
        assert_eq!(out["zoom"], 2);
        assert_eq!(out["band_altitude"], 1.25);
    }

    #[test]
    fn errors_name_the_problem() {
        let err = cmd_markers(args(&["/definitely/missing.json"])).unwrap_err();
        assert!(err.contains("unavailable"), "{err}");
        let err = cmd_zoom(args(&["high"])).unwrap_err();
        assert!(err.contains("not a valid number"), "{err}");
        let err = cmd_markers(args(&["--bogus"])).unwrap_err();
        assert!(err.contains("unknown arg"), "{err}");
    }
}
