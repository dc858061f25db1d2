use crate::config::{AppConfig, InputConfig};
use crate::error::DemoError;
use crate::sampling::generate_sample_points;
use crate::types::{Region, SamplePoint};
use anyhow::{Context, Result, anyhow};
use geo::MultiPolygon;
use shapefile::Reader;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Everything loaded once per process and shared read-only afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub regions: Vec<Region>,
    pub points: Vec<SamplePoint>,
}

impl Dataset {
    /// Sorted, de-duplicated region names.
    pub fn region_names(&self) -> Vec<String> {
        self.regions
            .iter()
            .map(|r| r.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// `preferred` when present, otherwise the alphabetically first name.
    pub fn default_region(&self, preferred: &str) -> Option<String> {
        let names = self.region_names();
        if names.iter().any(|n| n == preferred) {
            Some(preferred.to_string())
        } else {
            names.into_iter().next()
        }
    }
}

pub async fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    info!("Loading region dataset from {}", config.input.source);

    let geometry_path = resolve_source(&config.input).await?;
    let regions = load_regions(&geometry_path, &config.input)?;
    info!("Loaded {} regions", regions.len());

    let points = generate_sample_points(&config.sampling);
    info!("Generated {} sample points (seed {})", points.len(), config.sampling.seed);

    Ok(Dataset { regions, points })
}

/// Turn the configured source into a local .shp/.geojson path, downloading and
/// unpacking a zip bundle where needed.
async fn resolve_source(input: &InputConfig) -> Result<PathBuf> {
    let source = input.source.as_str();

    if source.starts_with("http://") || source.starts_with("https://") {
        let bytes = fetch(source).await?;
        let stem = bundle_stem(source);
        return extract_bundle(&bytes, &input.cache_dir.join(stem));
    }

    let path = PathBuf::from(source);
    if extension_of(&path).as_deref() == Some("zip") {
        let bytes = fs::read(&path)
            .map_err(|e| DemoError::DataUnavailable { source_ref: source.to_string(), reason: e.to_string() })?;
        let stem = bundle_stem(source);
        return extract_bundle(&bytes, &input.cache_dir.join(stem));
    }

    Ok(path)
}

async fn fetch(url: &str) -> Result<Vec<u8>> {
    let unavailable = |reason: String| DemoError::DataUnavailable { source_ref: url.to_string(), reason };

    let resp = reqwest::get(url).await.map_err(|e| unavailable(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(unavailable(format!("HTTP status {}", resp.status())).into());
    }
    let bytes = resp.bytes().await.map_err(|e| unavailable(e.to_string()))?;
    info!("Downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

fn bundle_stem(source: &str) -> String {
    let last = source.rsplit(['/', '\\']).next().unwrap_or(source);
    last.trim_end_matches(".zip").to_string()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

/// Unpack a zip bundle into `dest` and return the geometry file inside it.
pub fn extract_bundle(bytes: &[u8], dest: &Path) -> Result<PathBuf> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .context("Dataset bundle is not a valid zip archive")?;
    fs::create_dir_all(dest).with_context(|| format!("Failed to create cache dir: {:?}", dest))?;

    let mut geometry_file: Option<PathBuf> = None;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        // flatten: sidecar files must sit next to the .shp
        let file_name = match entry.enclosed_name().and_then(|p| p.file_name().map(PathBuf::from)) {
            Some(name) => name,
            None => {
                warn!("Skipping unsafe zip entry {}", entry.name());
                continue;
            }
        };
        let out_path = dest.join(&file_name);
        let mut out = File::create(&out_path)
            .with_context(|| format!("Failed to write {:?}", out_path))?;
        std::io::copy(&mut entry, &mut out)?;

        let ext = extension_of(&out_path);
        let is_geometry = matches!(ext.as_deref(), Some("shp") | Some("geojson") | Some("json"));
        if is_geometry && geometry_file.is_none() {
            geometry_file = Some(out_path);
        }
    }

    geometry_file.ok_or_else(|| anyhow!("No .shp or .geojson found in dataset bundle"))
}

pub fn load_regions(path: &Path, input: &InputConfig) -> Result<Vec<Region>> {
    let extension = extension_of(path)
        .ok_or_else(|| anyhow!("Input geometry file has no extension"))?;

    let mut regions = match extension.as_str() {
        "shp" => {
            warn_if_not_wgs84(path);
            load_shapefile(path, &input.name_fields)?
        }
        "json" | "geojson" => load_geojson(path, &input.name_fields)?,
        other => return Err(DemoError::UnsupportedFormat(other.to_string()).into()),
    };

    if let Some(excluded) = input.exclude_region.as_deref().filter(|s| !s.is_empty()) {
        let excluded = excluded.to_lowercase();
        let before = regions.len();
        regions.retain(|r| r.name.to_lowercase() != excluded);
        if regions.len() < before {
            info!("Dropped excluded region '{}'", excluded);
        }
    }

    Ok(regions)
}

/// Geometries are used as lon/lat without reprojection, so flag any .prj
/// that describes something else.
fn warn_if_not_wgs84(shp_path: &Path) {
    let prj_path = shp_path.with_extension("prj");
    match fs::read_to_string(&prj_path) {
        Ok(wkt) if !is_geographic_wgs84(&wkt) => warn!(
            "{:?} is not geographic WGS84; coordinates are used as-is",
            prj_path
        ),
        Ok(_) => {}
        Err(_) => warn!("No .prj next to {:?}; assuming WGS84", shp_path),
    }
}

pub fn is_geographic_wgs84(wkt: &str) -> bool {
    let wkt = wkt.trim_start().to_uppercase();
    wkt.starts_with("GEOGCS") && (wkt.contains("WGS_1984") || wkt.contains("WGS 84"))
}

fn missing_name_field(candidates: &[String]) -> anyhow::Error {
    DemoError::MissingNameField { candidates: candidates.to_vec() }.into()
}

fn load_shapefile(path: &Path, name_fields: &[String]) -> Result<Vec<Region>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut name_field: Option<String> = None;
    let mut regions = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        // the first record decides which candidate column is the name
        let field = match &name_field {
            Some(f) => f.clone(),
            None => {
                let found = name_fields
                    .iter()
                    .find(|c| record.get(c.as_str()).is_some())
                    .cloned()
                    .ok_or_else(|| missing_name_field(name_fields))?;
                info!("Using '{}' as the region name field", found);
                name_field = Some(found.clone());
                found
            }
        };

        let name = match record.get(&field) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(shapefile::dbase::FieldValue::Memo(s)) => s.trim().to_string(),
            _ => continue,
        };
        if name.is_empty() {
            continue;
        }

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon: {:?}", e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM: {:?}", e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ: {:?}", e))?,
            _ => continue,
        };

        regions.push(Region { name, geometry });
    }

    Ok(regions)
}

fn load_geojson(path: &Path, name_fields: &[String]) -> Result<Vec<Region>> {
    use geojson::GeoJson;

    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = GeoJson::from_reader(BufReader::new(file)).context("Failed to parse GeoJSON")?;

    let collection = match geojson {
        GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("GeoJSON must be a FeatureCollection")),
    };

    let field = collection
        .features
        .iter()
        .find_map(|f| f.properties.as_ref())
        .and_then(|props| name_fields.iter().find(|c| props.contains_key(c.as_str())))
        .cloned()
        .ok_or_else(|| missing_name_field(name_fields))?;
    info!("Using '{}' as the region name field", field);

    let mut regions = Vec::new();

    for feature in collection.features {
        let name = match feature.properties.as_ref().and_then(|props| props.get(&field)) {
            Some(serde_json::Value::String(s)) => s.trim().to_string(),
            _ => continue,
        };

        let geometry = match feature.geometry {
            Some(geom) => {
                let value: geo::Geometry<f64> = geom.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geojson geometry: {:?}", e))?;
                match value {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        regions.push(Region { name, geometry });
    }

    Ok(regions)
}
