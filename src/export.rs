use crate::render::save_preview;
use crate::scene::Scene;
use crate::types::MembershipRow;
use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const CSV_FILE_NAME: &str = "joined_points.csv";
pub const SCENE_FILE_NAME: &str = "scene.geojson";
pub const PREVIEW_FILE_NAME: &str = "preview.png";

const CSV_HEADER: [&str; 5] = ["id", "lat", "lon", "name", "inside"];

/// Write the joined table with a header row: id, lat, lon, name, inside.
pub fn write_csv<W: Write>(rows: &[MembershipRow], writer: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    // explicit so an empty table still gets its header
    wtr.write_record(CSV_HEADER)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn csv_bytes(rows: &[MembershipRow]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(rows, &mut buf)?;
    Ok(buf)
}

/// Write CSV, merged GeoJSON and PNG preview for one scene into `dir`.
pub fn export_scene(scene: &Scene, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output dir: {:?}", dir))?;

    let csv_path = dir.join(CSV_FILE_NAME);
    let file = fs::File::create(&csv_path)
        .with_context(|| format!("Failed to create {:?}", csv_path))?;
    write_csv(&scene.rows, file)?;

    let geojson_path = dir.join(SCENE_FILE_NAME);
    let geojson = geojson::GeoJson::from(scene.to_feature_collection());
    fs::write(&geojson_path, geojson.to_string())
        .with_context(|| format!("Failed to write {:?}", geojson_path))?;

    let preview_path = dir.join(PREVIEW_FILE_NAME);
    save_preview(scene, &preview_path)?;

    info!("Exported '{}' to {:?}", scene.region, dir);
    Ok(vec![csv_path, geojson_path, preview_path])
}
