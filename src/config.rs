use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Context, Result};

pub const NATURAL_EARTH_URL: &str =
    "https://naturalearth.s3.amazonaws.com/110m_cultural/ne_110m_admin_0_countries.zip";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// URL or local path (.zip, .shp, .json, .geojson)
    #[serde(default = "default_source")]
    pub source: String,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Candidate name columns, highest priority first
    #[serde(default = "default_name_fields")]
    pub name_fields: Vec<String>,
    #[serde(default = "default_exclude_region")]
    pub exclude_region: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SamplingConfig {
    pub seed: u64,
    pub count: usize,
    pub lat_range: [f64; 2],
    pub lon_range: [f64; 2],
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ControlsConfig {
    pub default_region: String,
    pub buffer_km: u32,
    pub buffer_min_km: u32,
    pub buffer_max_km: u32,
    pub buffer_step_km: u32,
    pub show_all_regions: bool,
    pub show_points_outside: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

fn default_source() -> String {
    NATURAL_EARTH_URL.to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_name_fields() -> Vec<String> {
    ["name", "ADMIN", "NAME", "NAME_LONG", "admin", "name_long"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_exclude_region() -> Option<String> {
    Some("antarctica".to_string())
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            cache_dir: default_cache_dir(),
            name_fields: default_name_fields(),
            exclude_region: default_exclude_region(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            count: 600,
            lat_range: [-60.0, 75.0],
            lon_range: [-180.0, 180.0],
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            default_region: "New Zealand".to_string(),
            buffer_km: 50,
            buffer_min_km: 0,
            buffer_max_km: 200,
            buffer_step_km: 10,
            show_all_regions: true,
            show_points_outside: false,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("output") }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: InputConfig::default(),
            sampling: SamplingConfig::default(),
            controls: ControlsConfig::default(),
            server: ServerConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

impl ControlsConfig {
    /// A buffer distance the slider could actually produce.
    pub fn accepts_buffer(&self, buffer_km: u32) -> bool {
        let in_range = (self.buffer_min_km..=self.buffer_max_km).contains(&buffer_km);
        let step = self.buffer_step_km.max(1);
        in_range && (buffer_km - self.buffer_min_km) % step == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let config = AppConfig::from_toml_str("[input]\nsource = \"countries.shp\"\n").unwrap();
        assert_eq!(config.input.source, "countries.shp");
        assert_eq!(config.input.name_fields[0], "name");
        assert_eq!(config.input.exclude_region.as_deref(), Some("antarctica"));
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.sampling.count, 600);
        assert_eq!(config.controls.default_region, "New Zealand");
        assert_eq!(config.controls.buffer_km, 50);
        assert!(config.controls.show_all_regions);
        assert!(!config.controls.show_points_outside);
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            "[input]\n[sampling]\ncount = 10\n[server]\nport = 9000\n",
        )
        .unwrap();
        assert_eq!(config.input.source, NATURAL_EARTH_URL);
        assert_eq!(config.sampling.count, 10);
        assert_eq!(config.sampling.seed, 42);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_missing_input_section_is_an_error() {
        assert!(AppConfig::from_toml_str("[server]\nport = 1\n").is_err());
    }

    #[test]
    fn test_accepts_buffer() {
        let controls = ControlsConfig::default();
        assert!(controls.accepts_buffer(0));
        assert!(controls.accepts_buffer(50));
        assert!(controls.accepts_buffer(200));
        assert!(!controls.accepts_buffer(55));
        assert!(!controls.accepts_buffer(210));
    }
}
