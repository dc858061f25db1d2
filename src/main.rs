use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use country_buffer_map::{config, data, export, scene, server};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the interactive map
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Render one country to CSV, GeoJSON and a PNG preview
    Export {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        /// Country name (defaults to the configured default region)
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long)]
        buffer_km: Option<u32>,
        /// Include points outside the country in the outputs' layers
        #[arg(long)]
        show_outside: bool,
    },
    /// List the selectable country names
    Regions {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;

            // loaded once, shared by every request
            let dataset = Arc::new(data::load_dataset(&app_config).await?);

            server::start_server(app_config, dataset).await?;
        }
        Commands::Export { config, region, buffer_km, show_outside } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_dataset(&app_config).await?;
            let controls = &app_config.controls;

            let region = match region {
                Some(r) => r.clone(),
                None => dataset
                    .default_region(&controls.default_region)
                    .ok_or_else(|| anyhow!("Dataset has no regions"))?,
            };
            let mut request = scene::RenderRequest::with_defaults(region, controls);
            if let Some(km) = buffer_km {
                request.buffer_km = *km;
            }
            request.show_points_outside |= *show_outside;

            match scene::render_scene(&dataset, controls, &request)? {
                scene::RenderOutcome::Rendered(scene) => {
                    println!(
                        "{}: {} of {} points inside (buffer {} km)",
                        scene.region,
                        scene.metrics.points_inside,
                        scene.metrics.total_points,
                        scene.metrics.buffer_km
                    );
                    for path in export::export_scene(&scene, &app_config.output.dir)? {
                        println!("Wrote {}", path.display());
                    }
                }
                scene::RenderOutcome::NoSuchRegion { name } => {
                    return Err(anyhow!("No region named '{}'", name));
                }
            }
        }
        Commands::Regions { config } => {
            let app_config = config::AppConfig::load_from_file(config)?;
            let dataset = data::load_dataset(&app_config).await?;
            for name in dataset.region_names() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
