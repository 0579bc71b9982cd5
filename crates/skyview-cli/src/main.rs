//! skyview CLI - sky obstruction queries from the command line
//!
//! Reads JSON requests from files, writes JSON responses to stdout and logs
//! to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use skyview_engine::convert::{mesh_from_wire, validation_mode};
use skyview_engine::{EngineConfig, EngineError, SkyviewService};
use skyview_geom::{AngularRange, DirectionSampler};
use skyview_ir::{ObstructionRequest, ParallelRequest};

#[derive(Parser)]
#[command(name = "skyview")]
#[command(about = "Sky obstruction angles from triangle meshes", long_about = None)]
struct Cli {
    /// TOML configuration file (SKYVIEW_* variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single direction
    Query {
        /// JSON obstruction request
        request: PathBuf,
        /// Which angles to report
        #[arg(short, long, value_enum, default_value_t = QueryKind::Obstruction)]
        kind: QueryKind,
    },
    /// Evaluate many directions concurrently
    Parallel {
        /// JSON parallel request
        request: PathBuf,
    },
    /// Print the directions the sampler would produce
    Sample {
        /// Number of directions (configured default if absent)
        #[arg(short = 'n', long)]
        count: Option<usize>,
        /// First azimuth in degrees
        #[arg(long, requires = "end")]
        start: Option<f64>,
        /// Last azimuth in degrees
        #[arg(long, requires = "start")]
        end: Option<f64>,
    },
    /// Describe the mesh of a request
    Info {
        /// JSON obstruction or parallel request
        request: PathBuf,
    },
    /// Print service name, version and state
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum QueryKind {
    Obstruction,
    Horizon,
    Zenith,
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let service = SkyviewService::new(config)?;

    match cli.command {
        Commands::Query { request, kind } => {
            let req = ObstructionRequest::from_json(&read(&request)?)
                .with_context(|| format!("invalid request in {}", request.display()))?;
            match kind {
                QueryKind::Obstruction => respond(service.handle_obstruction(&req))?,
                QueryKind::Horizon => respond(service.handle_horizon(&req))?,
                QueryKind::Zenith => respond(service.handle_zenith(&req))?,
                QueryKind::All => respond(service.handle_all(&req))?,
            }
        }
        Commands::Parallel { request } => {
            let req = ParallelRequest::from_json(&read(&request)?)
                .with_context(|| format!("invalid request in {}", request.display()))?;
            respond(service.handle_parallel(&req).await)?;
        }
        Commands::Sample { count, start, end } => {
            let range = match (start, end) {
                (Some(start), Some(end)) => AngularRange::new(start, end)?,
                _ => service.config().range,
            };
            let n = count.unwrap_or(service.config().default_num_directions);
            service.config().check_direction_count(n)?;
            let samples = DirectionSampler::new(range)?.sample(n)?;
            print_json(&samples)?;
        }
        Commands::Info { request } => {
            show_info(&service, &request)?;
        }
        Commands::Status => {
            print_json(&service.status())?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a response, or the error body and a failing exit.
fn respond<T: Serialize>(result: std::result::Result<T, EngineError>) -> Result<()> {
    match result {
        Ok(response) => print_json(&response),
        Err(e) => {
            print_json(&e.to_response())?;
            Err(e.into())
        }
    }
}

#[derive(Serialize)]
struct MeshInfo {
    triangles: usize,
    skipped: Vec<SkippedInfo>,
    bounds: Option<[[f64; 3]; 2]>,
}

#[derive(Serialize)]
struct SkippedInfo {
    index: usize,
    reason: String,
}

fn show_info(service: &SkyviewService, path: &Path) -> Result<()> {
    // Both request shapes carry `mesh` and `validation`
    let req = ParallelRequest::from_json(&read(path)?)
        .with_context(|| format!("invalid request in {}", path.display()))?;
    let mode = validation_mode(req.validation, service.config().validation);
    let build = mesh_from_wire(&req.mesh, mode)?;

    info!(
        triangles = build.mesh.len(),
        skipped = build.skipped.len(),
        "loaded mesh from {}",
        path.display()
    );

    print_json(&MeshInfo {
        triangles: build.mesh.len(),
        skipped: build
            .skipped
            .into_iter()
            .map(|s| SkippedInfo {
                index: s.index,
                reason: s.reason,
            })
            .collect(),
        bounds: build
            .mesh
            .bounds()
            .map(|(min, max)| [[min.x, min.y, min.z], [max.x, max.y, max.z]]),
    })
}
