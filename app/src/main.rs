use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;
use tokio::task::JoinSet;

use pcd_core::pointcloud::point::PointCloud;
use pcd_parser::load;

#[derive(Parser, Debug)]
#[command(
    name = "pcdinfo",
    about = "A tool for inspecting Point Cloud Data (PCD) files",
    author = "MIERUNE Inc.",
    version = "0.0.1"
)]
struct Cli {
    #[arg(short, long, required = true, num_args = 1.., value_name = "FILE")]
    input: Vec<String>,

    /// Write `<name>.json` with the header and positions of each input into this directory
    #[arg(short, long, value_name = "DIR")]
    json: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

fn expand_globs(input_patterns: Vec<String>) -> Vec<String> {
    let mut sources = Vec::new();
    for pattern in input_patterns {
        if !is_remote(&pattern)
            && (pattern.contains('*') || pattern.contains('?') || pattern.contains('['))
        {
            match glob(&pattern) {
                Ok(entries) => {
                    for entry in entries {
                        match entry {
                            Ok(path) => sources.push(path.to_string_lossy().into_owned()),
                            Err(e) => log::warn!("Skipping unreadable path: {:?}", e),
                        }
                    }
                }
                Err(e) => log::error!("Invalid glob pattern {}: {}", pattern, e),
            }
        } else {
            sources.push(pattern);
        }
    }
    sources
}

fn log_summary(source: &str, point_cloud: &PointCloud) {
    let header = &point_cloud.header;
    log::info!("{}", source);
    log::info!("  version: {}", header.version);
    log::info!("  fields: {:?}", header.fields);
    log::info!("  size: {:?}", header.size);
    log::info!(
        "  type: {:?}",
        header
            .field_type
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
    );
    log::info!("  count: {:?}", header.count);
    log::info!("  width x height: {} x {}", header.width, header.height);
    log::info!(
        "  viewpoint: {:?} {:?}",
        header.viewpoint.translation,
        header.viewpoint.rotation
    );
    log::info!("  points: {}", header.points);
    log::info!("  data: {}", header.data);

    match &point_cloud.positions {
        Some(positions) => match positions.bounding_volume() {
            Some(bounds) => {
                log::info!("  bounds min: {:?}", bounds.min);
                log::info!("  bounds max: {:?}", bounds.max);
            }
            None => log::info!("  positions: no finite points"),
        },
        None => log::info!("  positions: none (x, y, z not all declared)"),
    }
}

fn json_path(output_dir: &Path, source: &str) -> PathBuf {
    let stem = Path::new(source)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pointcloud".to_string());
    output_dir.join(format!("{}.json", stem))
}

fn write_json(path: &Path, point_cloud: &PointCloud) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, point_cloud)?;
    writer.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    log::info!("input files: {:?}", args.input);
    if let Some(json) = &args.json {
        log::info!("json output folder: {}", json);
    }

    let start = std::time::Instant::now();

    let sources = expand_globs(args.input);
    log::info!("Expanded input files: {:?}", sources);

    let output_dir = args.json.map(PathBuf::from);
    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)?;
    }

    // Each parse owns its buffer, so files load independently.
    let mut tasks = JoinSet::new();
    for source in sources {
        tasks.spawn(async move {
            let start_local = std::time::Instant::now();
            let result = load(&source).await;
            (source, result, start_local.elapsed())
        });
    }

    let mut failures = 0;
    while let Some(joined) = tasks.join_next().await {
        let (source, result, elapsed) = match joined {
            Ok(output) => output,
            Err(e) => {
                log::error!("Loader task failed: {}", e);
                failures += 1;
                continue;
            }
        };

        let point_cloud = match result {
            Ok(point_cloud) => point_cloud,
            Err(e) => {
                log::error!("Failed to parse {}: {}", source, e);
                failures += 1;
                continue;
            }
        };
        log::debug!("parsed {} in {:?}", source, elapsed);
        log_summary(&source, &point_cloud);

        if let Some(dir) = &output_dir {
            let path = json_path(dir, &source);
            log::info!("write json: {:?}", path);
            if let Err(e) = write_json(&path, &point_cloud) {
                log::error!("Failed to write {:?}: {}", path, e);
                failures += 1;
            }
        }
    }

    log::info!("Elapsed: {:?}", start.elapsed());
    if failures > 0 {
        return Err(format!("{} input(s) failed", failures).into());
    }

    Ok(())
}
