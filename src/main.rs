// Example runner: analyses one or more image files and prints each record as JSON.
//
//   prism_vision [--detections regions.json] [--annotated-dir DIR] <image>...
//
// PRISM_MAX_DIMENSION and PRISM_WORKERS override the pipeline defaults.

use anyhow::{Context, bail};
use prism_vision::core_modules::utils::image_helper::image_helper;
use prism_vision::{
    AnalysisPipeline, AnalysisRecord, AnalysisStage, HistoryStore, ParallelPipeline, PipelineConfig,
    StaticDetector, logger,
};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{error, info};

struct Args {
    images: Vec<PathBuf>,
    detections: Option<PathBuf>,
    annotated_dir: Option<PathBuf>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut args = env::args().skip(1);
    let mut parsed = Args {
        images: Vec::new(),
        detections: None,
        annotated_dir: None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--detections" => parsed.detections = Some(args.next().context("--detections needs a path")?.into()),
            "--annotated-dir" => {
                parsed.annotated_dir = Some(args.next().context("--annotated-dir needs a path")?.into())
            }
            _ => parsed.images.push(arg.into()),
        }
    }

    if parsed.images.is_empty() {
        bail!("Usage: prism_vision [--detections regions.json] [--annotated-dir DIR] <image>...");
    }
    Ok(parsed)
}

fn env_override<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.parse().ok())
}

fn config_from_env() -> PipelineConfig {
    let mut builder = PipelineConfig::builder();
    if let Some(max_dimension) = env_override::<u32>("PRISM_MAX_DIMENSION") {
        builder = builder.max_dimension(max_dimension);
    }
    if let Some(workers) = env_override::<usize>("PRISM_WORKERS") {
        builder = builder.worker_count(workers);
    }
    builder.build()
}

fn write_annotated(dir: &Path, source: &Path, record: &AnalysisRecord) -> anyhow::Result<()> {
    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
    let output = dir.join(format!("{}_annotated.jpg", stem));
    image_helper::save(&output, &record.image)?;
    info!(output = %output.display(), "annotated image written");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init();
    let args = parse_args()?;
    let config = config_from_env();

    let detector = match &args.detections {
        Some(path) => StaticDetector::from_path(path)
            .with_context(|| format!("loading detections from {}", path.display()))?,
        None => StaticDetector::default(),
    };
    let pipeline = AnalysisPipeline::with_detector(detector, config);
    let mut history = HistoryStore::new();

    if args.images.len() == 1 {
        let path = &args.images[0];
        let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let progress = |stage: AnalysisStage| info!("[{:>3}%] {}", stage.percent(), stage.description());
        let record = pipeline.analyze_bytes_with_progress(&bytes, &progress)?;
        println!("{}", serde_json::to_string_pretty(&record.summary())?);
        if let Some(dir) = &args.annotated_dir {
            write_annotated(dir, path, &record)?;
        }
        history.save(record);
    } else {
        let mut inputs = Vec::with_capacity(args.images.len());
        for path in &args.images {
            inputs.push(std::fs::read(path).with_context(|| format!("reading {}", path.display()))?);
        }

        let parallel = ParallelPipeline::new(pipeline);
        info!(images = inputs.len(), workers = parallel.worker_count(), "batch analysis");
        let results = parallel.analyze_batch(inputs).await;
        parallel.shutdown().await;

        for (path, result) in args.images.iter().zip(results) {
            match result {
                Ok(record) => {
                    println!("{}", serde_json::to_string_pretty(&record.summary())?);
                    if let Some(dir) = &args.annotated_dir {
                        write_annotated(dir, path, &record)?;
                    }
                    history.save(record);
                }
                Err(e) => error!(input = %path.display(), "analysis failed: {}", e),
            }
        }
    }

    info!(saved = history.len(), "done");
    Ok(())
}
