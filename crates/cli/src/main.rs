mod recommendation;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use serde::Serialize;

use skintone_core::classification::tone_category::ToneCategory;
use skintone_core::detection::domain::face_selection::FaceSelection;
use skintone_core::detection::infrastructure::cascade_face_detector::DetectionPreset;
use skintone_core::imaging::infrastructure::image_file_reader::ImageFileReader;
use skintone_core::imaging::infrastructure::image_file_writer::ImageFileWriter;
use skintone_core::overlay::infrastructure::box_outline_annotator::BoxOutlineAnnotator;
use skintone_core::pipeline::analyzer_config::AnalyzerConfig;
use skintone_core::pipeline::batch_executor::{
    BatchExecutor, BatchItem, SequentialBatchExecutor,
};
use skintone_core::pipeline::classify_image_use_case::{ClassifyImageUseCase, OverlayOutput};
use skintone_core::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
use skintone_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use skintone_core::pipeline::skin_tone_analyzer::NoFacePolicy;
use skintone_core::shared::cascade_resolver;
use skintone_core::shared::constants::IMAGE_EXTENSIONS;

use recommendation::{PaletteAsset, PaletteCatalog};

const RETRY_HINT: &str = "Please try again with a clearer photo!";

/// Classify the skin tone of the face in each photo.
#[derive(Parser)]
#[command(name = "skintone")]
struct Cli {
    /// Image files or directories of images.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Cascade model (OpenCV .xml or JSON). Falls back to $SKINTONE_CASCADE, then the data dir.
    #[arg(long)]
    cascade: Option<PathBuf>,

    /// Detector preset: default or close-up.
    #[arg(long)]
    preset: Option<String>,

    /// Pyramid step between detection scales (> 1.0).
    #[arg(long)]
    scale_factor: Option<f64>,

    /// Raw hits a face needs before it counts (0 = no grouping).
    #[arg(long)]
    min_neighbors: Option<usize>,

    /// Smallest face edge in pixels.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Which face to use when several are found: first, largest, or index:N.
    #[arg(long)]
    select: Option<String>,

    /// Without a face: refuse, or whole-image to sample the image center.
    #[arg(long)]
    no_face: Option<String>,

    /// Tone rule table (JSON) replacing the built-in thresholds.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Write a copy of each image with the face outlined into this directory.
    #[arg(long)]
    overlay_dir: Option<PathBuf>,

    /// Makeup palette assets (<CATEGORY>/<Product>/<Product>.png).
    /// Defaults to <data dir>/skintone/palettes if present.
    #[arg(long)]
    palette_dir: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Worker threads for batches (0 = one per core).
    #[arg(long, default_value = "1")]
    jobs: usize,

    /// Config file (JSON). Defaults to <config dir>/skintone/config.json if present.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut config = AnalyzerConfig::load_or_default(cli.config.as_deref())?;
    apply_overrides(&cli, &mut config)?;

    let cascade = cascade_resolver::resolve(config.cascade.as_deref(), bundled_dir().as_deref())?;
    let analyzer = config.build_analyzer(&cascade)?;

    let overlay = cli.overlay_dir.clone().map(|dir| {
        OverlayOutput::new(
            dir,
            Box::new(BoxOutlineAnnotator::default()),
            Box::new(ImageFileWriter::new()),
        )
    });
    let use_case = ClassifyImageUseCase::new(
        Box::new(ImageFileReader::new()),
        analyzer,
        config.no_face,
        overlay,
    );

    let inputs = collect_inputs(&cli.inputs)?;
    let executor = build_executor(cli.jobs, inputs.len());
    let mut logger = LogPipelineLogger::new();
    let items = executor.execute(&use_case, &inputs, &mut logger);
    logger.summary();

    let palettes = palette_catalog(cli.palette_dir.as_deref());
    if cli.json {
        let reports: Vec<Report> = items
            .iter()
            .map(|item| Report {
                item,
                palette: palette_for(item, palettes.as_ref()),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for item in &items {
            println!("{}", format_item(item, palettes.as_ref()));
        }
    }

    let failed = items.iter().filter(|i| !i.is_ok()).count();
    if failed > 0 {
        return Err(format!("{failed} of {} images could not be classified", items.len()).into());
    }
    Ok(())
}

/// One printed result: the batch item plus its makeup palette, if any.
#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    item: &'a BatchItem,
    #[serde(skip_serializing_if = "Option::is_none")]
    palette: Option<Vec<PaletteAsset>>,
}

/// The explicit palette dir, else the default one when it exists.
fn palette_catalog(explicit: Option<&Path>) -> Option<PaletteCatalog> {
    match explicit {
        Some(dir) => Some(PaletteCatalog::new(dir)),
        None => PaletteCatalog::default_dir()
            .filter(|d| d.is_dir())
            .map(PaletteCatalog::new),
    }
}

fn palette_for(item: &BatchItem, palettes: Option<&PaletteCatalog>) -> Option<Vec<PaletteAsset>> {
    let outcome = item.outcome.as_ref().ok()?;
    palettes?.recommend(outcome.analysis.category)
}

fn apply_overrides(cli: &Cli, config: &mut AnalyzerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.cascade {
        config.cascade = Some(path.clone());
    }
    if let Some(preset) = &cli.preset {
        config.preset = preset.parse::<DetectionPreset>()?;
    }
    if cli.scale_factor.is_some() {
        config.scale_factor = cli.scale_factor;
    }
    if cli.min_neighbors.is_some() {
        config.min_neighbors = cli.min_neighbors;
    }
    if cli.min_face_size.is_some() {
        config.min_face_size = cli.min_face_size;
    }
    if let Some(select) = &cli.select {
        config.selection = select.parse::<FaceSelection>()?;
    }
    if let Some(policy) = &cli.no_face {
        config.no_face = policy.parse::<NoFacePolicy>()?;
    }
    if let Some(path) = &cli.rules {
        config.rules = Some(path.clone());
    }
    Ok(())
}

fn build_executor(jobs: usize, inputs: usize) -> Box<dyn BatchExecutor> {
    match jobs {
        _ if inputs <= 1 => Box::new(SequentialBatchExecutor),
        0 => Box::new(ThreadedBatchExecutor::with_available_parallelism()),
        1 => Box::new(SequentialBatchExecutor),
        n => Box::new(ThreadedBatchExecutor::new(n)),
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input not found: {}", input.display()).into());
        }
    }
    if let Some(s) = cli.scale_factor {
        if !(s > 1.0 && s.is_finite()) {
            return Err(format!("Scale factor must be greater than 1.0, got {s}").into());
        }
    }
    if cli.min_face_size == Some(0) {
        return Err("Minimum face size must be at least 1 pixel".into());
    }
    if let Some(path) = &cli.rules {
        if !path.is_file() {
            return Err(format!("Rule table not found: {}", path.display()).into());
        }
    }
    if let Some(dir) = &cli.palette_dir {
        if !dir.is_dir() {
            return Err(format!("Palette directory not found: {}", dir.display()).into());
        }
    }
    if let Some(dir) = &cli.overlay_dir {
        if dir.is_file() {
            return Err(format!("Overlay directory is a file: {}", dir.display()).into());
        }
    }
    Ok(())
}

/// Expands directories into their image files (sorted, non-recursive).
/// Files named explicitly are kept whatever their extension.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut out = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_image(p))
                .collect();
            found.sort();
            if found.is_empty() {
                log::warn!("No images found in {}", input.display());
            }
            out.extend(found);
        } else {
            out.push(input.clone());
        }
    }
    if out.is_empty() {
        return Err("No images to classify".into());
    }
    Ok(out)
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// `<exe dir>/cascades`, for pre-packaged installs.
fn bundled_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|d| d.join("cascades")))
}

fn format_item(item: &BatchItem, palettes: Option<&PaletteCatalog>) -> String {
    let path = item.path.display();
    match &item.outcome {
        Err(e) => format!("{path}: error: {e}"),
        Ok(outcome) => {
            let analysis = &outcome.analysis;
            let mut line = format!("{path}: {}", analysis.category);
            match analysis.face {
                Some(f) => line.push_str(&format!(
                    " (face at {},{} {}x{})",
                    f.x, f.y, f.width, f.height
                )),
                None => line.push_str(" (no face detected)"),
            }
            if let Some(e) = analysis.estimate() {
                line.push_str(&format!(
                    " hsv=({:.1}, {:.1}, {:.1})",
                    e.hue, e.saturation, e.value
                ));
            }
            if let Some(overlay) = &outcome.overlay {
                line.push_str(&format!(" overlay={}", overlay.display()));
            }
            if analysis.category == ToneCategory::Unknown {
                line.push_str(&format!("\n  {RETRY_HINT}"));
            } else if let Some(assets) = palette_for(item, palettes) {
                line.push_str("\n  Makeup palette:");
                for asset in assets {
                    line.push_str(&format!("\n    {}: {}", asset.product, asset.path.display()));
                }
            }
            line
        }
    }
}
