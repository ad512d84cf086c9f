// THEORY:
// This file is the entry point for the `prism_vision` library crate. It exposes
// the still-image visual attribute classifier: a dominant color (with a human
// name) and a geometric shape (circle, square or rectangle) for one picture,
// optionally informed by an external object detector.
//
// The pure analyzers live in `core_modules` and know nothing about codecs,
// detectors or storage. `pipeline` wraps them in the full per-image staging,
// `parallel_pipeline` fans independent images out over a worker pool, and
// `record` holds the results and the history users commit them to.

pub mod core_modules;
pub mod error;
pub mod logger;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod record;

pub use core_modules::circularity::circularity::circularity;
pub use core_modules::color_extractor::{ColorName, ColorResult, extract_dominant_color, name_color};
pub use core_modules::labels::LabelTable;
pub use core_modules::pixel_buffer::PixelBuffer;
pub use core_modules::region::{BoundingBox, DetectedRegion};
pub use core_modules::shape_classifier::{ShapeResult, classify_shape};
pub use error::{Result, VisionError};
pub use parallel_pipeline::ParallelPipeline;
pub use pipeline::{
    AnalysisPipeline, AnalysisStage, NullDetector, ObjectDetector, PipelineConfig, ProgressObserver,
    StaticDetector, classify,
};
pub use record::{AnalysisRecord, DetectionSummary, HistoryStore};
