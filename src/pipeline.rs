// THEORY:
// The `pipeline` module is the top-level API. It wraps the pure classifier in the
// staging the application runs for every still image:
//
//   Preparing (20%) -> Detecting (40%) -> Color (60%) -> Shape (80%) -> Finalizing (100%)
//
// 1.  **Preparing**: decode, then downscale so neither side exceeds the configured
//     maximum. Everything after this works on the prepared image.
// 2.  **Detecting**: the external object detector is consulted through the
//     `ObjectDetector` trait and its output capped to `max_detections`.
// 3.  **Color / Shape**: the two pure analyzers run on one shared, read-only
//     `PixelBuffer`.
// 4.  **Finalizing**: boxes are drawn on a copy of the image, which is encoded and
//     packed with the attributes into an `AnalysisRecord`.
//
// Each stage is announced to a `ProgressObserver` and runs inside its own
// tracing span. The classifier itself stays free of any of this.

use crate::core_modules::annotation::annotate;
use crate::core_modules::color_extractor::{ColorResult, extract_dominant_color};
use crate::core_modules::labels::LabelTable;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::region::DetectedRegion;
use crate::core_modules::shape_classifier::{ShapeResult, classify_shape};
use crate::core_modules::utils::image_helper::image_helper;
use crate::error::{Result, VisionError};
use crate::record::{AnalysisRecord, DetectionSummary};
use chrono::Utc;
use image::RgbaImage;
use std::path::Path;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub const DEFAULT_MAX_DIMENSION: u32 = 640;
pub const DEFAULT_MAX_DETECTIONS: usize = 10;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// The pure classifier: dominant color and shape of one image.
pub fn classify(buffer: &PixelBuffer, regions: &[DetectedRegion]) -> (ColorResult, ShapeResult) {
    let color = extract_dominant_color(buffer);
    let shape = classify_shape(regions, buffer.width(), buffer.height(), buffer);
    (color, shape)
}

/// The external object detector.
pub trait ObjectDetector: Send + Sync {
    /// Up to `max_detections` regions, in the buffer's pixel space.
    fn detect(&self, buffer: &PixelBuffer, max_detections: usize) -> Result<Vec<DetectedRegion>>;
}

/// A detector that never finds anything; shape falls back to the image ratio.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDetector;

impl ObjectDetector for NullDetector {
    fn detect(&self, _buffer: &PixelBuffer, _max_detections: usize) -> Result<Vec<DetectedRegion>> {
        Ok(Vec::new())
    }
}

/// Replays a fixed list of detections, e.g. produced offline by a real model.
#[derive(Debug, Clone, Default)]
pub struct StaticDetector {
    regions: Vec<DetectedRegion>,
}

impl StaticDetector {
    pub fn new(regions: Vec<DetectedRegion>) -> Self {
        Self { regions }
    }

    /// Parses a JSON array of `DetectedRegion`s.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl ObjectDetector for StaticDetector {
    fn detect(&self, _buffer: &PixelBuffer, max_detections: usize) -> Result<Vec<DetectedRegion>> {
        Ok(self.regions.iter().take(max_detections).cloned().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisStage {
    Preparing,
    Detecting,
    ExtractingColor,
    ClassifyingShape,
    Finalizing,
}

impl AnalysisStage {
    pub fn percent(&self) -> u8 {
        match self {
            AnalysisStage::Preparing => 20,
            AnalysisStage::Detecting => 40,
            AnalysisStage::ExtractingColor => 60,
            AnalysisStage::ClassifyingShape => 80,
            AnalysisStage::Finalizing => 100,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AnalysisStage::Preparing => "preparing image",
            AnalysisStage::Detecting => "detecting objects",
            AnalysisStage::ExtractingColor => "analyzing colors",
            AnalysisStage::ClassifyingShape => "detecting shape",
            AnalysisStage::Finalizing => "finalizing",
        }
    }
}

/// Receives stage changes while an analysis runs.
pub trait ProgressObserver: Send + Sync {
    fn on_stage(&self, stage: AnalysisStage);
}

/// Ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_stage(&self, _stage: AnalysisStage) {}
}

impl<F> ProgressObserver for F
where
    F: Fn(AnalysisStage) + Send + Sync,
{
    fn on_stage(&self, stage: AnalysisStage) {
        self(stage)
    }
}

/// Configuration for the AnalysisPipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Longest side, in pixels, an image is analysed at.
    pub max_dimension: u32,
    /// Detections beyond this many are discarded.
    pub max_detections: usize,
    /// Quality of the annotated JPEG (1-100).
    pub jpeg_quality: u8,
    /// Whether boxes are drawn on the stored image.
    pub annotate: bool,
    /// Workers used by the `ParallelPipeline`.
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            max_detections: DEFAULT_MAX_DETECTIONS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            annotate: true,
            worker_count: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }
}

/// Builder for PipelineConfig
#[derive(Default)]
pub struct PipelineConfigBuilder {
    max_dimension: Option<u32>,
    max_detections: Option<usize>,
    jpeg_quality: Option<u8>,
    annotate: Option<bool>,
    worker_count: Option<usize>,
}

impl PipelineConfigBuilder {
    pub fn max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = Some(max_dimension);
        self
    }

    pub fn max_detections(mut self, max_detections: usize) -> Self {
        self.max_detections = Some(max_detections);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = Some(quality);
        self
    }

    pub fn annotate(mut self, enable: bool) -> Self {
        self.annotate = Some(enable);
        self
    }

    pub fn worker_count(mut self, workers: usize) -> Self {
        self.worker_count = Some(workers);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            max_dimension: self.max_dimension.unwrap_or(default.max_dimension),
            max_detections: self.max_detections.unwrap_or(default.max_detections),
            jpeg_quality: self.jpeg_quality.unwrap_or(default.jpeg_quality),
            annotate: self.annotate.unwrap_or(default.annotate),
            worker_count: self.worker_count.unwrap_or(default.worker_count).max(1),
        }
    }
}

pub struct AnalysisPipeline<D: ObjectDetector> {
    detector: D,
    labels: LabelTable,
    config: PipelineConfig,
}

impl AnalysisPipeline<NullDetector> {
    /// A pipeline without object detection.
    pub fn new(config: PipelineConfig) -> Self {
        Self::with_detector(NullDetector, config)
    }
}

impl<D: ObjectDetector> AnalysisPipeline<D> {
    pub fn with_detector(detector: D, config: PipelineConfig) -> Self {
        Self {
            detector,
            labels: LabelTable::default(),
            config,
        }
    }

    pub fn with_labels(mut self, labels: LabelTable) -> Self {
        self.labels = labels;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Decodes `bytes` and analyses the image.
    pub fn analyze_bytes(&self, bytes: &[u8]) -> Result<AnalysisRecord> {
        self.analyze_bytes_with_progress(bytes, &NoProgress)
    }

    #[instrument(skip(self, bytes, observer), fields(input_size = bytes.len()))]
    pub fn analyze_bytes_with_progress(
        &self,
        bytes: &[u8],
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRecord> {
        let image = {
            let _span = tracing::info_span!("decode_image").entered();
            image_helper::decode(bytes)?
        };
        self.analyze_image(image, bytes.to_vec(), observer)
    }

    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisRecord> {
        let path = path.as_ref();
        info!(input = %path.display(), "analyzing file");
        let bytes = std::fs::read(path)?;
        self.analyze_bytes(&bytes)
    }

    /// Runs every stage on an already decoded image. `original` is stored untouched.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn analyze_image(
        &self,
        image: RgbaImage,
        original: Vec<u8>,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisRecord> {
        // --- 1. Preparing ---
        observer.on_stage(AnalysisStage::Preparing);
        let mut image = {
            let _span = tracing::info_span!("prepare_image").entered();
            let (width, height) = image.dimensions();
            if width == 0 || height == 0 {
                return Err(VisionError::InvalidDimensions(width, height));
            }
            image_helper::fit_within(image, self.config.max_dimension)?
        };
        let (width, height) = image.dimensions();

        let (regions, color, shape) = {
            let buffer = PixelBuffer::from_rgba_image(&image)?;

            // --- 2. Detecting ---
            observer.on_stage(AnalysisStage::Detecting);
            let mut regions = {
                let _span = tracing::info_span!("detect_objects").entered();
                self.detector.detect(&buffer, self.config.max_detections)?
            };
            regions.truncate(self.config.max_detections);
            debug!(count = regions.len(), "detections");

            // --- 3. Color ---
            observer.on_stage(AnalysisStage::ExtractingColor);
            let color = {
                let _span = tracing::info_span!("extract_color").entered();
                extract_dominant_color(&buffer)
            };

            // --- 4. Shape ---
            observer.on_stage(AnalysisStage::ClassifyingShape);
            let shape = {
                let _span = tracing::info_span!("classify_shape").entered();
                classify_shape(&regions, width, height, &buffer)
            };

            (regions, color, shape)
        };

        // --- 5. Finalizing ---
        observer.on_stage(AnalysisStage::Finalizing);
        let encoded = {
            let _span = tracing::info_span!("encode_annotated").entered();
            if self.config.annotate {
                annotate(&mut image, &regions, &self.labels);
            }
            image_helper::encode_jpeg(&image, self.config.jpeg_quality)?
        };

        let record = AnalysisRecord {
            id: Uuid::new_v4(),
            image: encoded,
            original,
            width,
            height,
            color,
            shape,
            detections: regions
                .iter()
                .map(|region| DetectionSummary::from_region(region, &self.labels))
                .collect(),
            timestamp: Utc::now(),
        };

        info!(
            id = %record.id,
            color = %record.color.name,
            hex = %record.color.hex,
            shape = %record.shape,
            detections = record.detections.len(),
            "analysis complete"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::color_extractor::ColorName;
    use image::Rgba;
    use std::sync::Mutex;

    struct FailingDetector;

    impl ObjectDetector for FailingDetector {
        fn detect(&self, _buffer: &PixelBuffer, _max: usize) -> Result<Vec<DetectedRegion>> {
            Err(VisionError::Detector("model not loaded".to_string()))
        }
    }

    /// Reports more regions than asked for.
    struct GreedyDetector;

    impl ObjectDetector for GreedyDetector {
        fn detect(&self, _buffer: &PixelBuffer, _max: usize) -> Result<Vec<DetectedRegion>> {
            Ok((0..25).map(|i| DetectedRegion::new("cup", 0.5, [i as f64, 0.0, 2.0, 2.0])).collect())
        }
    }

    fn png(image: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn config_builder() {
        let config = PipelineConfig::builder()
            .max_dimension(320)
            .max_detections(3)
            .jpeg_quality(70)
            .annotate(false)
            .worker_count(0)
            .build();

        assert_eq!(config.max_dimension, 320);
        assert_eq!(config.max_detections, 3);
        assert_eq!(config.jpeg_quality, 70);
        assert!(!config.annotate);
        assert_eq!(config.worker_count, 1);
    }

    #[test]
    fn default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_dimension, 640);
        assert_eq!(config.max_detections, 10);
        assert_eq!(config.jpeg_quality, 90);
        assert!(config.annotate);
    }

    #[test]
    fn classify_red_square() {
        let data = [255u8, 0, 0, 255].repeat(64 * 64);
        let buffer = PixelBuffer::new(64, 64, &data).unwrap();
        let (color, shape) = classify(&buffer, &[]);
        assert_eq!(color.rgb, (255, 0, 0));
        assert_eq!(color.hex, "#ff0000");
        assert_eq!(color.name, ColorName::Red);
        assert_eq!(shape, ShapeResult::Square);
    }

    #[test]
    fn end_to_end_without_detector() {
        let image = RgbaImage::from_pixel(64, 64, Rgba([255, 0, 0, 255]));
        let bytes = png(&image);
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());

        let record = pipeline.analyze_bytes(&bytes).unwrap();
        assert_eq!(record.color.rgb, (255, 0, 0));
        assert_eq!(record.color.name, ColorName::Red);
        assert_eq!(record.shape, ShapeResult::Square);
        assert!(record.detections.is_empty());
        assert_eq!(record.original, bytes);
        assert_eq!(&record.image[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn large_images_are_analysed_downscaled() {
        let image = RgbaImage::from_pixel(1280, 640, Rgba([0, 0, 255, 255]));
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());
        let record = pipeline.analyze_image(image, Vec::new(), &NoProgress).unwrap();
        assert_eq!((record.width, record.height), (640, 320));
        assert_eq!(record.shape, ShapeResult::Rectangle);
        assert_eq!(record.color.name, ColorName::Blue);
    }

    #[test]
    fn category_shortcut_flows_through_the_pipeline() {
        let image = RgbaImage::from_pixel(100, 50, Rgba([255, 160, 0, 255]));
        let detector = StaticDetector::new(vec![DetectedRegion::new("orange", 0.93, [10.0, 10.0, 60.0, 20.0])]);
        let pipeline = AnalysisPipeline::with_detector(detector, PipelineConfig::default());

        let record = pipeline.analyze_image(image, Vec::new(), &NoProgress).unwrap();
        assert_eq!(record.shape, ShapeResult::Circle);
        assert_eq!(record.color.name, ColorName::Orange);
        assert_eq!(record.detections[0].label, "Naranja");
        assert_eq!(record.detections[0].category, "orange");
    }

    #[test]
    fn oversized_detector_boxes_are_annotated_without_failing() {
        let image = RgbaImage::from_pixel(32, 32, Rgba([0, 0, 255, 255]));
        let bytes = png(&image);
        let detector = StaticDetector::new(vec![
            DetectedRegion::new("sports ball", 0.9, [1e19, 0.0, 1e19, 5.0]),
            DetectedRegion::new("vase", 0.4, [-1e19, -1e19, 1e3, 1e3]),
        ]);
        let pipeline = AnalysisPipeline::with_detector(detector, PipelineConfig::default());

        let record = pipeline.analyze_bytes(&bytes).unwrap();
        assert_eq!(record.shape, ShapeResult::Circle);
        assert_eq!(record.color.name, ColorName::Blue);
        assert_eq!(record.detections.len(), 2);
    }

    #[test]
    fn stages_are_reported_in_order() {
        let seen = Mutex::new(Vec::new());
        let observer = |stage: AnalysisStage| seen.lock().unwrap().push(stage.percent());
        let image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());

        pipeline.analyze_image(image, Vec::new(), &observer).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![20, 40, 60, 80, 100]);
    }

    #[test]
    fn detector_failure_propagates() {
        let image = RgbaImage::from_pixel(8, 8, Rgba([0, 0, 0, 255]));
        let pipeline = AnalysisPipeline::with_detector(FailingDetector, PipelineConfig::default());
        let err = pipeline.analyze_image(image, Vec::new(), &NoProgress).unwrap_err();
        assert!(matches!(err, VisionError::Detector(_)));
    }

    #[test]
    fn detections_are_capped() {
        let image = RgbaImage::from_pixel(40, 40, Rgba([0, 0, 0, 255]));
        let config = PipelineConfig::builder().max_detections(4).build();
        let pipeline = AnalysisPipeline::with_detector(GreedyDetector, config);
        let record = pipeline.analyze_image(image, Vec::new(), &NoProgress).unwrap();
        assert_eq!(record.detections.len(), 4);
    }

    #[test]
    fn static_detector_parses_json() {
        let detector = StaticDetector::from_json(
            r#"[{"category":"clock","confidence":0.9,"bbox":{"x":0,"y":0,"width":10,"height":10}}]"#,
        )
        .unwrap();
        let data = vec![0u8; 4];
        let buffer = PixelBuffer::new(1, 1, &data).unwrap();
        assert_eq!(detector.detect(&buffer, 10).unwrap()[0].category, "clock");
        assert!(detector.detect(&buffer, 0).unwrap().is_empty());
        assert!(matches!(StaticDetector::from_json("{"), Err(VisionError::Serialization(_))));
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());
        assert!(matches!(pipeline.analyze_bytes(b"nope"), Err(VisionError::Image(_))));
    }

    #[test]
    fn empty_image_is_rejected() {
        let pipeline = AnalysisPipeline::new(PipelineConfig::default());
        let err = pipeline.analyze_image(RgbaImage::new(0, 0), Vec::new(), &NoProgress).unwrap_err();
        assert!(matches!(err, VisionError::InvalidDimensions(0, 0)));
    }
}
