// Analysis results and the newest-first history they are committed to.

use crate::core_modules::color_extractor::ColorResult;
use crate::core_modules::labels::LabelTable;
use crate::core_modules::region::{BoundingBox, DetectedRegion};
use crate::core_modules::shape_classifier::ShapeResult;
use crate::error::{Result, VisionError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// A detection as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    /// Translated display label.
    pub label: String,
    /// Raw detector label.
    pub category: String,
    /// Confidence in percent, one decimal.
    pub confidence_percent: f32,
    pub bbox: BoundingBox,
}

impl DetectionSummary {
    pub fn from_region(region: &DetectedRegion, labels: &LabelTable) -> Self {
        Self {
            label: labels.translate(&region.category).to_string(),
            category: region.category.clone(),
            confidence_percent: (region.confidence * 1000.0).round() / 10.0,
            bbox: region.bbox,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    /// Annotated JPEG.
    pub image: Vec<u8>,
    /// Bytes exactly as submitted.
    pub original: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub color: ColorResult,
    pub shape: ShapeResult,
    pub detections: Vec<DetectionSummary>,
    pub timestamp: DateTime<Utc>,
}

/// Byte-free view of a record, for logs and JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary<'a> {
    pub id: Uuid,
    pub width: u32,
    pub height: u32,
    pub color: &'a ColorResult,
    pub shape: ShapeResult,
    pub detections: &'a [DetectionSummary],
    pub date: String,
    pub time: String,
}

impl AnalysisRecord {
    pub fn summary(&self) -> RecordSummary<'_> {
        RecordSummary {
            id: self.id,
            width: self.width,
            height: self.height,
            color: &self.color,
            shape: self.shape,
            detections: &self.detections,
            date: self.timestamp.format("%d %B %Y").to_string(),
            time: self.timestamp.format("%H:%M:%S").to_string(),
        }
    }

    /// The first `limit` detections and how many were left out.
    pub fn detection_preview(&self, limit: usize) -> (&[DetectionSummary], usize) {
        let shown = self.detections.len().min(limit);
        (&self.detections[..shown], self.detections.len() - shown)
    }
}

/// Committed records, newest first.
#[derive(Debug, Default)]
pub struct HistoryStore {
    records: Vec<AnalysisRecord>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commits `record` at the front of the history and returns its id.
    pub fn save(&mut self, record: AnalysisRecord) -> Uuid {
        let id = record.id;
        self.records.insert(0, record);
        info!(%id, total = self.records.len(), "record saved");
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&AnalysisRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    pub fn delete(&mut self, id: Uuid) -> Result<AnalysisRecord> {
        let position = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(VisionError::RecordNotFound(id))?;
        info!(%id, "record deleted");
        Ok(self.records.remove(position))
    }

    /// Drops every record, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let removed = self.records.len();
        self.records.clear();
        info!(removed, "history cleared");
        removed
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnalysisRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
