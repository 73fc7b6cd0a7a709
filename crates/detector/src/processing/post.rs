use crate::{
    backend::{ClassOutput, ENTITIES_OUTPUT, LABELS_OUTPUT, RawDetections},
    error::DetectorError,
    labels::LabelMap,
};
use ndarray::{ArrayD, ArrayView1, ArrayViewD, Axis, Ix1, Ix2};
use serde::{Deserialize, Serialize};

/// Three parallel sequences, one entry per detected object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub detection_boxes: Vec<[f32; 4]>,
    pub detection_scores: Vec<f32>,
    pub detection_class_entities: Vec<String>,
}

impl DetectionResult {
    pub fn len(&self) -> usize {
        self.detection_scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detection_scores.is_empty()
    }
}

pub struct PostProcessor {
    // Only needed when the model emits class indices instead of entity names.
    labels: Option<LabelMap>,
}

impl PostProcessor {
    pub fn new(labels: Option<LabelMap>) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> Option<&LabelMap> {
        self.labels.as_ref()
    }

    /// Flatten raw model outputs into plain sequences. Entity names pass
    /// through as emitted; class indices are resolved through the label map.
    #[tracing::instrument(name = "postprocess", skip_all)]
    pub fn parse_detections(&self, raw: &RawDetections) -> Result<DetectionResult, DetectorError> {
        let boxes = squeeze_batch(raw.boxes.view(), 2)
            .into_dimensionality::<Ix2>()
            .map_err(|_| {
                DetectorError::inference(format!(
                    "`detection_boxes` has shape {:?}, expected [N, 4]",
                    raw.boxes.shape()
                ))
            })?;
        if boxes.ncols() != 4 {
            return Err(DetectorError::inference(format!(
                "`detection_boxes` rows have {} coordinates, expected 4",
                boxes.ncols()
            )));
        }

        let scores = vector(&raw.scores, "detection_scores")?;

        let class_count = match &raw.classes {
            ClassOutput::Entities(entities) => vector(entities, ENTITIES_OUTPUT)?.len(),
            ClassOutput::Indices(indices) => vector(indices, LABELS_OUTPUT)?.len(),
        };

        let count = scores.len();
        if boxes.nrows() != count || class_count != count {
            return Err(DetectorError::inference(format!(
                "output lengths disagree: {} boxes, {} scores, {} classes",
                boxes.nrows(),
                count,
                class_count
            )));
        }

        let detection_boxes = boxes
            .rows()
            .into_iter()
            .map(|row| [row[0], row[1], row[2], row[3]])
            .collect();

        let detection_class_entities = match &raw.classes {
            ClassOutput::Entities(entities) => vector(entities, ENTITIES_OUTPUT)?.to_vec(),
            ClassOutput::Indices(indices) => self.resolve(vector(indices, LABELS_OUTPUT)?)?,
        };

        tracing::debug!(
            detections = count,
            classes = raw.classes.output_name(),
            "Parsed detections"
        );

        Ok(DetectionResult {
            detection_boxes,
            detection_scores: scores.to_vec(),
            detection_class_entities,
        })
    }

    fn resolve(&self, indices: ArrayView1<'_, i64>) -> Result<Vec<String>, DetectorError> {
        let labels = self.labels.as_ref().ok_or_else(|| {
            DetectorError::inference(
                "model emits `detection_class_labels` but no label map is loaded",
            )
        })?;

        indices
            .iter()
            .map(|&index| {
                labels.entity(index).map(str::to_string).ok_or_else(|| {
                    DetectorError::inference(format!(
                        "class index {} is outside the label map ({} entries)",
                        index,
                        labels.len()
                    ))
                })
            })
            .collect()
    }
}

/// View a per-detection output as `[N]`, accepting a batch of one.
fn vector<'a, T>(array: &'a ArrayD<T>, name: &str) -> Result<ArrayView1<'a, T>, DetectorError> {
    squeeze_batch(array.view(), 1)
        .into_dimensionality::<Ix1>()
        .map_err(|_| {
            DetectorError::inference(format!(
                "`{}` has shape {:?}, expected [N]",
                name,
                array.shape()
            ))
        })
}

/// Drop a leading batch dimension of size 1 from a tensor of the given rank.
fn squeeze_batch<T>(view: ArrayViewD<'_, T>, rank: usize) -> ArrayViewD<'_, T> {
    if view.ndim() == rank + 1 && view.shape()[0] == 1 {
        view.index_axis_move(Axis(0), 0)
    } else {
        view
    }
}
