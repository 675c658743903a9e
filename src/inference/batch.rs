//! Batch prediction over a directory of images

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};
use walkdir::WalkDir;

use super::predictor::{PredictionResult, Predictor};
use crate::utils::error::{FoodVisionError, Result};

/// File extensions picked up when walking a directory
pub const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "bmp"];

/// Outcome for one file of a batch
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_some()
    }
}

/// Aggregate counts for a batch run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Number of images per predicted top label
    pub label_counts: BTreeMap<String, usize>,
}

impl BatchSummary {
    fn from_outcomes(outcomes: &[FileOutcome]) -> Self {
        let mut summary = Self {
            total: outcomes.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            match &outcome.result {
                Some(result) => {
                    summary.succeeded += 1;
                    *summary.label_counts.entry(result.top_label.clone()).or_insert(0) += 1;
                }
                None => summary.failed += 1,
            }
        }
        summary
    }
}

/// Per-file outcomes in path order plus their summary
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<FileOutcome>,
    pub summary: BatchSummary,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Every image file below `dir`, sorted by path
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FoodVisionError::InvalidInput(format!(
            "{:?} is not a directory",
            dir
        )));
    }

    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_image(e.path()))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    Ok(paths)
}

fn progress_bar(total: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("  {spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Classify every image under `dir` in parallel
///
/// A file that fails is recorded in its outcome; the batch keeps going.
pub fn predict_directory(predictor: &Predictor, dir: &Path, show_progress: bool) -> Result<BatchReport> {
    let paths = collect_images(dir)?;
    info!("Predicting {} images under {:?}", paths.len(), dir);

    let pb = progress_bar(paths.len(), show_progress);
    let done = AtomicUsize::new(0);

    let outcomes: Vec<FileOutcome> = paths
        .par_iter()
        .map(|path| {
            let outcome = match predictor.predict_file(path) {
                Ok(result) => FileOutcome {
                    path: path.clone(),
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    warn!("Prediction failed for {:?}: {}", path, e);
                    FileOutcome {
                        path: path.clone(),
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            let count = done.fetch_add(1, Ordering::Relaxed) + 1;
            pb.set_position(count as u64);
            outcome
        })
        .collect();

    let summary = BatchSummary::from_outcomes(&outcomes);
    pb.finish_with_message(format!("{} ok, {} failed", summary.succeeded, summary.failed));

    Ok(BatchReport { outcomes, summary })
}
