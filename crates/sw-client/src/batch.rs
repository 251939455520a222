//! Batch image import and sequential submission.
//!
//! A [`BatchSession`] collects image files before they are submitted. Each
//! unit holds a [`PreviewHandle`] that is released when the unit is dropped,
//! whether it was submitted, removed or discarded with the session.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::ImageFormat;
use log::{debug, info, warn};
use sw_core::JobRecord;
use uuid::Uuid;

use crate::error::QueueError;
use crate::events::{AppEvent, BatchProgress, EventSender};

/// Whether `path` names an image format the client can preview and upload.
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
}

/// Counts preview handles that are still alive.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    live: AtomicUsize,
}

impl PreviewRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn acquire(self: &Arc<Self>, path: &Path) -> PreviewHandle {
        self.live.fetch_add(1, Ordering::SeqCst);
        PreviewHandle {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            registry: Arc::clone(self),
        }
    }

    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct PreviewHandle {
    id: Uuid,
    path: PathBuf,
    registry: Arc<PreviewRegistry>,
}

impl PreviewHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.live.fetch_sub(1, Ordering::SeqCst);
        debug!("Released preview {} for {}", self.id, self.path.display());
    }
}

#[derive(Debug)]
pub struct BatchImportUnit {
    pub path: PathBuf,
    pub selected: bool,
    preview: PreviewHandle,
}

impl BatchImportUnit {
    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Files added to a session: `added` new units, `rejected` non-image paths.
/// Paths already in the session are silently skipped.
#[derive(Debug, Default, PartialEq)]
pub struct AddedFiles {
    pub added: usize,
    pub rejected: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct BatchSession {
    registry: Arc<PreviewRegistry>,
    units: Vec<BatchImportUnit>,
}

impl BatchSession {
    pub fn new(registry: Arc<PreviewRegistry>) -> Self {
        Self {
            registry,
            units: Vec::new(),
        }
    }

    pub fn add_files(&mut self, paths: impl IntoIterator<Item = PathBuf>) -> AddedFiles {
        let mut result = AddedFiles::default();

        for path in paths {
            if !is_supported_image(&path) {
                result.rejected.push(path);
                continue;
            }
            if self.units.iter().any(|unit| unit.path == path) {
                continue;
            }

            let preview = self.registry.acquire(&path);
            self.units.push(BatchImportUnit {
                path,
                selected: true,
                preview,
            });
            result.added += 1;
        }

        result
    }

    pub fn units(&self) -> &[BatchImportUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Flip the selection of one unit; returns the new state.
    pub fn toggle(&mut self, index: usize) -> Option<bool> {
        let unit = self.units.get_mut(index)?;
        unit.selected = !unit.selected;
        Some(unit.selected)
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for unit in &mut self.units {
            unit.selected = selected;
        }
    }

    pub fn remove(&mut self, index: usize) -> bool {
        if index < self.units.len() {
            self.units.remove(index);
            true
        } else {
            false
        }
    }

    pub fn selected_count(&self) -> usize {
        self.units.iter().filter(|unit| unit.selected).count()
    }

    /// Consume the session, keeping the selected units in order. Unselected
    /// units are released here.
    fn into_selected(self) -> Vec<BatchImportUnit> {
        self.units.into_iter().filter(|unit| unit.selected).collect()
    }
}

#[derive(Debug)]
pub struct BatchFailure {
    pub path: PathBuf,
    pub error: QueueError,
}

#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub fail_count: usize,
    pub created: Vec<JobRecord>,
    pub failures: Vec<BatchFailure>,
}

/// Submit the selected units of `session` one after another.
///
/// A failed unit is recorded and the batch moves on. Progress is emitted after
/// every unit and summaries at the end. The session is consumed, releasing
/// every preview whether it was submitted or not.
pub async fn run_batch<F, Fut>(session: BatchSession, events: &EventSender, mut submit: F) -> BatchOutcome
where
    F: FnMut(&BatchImportUnit) -> Fut,
    Fut: Future<Output = Result<JobRecord, QueueError>>,
{
    let units = session.into_selected();
    let total = units.len();
    let mut outcome = BatchOutcome::default();

    if total == 0 {
        events.info("Batch", "No files selected");
        return outcome;
    }
    info!("Submitting batch of {total} images");

    for (index, unit) in units.iter().enumerate() {
        match submit(unit).await {
            Ok(job) => {
                debug!("Batch unit {} -> job {}", unit.file_name(), job.id);
                events.emit(AppEvent::JobCreated(job.clone()));
                outcome.success_count += 1;
                outcome.created.push(job);
            }
            Err(error) => {
                warn!("Batch unit {} failed: {error}", unit.file_name());
                outcome.fail_count += 1;
                outcome.failures.push(BatchFailure {
                    path: unit.path.clone(),
                    error,
                });
            }
        }
        events.emit(AppEvent::BatchProgress(BatchProgress::new(index + 1, total)));
    }
    drop(units);

    if outcome.success_count > 0 {
        events.success(
            "Batch submitted",
            format!("{} of {total} jobs queued", outcome.success_count),
        );
    }
    if outcome.fail_count > 0 {
        let names: Vec<_> = outcome
            .failures
            .iter()
            .map(|failure| failure.path.display().to_string())
            .collect();
        events.error(
            "Batch incomplete",
            format!("{} of {total} failed: {}", outcome.fail_count, names.join(", ")),
        );
    }

    outcome
}
