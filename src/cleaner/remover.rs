use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};

use super::events::{CleanerEvent, CleanupOutcome, EventBus, SkipReason};
use super::platform::{is_marker_companion, MarkerPlatform, PlatformError};

/// Удаление маркера у одного файла с классификацией результата.
///
/// Никогда не паникует и не возвращает ошибку: сбой ОС превращается в
/// `CleanupOutcome::Failed` и событие `ErrorOccurred`.
pub struct MarkerRemover {
    platform: Arc<dyn MarkerPlatform>,
    events: Arc<EventBus>,
    processed: AtomicU64,
}

impl MarkerRemover {
    pub fn new(platform: Arc<dyn MarkerPlatform>, events: Arc<EventBus>) -> Self {
        Self {
            platform,
            events,
            processed: AtomicU64::new(0),
        }
    }

    pub fn remove(&self, path: &Path) -> CleanupOutcome {
        if is_marker_companion(path) {
            return CleanupOutcome::Skipped(SkipReason::MarkerCompanion);
        }
        match fs::metadata(path) {
            Err(_) => return CleanupOutcome::Skipped(SkipReason::Missing),
            Ok(meta) if meta.is_dir() => return CleanupOutcome::Skipped(SkipReason::Directory),
            Ok(_) => {}
        }

        let marker = self.platform.marker_path(path);
        match self.platform.delete_marker(&marker) {
            Ok(()) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                info!("Zone.Identifier removed: {}", path.display());
                self.events.emit(&CleanerEvent::FileProcessed {
                    path: path.to_path_buf(),
                });
                CleanupOutcome::Removed
            }
            Err(code) if code.is_not_found() => {
                debug!("no marker on {}", path.display());
                CleanupOutcome::NotPresent
            }
            Err(code) => {
                let error = PlatformError::new(code, marker);
                warn!("Cannot remove marker from {}: {error}", path.display());
                self.events.emit(&CleanerEvent::ErrorOccurred {
                    path: path.to_path_buf(),
                    error: error.clone(),
                });
                CleanupOutcome::Failed(error)
            }
        }
    }

    /// Сколько маркеров удалено за время жизни.
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }
}
