//! Модуль мониторинга файловой системы.
//!
//! Один `FolderObserver` на одну зарегистрированную папку:
//! - рекурсивная подписка `notify` на создание/запись/переименование
//! - пересылка изменений файлов в sink (директории отбрасываются)
//! - закрытие подписки в `stop()`: после возврата sink больше не вызывается

mod events;

pub use events::{classify, ChangeKind, FileChange};

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::ZoneError;

/// Получатель изменений. Вызывается из потока `notify`.
pub type ChangeSink = Arc<dyn Fn(FileChange) + Send + Sync>;

type SinkSlot = Arc<Mutex<Option<ChangeSink>>>;

/// Подписка на изменения одной папки.
pub struct FolderObserver {
    watcher: Option<RecommendedWatcher>,
    sink: SinkSlot,
    watch_dir: PathBuf,
}

impl FolderObserver {
    /// Запустить рекурсивное наблюдение за `dir`.
    ///
    /// События начинают поступать в `sink` сразу после возврата.
    pub fn start(dir: &Path, sink: ChangeSink) -> Result<Self, ZoneError> {
        if !dir.is_dir() {
            return Err(ZoneError::InvalidPath(format!(
                "not a directory: {}",
                dir.display()
            )));
        }

        let slot: SinkSlot = Arc::new(Mutex::new(Some(sink)));
        let callback_slot = Arc::clone(&slot);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => forward_event(&callback_slot, event),
                // Например, папку удалили из-под наблюдателя: он просто замолкает.
                Err(err) => warn!("notify error: {err}"),
            }
        })?;
        watcher.watch(dir, RecursiveMode::Recursive)?;

        info!("Observing folder: {}", dir.display());

        Ok(Self {
            watcher: Some(watcher),
            sink: slot,
            watch_dir: dir.to_path_buf(),
        })
    }

    pub fn watch_dir(&self) -> &Path {
        &self.watch_dir
    }

    pub fn is_active(&self) -> bool {
        self.watcher.is_some()
    }

    /// Остановить наблюдение (idempotent).
    pub fn stop(&mut self) {
        // 1) Закрываем sink под тем же mutex, под которым его вызывает callback:
        // после этого ни одно событие уже не будет переслано.
        let _dropped = self
            .sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        // 2) Снимаем подписку ОС.
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.watch_dir) {
                // Папка могла исчезнуть — подписка всё равно освобождается при drop.
                debug!("unwatch {} failed: {e}", self.watch_dir.display());
            }
            info!("Stopped observing folder: {}", self.watch_dir.display());
        }
    }
}

impl Drop for FolderObserver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn forward_event(slot: &Mutex<Option<ChangeSink>>, event: notify::Event) {
    let Some(kind) = classify(&event.kind) else {
        return;
    };
    debug!("notify event: {:?} {:?}", event.kind, event.paths);

    let changes: Vec<FileChange> = event
        .paths
        .into_iter()
        .filter(|path| !path.is_dir())
        .map(|path| FileChange { path, kind })
        .collect();
    if changes.is_empty() {
        return;
    }

    let guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    let Some(sink) = guard.as_ref() else {
        return;
    };
    for change in changes {
        sink(change);
    }
}
