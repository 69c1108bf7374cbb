//! События и итоги очистки.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use super::platform::PlatformError;

/// Событие для внешнего слоя (трей, журнал диагностики).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanerEvent {
    /// Маркер удалён.
    FileProcessed { path: PathBuf },
    /// ОС отказала в удалении маркера (кроме «не найден»).
    ErrorOccurred { path: PathBuf, error: PlatformError },
}

impl CleanerEvent {
    pub fn path(&self) -> &Path {
        match self {
            Self::FileProcessed { path } | Self::ErrorOccurred { path, .. } => path.as_path(),
        }
    }
}

/// Почему файл не обрабатывался.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// Файла уже нет.
    Missing,
    Directory,
    /// Это сам соседний файл-маркер.
    MarkerCompanion,
}

/// Итог одной попытки удаления маркера.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// У файла нет маркера.
    NotPresent,
    Skipped(SkipReason),
    Failed(PlatformError),
}

impl CleanupOutcome {
    pub fn is_removed(&self) -> bool {
        matches!(self, Self::Removed)
    }
}

/// Подписчик на события. Вызывается из рабочих потоков очистки.
pub type EventHandler = Arc<dyn Fn(CleanerEvent) + Send + Sync>;

/// Рассылка событий всем подписчикам.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<Vec<EventHandler>>,
}

impl EventBus {
    pub fn subscribe(&self, handler: impl Fn(CleanerEvent) + Send + Sync + 'static) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    pub fn emit(&self, event: &CleanerEvent) {
        // Копия списка: подписчик может сам вызвать `subscribe`.
        let handlers = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for handler in handlers {
            handler(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
