//! Движок очистки Zone.Identifier.
//!
//! Поток данных:
//! `FolderObserver` → `ExtensionFilter` → `Dispatcher` (задержка) → `MarkerRemover` → события.
//! Массовая очистка идёт мимо наблюдателей и задержки:
//! `TreeWalker` → `ExtensionFilter` → `MarkerRemover`, синхронно.
//!
//! Блокировки:
//! - реестр папок — один mutex (`PathRegistry`), берётся в add/remove/replace/list/shutdown;
//! - список расширений — свой `RwLock` (`ExtensionFilter`), читается при каждой проверке.

pub mod dispatcher;
pub mod events;
pub mod filter;
pub mod platform;
pub mod registry;
pub mod remover;
pub mod walker;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, trace};

use crate::config::CleanerConfig;
use crate::error::ZoneError;
use crate::file_watcher::{ChangeSink, FileChange, FolderObserver};

pub use dispatcher::{Dispatcher, PendingCleanup};
pub use events::{CleanerEvent, CleanupOutcome, EventBus, EventHandler, SkipReason};
pub use filter::ExtensionFilter;
pub use platform::{MarkerPlatform, OsErrorCode, PlatformError, SystemPlatform};
pub use registry::PathRegistry;
pub use remover::MarkerRemover;
pub use walker::TreeWalker;

pub struct ZoneCleaner {
    registry: PathRegistry,
    filter: Arc<ExtensionFilter>,
    remover: Arc<MarkerRemover>,
    dispatcher: Arc<Dispatcher>,
    events: Arc<EventBus>,
    shut_down: AtomicBool,
}

impl ZoneCleaner {
    /// Запустить движок на реальной ОС: применить расширения и
    /// зарегистрировать все папки из настроек.
    pub fn new(
        config: &CleanerConfig,
        on_event: impl Fn(CleanerEvent) + Send + Sync + 'static,
    ) -> Result<Self, ZoneError> {
        Self::with_platform(config, Arc::new(SystemPlatform), on_event)
    }

    pub fn with_platform(
        config: &CleanerConfig,
        platform: Arc<dyn MarkerPlatform>,
        on_event: impl Fn(CleanerEvent) + Send + Sync + 'static,
    ) -> Result<Self, ZoneError> {
        let events = Arc::new(EventBus::default());
        events.subscribe(on_event);

        let remover = Arc::new(MarkerRemover::new(platform, Arc::clone(&events)));
        let dispatcher = Arc::new(Dispatcher::start(
            config.debounce(),
            config.worker_count(),
            Arc::clone(&remover),
        )?);

        let cleaner = Self {
            registry: PathRegistry::default(),
            filter: Arc::new(ExtensionFilter::new(&config.allowed_extensions)),
            remover,
            dispatcher,
            events,
            shut_down: AtomicBool::new(false),
        };

        for folder in &config.monitored_folders {
            if let Err(e) = cleaner.add_path(folder) {
                error!("Cannot observe {}: {e}", folder.display());
            }
        }
        info!(
            "Cleaner started: {} folder(s), extensions: {:?}",
            cleaner.registry.len(),
            cleaner.filter.allowed()
        );

        Ok(cleaner)
    }

    /// Дополнительный подписчик на события.
    pub fn subscribe(&self, handler: impl Fn(CleanerEvent) + Send + Sync + 'static) {
        self.events.subscribe(handler);
    }

    /// Поставить папку под наблюдение.
    ///
    /// `Ok(false)` — папки нет, она уже зарегистрирована или движок остановлен.
    pub fn add_path(&self, path: impl AsRef<Path>) -> Result<bool, ZoneError> {
        if self.is_shut_down() {
            return Ok(false);
        }
        let sink = self.change_sink();
        self.registry
            .add(path.as_ref(), |dir| FolderObserver::start(dir, sink))
    }

    /// Снять папку с наблюдения. Уже запланированные очистки не отменяются.
    pub fn remove_path(&self, path: impl AsRef<Path>) -> bool {
        self.registry.remove(path.as_ref())
    }

    pub fn list_paths(&self) -> Vec<PathBuf> {
        self.registry.list()
    }

    /// Заменить набор папок целиком. Возвращает число зарегистрированных;
    /// папки, которые не удалось поставить под наблюдение, только логируются.
    pub fn replace_paths<P: AsRef<Path>>(&self, paths: &[P]) -> usize {
        if self.is_shut_down() {
            return 0;
        }
        self.registry
            .replace(paths, |dir| FolderObserver::start(dir, self.change_sink()))
    }

    pub fn set_allowed_extensions<I, S>(&self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.filter.set_allowed(extensions);
        info!("Allowed extensions: {:?}", self.filter.allowed());
    }

    pub fn allowed_extensions(&self) -> Vec<String> {
        self.filter.allowed()
    }

    pub fn is_allowed(&self, path: impl AsRef<Path>) -> bool {
        self.filter.is_allowed(path.as_ref())
    }

    /// Удалить маркер у одного файла. `true` — маркер был и удалён.
    pub fn try_remove_marker(&self, path: impl AsRef<Path>) -> bool {
        self.try_remove_marker_outcome(path).is_removed()
    }

    pub fn try_remove_marker_outcome(&self, path: impl AsRef<Path>) -> CleanupOutcome {
        self.remover.remove(path.as_ref())
    }

    /// Синхронно очистить всё дерево папки. Возвращает число удалённых маркеров.
    pub fn clean_folder(&self, path: impl AsRef<Path>) -> usize {
        let root = path.as_ref();
        if !root.is_dir() {
            return 0;
        }

        let removed = TreeWalker::new(root)
            .filter(|file| self.filter.is_allowed(file))
            .filter(|file| self.remover.remove(file).is_removed())
            .count();
        info!("Cleaned {}: {removed} marker(s) removed", root.display());
        removed
    }

    /// Очистить все зарегистрированные папки.
    pub fn clean_all(&self) -> usize {
        self.registry
            .list()
            .iter()
            .map(|folder| self.clean_folder(folder))
            .sum()
    }

    /// Сколько маркеров удалено с момента запуска.
    pub fn processed_count(&self) -> u64 {
        self.remover.processed_count()
    }

    pub fn debounce(&self) -> Duration {
        self.dispatcher.delay()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Освободить все подписки и дождаться запланированных очисток (idempotent).
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let released = self.registry.clear();
        self.dispatcher.shutdown();
        info!("Cleaner shut down, released {released} observer(s)");
    }

    fn change_sink(&self) -> ChangeSink {
        let filter = Arc::clone(&self.filter);
        let dispatcher = Arc::clone(&self.dispatcher);
        Arc::new(move |change: FileChange| {
            if !filter.is_allowed(&change.path) {
                trace!("filtered out: {}", change.path.display());
                return;
            }
            trace!("{:?}: {}", change.kind, change.path.display());
            dispatcher.schedule(change.path);
        })
    }
}

impl Drop for ZoneCleaner {
    fn drop(&mut self) {
        self.shutdown();
    }
}
