//! Процессный фасад движка.
//!
//! Тонкий слой для внешних сборщиков (трей, окно настроек): один движок на
//! процесс, один активный подписчик на события. Вся логика — в `cleaner`.
//!
//! Контракт:
//! - `start` при уже запущенном движке → `ZoneError::AlreadyRunning`;
//! - без запущенного движка операции ничего не делают (пусто/`false`/`0`);
//! - `shutdown` можно вызывать сколько угодно раз.

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use log::warn;

use crate::cleaner::{CleanerEvent, EventHandler, ZoneCleaner};
use crate::config::CleanerConfig;
use crate::error::ZoneError;
use crate::logging;

static EVENT_SINK: Lazy<Mutex<Option<EventHandler>>> = Lazy::new(|| Mutex::new(None));

static CLEANER: Lazy<Mutex<Option<Arc<ZoneCleaner>>>> = Lazy::new(|| Mutex::new(None));

fn current() -> Option<Arc<ZoneCleaner>> {
    CLEANER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

fn emit(event: CleanerEvent) {
    // Клонируем handler, чтобы не держать mutex во время вызова.
    let handler = EVENT_SINK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    match handler {
        Some(handler) => handler(event),
        None => log::debug!("event dropped (no active subscriber): {:?}", event.path()),
    }
}

/// Инициализация логирования.
pub fn init_logging() {
    logging::init_logging();
}

/// Подписаться на события. Предыдущий подписчик заменяется.
pub fn on_event(handler: impl Fn(CleanerEvent) + Send + Sync + 'static) {
    logging::init_logging();

    let mut guard = EVENT_SINK.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        warn!("on_event called while previous subscriber is still bound; replacing it");
    }
    *guard = Some(Arc::new(handler));
}

/// Запустить движок. Возвращает зарегистрированные папки (для отображения в UI).
pub fn start(config: &CleanerConfig) -> Result<Vec<PathBuf>, ZoneError> {
    logging::init_logging();

    let mut guard = CLEANER.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_some() {
        return Err(ZoneError::AlreadyRunning);
    }

    let cleaner = ZoneCleaner::new(config, emit)?;
    let paths = cleaner.list_paths();
    *guard = Some(Arc::new(cleaner));
    Ok(paths)
}

pub fn is_running() -> bool {
    current().is_some()
}

pub fn add_path(path: &str) -> Result<bool, ZoneError> {
    match current() {
        Some(cleaner) => cleaner.add_path(path),
        None => Ok(false),
    }
}

pub fn remove_path(path: &str) -> bool {
    current().is_some_and(|c| c.remove_path(path))
}

pub fn list_paths() -> Vec<String> {
    current()
        .map(|c| {
            c.list_paths()
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn set_allowed_extensions(extensions: Vec<String>) {
    if let Some(cleaner) = current() {
        cleaner.set_allowed_extensions(extensions);
    }
}

pub fn try_remove_marker(path: &str) -> bool {
    current().is_some_and(|c| c.try_remove_marker(path))
}

/// Массовая очистка одной папки (блокирует до завершения).
pub fn clean_folder(path: &str) -> usize {
    current().map_or(0, |c| c.clean_folder(path))
}

/// «Очистить сейчас» по всем папкам.
pub fn clean_all() -> usize {
    current().map_or(0, |c| c.clean_all())
}

pub fn processed_count() -> u64 {
    current().map_or(0, |c| c.processed_count())
}

/// Остановить движок и закрыть подписку.
pub fn shutdown() {
    // 1) Сначала движок: после этого новых событий не будет.
    let cleaner = CLEANER
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(cleaner) = cleaner {
        cleaner.shutdown();
    }

    // 2) Затем подписчик.
    let _dropped = EVENT_SINK
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    log::debug!("Event subscriber closed");
}
