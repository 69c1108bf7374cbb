//! Hornero Zone Core
//!
//! Снимает метку «файл из интернета» (поток `Zone.Identifier`) с файлов в
//! наблюдаемых папках: реактивно, по событиям ФС с задержкой, и по запросу,
//! обходом всего дерева. Трей, хранение настроек и автозапуск — внешние
//! слои; они пользуются [`api`] или [`ZoneCleaner`] напрямую.

pub mod api;
pub mod cleaner;
pub mod config;
pub mod error;
pub mod file_watcher;
pub mod logging;

pub use cleaner::{CleanerEvent, CleanupOutcome, ZoneCleaner};
pub use config::CleanerConfig;
pub use error::ZoneError;
