//! Настройки агента: какие папки наблюдать, какие расширения чистить.
//!
//! Формат хранения — TOML. Само сохранение/расположение файла принадлежит
//! внешнему слою настроек; здесь только разбор и значения по умолчанию.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cleaner::filter::normalize_extension;
use crate::error::ZoneError;

/// Задержка перед очисткой по умолчанию: почтовый клиент успевает дописать вложение.
pub const DEFAULT_DEBOUNCE_MS: u64 = 500;

/// Размер пула потоков очистки по умолчанию.
pub const DEFAULT_WORKERS: usize = 2;

/// Верхняя граница пула: удаление маркера — короткий локальный вызов.
pub const MAX_WORKERS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanerConfig {
    /// Папки под наблюдением.
    pub monitored_folders: Vec<PathBuf>,
    /// Разрешённые расширения; пустой список — чистить все файлы.
    pub allowed_extensions: Vec<String>,
    pub debounce_ms: u64,
    pub workers: usize,
    /// Автозапуск при входе в систему. Ядро его не использует.
    pub start_with_system: bool,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            monitored_folders: default_folders(),
            allowed_extensions: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            workers: DEFAULT_WORKERS,
            start_with_system: false,
        }
    }
}

impl CleanerConfig {
    /// Пустая конфигурация: без папок, без фильтра.
    pub fn empty() -> Self {
        Self {
            monitored_folders: Vec::new(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ZoneError> {
        let cfg: Self = toml::from_str(raw)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Загрузить настройки из файла. Отсутствие явно указанного файла — ошибка.
    pub fn load(path: &Path) -> Result<Self, ZoneError> {
        if !path.exists() {
            return Err(ZoneError::MissingConfig(path.to_path_buf()));
        }
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ZoneError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Размер пула в пределах `1..=MAX_WORKERS`.
    pub fn worker_count(&self) -> usize {
        self.workers.clamp(1, MAX_WORKERS)
    }

    /// Расширения в каноническом виде (`.pdf`), без пустых значений.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .filter_map(|e| normalize_extension(e))
            .collect()
    }

    fn validate(&self) -> Result<(), ZoneError> {
        if self.workers > MAX_WORKERS {
            return Err(ZoneError::InvalidConfig(format!(
                "workers = {} exceeds the limit of {MAX_WORKERS}",
                self.workers
            )));
        }
        for folder in &self.monitored_folders {
            if folder.as_os_str().is_empty() {
                return Err(ZoneError::InvalidPath("empty monitored folder".to_string()));
            }
            if !folder.is_absolute() {
                return Err(ZoneError::InvalidPath(format!(
                    "monitored folder must be absolute: {}",
                    folder.display()
                )));
            }
        }
        Ok(())
    }
}

/// Папки по умолчанию: Рабочий стол, Загрузки, Документы — только существующие.
pub fn default_folders() -> Vec<PathBuf> {
    [dirs::desktop_dir(), dirs::download_dir(), dirs::document_dir()]
        .into_iter()
        .flatten()
        .filter(|p| p.is_dir())
        .fold(Vec::new(), |mut acc, p| {
            if !acc.contains(&p) {
                acc.push(p);
            }
            acc
        })
}
