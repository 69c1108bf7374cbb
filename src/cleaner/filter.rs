//! Фильтр по расширениям.
//!
//! Пустой список — фильтра нет, подходит любой файл. Список заменяется
//! целиком под write-lock; каждая проверка видит целый снимок.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

/// Привести расширение к виду `.pdf`. Пустые значения отбрасываются.
pub fn normalize_extension(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        return None;
    }
    Some(format!(".{}", trimmed.to_lowercase()))
}

#[derive(Default)]
pub struct ExtensionFilter {
    allowed: RwLock<Arc<HashSet<String>>>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filter = Self::default();
        filter.set_allowed(extensions);
        filter
    }

    /// Заменить список целиком.
    pub fn set_allowed<I, S>(&self, extensions: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let next: HashSet<String> = extensions
            .into_iter()
            .filter_map(|e| normalize_extension(e.as_ref()))
            .collect();
        *self.allowed.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }

    pub fn is_allowed(&self, path: &Path) -> bool {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return true;
        }
        // Файл без расширения при активном фильтре не подходит.
        path.extension()
            .and_then(|ext| normalize_extension(&ext.to_string_lossy()))
            .is_some_and(|ext| snapshot.contains(&ext))
    }

    pub fn is_active(&self) -> bool {
        !self.snapshot().is_empty()
    }

    /// Текущий список, отсортированный.
    pub fn allowed(&self) -> Vec<String> {
        let mut list: Vec<String> = self.snapshot().iter().cloned().collect();
        list.sort();
        list
    }

    fn snapshot(&self) -> Arc<HashSet<String>> {
        Arc::clone(&self.allowed.read().unwrap_or_else(PoisonError::into_inner))
    }
}
