//! Набор наблюдаемых папок и их наблюдателей.
//!
//! Ключ — абсолютный путь без хвостовых разделителей в нижнем регистре: одна
//! папка, записанная разным регистром или относительно текущей директории,
//! регистрируется один раз. Один mutex на весь набор: множество путей и
//! множество наблюдателей всегда совпадают.

use std::collections::HashMap;
use std::path::{self, Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, error, info};

use crate::error::ZoneError;
use crate::file_watcher::FolderObserver;

/// Абсолютный путь; относительный достраивается от текущей директории.
fn absolute(path: &Path) -> PathBuf {
    path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Регистронезависимый ключ пути.
pub fn registry_key(path: &Path) -> String {
    let path = absolute(path);
    let raw = path.to_string_lossy();
    let trimmed = raw.trim_end_matches(|c: char| c == '/' || c == '\\');
    // `/` и `C:\` остаются как есть.
    let key = if trimmed.is_empty() || trimmed.ends_with(':') {
        &*raw
    } else {
        trimmed
    };
    key.to_lowercase()
}

#[derive(Default)]
pub struct PathRegistry {
    observers: Mutex<HashMap<String, FolderObserver>>,
}

impl PathRegistry {
    /// Зарегистрировать папку. `Ok(false)` — папки нет или она уже под наблюдением.
    ///
    /// `start` создаёт наблюдателя; вызывается под блокировкой реестра.
    pub fn add<F>(&self, path: &Path, start: F) -> Result<bool, ZoneError>
    where
        F: FnOnce(&Path) -> Result<FolderObserver, ZoneError>,
    {
        let mut observers = self.lock();
        Self::insert(&mut observers, path, start)
    }

    /// Заменить набор целиком под одной блокировкой. Папка, которую не удалось
    /// поставить под наблюдение, пропускается с записью в лог.
    pub fn replace<P, F>(&self, paths: &[P], mut start: F) -> usize
    where
        P: AsRef<Path>,
        F: FnMut(&Path) -> Result<FolderObserver, ZoneError>,
    {
        let mut observers = self.lock();
        for (_, mut observer) in observers.drain() {
            observer.stop();
        }
        for path in paths {
            let path = path.as_ref();
            if let Err(e) = Self::insert(&mut observers, path, &mut start) {
                error!("Cannot observe {}: {e}", path.display());
            }
        }
        observers.len()
    }

    fn insert<F>(
        observers: &mut HashMap<String, FolderObserver>,
        path: &Path,
        start: F,
    ) -> Result<bool, ZoneError>
    where
        F: FnOnce(&Path) -> Result<FolderObserver, ZoneError>,
    {
        if !path.is_dir() {
            debug!("add ignored, not a directory: {}", path.display());
            return Ok(false);
        }

        let path = absolute(path);
        let key = registry_key(&path);
        if observers.contains_key(&key) {
            debug!("add ignored, already registered: {}", path.display());
            return Ok(false);
        }
        let observer = start(&path)?;
        observers.insert(key, observer);
        info!("Registered folder: {}", path.display());
        Ok(true)
    }

    /// Снять папку с наблюдения. После возврата события от неё не приходят.
    pub fn remove(&self, path: &Path) -> bool {
        let mut observers = self.lock();
        let Some(mut observer) = observers.remove(&registry_key(path)) else {
            return false;
        };
        observer.stop();
        info!("Unregistered folder: {}", path.display());
        true
    }

    /// Снимок зарегистрированных путей (абсолютных, в исходном регистре), отсортированный.
    pub fn list(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .lock()
            .values()
            .map(|o| o.watch_dir().to_path_buf())
            .collect();
        paths.sort();
        paths
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.lock().contains_key(&registry_key(path))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Остановить всех наблюдателей и очистить набор. Возвращает их число.
    pub fn clear(&self) -> usize {
        let mut observers = self.lock();
        let count = observers.len();
        for (_, mut observer) in observers.drain() {
            observer.stop();
        }
        count
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, FolderObserver>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_watcher::{ChangeSink, FileChange};
    use std::sync::Arc;

    fn quiet_start(dir: &Path) -> Result<FolderObserver, ZoneError> {
        let sink: ChangeSink = Arc::new(|_: FileChange| {});
        FolderObserver::start(dir, sink)
    }

    #[test]
    fn test_key_ignores_case_and_trailing_separator() {
        assert_eq!(
            registry_key(Path::new("C:\\Users\\Me\\Downloads\\")),
            registry_key(Path::new("c:\\users\\me\\downloads"))
        );
        assert_eq!(registry_key(Path::new("/")), "/");
        #[cfg(windows)]
        assert_eq!(registry_key(Path::new("C:\\")), "c:\\");
    }

    #[test]
    fn test_relative_and_absolute_share_key() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(registry_key(Path::new("src")), registry_key(&cwd.join("src")));
        assert_eq!(registry_key(Path::new("./src/")), registry_key(&cwd.join("src")));
    }

    #[test]
    fn test_relative_duplicate_keeps_single_observer() {
        let cwd = std::env::current_dir().unwrap();
        let registry = PathRegistry::default();

        assert!(registry.add(Path::new("src"), quiet_start).unwrap());
        assert!(!registry.add(&cwd.join("src"), quiet_start).unwrap());
        assert_eq!(registry.list(), vec![cwd.join("src")]);
        assert!(registry.remove(&cwd.join("src")));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_replace_skips_failures_and_keeps_the_rest() {
        let a = tempfile::TempDir::new().unwrap();
        let b = tempfile::TempDir::new().unwrap();
        let c = tempfile::TempDir::new().unwrap();
        let registry = PathRegistry::default();
        registry.add(a.path(), quiet_start).unwrap();

        let failing = b.path().to_path_buf();
        let count = registry.replace(&[b.path(), c.path(), c.path()], |dir| {
            if dir == failing.as_path() {
                Err(ZoneError::InvalidPath("refused".to_string()))
            } else {
                quiet_start(dir)
            }
        });

        assert_eq!(count, 1);
        assert_eq!(registry.list(), vec![c.path().to_path_buf()]);
        assert!(!registry.contains(a.path()));
    }

    #[test]
    fn test_concurrent_add_remove_keeps_set_consistent() {
        let dirs: Vec<tempfile::TempDir> =
            (0..4).map(|_| tempfile::TempDir::new().unwrap()).collect();
        let paths: Vec<PathBuf> = dirs.iter().map(|d| d.path().to_path_buf()).collect();
        let registry = Arc::new(PathRegistry::default());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = Arc::clone(&registry);
                let paths = paths.clone();
                std::thread::spawn(move || {
                    for round in 0..25 {
                        let path = &paths[(t + round) % paths.len()];
                        if (t + round) % 3 == 0 {
                            registry.remove(path);
                        } else {
                            registry.add(path, quiet_start).unwrap();
                        }
                        let listed = registry.list();
                        let mut keys: Vec<String> =
                            listed.iter().map(|p| registry_key(p)).collect();
                        keys.sort();
                        keys.dedup();
                        assert_eq!(keys.len(), listed.len());
                        assert!(listed.len() <= paths.len());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let listed = registry.list();
        assert_eq!(registry.len(), listed.len());
        for path in &paths {
            assert_eq!(registry.contains(path), listed.contains(path));
        }
        assert_eq!(registry.clear(), listed.len());
    }

    #[test]
    fn test_missing_directory_is_noop() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = PathRegistry::default();
        let added = registry.add(&dir.path().join("missing"), quiet_start).unwrap();
        assert!(!added);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_duplicate_add_keeps_single_observer() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = PathRegistry::default();
        assert!(registry.add(dir.path(), quiet_start).unwrap());

        let mut starts = 0;
        let added = registry
            .add(dir.path(), |d| {
                starts += 1;
                quiet_start(d)
            })
            .unwrap();
        assert!(!added);
        assert_eq!(starts, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_and_clear() {
        let a = tempfile::TempDir::new().unwrap();
        let b = tempfile::TempDir::new().unwrap();
        let registry = PathRegistry::default();
        registry.add(a.path(), quiet_start).unwrap();
        registry.add(b.path(), quiet_start).unwrap();

        assert!(registry.remove(a.path()));
        assert!(!registry.remove(a.path()));
        assert_eq!(registry.list(), vec![b.path().to_path_buf()]);

        assert_eq!(registry.clear(), 1);
        assert_eq!(registry.clear(), 0);
        assert!(!registry.contains(b.path()));
    }

    #[test]
    fn test_failed_start_registers_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let registry = PathRegistry::default();
        let result = registry.add(dir.path(), |_| {
            Err(ZoneError::InvalidPath("boom".to_string()))
        });
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
