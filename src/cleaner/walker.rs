//! Итеративный обход дерева папок для массовой очистки.
//!
//! Явный стек вместо рекурсии; файлы отдаются лениво. Ошибка чтения
//! директории (нет прав, I/O) пропускает только эту директорию.
//! Симлинки на директории не раскрываются, симлинки на файлы отдаются.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

pub struct TreeWalker {
    stack: Vec<PathBuf>,
    files: VecDeque<PathBuf>,
    skipped_dirs: usize,
}

impl TreeWalker {
    pub fn new(root: &Path) -> Self {
        Self {
            stack: vec![root.to_path_buf()],
            files: VecDeque::new(),
            skipped_dirs: 0,
        }
    }

    /// Сколько директорий пропущено из-за ошибок чтения.
    pub fn skipped_dirs(&self) -> usize {
        self.skipped_dirs
    }

    fn expand(&mut self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("skipping directory {}: {err}", dir.display());
                self.skipped_dirs += 1;
                return;
            }
        };

        let mut subdirs = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping entry in {}: {err}", dir.display());
                    continue;
                }
            };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();
            if file_type.is_dir() {
                subdirs.push(path);
            } else if file_type.is_file() {
                self.files.push_back(path);
            } else if file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_file()) {
                self.files.push_back(path);
            }
        }

        // Первая по списку поддиректория обходится первой.
        self.stack.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for TreeWalker {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            if let Some(file) = self.files.pop_front() {
                return Some(file);
            }
            let dir = self.stack.pop()?;
            self.expand(&dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn test_walks_nested_tree() {
        let dir = tempfile::TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();
        touch(&dir.path().join("root.txt"));
        touch(&dir.path().join("a").join("mid.txt"));
        touch(&nested.join("deep.txt"));

        let found: HashSet<PathBuf> = TreeWalker::new(dir.path()).collect();
        let expected: HashSet<PathBuf> = [
            dir.path().join("root.txt"),
            dir.path().join("a").join("mid.txt"),
            nested.join("deep.txt"),
        ]
        .into_iter()
        .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn test_missing_root_yields_nothing() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut walker = TreeWalker::new(&dir.path().join("missing"));
        assert_eq!(walker.next(), None);
        assert_eq!(walker.skipped_dirs(), 1);
    }

    #[test]
    fn test_each_walk_is_independent() {
        let dir = tempfile::TempDir::new().unwrap();
        touch(&dir.path().join("one.txt"));

        assert_eq!(TreeWalker::new(dir.path()).count(), 1);
        touch(&dir.path().join("two.txt"));
        assert_eq!(TreeWalker::new(dir.path()).count(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        let open = dir.path().join("open");
        fs::create_dir_all(&locked).unwrap();
        fs::create_dir_all(&open).unwrap();
        touch(&locked.join("hidden.txt"));
        touch(&open.join("visible.txt"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // root читает всё — проверять нечего.
        let readable = fs::read_dir(&locked).is_ok();
        let mut walker = TreeWalker::new(dir.path());
        let found: Vec<PathBuf> = walker.by_ref().collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(found.contains(&open.join("visible.txt")));
        if !readable {
            assert_eq!(found.len(), 1);
            assert_eq!(walker.skipped_dirs(), 1);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_is_not_followed() {
        let dir = tempfile::TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir_all(&real).unwrap();
        touch(&real.join("f.txt"));
        std::os::unix::fs::symlink(dir.path(), real.join("loop")).unwrap();
        std::os::unix::fs::symlink(real.join("f.txt"), dir.path().join("link.txt")).unwrap();

        let found: HashSet<PathBuf> = TreeWalker::new(dir.path()).collect();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&dir.path().join("link.txt")));
    }
}
