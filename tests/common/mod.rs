//! Общие помощники интеграционных тестов.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use hornero_zone::cleaner::platform::marker_path;
use hornero_zone::CleanerEvent;

/// Собирает события в потокобезопасную очередь для проверки.
#[derive(Clone, Default)]
pub struct EventCollector {
    events: Arc<Mutex<VecDeque<CleanerEvent>>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: CleanerEvent) {
        self.events.lock().unwrap().push_back(event);
    }

    /// Handler для `ZoneCleaner::new` / `api::on_event`.
    pub fn handler(&self) -> impl Fn(CleanerEvent) + Send + Sync + 'static {
        let this = self.clone();
        move |e| this.push(e)
    }

    pub fn take_all(&self) -> Vec<CleanerEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }

    /// Сколько `FileProcessed` пришло для файла с таким именем.
    pub fn processed_named(&self, name: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, CleanerEvent::FileProcessed { .. }))
            .filter(|e| e.path().file_name().is_some_and(|n| n == name))
            .count()
    }
}

/// Вспомогательная функция для ожидания событий с таймаутом.
pub fn wait_for_events(collector: &EventCollector, min_count: usize, timeout: Duration) -> bool {
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if collector.count() >= min_count {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    false
}

/// Создаёт тестовый файл с содержимым.
pub fn create_test_file(dir: &Path, name: &str) -> PathBuf {
    fs::create_dir_all(dir).expect("Failed to create parent dir");
    let path = dir.join(name);
    fs::write(&path, format!("content of {name}")).expect("Failed to create test file");
    path
}

/// Навесить маркер: на Windows это ADS, на остальных ОС — соседний файл.
pub fn write_marker(file: &Path) {
    fs::write(marker_path(file), "[ZoneTransfer]\r\nZoneId=3\r\n").expect("Failed to write marker");
}

pub fn has_marker(file: &Path) -> bool {
    fs::read(marker_path(file)).is_ok()
}
