//! Внутренние типы событий file_watcher.
//!
//! Наблюдатель отдаёт наружу только файлы: события о директориях
//! отбрасываются до пересылки.

use std::path::PathBuf;

use notify::event::{MetadataKind, ModifyKind};
use notify::EventKind;

/// Что произошло с файлом.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Renamed,
}

/// Изменение файла внутри наблюдаемой папки.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileChange {
    /// Полный путь к файлу.
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Отобрать интересующие события: создание, запись, переименование.
///
/// Удаления, чтения и смена прав игнорируются.
pub fn classify(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(ModifyKind::Data(_) | ModifyKind::Any) => Some(ChangeKind::Modified),
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime | MetadataKind::Any)) => {
            Some(ChangeKind::Modified)
        }
        EventKind::Modify(_) => None,
        EventKind::Remove(_) => None,
        EventKind::Access(_) => None,
        EventKind::Other => None,
        EventKind::Any => None,
    }
}
