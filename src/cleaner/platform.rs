//! Узкий слой над ОС: удаление потока `Zone.Identifier`.
//!
//! Windows: маркер — альтернативный поток NTFS `file:Zone.Identifier`,
//! удаляется `DeleteFileW` по адресу потока (основное содержимое не трогается).
//!
//! Остальные ОС: ADS нет, но при копировании с Windows на чужие ФС маркер
//! остаётся соседним файлом с тем же именем `file:Zone.Identifier`.
//! Удаляется он обычным `remove_file`; если такого файла нет — это
//! «маркера нет», т.е. no-op.

use std::ffi::OsString;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// `:` + имя потока-маркера.
const MARKER_SUFFIX: &str = ":Zone.Identifier";

/// Сырой код ошибки ОС.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OsErrorCode(pub i32);

impl OsErrorCode {
    /// `ERROR_FILE_NOT_FOUND` на Windows, `ENOENT` на POSIX.
    pub const NOT_FOUND: Self = Self(2);

    pub fn is_not_found(self) -> bool {
        self == Self::NOT_FOUND
    }

    /// Системное описание кода.
    pub fn describe(self) -> String {
        io::Error::from_raw_os_error(self.0).to_string()
    }

    pub fn from_io(err: &io::Error) -> Self {
        match err.raw_os_error() {
            Some(code) => Self(code),
            None if err.kind() == io::ErrorKind::NotFound => Self::NOT_FOUND,
            None => Self(-1),
        }
    }
}

impl fmt::Display for OsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Структурированная ошибка удаления маркера.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("OS error {code} removing {marker:?}: {message}")]
pub struct PlatformError {
    pub code: OsErrorCode,
    /// Адрес потока, который не удалось удалить.
    pub marker: PathBuf,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: OsErrorCode, marker: PathBuf) -> Self {
        Self {
            code,
            marker,
            message: code.describe(),
        }
    }
}

/// Операция удаления маркера, подменяемая в тестах.
pub trait MarkerPlatform: Send + Sync {
    /// Удалить поток по адресу `marker` (`file:Zone.Identifier`).
    fn delete_marker(&self, marker: &Path) -> Result<(), OsErrorCode>;

    /// Адрес маркера для `file`.
    fn marker_path(&self, file: &Path) -> PathBuf {
        marker_path(file)
    }
}

/// Реальная ОС.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemPlatform;

impl MarkerPlatform for SystemPlatform {
    fn delete_marker(&self, marker: &Path) -> Result<(), OsErrorCode> {
        native::delete_stream(marker)
    }
}

/// Адрес маркера для файла: `path:Zone.Identifier`.
pub fn marker_path(file: &Path) -> PathBuf {
    let mut raw = OsString::from(file.as_os_str());
    raw.push(MARKER_SUFFIX);
    PathBuf::from(raw)
}

/// Сам соседний файл-маркер (на ФС без ADS). На Windows имя файла не может
/// содержать `:`, так что там всегда `false`.
pub fn is_marker_companion(path: &Path) -> bool {
    path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().ends_with(MARKER_SUFFIX))
}

#[cfg(target_os = "windows")]
mod native {
    use std::iter;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use windows::core::PCWSTR;
    use windows::Win32::Storage::FileSystem::DeleteFileW;

    use super::OsErrorCode;

    pub(super) fn delete_stream(marker: &Path) -> Result<(), OsErrorCode> {
        let wide: Vec<u16> = marker
            .as_os_str()
            .encode_wide()
            .chain(iter::once(0))
            .collect();

        // SAFETY: `wide` — нуль-терминированная UTF-16 строка, живёт до конца вызова.
        unsafe { DeleteFileW(PCWSTR(wide.as_ptr())) }
            .map_err(|err| OsErrorCode(win32_code(err.code().0)))
    }

    /// HRESULT_FROM_WIN32 (`0x8007xxxx`) обратно в код Win32.
    fn win32_code(hresult: i32) -> i32 {
        let raw = hresult as u32;
        if raw & 0xFFFF_0000 == 0x8007_0000 {
            (raw & 0xFFFF) as i32
        } else {
            hresult
        }
    }

}

#[cfg(not(target_os = "windows"))]
mod native {
    use std::fs;
    use std::path::Path;

    use super::OsErrorCode;

    pub(super) fn delete_stream(marker: &Path) -> Result<(), OsErrorCode> {
        fs::remove_file(marker).map_err(|err| OsErrorCode::from_io(&err))
    }
}
