use std::path::PathBuf;

/// Единый тип ошибок Rust Core.
///
/// Ожидаемые ситуации (нет маркера, папка не существует, дубликат пути)
/// сюда не попадают: они выражаются через `bool`/счётчики/события.
#[derive(thiserror::Error, Debug)]
pub enum ZoneError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Cleaner is already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing configuration file: {0:?}")]
    MissingConfig(PathBuf),

    #[error("Configuration parse failure: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Configuration serialize failure: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Notify error: {0}")]
    Notify(#[from] notify::Error),
}
