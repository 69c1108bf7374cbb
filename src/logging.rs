//! Логирование Hornero Zone.
//!
//! ## Уровни
//! - `ERROR`: сбой создания наблюдателя, падение рабочего потока
//! - `WARN`:  ошибки платформы при удалении маркера, ошибки `notify`
//! - `INFO`:  папки добавлены/сняты, массовая очистка, shutdown
//! - `DEBUG`: события ФС, отложенные очистки, пропущенные директории
//! - `TRACE`: файлы, отсеянные фильтром расширений
//!
//! Строка лога: `[12:04:05.120] I zone-worker-0 hornero_zone::cleaner::remover: ...`.
//! Имя потока нужно: очистки идут из пула `zone-worker-N`, события ФС из потока `notify`.
//!
//! ## Корреляция
//! Каждая отложенная очистка несёт `LogContext`; его `Display` (`[zc-000042 debounced_cleanup]`)
//! связывает строку «scheduled» с итогом удаления в рабочем потоке.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Once;
use std::thread;
use std::time::{SystemTime, UNIX_EPOCH};

use log::Level;

/// Фильтр, если `RUST_LOG` не задан.
pub const DEFAULT_FILTER: &str = "hornero_zone=info,notify=warn";

static INIT: Once = Once::new();

/// Инициализировать логирование (idempotent). Уровни — через `RUST_LOG`,
/// например `RUST_LOG=hornero_zone=debug`.
pub fn init_logging() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().filter_or("RUST_LOG", DEFAULT_FILTER);
        let result = env_logger::Builder::from_env(env)
            .format(|buf, record| {
                let current = thread::current();
                writeln!(
                    buf,
                    "[{}] {} {} {}: {}",
                    clock_timestamp(),
                    level_letter(record.level()),
                    current.name().unwrap_or("-"),
                    record.target(),
                    record.args()
                )
            })
            .try_init();
        // Логгер мог поставить сам хост-процесс.
        if result.is_err() {
            log::debug!("logger already installed, keeping it");
        }
    });
}

fn level_letter(level: Level) -> char {
    match level {
        Level::Error => 'E',
        Level::Warn => 'W',
        Level::Info => 'I',
        Level::Debug => 'D',
        Level::Trace => 'T',
    }
}

/// `HH:MM:SS.mmm` (UTC).
fn clock_timestamp() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = now.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60,
        now.subsec_millis()
    )
}

/// Метка одной операции в логах.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub correlation_id: String,
    pub operation: &'static str,
}

impl LogContext {
    pub fn new(operation: &'static str) -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self {
            correlation_id: format!("zc-{:06}", id % 1_000_000),
            operation,
        }
    }
}

impl fmt::Display for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.correlation_id, self.operation)
    }
}
