//! Отложенная очистка.
//!
//! Каждое событие ФС превращается в `PendingCleanup` со сроком `now + delay`.
//! Таймерный поток держит кучу сроков и отдаёт созревшие задачи пулу
//! рабочих потоков. Повторы для одного пути не склеиваются, задачи не
//! отменяются: удаление маркера идемпотентно.
//!
//! `shutdown()` перестаёт принимать новые задачи, но уже запланированные
//! дожидаются своего срока и выполняются.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{self as channel, RecvTimeoutError};
use log::{debug, error};

use super::remover::MarkerRemover;
use crate::config::MAX_WORKERS;
use crate::error::ZoneError;
use crate::logging::LogContext;

/// «Удалить маркер у `path` не раньше `due`».
#[derive(Debug)]
pub struct PendingCleanup {
    pub path: PathBuf,
    pub due: Instant,
    seq: u64,
    ctx: LogContext,
}

impl PartialEq for PendingCleanup {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for PendingCleanup {}

impl PartialOrd for PendingCleanup {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingCleanup {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

pub struct Dispatcher {
    delay: Duration,
    schedule_tx: Mutex<Option<channel::Sender<PendingCleanup>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
    seq: AtomicU64,
}

impl Dispatcher {
    /// Запустить таймер и `workers` рабочих потоков (не больше `MAX_WORKERS`).
    pub fn start(
        delay: Duration,
        workers: usize,
        remover: Arc<MarkerRemover>,
    ) -> Result<Self, ZoneError> {
        let (schedule_tx, schedule_rx) = channel::unbounded::<PendingCleanup>();
        let (work_tx, work_rx) = channel::unbounded::<PendingCleanup>();

        let workers = workers.clamp(1, MAX_WORKERS);
        let mut threads = Vec::with_capacity(workers + 1);
        threads.push(
            thread::Builder::new()
                .name("zone-timer".to_string())
                .spawn(move || run_timer(&schedule_rx, &work_tx))?,
        );
        for i in 0..workers {
            let work_rx = work_rx.clone();
            let remover = Arc::clone(&remover);
            threads.push(
                thread::Builder::new()
                    .name(format!("zone-worker-{i}"))
                    .spawn(move || run_worker(&work_rx, &remover))?,
            );
        }

        Ok(Self {
            delay,
            schedule_tx: Mutex::new(Some(schedule_tx)),
            threads: Mutex::new(threads),
            seq: AtomicU64::new(0),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Запланировать очистку. `false` — диспетчер уже остановлен.
    pub fn schedule(&self, path: PathBuf) -> bool {
        let pending = PendingCleanup {
            path,
            due: Instant::now() + self.delay,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            ctx: LogContext::new("debounced_cleanup"),
        };
        debug!(
            "{} scheduled {} in {:?}",
            pending.ctx,
            pending.path.display(),
            self.delay
        );

        let guard = self
            .schedule_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => tx.send(pending).is_ok(),
            None => false,
        }
    }

    /// Остановить приём задач и дождаться уже запланированных (idempotent).
    pub fn shutdown(&self) {
        let sender = self
            .schedule_tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let threads: Vec<JoinHandle<()>> = self
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        let current = thread::current().id();
        for handle in threads {
            // Подписчик события может вызвать shutdown из рабочего потока.
            if handle.thread().id() == current {
                continue;
            }
            let name = handle.thread().name().unwrap_or("zone-thread").to_string();
            if handle.join().is_err() {
                error!("{name} panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_timer(
    schedule_rx: &channel::Receiver<PendingCleanup>,
    work_tx: &channel::Sender<PendingCleanup>,
) {
    let mut queue: BinaryHeap<Reverse<PendingCleanup>> = BinaryHeap::new();
    let mut open = true;

    while open || !queue.is_empty() {
        let now = Instant::now();
        while queue.peek().is_some_and(|next| next.0.due <= now) {
            if let Some(Reverse(pending)) = queue.pop() {
                if work_tx.send(pending).is_err() {
                    return;
                }
            }
        }

        let wait = queue
            .peek()
            .map(|next| next.0.due.saturating_duration_since(Instant::now()));

        if open {
            let received = match wait {
                Some(wait) => schedule_rx.recv_timeout(wait),
                None => schedule_rx
                    .recv()
                    .map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(pending) => queue.push(Reverse(pending)),
                Err(RecvTimeoutError::Timeout) => {
                    // тик
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("dispatcher closed, draining {} pending", queue.len());
                    open = false;
                }
            }
        } else if let Some(wait) = wait {
            thread::sleep(wait);
        }
    }
}

fn run_worker(work_rx: &channel::Receiver<PendingCleanup>, remover: &MarkerRemover) {
    for pending in work_rx.iter() {
        let outcome = remover.remove(&pending.path);
        debug!("{} {} -> {:?}", pending.ctx, pending.path.display(), outcome);
    }
}
