//! Global FIFO ingestion queue.
//!
//! Every conversational turn runs as one queued task. Starts preserve
//! admission order, at most `concurrency` tasks run at once, and two
//! consecutive starts are spaced by at least `interval`. At the default
//! concurrency of 1 this serializes turn handling across every session,
//! which is what keeps per-session state free of interleaved writes.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use {
    anyhow::Result,
    charla_config::CharlaConfig,
    futures::future::BoxFuture,
    tokio::sync::{Semaphore, mpsc},
    tracing::{debug, error, warn},
};

/// One queued unit of work. Errors are caught and logged at the queue
/// boundary; nothing propagates past a task.
pub type Task = BoxFuture<'static, Result<()>>;

struct Admitted {
    session: String,
    task: Task,
}

/// Queue tuning.
#[derive(Debug, Clone, Copy)]
pub struct QueueSettings {
    /// Tasks allowed to run at once.
    pub concurrency: usize,
    /// Minimum spacing between two task starts.
    pub interval: Duration,
}

impl QueueSettings {
    #[must_use]
    pub fn from_config(config: &CharlaConfig) -> Self {
        Self {
            concurrency: config.queue.concurrency,
            interval: Duration::from_millis(config.queue.interval_ms),
        }
    }
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            concurrency: 1,
            interval: Duration::from_millis(500),
        }
    }
}

/// Single global admission queue.
pub struct TaskQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<Admitted>>>,
}

impl TaskQueue {
    #[must_use]
    pub fn new(settings: QueueSettings) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_queue(rx, settings));
        Self {
            tx: Mutex::new(Some(tx)),
        }
    }

    /// Admit a task tagged with its session key. After [`TaskQueue::close`]
    /// the task is dropped with a log line.
    pub fn enqueue(&self, session: &str, task: Task) {
        let guard = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(tx) => {
                if tx
                    .send(Admitted {
                        session: session.to_string(),
                        task,
                    })
                    .is_err()
                {
                    warn!(session, "queue worker gone, dropping task");
                }
            },
            None => warn!(session, "queue closed, dropping task"),
        }
    }

    /// Stop admitting. Tasks already admitted still run to completion and
    /// the worker exits once the backlog drains.
    pub fn close(&self) {
        self.tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

async fn run_queue(mut rx: mpsc::UnboundedReceiver<Admitted>, settings: QueueSettings) {
    let semaphore = Arc::new(Semaphore::new(settings.concurrency.max(1)));
    while let Some(Admitted { session, task }) = rx.recv().await {
        let permit = match Arc::clone(&semaphore).acquire_owned().await {
            Ok(permit) => permit,
            // The semaphore is never closed while the loop runs.
            Err(_) => break,
        };
        tokio::spawn(async move {
            if let Err(error) = task.await {
                error!(session, error = %error, "queued turn failed");
            }
            drop(permit);
        });
        tokio::time::sleep(settings.interval).await;
    }
    debug!("ingestion queue drained");
}
