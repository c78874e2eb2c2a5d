//! Periodic orphan sweeps on a background thread.
//!
//! Supports a manual trigger via broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::pipeline::{OcrPipeline, PipelineError};

use super::{OrphanReclaimer, ReclaimReport};

/// One sweep, as run by the scheduler.
#[async_trait]
pub trait ReclaimTask: Send + Sync {
    async fn run_sweep(&self) -> Result<ReclaimReport, PipelineError>;
}

/// Sweep and restart every reset document.
#[async_trait]
impl ReclaimTask for OcrPipeline {
    async fn run_sweep(&self) -> Result<ReclaimReport, PipelineError> {
        self.reclaim_orphans().await
    }
}

/// Sweep only; reset documents wait for the next caller to start them.
#[async_trait]
impl ReclaimTask for OrphanReclaimer {
    async fn run_sweep(&self) -> Result<ReclaimReport, PipelineError> {
        Ok(self.reclaim_orphans().await?)
    }
}

pub struct ReclaimScheduler {
    task: Arc<dyn ReclaimTask>,
    interval: Duration,
    shutdown: Arc<AtomicBool>,
}

impl ReclaimScheduler {
    pub fn new(task: Arc<dyn ReclaimTask>, interval: Duration) -> Self {
        Self {
            task,
            interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Starts the sweep loop in a background thread. The first sweep runs
    /// one interval after start, or on the first trigger.
    pub fn start(&self, mut trigger_rx: broadcast::Receiver<()>) -> JoinHandle<()> {
        let task = Arc::clone(&self.task);
        let shutdown = Arc::clone(&self.shutdown);
        let interval = self.interval;

        std::thread::spawn(move || {
            let rt = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(rt) => rt,
                Err(e) => {
                    tracing::error!("Failed to start reclaim scheduler runtime: {}", e);
                    return;
                }
            };

            rt.block_on(async {
                let mut interval_timer = tokio::time::interval(interval);
                interval_timer.tick().await; // skip immediate first tick

                loop {
                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    tokio::select! {
                        _ = interval_timer.tick() => {},
                        Ok(()) = trigger_rx.recv() => {
                            tracing::info!("Manual orphan sweep triggered");
                        },
                    }

                    if shutdown.load(Ordering::Acquire) {
                        break;
                    }

                    match task.run_sweep().await {
                        Ok(report) if report.reset + report.failed > 0 => {
                            tracing::info!(
                                reset = report.reset,
                                failed = report.failed,
                                "Orphan sweep reclaimed documents"
                            );
                        }
                        Err(e) => tracing::error!("Orphan sweep failed: {}", e),
                        _ => {}
                    }
                }
            });
        })
    }

    /// Signals the scheduler to stop.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
    }
}
