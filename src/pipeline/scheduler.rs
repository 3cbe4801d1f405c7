// src/pipeline/scheduler.rs

//! Periodic job runner.
//!
//! A timer task pushes triggers into a one-slot queue and a single worker
//! drains it, so runs never overlap. While a run is in flight one trigger can
//! wait in the queue; any further ticks are coalesced into it.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::error::{AppError, Result};

/// Work the scheduler can run.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Run once. Failures are the job's to report.
    async fn execute(&self);
}

/// Fixed-interval scheduler.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(AppError::config("scheduler interval must be > 0"));
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `job` now, then once per interval until stopped.
    pub fn start(&self, job: Arc<dyn Job>) -> SchedulerHandle {
        let (sender, mut receiver) = mpsc::channel::<()>(1);
        let interval = self.interval;
        let name = job.name();

        let timer = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match sender.try_send(()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(())) => {
                        log::debug!("Job '{}' still busy, coalescing trigger", name);
                    }
                    Err(TrySendError::Closed(())) => break,
                }
            }
        });

        let worker = tokio::spawn(async move {
            log::info!(
                "Job '{}' scheduled every {}s",
                name,
                interval.as_secs_f64()
            );
            while receiver.recv().await.is_some() {
                log::debug!("Job '{}' starting", name);
                job.execute().await;
            }
            log::info!("Job '{}' stopped", name);
        });

        SchedulerHandle {
            name,
            timer,
            worker,
        }
    }
}

/// Running scheduler tasks.
pub struct SchedulerHandle {
    name: &'static str,
    timer: JoinHandle<()>,
    worker: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Wait for the worker. Only returns if the worker dies, which is an error
    /// when a job panicked.
    pub async fn wait(self) -> Result<()> {
        let outcome = self.worker.await;
        self.timer.abort();
        match outcome {
            Ok(()) => Ok(()),
            Err(e) => {
                log::error!("Job '{}' worker stopped: {}", self.name, e);
                Err(AppError::JobPanicked {
                    job: self.name,
                    message: e.to_string(),
                })
            }
        }
    }

    /// Stop triggering new runs. A run already in progress is aborted too.
    pub fn stop(self) {
        self.timer.abort();
        self.worker.abort();
    }
}
