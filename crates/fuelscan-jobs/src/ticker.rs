//! Periodic trigger that drives the scheduler.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use fuelscan_core::defaults::{EVENT_BUS_CAPACITY, RUNS_PER_TICK, TICK_INTERVAL_MS};
use fuelscan_core::{Error, Result};

use crate::scheduler::{RunOutcome, Scheduler};

/// Configuration for the queue ticker.
#[derive(Debug, Clone)]
pub struct TickerConfig {
    /// Whether the ticker runs at all.
    pub enabled: bool,
    /// Sleep between ticks when the queue is idle, in milliseconds.
    pub tick_interval_ms: u64,
    /// Concurrent `run_once` calls per tick.
    pub runs_per_tick: usize,
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_ms: TICK_INTERVAL_MS,
            runs_per_tick: RUNS_PER_TICK,
        }
    }
}

impl TickerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `QUEUE_TICKER_ENABLED` | `true` | Enable/disable the in-process trigger |
    /// | `QUEUE_TICK_INTERVAL_MS` | `60000` | Sleep between ticks when idle |
    /// | `QUEUE_RUNS_PER_TICK` | `1` | Concurrent runs per tick |
    pub fn from_env() -> Self {
        let enabled = std::env::var("QUEUE_TICKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let tick_interval_ms = std::env::var("QUEUE_TICK_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(TICK_INTERVAL_MS);

        let runs_per_tick = std::env::var("QUEUE_RUNS_PER_TICK")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(RUNS_PER_TICK)
            .max(1);

        Self {
            enabled,
            tick_interval_ms,
            runs_per_tick,
        }
    }

    pub fn with_tick_interval(mut self, ms: u64) -> Self {
        self.tick_interval_ms = ms;
        self
    }

    pub fn with_runs_per_tick(mut self, runs: usize) -> Self {
        self.runs_per_tick = runs.max(1);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Event emitted by the queue ticker.
#[derive(Debug, Clone)]
pub enum TickerEvent {
    TickerStarted,
    JobProcessed {
        job_id: Uuid,
        element_number: String,
        row_count: usize,
    },
    JobFailed {
        job_id: Uuid,
        error: String,
        attempts: i32,
        terminal: bool,
    },
    /// A run aborted on a store error.
    RunAborted { error: String },
    TickerStopped,
}

/// Handle for controlling a running ticker.
pub struct TickerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<TickerEvent>,
    task: JoinHandle<()>,
}

impl TickerHandle {
    /// Signal the ticker to stop after the current tick.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        Ok(())
    }

    /// Get a receiver for ticker events.
    pub fn events(&self) -> broadcast::Receiver<TickerEvent> {
        self.event_rx.resubscribe()
    }

    /// Signal shutdown and wait until the in-flight tick has recorded every
    /// outcome, so no claimed job is abandoned mid-run.
    pub async fn stop(self) {
        // A disabled ticker has already exited and dropped its receiver.
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = ?e, "Queue ticker task panicked");
        }
    }
}

/// In-process equivalent of a scheduled trigger calling `run_once`.
pub struct QueueTicker {
    scheduler: Scheduler,
    config: TickerConfig,
    event_tx: broadcast::Sender<TickerEvent>,
}

impl QueueTicker {
    pub fn new(scheduler: Scheduler, config: TickerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            scheduler,
            config,
            event_tx,
        }
    }

    /// Start the ticker and return a handle for control.
    pub fn start(self) -> TickerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        TickerHandle {
            shutdown_tx,
            event_rx,
            task,
        }
    }

    /// Tick until shutdown. Ticks back-to-back while runs find work and
    /// sleeps for the interval once a tick handles nothing.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Queue ticker is disabled, not starting");
            return;
        }

        info!(
            subsystem = "jobs",
            component = "ticker",
            tick_interval_ms = self.config.tick_interval_ms,
            runs_per_tick = self.config.runs_per_tick,
            "Queue ticker started"
        );
        let _ = self.event_tx.send(TickerEvent::TickerStarted);

        let interval = Duration::from_millis(self.config.tick_interval_ms);

        loop {
            if shutdown_rx.try_recv().is_ok() {
                info!("Queue ticker received shutdown signal");
                break;
            }

            let handled = self.tick().await;
            if handled == 0 {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Queue ticker received shutdown signal");
                        break;
                    }
                    _ = sleep(interval) => {}
                }
            } else {
                debug!(handled, "Tick handled jobs, ticking again");
            }
        }

        let _ = self.event_tx.send(TickerEvent::TickerStopped);
        info!("Queue ticker stopped");
    }

    /// Fire `runs_per_tick` concurrent runs and wait for all of them.
    /// Returns how many runs claimed a job.
    pub async fn tick(&self) -> usize {
        let mut runs = JoinSet::new();
        for _ in 0..self.config.runs_per_tick {
            let scheduler = self.scheduler.clone();
            runs.spawn(async move { scheduler.run_once().await });
        }

        let mut handled = 0;
        while let Some(joined) = runs.join_next().await {
            let event = match joined {
                Ok(Ok(RunOutcome::NoJob)) => continue,
                Ok(Ok(RunOutcome::Processed {
                    job_id,
                    element_number,
                    row_count,
                })) => {
                    handled += 1;
                    TickerEvent::JobProcessed {
                        job_id,
                        element_number,
                        row_count,
                    }
                }
                Ok(Ok(RunOutcome::Failed {
                    job_id,
                    error,
                    attempts,
                    terminal,
                    ..
                })) => {
                    handled += 1;
                    TickerEvent::JobFailed {
                        job_id,
                        error: error.to_string(),
                        attempts,
                        terminal,
                    }
                }
                Ok(Err(e)) => TickerEvent::RunAborted {
                    error: e.to_string(),
                },
                Err(e) => {
                    error!(error = ?e, "Scheduler run panicked");
                    continue;
                }
            };
            let _ = self.event_tx.send(event);
        }
        handled
    }

    /// Get a receiver for ticker events.
    pub fn events(&self) -> broadcast::Receiver<TickerEvent> {
        self.event_tx.subscribe()
    }
}
