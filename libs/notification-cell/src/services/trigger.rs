use chrono::{Days, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{debug, error, info};

use crate::services::dispatcher::NotificationDispatchService;
use crate::services::sweeper::RetentionSweeperService;

#[derive(Debug, Clone)]
pub struct TriggerConfig {
    pub dispatch_interval: Duration,
    pub sweep_interval: Duration,
    /// When set, the first sweep waits for the next UTC midnight instead of
    /// one full interval from startup.
    pub align_sweep_to_midnight: bool,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            dispatch_interval: Duration::from_secs(5 * 60),
            sweep_interval: Duration::from_secs(24 * 60 * 60),
            align_sweep_to_midnight: true,
        }
    }
}

/// Runs the dispatch worker and the retention sweeper on independent fixed
/// periods, decoupled from request handling. The two loops never delay each
/// other, and a failing invocation is logged and absorbed; it cannot stop
/// future ticks.
pub struct PeriodicTriggerService {
    dispatcher: Arc<NotificationDispatchService>,
    sweeper: Arc<RetentionSweeperService>,
    config: TriggerConfig,
    shutdown_tx: watch::Sender<bool>,
}

impl PeriodicTriggerService {
    pub fn new(
        dispatcher: Arc<NotificationDispatchService>,
        sweeper: Arc<RetentionSweeperService>,
        config: TriggerConfig,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            dispatcher,
            sweeper,
            config,
            shutdown_tx,
        }
    }

    /// Spawn both periodic loops. The returned handles complete after
    /// `stop`, once any in-flight invocation has run out.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        info!(
            "Starting periodic triggers: dispatch every {}s, sweep every {}s",
            self.config.dispatch_interval.as_secs(),
            self.config.sweep_interval.as_secs()
        );

        let dispatch_handle = {
            let dispatcher = Arc::clone(&self.dispatcher);
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            let period = self.config.dispatch_interval;

            tokio::spawn(async move {
                // First fire one full period after startup, like a cron slot
                let mut ticker = interval_at(Instant::now() + period, period);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                            debug!("Processing notification queue");
                            if let Err(e) = dispatcher.process_queue().await {
                                error!("Notification dispatch tick failed: {}", e);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            debug!("Dispatch trigger stopped");
                            break;
                        }
                    }
                }
            })
        };

        let sweep_handle = {
            let sweeper = Arc::clone(&self.sweeper);
            let mut shutdown_rx = self.shutdown_tx.subscribe();
            let period = self.config.sweep_interval;
            let initial_delay = if self.config.align_sweep_to_midnight {
                duration_until_next_midnight()
            } else {
                period
            };

            tokio::spawn(async move {
                let mut ticker = interval_at(Instant::now() + initial_delay, period);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if *shutdown_rx.borrow() {
                                break;
                            }
                            debug!("Sweeping old notifications");
                            if let Err(e) = sweeper.sweep().await {
                                error!("Retention sweep failed: {}", e);
                            }
                        }
                        _ = shutdown_rx.changed() => {
                            debug!("Sweep trigger stopped");
                            break;
                        }
                    }
                }
            })
        };

        vec![dispatch_handle, sweep_handle]
    }

    /// Halt both periodic actions. No invocation starts after this returns;
    /// an invocation already in flight runs to completion.
    pub fn stop(&self) {
        info!("Stopping periodic triggers");
        let _ = self.shutdown_tx.send(true);
    }
}

fn duration_until_next_midnight() -> Duration {
    let now = Utc::now();
    let next_midnight = (now.date_naive() + Days::new(1))
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc();

    (next_midnight - now).to_std().unwrap_or(Duration::ZERO)
}
