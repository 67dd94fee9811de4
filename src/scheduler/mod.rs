//! Fixed-interval driver for ingestion cycles.
//!
//! Cycles run one at a time: the next tick is only awaited after the current
//! cycle has finished, and a [`CancelToken`] stops the loop between cycles or
//! aborts the fetch in flight.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::app::{CancelToken, GatorError, Result};
use crate::ingest::Aggregator;
use crate::store::FeedGateway;

/// Delay between ingestion cycles, written as `<integer><unit>` with unit
/// `s`, `m` or `h` (for example `30s`, `1m`, `6h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval(Duration);

impl PollInterval {
    pub fn as_duration(&self) -> Duration {
        self.0
    }

    pub fn from_secs(secs: u64) -> Result<Self> {
        if secs == 0 {
            return Err(GatorError::InvalidInterval(format!("{secs}s")));
        }
        Ok(Self(Duration::from_secs(secs)))
    }
}

impl FromStr for PollInterval {
    type Err = GatorError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || GatorError::InvalidInterval(s.to_string());
        let trimmed = s.trim();

        let split = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (magnitude, unit) = trimmed.split_at(split);

        if magnitude.is_empty() {
            return Err(invalid());
        }

        let multiplier: u64 = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3600,
            _ => return Err(invalid()),
        };

        let secs = magnitude
            .parse::<u64>()
            .ok()
            .and_then(|n| n.checked_mul(multiplier))
            .ok_or_else(invalid)?;

        Self::from_secs(secs).map_err(|_| invalid())
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.0.as_secs();
        if secs >= 3600 && secs % 3600 == 0 {
            write!(f, "{}h", secs / 3600)
        } else if secs >= 60 && secs % 60 == 0 {
            write!(f, "{}m", secs / 60)
        } else {
            write!(f, "{}s", secs)
        }
    }
}

pub struct Scheduler<G> {
    aggregator: Aggregator<G>,
    interval: PollInterval,
}

impl<G: FeedGateway> Scheduler<G> {
    pub fn new(aggregator: Aggregator<G>, interval: PollInterval) -> Self {
        Self {
            aggregator,
            interval,
        }
    }

    pub fn interval(&self) -> PollInterval {
        self.interval
    }

    /// Run cycles until `cancel` fires. The first cycle starts immediately.
    ///
    /// Returns the number of cycles started.
    pub async fn run(&self, cancel: &CancelToken) -> usize {
        tracing::info!("Collecting feeds every {}", self.interval);

        let mut timer = interval(self.interval.as_duration());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut cycles = 0;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = timer.tick() => {}
            }

            cycles += 1;
            tracing::info!("Starting ingestion cycle {}", cycles);
            self.aggregator.tick(cancel).await;

            if cancel.is_cancelled() {
                break;
            }
        }

        tracing::info!("Scheduler stopped after {} cycles", cycles);
        cycles
    }
}

/// Cancel `cancel` on Ctrl-C, or SIGTERM on unix.
pub fn cancel_on_shutdown_signal(cancel: CancelToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = sigterm.recv() => {},
                        _ = tokio::signal::ctrl_c() => {},
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to set up SIGTERM handler: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Shutdown signal received");
        cancel.cancel();
    });
}
