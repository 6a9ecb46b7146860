//! Measurement triggers
//!
//! A flag trigger fires once per marker file; the file is removed before the
//! cycle runs. An interval trigger fires on a fixed tick.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, warn};

/// Default marker file requesting one measurement
pub const DEFAULT_FLAG_PATH: &str = "/tmp/do_measure.flag";

fn default_flag_path() -> PathBuf {
    PathBuf::from(DEFAULT_FLAG_PATH)
}

fn default_poll_ms() -> u64 {
    1000
}

fn default_period_ms() -> u64 {
    1000
}

/// How the engine decides when to measure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum TriggerPolicy {
    /// On demand: one cycle per marker file
    Flag {
        #[serde(default = "default_flag_path")]
        path: PathBuf,
        /// How often to look for the file
        #[serde(default = "default_poll_ms")]
        poll_ms: u64,
    },
    /// Continuous monitoring on a fixed tick
    Interval {
        #[serde(default = "default_period_ms")]
        period_ms: u64,
    },
}

impl Default for TriggerPolicy {
    fn default() -> Self {
        TriggerPolicy::Flag {
            path: default_flag_path(),
            poll_ms: default_poll_ms(),
        }
    }
}

impl TriggerPolicy {
    pub fn interval() -> Self {
        TriggerPolicy::Interval {
            period_ms: default_period_ms(),
        }
    }

    /// Whether this is the continuous-monitoring variant
    pub fn is_continuous(&self) -> bool {
        matches!(self, TriggerPolicy::Interval { .. })
    }
}

/// Live trigger built from a [`TriggerPolicy`]
#[derive(Debug)]
pub struct Trigger {
    kind: TriggerKind,
}

#[derive(Debug)]
enum TriggerKind {
    Flag { path: PathBuf, poll: Duration },
    // Interval is created on first use so a runtime is only needed then
    Interval { period: Duration, ticker: Option<Interval> },
}

impl Trigger {
    pub fn new(policy: &TriggerPolicy) -> Self {
        let kind = match policy {
            TriggerPolicy::Flag { path, poll_ms } => TriggerKind::Flag {
                path: path.clone(),
                poll: Duration::from_millis(*poll_ms),
            },
            TriggerPolicy::Interval { period_ms } => TriggerKind::Interval {
                period: Duration::from_millis((*period_ms).max(1)),
                ticker: None,
            },
        };
        Self { kind }
    }

    pub fn is_continuous(&self) -> bool {
        matches!(self.kind, TriggerKind::Interval { .. })
    }

    /// Check once whether a cycle should run now
    ///
    /// For a flag trigger this consumes the flag if present and never
    /// sleeps. For an interval trigger it waits for the next tick.
    pub async fn poll(&mut self) -> bool {
        match &mut self.kind {
            TriggerKind::Flag { path, .. } => consume_flag(path),
            TriggerKind::Interval { period, ticker } => {
                let period = *period;
                ticker
                    .get_or_insert_with(|| {
                        let mut interval = time::interval(period);
                        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        interval
                    })
                    .tick()
                    .await;
                true
            }
        }
    }

    /// Wait until a cycle should run
    pub async fn wait(&mut self) {
        loop {
            if self.poll().await {
                return;
            }
            if let TriggerKind::Flag { poll, .. } = &self.kind {
                time::sleep(*poll).await;
            }
        }
    }
}

/// Remove the flag file if it exists
///
/// Returns `true` when this call removed it. Removing instead of checking
/// first means a flag can only ever start one cycle.
pub fn consume_flag(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Consumed trigger flag {}", path.display());
            true
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!("Cannot remove trigger flag {}: {}", path.display(), e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flag_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ws-trigger-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_default_policy_is_flag() {
        let policy = TriggerPolicy::default();
        assert_eq!(
            policy,
            TriggerPolicy::Flag {
                path: PathBuf::from("/tmp/do_measure.flag"),
                poll_ms: 1000,
            }
        );
        assert!(!policy.is_continuous());
    }

    #[test]
    fn test_policy_serde() {
        let policy: TriggerPolicy = serde_json::from_str(r#"{"mode":"interval"}"#).unwrap();
        assert_eq!(policy, TriggerPolicy::Interval { period_ms: 1000 });

        let policy: TriggerPolicy =
            serde_json::from_str(r#"{"mode":"flag","path":"/run/measure"}"#).unwrap();
        assert_eq!(
            policy,
            TriggerPolicy::Flag {
                path: PathBuf::from("/run/measure"),
                poll_ms: 1000,
            }
        );

        assert!(serde_json::from_str::<TriggerPolicy>(r#"{"mode":"cron"}"#).is_err());
    }

    #[tokio::test]
    async fn test_flag_consumed_once() {
        let path = flag_path("once");
        std::fs::write(&path, b"").unwrap();

        let mut trigger = Trigger::new(&TriggerPolicy::Flag {
            path: path.clone(),
            poll_ms: 10,
        });
        assert!(trigger.poll().await);
        assert!(!path.exists());
        assert!(!trigger.poll().await);
    }

    #[test]
    fn test_absent_flag() {
        let path = flag_path("absent");
        assert!(!consume_flag(&path));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_picks_up_late_flag() {
        let path = flag_path("late");
        let mut trigger = Trigger::new(&TriggerPolicy::Flag {
            path: path.clone(),
            poll_ms: 1000,
        });

        let writer = {
            let path = path.clone();
            tokio::spawn(async move {
                time::sleep(Duration::from_millis(2500)).await;
                std::fs::write(&path, b"").unwrap();
            })
        };

        trigger.wait().await;
        writer.await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks() {
        let mut trigger = Trigger::new(&TriggerPolicy::Interval { period_ms: 1000 });
        assert!(trigger.is_continuous());

        let start = time::Instant::now();
        trigger.wait().await;
        trigger.wait().await;
        trigger.wait().await;
        // first tick is immediate
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }
}
