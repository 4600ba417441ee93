// Auto-save scheduler - unattended persistence of draft dashboards with backoff
use crate::application::session::SessionStore;
use std::sync::Weak;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_BACKOFF: [Duration; 3] = [
    Duration::from_secs(5),
    Duration::from_secs(10),
    Duration::from_secs(20),
];
pub const DEFAULT_MAX_FAILURES: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoSaveStatus {
    #[default]
    Idle,
    Saving,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSavePolicy {
    pub interval: Duration,
    pub backoff: Vec<Duration>,
    pub max_failures: u32,
}

impl Default for AutoSavePolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            backoff: DEFAULT_BACKOFF.to_vec(),
            max_failures: DEFAULT_MAX_FAILURES,
        }
    }
}

impl AutoSavePolicy {
    /// Delay before the next attempt after `failures` consecutive failures.
    /// The ladder is capped at its last entry.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let index = (failures as usize - 1).min(self.backoff.len().saturating_sub(1));
        self.backoff.get(index).copied().unwrap_or(self.interval)
    }

    /// Like `backoff_delay`, but `None` once the retry cap is reached
    pub fn next_delay(&self, failures: u32) -> Option<Duration> {
        if failures >= self.max_failures {
            return None;
        }
        Some(self.backoff_delay(failures))
    }

    pub fn has_given_up(&self, failures: u32) -> bool {
        failures >= self.max_failures
    }

    /// Human-readable status line, `None` when there is nothing to report
    pub fn status_message(&self, status: AutoSaveStatus, failures: u32) -> Option<&'static str> {
        match status {
            AutoSaveStatus::Idle => None,
            AutoSaveStatus::Saving => Some("Saving..."),
            AutoSaveStatus::Error if self.has_given_up(failures) => {
                Some("Unable to save. Please check your connection.")
            }
            AutoSaveStatus::Error => Some("Changes not saved. Retrying..."),
        }
    }
}

/// Drive auto-save for a shared session until the session is dropped.
///
/// The timer is re-armed whenever the session's revision changes, so the
/// interval always counts from the latest edit.
pub fn spawn_auto_save(session: Weak<Mutex<SessionStore>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut changes = match session.upgrade() {
            Some(store) => store.lock().await.subscribe(),
            None => return,
        };

        loop {
            let (delay, revision) = {
                let Some(store) = session.upgrade() else { break };
                let store = store.lock().await;
                let _ = changes.borrow_and_update();
                (store.auto_save_delay(), store.revision())
            };

            let Some(delay) = delay else {
                if changes.changed().await.is_err() {
                    break;
                }
                continue;
            };

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let Some(store) = session.upgrade() else { break };
                    let mut store = store.lock().await;
                    if store.revision() == revision {
                        // Failures are recorded on the store and drive the next delay.
                        let _ = store.auto_save().await;
                    }
                }
                changed = changes.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("auto-save driver stopped");
    })
}
