//! Backup replication stub.
//!
//! Real replication (segment shipping, copyset placement) lives outside
//! this engine. The object manager still needs three things from it: a
//! progress tick it can pump during long replays, session priming on
//! first write, and a failure monitor with an explicit lifecycle.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

/// How often the failure monitor drains reported failures.
const MONITOR_INTERVAL: Duration = Duration::from_millis(20);

/// Tracks backup sessions and keeps replication pipelines ticking.
pub struct ReplicaManager {
    ticks: AtomicU64,
    sessions: RwLock<Vec<String>>,
    reported_failures: Mutex<Vec<String>>,
    monitor_running: Arc<AtomicBool>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ReplicaManager {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            sessions: RwLock::new(Vec::new()),
            reported_failures: Mutex::new(Vec::new()),
            monitor_running: Arc::new(AtomicBool::new(false)),
            monitor: Mutex::new(None),
        }
    }

    /// Give the replication pipeline a chance to make progress. Called
    /// periodically from long-running work (segment replay) so backup
    /// traffic is not starved.
    pub fn proceed(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of `proceed` ticks so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Open a session to each backup locator that does not have one yet.
    pub fn prime_sessions(&self, locators: &[String]) {
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        for locator in locators {
            if !sessions.contains(locator) {
                debug!(locator = %locator, "primed backup session");
                sessions.push(locator.clone());
            }
        }
    }

    /// Locators with an open session.
    pub fn primed_sessions(&self) -> Vec<String> {
        self.sessions.read().expect("session lock poisoned").clone()
    }

    /// Report a failed backup; the monitor will drop its session.
    pub fn report_failure(&self, locator: impl Into<String>) {
        self.reported_failures
            .lock()
            .expect("failure queue poisoned")
            .push(locator.into());
    }

    /// Start the background failure monitor. Idempotent.
    pub fn start_failure_monitor(self: &Arc<Self>) {
        if self.monitor_running.swap(true, Ordering::SeqCst) {
            return;
        }
        let manager = Arc::downgrade(self);
        let running = Arc::clone(&self.monitor_running);
        let handle = std::thread::spawn(move || {
            while running.load(Ordering::SeqCst) {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.drain_failures();
                drop(manager);
                std::thread::sleep(MONITOR_INTERVAL);
            }
        });
        *self.monitor.lock().expect("monitor lock poisoned") = Some(handle);
    }

    /// Stop the failure monitor and wait for it to exit. Idempotent.
    pub fn halt_failure_monitor(&self) {
        self.monitor_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.monitor.lock().expect("monitor lock poisoned").take() {
            let _ = handle.join();
        }
    }

    fn drain_failures(&self) {
        let failed: Vec<String> = {
            let mut queue = self.reported_failures.lock().expect("failure queue poisoned");
            std::mem::take(&mut *queue)
        };
        if failed.is_empty() {
            return;
        }
        let mut sessions = self.sessions.write().expect("session lock poisoned");
        for locator in failed {
            warn!(locator = %locator, "dropping session to failed backup");
            sessions.retain(|s| s != &locator);
        }
    }
}

impl Default for ReplicaManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proceed_counts_ticks() {
        let replica = ReplicaManager::new();
        replica.proceed();
        replica.proceed();
        assert_eq!(replica.ticks(), 2);
    }

    #[test]
    fn prime_sessions_is_idempotent() {
        let replica = ReplicaManager::new();
        let locators = vec!["backup-1".to_string(), "backup-2".to_string()];
        replica.prime_sessions(&locators);
        replica.prime_sessions(&locators);
        assert_eq!(replica.primed_sessions().len(), 2);
    }

    #[test]
    fn monitor_drops_failed_sessions() {
        let replica = Arc::new(ReplicaManager::new());
        replica.prime_sessions(&["backup-1".to_string(), "backup-2".to_string()]);
        replica.start_failure_monitor();

        replica.report_failure("backup-1");
        // Wait for the monitor to drain the report.
        for _ in 0..100 {
            if replica.primed_sessions().len() == 1 {
                break;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(replica.primed_sessions(), vec!["backup-2".to_string()]);

        replica.halt_failure_monitor();
    }
}
