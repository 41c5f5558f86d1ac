//! Periodic background trigger
//!
//! Stands in for the platform alarm: after an initial short delay it fires
//! a silent cycle at a fixed interval until stopped. A cooldown check
//! suppresses ticks that land right after another cycle completed (for
//! example a manual refresh the moment before the alarm fired).

use log::{debug, info};
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, Sender, channel};
use std::thread::JoinHandle;
use std::time::Duration;

use super::cycle::{Orchestrator, Trigger};

/// Check whether enough time has passed since the last completed cycle to
/// let a periodic tick run.
///
/// `None` means no cycle has completed yet, so the tick always runs.
pub fn cooldown_elapsed(since_last_cycle: Option<Duration>, cooldown: Duration) -> bool {
    match since_last_cycle {
        Some(elapsed) => elapsed >= cooldown,
        None => true,
    }
}

/// Handle for the background alarm thread; stops on drop
pub struct Scheduler {
    shutdown: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Start the periodic trigger.
    ///
    /// Each tick runs a silent ([`Trigger::Alarm`]) cycle unless a cycle
    /// completed within `cooldown` already.
    pub fn start(
        orchestrator: Arc<Orchestrator>,
        initial_delay: Duration,
        interval: Duration,
        cooldown: Duration,
    ) -> Self {
        let (shutdown, ticks) = channel();

        let handle = std::thread::spawn(move || {
            info!(
                "Alarm scheduler started: first tick in {:?}, then every {:?}",
                initial_delay, interval
            );

            let mut wait = initial_delay;
            loop {
                match ticks.recv_timeout(wait) {
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!("Alarm scheduler stopping");
                        return;
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                }

                if cooldown_elapsed(orchestrator.since_last_cycle(), cooldown) {
                    orchestrator.run_cycle(Trigger::Alarm);
                } else {
                    debug!("Skipping alarm tick: previous cycle completed within cooldown");
                }
                wait = interval;
            }
        });

        Self {
            shutdown,
            handle: Some(handle),
        }
    }

    /// Stop the scheduler and wait for the thread to exit
    pub fn stop(self) {
        drop(self);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_elapsed_never_ran() {
        assert!(cooldown_elapsed(None, Duration::from_secs(60)));
        assert!(cooldown_elapsed(None, Duration::ZERO));
    }

    #[test]
    fn test_cooldown_elapsed_recent_cycle() {
        assert!(!cooldown_elapsed(
            Some(Duration::from_secs(10)),
            Duration::from_secs(60)
        ));
    }

    #[test]
    fn test_cooldown_elapsed_old_cycle() {
        assert!(cooldown_elapsed(
            Some(Duration::from_secs(90)),
            Duration::from_secs(60)
        ));
        // Exactly at the boundary counts as elapsed
        assert!(cooldown_elapsed(
            Some(Duration::from_secs(60)),
            Duration::from_secs(60)
        ));
    }
}
