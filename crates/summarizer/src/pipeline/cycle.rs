//! The pipeline cycle
//!
//! One cycle runs token acquisition, unread listing, dedup filtering,
//! concurrent detail fetching, batch summarisation, and persistence, in
//! that order. Cycles are serialized by an internal mutex; every exit
//! path, including panics, publishes a completion event.

use log::{error, info, warn};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::events::{EventBus, PipelineEvent};
use crate::auth::TokenProvider;
use crate::backend::SummarizeClient;
use crate::error::PipelineError;
use crate::gmail::GmailClient;
use crate::models::{MessageId, SummaryResult};
use crate::storage::{DedupLedger, PreferenceStore, SessionStore};

/// What started a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// User-initiated login or refresh; may prompt for authorization
    Manual,
    /// Periodic background wake-up; must never prompt
    Alarm,
}

impl Trigger {
    fn interactive(self) -> bool {
        matches!(self, Trigger::Manual)
    }
}

/// Counters from one completed cycle
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CycleStats {
    /// Unread IDs reported by the provider
    pub listed: usize,
    /// IDs skipped because the ledger already had them
    pub already_summarized: usize,
    /// New summaries produced this cycle
    pub summarized: usize,
    /// Size of the session list after persisting
    pub total_stored: usize,
    /// Duration of the cycle
    pub duration_ms: u64,
}

/// Terminal state of one cycle, carried in the completion event
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// The cycle ran to the end; stats describe what it did
    Completed(CycleStats),
    /// Silent cycle found no cached credential; nothing was touched
    NoCredentials,
    /// The user declined the authorization prompt; nothing was touched
    Cancelled,
    /// A stage failed; stored summaries were cleared where required
    Failed { message: String },
}

/// Publishes the completion event when dropped.
///
/// Constructed before the first stage runs so that success, every failure
/// branch, and even a panic inside a stage all end in a notification.
struct CompletionGuard<'a> {
    events: &'a EventBus,
    outcome: Option<CycleOutcome>,
}

impl<'a> CompletionGuard<'a> {
    fn new(events: &'a EventBus) -> Self {
        Self {
            events,
            outcome: None,
        }
    }

    fn finish(mut self, outcome: CycleOutcome) {
        self.outcome = Some(outcome);
    }
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        let outcome = self.outcome.take().unwrap_or(CycleOutcome::Failed {
            message: "cycle aborted before completion".into(),
        });
        self.events.publish(PipelineEvent::CycleCompleted { outcome });
    }
}

/// Coordinates one summarisation cycle end to end
pub struct Orchestrator {
    tokens: Arc<dyn TokenProvider>,
    gmail: GmailClient,
    backend: SummarizeClient,
    session: Arc<dyn SessionStore>,
    ledger: Arc<dyn DedupLedger>,
    prefs: Arc<dyn PreferenceStore>,
    events: EventBus,
    /// Serializes cycles: overlapping triggers queue up instead of racing
    /// on the session store.
    cycle_lock: Mutex<()>,
    last_completed: Mutex<Option<Instant>>,
}

impl Orchestrator {
    pub fn new(
        tokens: Arc<dyn TokenProvider>,
        gmail: GmailClient,
        backend: SummarizeClient,
        session: Arc<dyn SessionStore>,
        ledger: Arc<dyn DedupLedger>,
        prefs: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            tokens,
            gmail,
            backend,
            session,
            ledger,
            prefs,
            events: EventBus::new(),
            cycle_lock: Mutex::new(()),
            last_completed: Mutex::new(None),
        }
    }

    /// Event surface for presentation layers
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Time since the last cycle finished, if one ever did
    pub fn since_last_cycle(&self) -> Option<Duration> {
        self.last_completed.lock().unwrap().map(|at| at.elapsed())
    }

    /// Run one full cycle.
    ///
    /// All stage errors are caught here and translated into an outcome;
    /// a completion event fires on every path.
    pub fn run_cycle(&self, trigger: Trigger) -> CycleOutcome {
        // A panicking stage poisons this lock; recover it so later
        // cycles still run.
        let _serial = self
            .cycle_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        info!("Pipeline cycle starting ({trigger:?})");

        let guard = CompletionGuard::new(&self.events);
        let outcome = match self.execute(trigger) {
            Ok(outcome) => outcome,
            Err(err) => self.handle_failure(err),
        };
        guard.finish(outcome.clone());

        *self.last_completed.lock().unwrap() = Some(Instant::now());
        info!("Pipeline cycle finished: {outcome:?}");
        outcome
    }

    fn execute(&self, trigger: Trigger) -> Result<CycleOutcome, PipelineError> {
        let start = Instant::now();
        let prefs = self.prefs.preferences()?;

        let token = match self.tokens.acquire(trigger.interactive()) {
            Ok(Some(token)) => token,
            Ok(None) => {
                info!("No cached credential; skipping silent cycle");
                return Ok(CycleOutcome::NoCredentials);
            }
            Err(PipelineError::AuthCancelled) => {
                warn!("User declined the authorization prompt");
                return Ok(CycleOutcome::Cancelled);
            }
            // Auth plumbing failures leave displayed summaries alone: the
            // user saw no prompt and no stale data was produced.
            Err(err) => {
                error!("Token acquisition failed: {err}");
                return Ok(CycleOutcome::Failed {
                    message: err.to_string(),
                });
            }
        };

        let listed = self.gmail.list_unread(&token, prefs.max_emails)?;
        let fresh = self.ledger.filter_new(&listed)?;

        let mut stats = CycleStats {
            listed: listed.len(),
            already_summarized: listed.len() - fresh.len(),
            ..CycleStats::default()
        };

        if fresh.is_empty() {
            info!("No new unread messages to summarize");
            stats.total_stored = self.persist(Vec::new(), &[])?;
            stats.duration_ms = start.elapsed().as_millis() as u64;
            return Ok(CycleOutcome::Completed(stats));
        }

        let details = self.gmail.fetch_details(&token, &fresh)?;
        let results = self.backend.summarize(&details)?;
        stats.summarized = results.len();

        stats.total_stored = self.persist(results, &fresh)?;
        stats.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Cycle summarized {} message(s), {} stored in session",
            stats.summarized, stats.total_stored
        );
        Ok(CycleOutcome::Completed(stats))
    }

    /// Merge new results into the session (newest first), record their IDs
    /// in the ledger, and refresh the badge. Returns the stored total.
    ///
    /// With an empty delta this preserves an existing list, or stores an
    /// empty one so consumers can tell "inbox zero" from "never fetched".
    fn persist(
        &self,
        new_results: Vec<SummaryResult>,
        new_ids: &[MessageId],
    ) -> Result<usize, PipelineError> {
        let mut merged = new_results;
        if let Some(existing) = self.session.summaries()? {
            merged.extend(existing);
        }
        let total = merged.len();

        self.session.set_summaries(merged)?;
        if !new_ids.is_empty() {
            self.ledger.record(new_ids)?;
        }
        self.session
            .set_badge(if total == 0 { None } else { Some(total) })?;
        Ok(total)
    }

    /// Boundary translation for stage failures: log, clear stale session
    /// state where the policy demands it, and report the outcome.
    fn handle_failure(&self, err: PipelineError) -> CycleOutcome {
        error!("Pipeline cycle failed: {err}");
        if err.clears_session() {
            if let Err(store_err) = self.session.clear() {
                error!("Failed to clear session state after cycle error: {store_err}");
            }
        }
        CycleOutcome::Failed {
            message: err.to_string(),
        }
    }

    /// Summarize one externally supplied message for a direct requester.
    ///
    /// Bypasses listing, dedup and the session store entirely; the result
    /// (or the error) is both returned and published as a single-summary
    /// event, because a requester is waiting on the other end.
    pub fn summarize_single(&self, id: &MessageId) -> Result<SummaryResult, PipelineError> {
        info!("Single-message summarisation requested for {id}");
        let result = self.summarize_single_inner(id);
        match &result {
            Ok(summary) => self.events.publish(PipelineEvent::SingleSummaryReady {
                id: id.clone(),
                result: summary.clone(),
            }),
            Err(err) => {
                warn!("Single-message summarisation for {id} failed: {err}");
                self.events.publish(PipelineEvent::SingleSummaryFailed {
                    id: id.clone(),
                    message: err.to_string(),
                });
            }
        }
        result
    }

    fn summarize_single_inner(&self, id: &MessageId) -> Result<SummaryResult, PipelineError> {
        let token = self
            .tokens
            .acquire(false)?
            .ok_or(PipelineError::NoToken)?;

        let detail = self.gmail.fetch_detail(&token, id)?;
        let mut results = self.backend.summarize(std::slice::from_ref(&detail))?;

        // summarize() guarantees one result per batch item
        results.pop().ok_or(PipelineError::BatchMismatch {
            expected: 1,
            actual: 0,
        })
    }

    /// Log out: best-effort remote revocation, then wipe both durable and
    /// session scopes. Remote failures never block the local clear.
    pub fn logout(&self) {
        let _serial = self
            .cycle_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        info!("Logging out: revoking credentials and clearing all pipeline state");

        if let Err(err) = self.tokens.revoke_and_clear() {
            warn!("Credential revocation did not fully complete: {err}");
        }
        if let Err(err) = self.ledger.reset() {
            error!("Failed to reset dedup ledger on logout: {err}");
        }
        if let Err(err) = self.session.clear() {
            error!("Failed to clear session state on logout: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_guard_publishes_finished_outcome() {
        let events = EventBus::new();
        let rx = events.subscribe();

        let guard = CompletionGuard::new(&events);
        guard.finish(CycleOutcome::NoCredentials);

        assert!(matches!(
            rx.try_recv().unwrap(),
            PipelineEvent::CycleCompleted {
                outcome: CycleOutcome::NoCredentials
            }
        ));
    }

    #[test]
    fn test_completion_guard_publishes_even_when_unfinished() {
        let events = EventBus::new();
        let rx = events.subscribe();

        drop(CompletionGuard::new(&events));

        assert!(matches!(
            rx.try_recv().unwrap(),
            PipelineEvent::CycleCompleted {
                outcome: CycleOutcome::Failed { .. }
            }
        ));
    }

    #[test]
    fn test_alarm_trigger_is_silent() {
        assert!(!Trigger::Alarm.interactive());
        assert!(Trigger::Manual.interactive());
    }
}
