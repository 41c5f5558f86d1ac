//! Pipeline orchestration
//!
//! Drives the end-to-end cycle (token -> list -> filter -> fetch ->
//! summarize -> persist -> notify) and exposes the event surface consumed
//! by presentation layers.

mod cycle;
mod events;
mod scheduler;

pub use cycle::{CycleOutcome, CycleStats, Orchestrator, Trigger};
pub use events::{EventBus, PipelineEvent};
pub use scheduler::{Scheduler, cooldown_elapsed};
