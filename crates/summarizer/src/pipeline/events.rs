//! Best-effort event delivery to presentation layers
//!
//! Publishing never fails: zero subscribers is a valid state (the popup
//! may simply be closed), and disconnected subscribers are pruned.

use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};

use super::cycle::CycleOutcome;
use crate::models::{MessageId, SummaryResult};

/// Events emitted by the pipeline
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Fired unconditionally at the end of every cycle, whatever its path
    CycleCompleted { outcome: CycleOutcome },
    /// A single-message summarisation finished for a direct requester
    SingleSummaryReady {
        id: MessageId,
        result: SummaryResult,
    },
    /// A single-message summarisation failed; forwarded to the requester
    SingleSummaryFailed { id: MessageId, message: String },
}

/// Fan-out channel from the pipeline to any number of listeners
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<PipelineEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; drop the receiver to unsubscribe
    pub fn subscribe(&self) -> Receiver<PipelineEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    /// Deliver an event to all live subscribers.
    ///
    /// Subscribers whose receiver has been dropped are removed; delivering
    /// to nobody is not an error.
    pub fn publish(&self, event: PipelineEvent) {
        let mut subscribers = self.subscribers.lock().unwrap();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_with_no_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(PipelineEvent::CycleCompleted {
            outcome: CycleOutcome::NoCredentials,
        });
    }

    #[test]
    fn test_all_subscribers_receive_events() {
        let bus = EventBus::new();
        let rx1 = bus.subscribe();
        let rx2 = bus.subscribe();

        bus.publish(PipelineEvent::CycleCompleted {
            outcome: CycleOutcome::NoCredentials,
        });

        assert!(matches!(
            rx1.try_recv().unwrap(),
            PipelineEvent::CycleCompleted { .. }
        ));
        assert!(matches!(
            rx2.try_recv().unwrap(),
            PipelineEvent::CycleCompleted { .. }
        ));
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        drop(rx);

        bus.publish(PipelineEvent::SingleSummaryFailed {
            id: MessageId::new("m1"),
            message: "gone".into(),
        });
        assert!(bus.subscribers.lock().unwrap().is_empty());
    }
}
