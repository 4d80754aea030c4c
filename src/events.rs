//! Fan-out of committed changes to WebSocket observers.

use compute::EntityRef;
use model::entities::Dataset;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Capacity of the broadcast channel; slower observers skip older updates.
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    StudentAdded,
    StudentUpdated,
    StudentDeleted,
    SponsorAdded,
    SponsorUpdated,
    SponsorDeleted,
    ExpenseAdded,
    ExpenseUpdated,
    ExpenseDeleted,
    EventAdded,
    EventUpdated,
    EventDeleted,
    DataImported,
}

impl UpdateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateKind::StudentAdded => "student_added",
            UpdateKind::StudentUpdated => "student_updated",
            UpdateKind::StudentDeleted => "student_deleted",
            UpdateKind::SponsorAdded => "sponsor_added",
            UpdateKind::SponsorUpdated => "sponsor_updated",
            UpdateKind::SponsorDeleted => "sponsor_deleted",
            UpdateKind::ExpenseAdded => "expense_added",
            UpdateKind::ExpenseUpdated => "expense_updated",
            UpdateKind::ExpenseDeleted => "expense_deleted",
            UpdateKind::EventAdded => "event_added",
            UpdateKind::EventUpdated => "event_updated",
            UpdateKind::EventDeleted => "event_deleted",
            UpdateKind::DataImported => "data_imported",
        }
    }
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A committed mutation together with the dataset as persisted after it.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEvent {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub entity: EntityRef,
    pub dataset: Arc<Dataset>,
}

/// First message a new observer receives.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub dataset: Arc<Dataset>,
}

impl SnapshotMessage {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            kind: "snapshot",
            dataset,
        }
    }
}

/// Broadcasts update events. Publishing never fails: without subscribers the
/// event is dropped, and lagging subscribers lose the oldest events.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UpdateEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: UpdateEvent) {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(receivers) => debug!(%kind, receivers, "Published update"),
            Err(_) => trace!(%kind, "No subscribers for update"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::entities::ProgramCode;

    fn event(kind: UpdateKind) -> UpdateEvent {
        UpdateEvent {
            kind,
            entity: EntityRef::Student {
                program: ProgramCode::Ch,
                serial_number: 1,
            },
            dataset: Arc::new(Dataset::empty(4100.0)),
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(event(UpdateKind::StudentAdded));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let bus = EventBus::new();
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();

        bus.publish(event(UpdateKind::SponsorDeleted));

        assert_eq!(first.recv().await.unwrap().kind, UpdateKind::SponsorDeleted);
        assert_eq!(second.recv().await.unwrap().kind, UpdateKind::SponsorDeleted);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_to_recent_events() {
        let bus = EventBus::new();
        let mut slow = bus.subscribe();
        for _ in 0..EVENT_BUFFER + 5 {
            bus.publish(event(UpdateKind::ExpenseAdded));
        }
        bus.publish(event(UpdateKind::DataImported));

        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        let mut last = None;
        while let Ok(update) = slow.try_recv() {
            last = Some(update.kind);
        }
        assert_eq!(last, Some(UpdateKind::DataImported));
    }

    #[test]
    fn test_update_event_wire_shape() {
        let json = serde_json::to_value(event(UpdateKind::StudentAdded)).unwrap();
        assert_eq!(json["type"], "student_added");
        assert_eq!(json["entity"]["kind"], "student");
        assert_eq!(json["entity"]["serial_number"], 1);
        assert!(json["dataset"]["programs"]["CH"].is_object());

        let snapshot = serde_json::to_value(SnapshotMessage::new(Arc::new(Dataset::empty(4100.0)))).unwrap();
        assert_eq!(snapshot["type"], "snapshot");
        assert_eq!(UpdateKind::DataImported.to_string(), "data_imported");
    }
}
