use metrics::counter;
use serde::{Deserialize, Serialize};
use strum::Display;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Kind of bookkeeping record an event refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RecordKind {
    Part,
    Procurement,
    Deployment,
    Sale,
    Expense,
    Property,
}

/// Events published after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    UserRegistered {
        user_id: Uuid,
        email: String,
        is_allowed: bool,
    },
    UserAccessChanged {
        user_id: Uuid,
        is_allowed: bool,
    },
    RecordCreated {
        kind: RecordKind,
        id: Uuid,
    },
    RecordUpdated {
        kind: RecordKind,
        id: Uuid,
    },
    RecordDeleted {
        kind: RecordKind,
        id: Uuid,
    },
    StockChanged {
        part_id: Uuid,
        part_key: String,
        qty_left: i32,
    },
    DeploymentStatusChanged {
        deployment_id: Uuid,
        deployment_status: bool,
        release_status: bool,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Publishes a batch of events. The data they describe is already
    /// committed, so a closed channel is logged instead of failing the request.
    pub async fn publish_all(&self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            if let Err(e) = self.send(event).await {
                warn!(error = %e, "dropping event after commit");
            }
        }
    }
}

/// Drains the event channel, logging each event and warning when a part
/// runs low.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, low_stock_threshold: i32) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("autoshop_events.processed", 1);

        match event {
            Event::StockChanged {
                part_id,
                part_key,
                qty_left,
            } => {
                if qty_left <= low_stock_threshold {
                    counter!("autoshop_events.low_stock", 1);
                    warn!(%part_id, part = %part_key, qty_left, "part stock is low");
                } else {
                    info!(%part_id, part = %part_key, qty_left, "part stock changed");
                }
            }
            Event::DeploymentStatusChanged {
                deployment_id,
                deployment_status,
                release_status,
            } => {
                info!(
                    %deployment_id,
                    deployment_status, release_status, "deployment status changed"
                );
            }
            Event::UserRegistered {
                user_id,
                email,
                is_allowed,
            } => {
                info!(%user_id, %email, is_allowed, "user registered");
            }
            Event::UserAccessChanged {
                user_id,
                is_allowed,
            } => {
                info!(%user_id, is_allowed, "user access changed");
            }
            Event::RecordCreated { kind, id } => info!(%kind, %id, "record created"),
            Event::RecordUpdated { kind, id } => info!(%kind, %id, "record updated"),
            Event::RecordDeleted { kind, id } => info!(%kind, %id, "record deleted"),
        }
    }

    info!("Event channel closed; event processing stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender
            .publish_all(vec![
                Event::RecordCreated {
                    kind: RecordKind::Sale,
                    id,
                },
                Event::RecordDeleted {
                    kind: RecordKind::Sale,
                    id,
                },
            ])
            .await;

        assert!(matches!(
            rx.recv().await,
            Some(Event::RecordCreated { kind: RecordKind::Sale, .. })
        ));
        assert!(matches!(rx.recv().await, Some(Event::RecordDeleted { .. })));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let result = sender
            .send(Event::UserAccessChanged {
                user_id: Uuid::new_v4(),
                is_allowed: false,
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn processor_stops_when_channel_closes() {
        let (tx, rx) = mpsc::channel(2);
        let handle = tokio::spawn(process_events(rx, 2));
        tx.send(Event::StockChanged {
            part_id: Uuid::new_v4(),
            part_key: "Brake Pad|Bosch".into(),
            qty_left: 1,
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();
    }

    #[test]
    fn record_kind_display_is_snake_case() {
        assert_eq!(RecordKind::Procurement.to_string(), "procurement");
    }
}
