//! # Change Notification Bus
//!
//! Fan-out channel that tells connected observers WHAT CHANGED after each
//! committed mutation. Every payload is built by the engine from its own
//! post-commit state; nothing a client sends is ever relayed to other
//! clients.
//!
//! ## Delivery Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ORDERING      events are published under the commit lock, so every    │
//! │                subscriber observes them in commit order                 │
//! │                                                                         │
//! │  AT-MOST-ONCE  a slow subscriber that overruns the ring buffer LOSES   │
//! │                the oldest events (broadcast Lagged); the engine never   │
//! │                blocks or retries on its behalf                          │
//! │                                                                         │
//! │  FIRE-FORGET   publish() ignores the no-subscriber case; mutations     │
//! │                never fail because nobody is listening                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use novabill_core::Invoice;

/// Default capacity of the broadcast ring buffer.
pub const DEFAULT_EVENT_BUFFER: usize = 256;

// =============================================================================
// Events
// =============================================================================

/// New quantity-on-hand for one stock item, as observed post-commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub stock_item_id: String,
    pub name: String,
    pub quantity_on_hand: i64,
}

/// A change notification published after a committed mutation.
///
/// Serializes as `{"type": "...", "payload": {...}}` with camelCase event
/// names, which is exactly what the subscription channel puts on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ChangeEvent {
    /// One or more items' quantity-on-hand changed (commit, replenishment,
    /// or manual adjustment).
    StockChanged(Vec<StockChange>),

    /// An invoice was committed. Carries the full invoice snapshot.
    InvoiceCreated(Invoice),

    /// An existing invoice changed state (currently: pending → paid).
    InvoiceUpdated(Invoice),
}

impl ChangeEvent {
    /// Event name as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeEvent::StockChanged(_) => "stockChanged",
            ChangeEvent::InvoiceCreated(_) => "invoiceCreated",
            ChangeEvent::InvoiceUpdated(_) => "invoiceUpdated",
        }
    }
}

// =============================================================================
// Bus
// =============================================================================

/// Broadcast bus carrying [`ChangeEvent`]s to all subscribers.
///
/// Cloning the bus is cheap; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    /// Creates a bus with the given ring-buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        ChangeBus { tx }
    }

    /// Registers a new observer. The receiver only sees events published
    /// after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publishes an event to all current subscribers, fire-and-forget.
    pub fn publish(&self, event: ChangeEvent) {
        debug!(event = event.name(), "publishing change event");
        // send() errs only when there are zero subscribers; that is fine.
        let _ = self.tx.send(event);
    }

    /// Number of currently attached subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        ChangeBus::new(DEFAULT_EVENT_BUFFER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shape() {
        let event = ChangeEvent::StockChanged(vec![StockChange {
            stock_item_id: "item-1".into(),
            name: "Pen".into(),
            quantity_on_hand: 4,
        }]);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "stockChanged");
        assert_eq!(json["payload"][0]["stockItemId"], "item-1");
        assert_eq!(json["payload"][0]["quantityOnHand"], 4);
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let bus = ChangeBus::default();
        bus.publish(ChangeEvent::StockChanged(vec![]));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_in_publish_order() {
        let bus = ChangeBus::default();
        let mut rx = bus.subscribe();

        bus.publish(ChangeEvent::StockChanged(vec![StockChange {
            stock_item_id: "a".into(),
            name: "A".into(),
            quantity_on_hand: 1,
        }]));
        bus.publish(ChangeEvent::StockChanged(vec![StockChange {
            stock_item_id: "b".into(),
            name: "B".into(),
            quantity_on_hand: 2,
        }]));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        match (first, second) {
            (ChangeEvent::StockChanged(f), ChangeEvent::StockChanged(s)) => {
                assert_eq!(f[0].stock_item_id, "a");
                assert_eq!(s[0].stock_item_id, "b");
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_events() {
        let bus = ChangeBus::default();
        bus.publish(ChangeEvent::StockChanged(vec![]));

        let mut rx = bus.subscribe();
        bus.publish(ChangeEvent::StockChanged(vec![StockChange {
            stock_item_id: "later".into(),
            name: "Later".into(),
            quantity_on_hand: 9,
        }]));

        match rx.recv().await.unwrap() {
            ChangeEvent::StockChanged(changes) => {
                assert_eq!(changes[0].stock_item_id, "later")
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
