use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Handle for publishing domain events to an in-process channel.
///
/// Delivery is best-effort from the caller's point of view: services log a
/// warning when a send fails instead of failing the business operation.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events emitted by the services after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Order events
    OrderCreated(Uuid),
    OrderConfirmed(Uuid),
    OrderPaid(Uuid),
    OrderShipped(Uuid),
    OrderCompleted(Uuid),
    OrderCancelled(Uuid),
    OrderItemsReturned {
        order_id: Uuid,
        warehouse_id: Uuid,
    },

    // Stock events
    StockSet {
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
    },
    StockAdjusted {
        product_id: Uuid,
        warehouse_id: Uuid,
        old_quantity: i32,
        new_quantity: i32,
    },

    // Reservation events
    ReservationCreated {
        reservation_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
        quantity: i32,
        reference_id: String,
    },
    ReservationConsumed(Uuid),
    ReservationReleased(Uuid),
    ExpiredReservationsReleased {
        released_count: u64,
    },

    // Inventory transaction events
    InventoryTransactionRecorded {
        transaction_id: Uuid,
        product_id: Uuid,
        warehouse_id: Uuid,
        transaction_type: String,
        quantity: i32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let order_id = Uuid::new_v4();

        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender.send(Event::OrderPaid(Uuid::new_v4())).await.is_err());
    }
}
