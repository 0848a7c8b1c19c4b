//! Domain events, published fire-and-forget over a tokio channel and
//! consumed by a logging task. Event delivery never fails a request.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

/// Events emitted by the booking and shop pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    CartLineAdded { user_id: Uuid, product_id: Uuid },
    CartLineRemoved { user_id: Uuid, item_id: Uuid },
    CartCleared { user_id: Uuid },
    PromoApplied { user_id: Uuid, promo_code_id: Uuid },
    PromoRemoved { user_id: Uuid },
    PromoExpired { promo_code_id: Uuid },
    OrderCreated { order_id: Uuid, order_number: String },
    PropertyBooked { property_id: Uuid, order_id: Uuid },
    ActivityBooked { activity_id: Uuid, order_id: Uuid },
    SettingUpdated { key: String },
}

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
            .map_err(|e| format!("failed to send event: {e}"))
    }

    /// Sends an event, logging instead of propagating on a full or closed
    /// channel.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("event dropped: {e}");
        }
    }
}

/// Consumes events off the channel for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        info!(?event, "event processed");
    }
}
