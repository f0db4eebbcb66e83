//! Fire-and-forget notification queue.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Handler (after COMMIT)                                                 │
//! │       │  notifier.send(event)   ← never awaited, never blocks           │
//! │       ▼                                                                 │
//! │  unbounded mpsc channel                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  detached tokio task ──► delivery (currently a structured log line)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are handed off strictly after the owning transaction commits, so
//! correctness never depends on delivery. A full or closed channel is
//! logged and dropped; the request has already succeeded.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Events emitted after state-changing operations commit.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
    /// A finalized bill was settled.
    ReceiptIssued {
        organization_id: String,
        bill_id: String,
        total_cents: i64,
    },
    /// A new organization completed onboarding.
    OrganizationRegistered {
        organization_id: String,
        name: String,
    },
}

/// Cheap-to-clone sending handle.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
    /// Spawns the delivery task and returns the sending handle.
    pub fn spawn() -> Notifier {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                // Delivery mechanics (receipt rendering, email, webhooks)
                // live behind this point; for now the event is logged.
                match serde_json::to_string(&event) {
                    Ok(payload) => info!(payload = %payload, "Notification dispatched"),
                    Err(err) => warn!(?err, "Failed to serialize notification"),
                }
            }
        });

        Notifier { tx }
    }

    /// Queues an event. Never blocks; a closed channel is logged and the
    /// event dropped.
    pub fn send(&self, event: Notification) {
        if self.tx.send(event).is_err() {
            warn!("Notification channel closed; event dropped");
        }
    }
}
