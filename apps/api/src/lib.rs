//! # Vendra API
//!
//! Axum HTTP server for the Vendra billing and stock engine.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Vendra API Server                               │
//! │                                                                         │
//! │  Client ───► HTTP/JSON ───► routes ───► vendra-db ───► SQLite          │
//! │                               │                                         │
//! │                               ├──► token broker (HMAC + JWT)            │
//! │                               └──► notifier (fire-and-forget)           │
//! │                                                                         │
//! │  Tenancy: every bill/stock/role route is scoped by the                  │
//! │  X-Organization-Id header. Cross-tenant ids read as not-found.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The server is a thin orchestration layer: request parsing and status
//! mapping live here; every invariant lives in vendra-core / vendra-db.

pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod token;

use std::sync::Arc;

use vendra_core::PlanPolicy;
use vendra_db::Database;

use crate::config::VendraConfig;
use crate::notify::Notifier;
use crate::token::TokenBroker;

pub use crate::error::{ApiError, ApiResult};
pub use crate::routes::router;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: VendraConfig,
    pub policy: Arc<PlanPolicy>,
    pub broker: Arc<TokenBroker>,
    pub notifier: Notifier,
}

impl AppState {
    /// Builds the application state from a connected database and config.
    ///
    /// Spawns the notification delivery task; call from within a tokio
    /// runtime.
    pub fn new(db: Database, config: VendraConfig) -> AppState {
        let broker = TokenBroker::new(config.token_secret.clone(), config.token_lifetime_secs);

        AppState {
            db,
            config,
            policy: Arc::new(PlanPolicy::standard()),
            broker: Arc::new(broker),
            notifier: Notifier::spawn(),
        }
    }
}
