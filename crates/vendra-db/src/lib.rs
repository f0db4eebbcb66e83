//! # vendra-db: Database Layer for Vendra
//!
//! SQLite persistence for the billing and stock engine: connection pool,
//! embedded migrations, and the transactional repositories.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Vendra Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    HTTP API (axum)                              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ vendra-db (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐      │   │
//! │  │   │  stock   │  │   bill   │  │ payment  │  │   org    │      │   │
//! │  │   │ ledger   │  │ ledger   │  │processor │  │ registry │      │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘      │   │
//! │  │                                                                 │   │
//! │  │   Every multi-row invariant is enforced HERE, in SQL, inside   │   │
//! │  │   transactions. Handlers cannot bypass it.                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    SQLite (WAL mode)                            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Invariants
//!
//! - **Stock never negative**: conditional decrement, one statement
//! - **One finalize wins**: draft claim via `WHERE status = 'draft'`
//! - **One payment per bill**: partial unique index on completed payments
//! - **One organization per subscription**: UNIQUE subscription_id

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::bill::BillRepository;
pub use repository::org::OrganizationRepository;
pub use repository::payment::PaymentRepository;
pub use repository::stock::StockRepository;
