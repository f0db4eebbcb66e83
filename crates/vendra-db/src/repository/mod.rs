//! # Repository Module
//!
//! Database repository implementations for Vendra.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  HTTP Handler                                                          │
//! │       │                                                                 │
//! │       │  db.bills().finalize(org, bill, discount, tax, actor)           │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  BillRepository                                                        │
//! │  ├── create_draft(&self, org)                                          │
//! │  ├── add_item(&self, org, bill, product, qty)                          │
//! │  └── finalize(&self, org, bill, discount, tax, actor)                  │
//! │       │                                                                 │
//! │       │  SQL (transactions where invariants demand them)               │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • Invariants live next to the statements that enforce them            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`stock::StockRepository`] - Product catalog and stock levels
//! - [`bill::BillRepository`] - Draft assembly and finalization
//! - [`payment::PaymentRepository`] - Write-once settlement
//! - [`org::OrganizationRepository`] - Tenants, stores, roles

pub mod bill;
pub mod org;
pub mod payment;
pub mod stock;
