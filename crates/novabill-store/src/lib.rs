//! # novabill-store: SQLite Persistence
//!
//! Implements the engine's [`Store`] trait over SQLite via sqlx.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   novabill-engine  ──►  Store trait  ──►  SqliteStore (this crate)     │
//! │                                                                         │
//! │   Tables:  stock_items · invoices · invoice_lines                       │
//! │   Pragmas: WAL, foreign_keys, busy_timeout                              │
//! │   Schema:  embedded migrations, applied on open                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine's in-memory ledger is authoritative for quantities while the
//! process runs; this crate is what survives a restart. Invoice commits
//! write the invoice and the new stock levels in one transaction, so a
//! restart can never observe one without the other.
//!
//! [`Store`]: novabill_engine::Store

pub mod migrations;
pub mod pool;
pub mod sqlite;

pub use pool::StoreConfig;
pub use sqlite::SqliteStore;
