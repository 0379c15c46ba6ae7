//! # novabill-engine: Ledger, Commits, and Change Notifications
//!
//! The stateful half of NovaBill. Owns:
//!
//! - the authoritative in-memory **stock ledger** ([`ledger::StockLedger`])
//! - the **invoice commit protocol** ([`engine::BillingEngine`])
//! - the pending → paid **payment lifecycle**
//! - the **change notification bus** ([`bus::ChangeBus`])
//! - the persistence seam ([`store::Store`])
//!
//! ## Consistency Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   boundary request                                                      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │   BillingEngine ──► commit mutex (one invoice commits at a time)        │
//! │        │                                                                │
//! │        ├──► StockLedger    RwLock'd quantities, all-or-nothing batch   │
//! │        ├──► Store          invoice + stock levels in one transaction   │
//! │        └──► ChangeBus      events published in commit order            │
//! │                                                                         │
//! │   Guarantee: no observer — REST reader, subscriber, or restart —        │
//! │   ever sees an invoice without its stock decrement or vice versa.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod bus;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod store;

pub use bus::{ChangeBus, ChangeEvent, StockChange, DEFAULT_EVENT_BUFFER};
pub use engine::{BillingEngine, NewStockItem, StockItemUpdate};
pub use error::{EngineError, EngineResult};
pub use ledger::{LineSnapshot, StockLedger};
pub use store::{MemoryStore, Store, StoreError, StoreResult};
