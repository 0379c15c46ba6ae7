//! # novabill-core: Pure Business Logic for NovaBill
//!
//! This crate is the heart of the invoice–inventory consistency engine.
//! It contains all business rules as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        NovaBill Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Boundary Adapters (apps/server)                 │   │
//! │  │        REST handlers  ──►  WebSocket change feed                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                novabill-engine (ledger + commits)               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ novabill-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │    tax    │  │ validation│  │   │
//! │  │   │ StockItem │  │   Money   │  │  totals   │  │   rules   │  │   │
//! │  │   │  Invoice  │  │  TaxRate  │  │  rounding │  │   checks  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output, no side effects
//! 2. **Integer money**: all monetary values are in cents (i64), never floats
//! 3. **Explicit errors**: all errors are typed, never strings or panics
//! 4. **Frozen snapshots**: invoices carry price/tax copies, never live refs

pub mod error;
pub mod money;
pub mod tax;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tax::{compute_totals, InvoiceTotals, LineInput, LineTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// Prevents runaway carts and keeps a single commit's critical section
/// bounded.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single item per cart line.
///
/// Guards against accidental over-ordering (e.g. typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default tax rate applied when inventory input omits one: 18% GST.
pub const DEFAULT_TAX_RATE_BPS: u32 = 1800;
