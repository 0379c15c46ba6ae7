//! # Domain Types
//!
//! Core domain types for the invoice–inventory engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   StockItem     │   │    Invoice      │   │    LineItem     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  stock_item_id  │       │
//! │  │  name           │   │  customer_name  │   │  name (frozen)  │       │
//! │  │  quantity       │   │  lines[]        │   │  price (frozen) │       │
//! │  │  price_cents    │   │  totals         │   │  rate (frozen)  │       │
//! │  │  tax_rate_bps   │   │  status         │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  The ledger exclusively owns quantity-on-hand. Invoices hold read-only  │
//! │  price/tax snapshots and never a live reference back to the ledger.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1800 bps = 18% GST. Integer bps avoid float
/// drift in tax math the same way integer cents do for money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (boundary convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Stock Item
// =============================================================================

/// A stock-keeping unit tracked by the ledger.
///
/// ## Invariant
/// `quantity_on_hand` never goes negative. Only the ledger mutates it, via
/// replenishment, adjustment, or an invoice commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown on invoices.
    pub name: String,

    /// Authoritative current stock count. Never negative.
    pub quantity_on_hand: i64,

    /// Unit price in cents.
    pub unit_price_cents: i64,

    /// Tax rate in basis points (1800 = 18%).
    pub tax_rate_bps: u32,

    /// Optional tax-classification code (HSN).
    pub hsn_code: Option<String>,

    /// Soft-retire flag. Retired items stay resolvable from historical
    /// invoices but are excluded from listings and new carts.
    pub is_active: bool,

    /// When the item was created.
    pub created_at: DateTime<Utc>,

    /// When the item was last updated.
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    /// Returns the unit price as a Money type.
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment-status lifecycle of an invoice.
///
/// Transitions `Pending → Paid` exactly once; everything else on the
/// invoice is frozen after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Invoice committed, payment outstanding.
    #[default]
    Pending,
    /// Invoice settled.
    Paid,
}

impl PaymentStatus {
    /// Canonical lowercase name, used for store encoding.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
        }
    }

    /// Parses the canonical lowercase name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            _ => None,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// A line item inside a committed invoice.
///
/// Uses the snapshot pattern: name, unit price, and tax rate are frozen at
/// commit time, so historical invoices are immune to later price changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Stock item this line references.
    pub stock_item_id: String,

    /// Item name at time of commit (frozen).
    pub name: String,

    /// Quantity sold. Always positive.
    pub quantity: i64,

    /// Unit price in cents at time of commit (frozen).
    pub unit_price_cents: i64,

    /// Tax rate in basis points at time of commit (frozen).
    pub tax_rate_bps: u32,

    /// Line total before tax (unit price × quantity).
    pub line_total_cents: i64,

    /// Tax for this line, rounded half-up (display breakdown; the invoice
    /// aggregate is rounded once over the exact per-line sums).
    pub tax_cents: i64,
}

// =============================================================================
// Invoice
// =============================================================================

/// A committed invoice.
///
/// ## Invariants
/// - `subtotal_cents` = Σ(unit price × quantity) over lines
/// - `total_cents` = `subtotal_cents` + `tax_cents`
/// - all three are computed atomically with the committing stock decrement,
///   never user-supplied, and never recomputed on read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    pub customer_name: String,
    /// Ordered line items, frozen at commit.
    pub lines: Vec<LineItem>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
    pub status: PaymentStatus,
    /// Creator reference (user id from the upstream auth gate).
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl Invoice {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One requested line in a transient cart: item key plus quantity.
///
/// Carts exist only until commit or discard and are never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub stock_item_id: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_bps() {
        let rate = TaxRate::from_bps(1800);
        assert_eq!(rate.bps(), 1800);
        assert!((rate.percentage() - 18.0).abs() < 0.001);
    }

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(18.0).bps(), 1800);
        assert_eq!(TaxRate::from_percentage(8.25).bps(), 825);
    }

    #[test]
    fn test_payment_status_round_trip() {
        assert_eq!(PaymentStatus::parse("pending"), Some(PaymentStatus::Pending));
        assert_eq!(PaymentStatus::parse("paid"), Some(PaymentStatus::Paid));
        assert_eq!(PaymentStatus::parse("voided"), None);
        assert_eq!(PaymentStatus::Paid.as_str(), "paid");
    }

    #[test]
    fn test_payment_status_serde_names() {
        let json = serde_json::to_string(&PaymentStatus::Pending).unwrap();
        assert_eq!(json, "\"pending\"");
    }
}
