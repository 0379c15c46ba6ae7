//! # Tax Calculator
//!
//! Pure totals computation over a sequence of line inputs.
//!
//! ## Rounding Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  WHERE ROUNDING HAPPENS                                                 │
//! │                                                                         │
//! │  line tax (exact)  = line_total_cents × rate_bps      (cent·bps units) │
//! │                                                                         │
//! │  aggregate tax     = round_half_up( Σ exact line tax / 10000 )         │
//! │                      ▲ rounded ONCE, at aggregation                     │
//! │                                                                         │
//! │  per-line tax      = round_half_up( exact line tax / 10000 )           │
//! │                      ▲ display breakdown only                           │
//! │                                                                         │
//! │  Rounding at aggregation keeps the invoice total free of compounding   │
//! │  per-line drift: Σ(rounded lines) may differ from the aggregate by a   │
//! │  cent, the stored invoice always carries the aggregate.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is integer (i128 intermediates), so the function is
//! deterministic and overflow-safe for any realistic cart.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Maximum tax rate: 100% in basis points.
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

/// One line of input to the calculator: (unit price, quantity, tax rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub tax_rate_bps: u32,
}

/// Computed amounts for a single line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineTotals {
    /// Line total before tax (unit price × quantity).
    pub line_total_cents: i64,
    /// Line tax rounded half-up (display breakdown).
    pub tax_cents: i64,
}

/// Aggregate amounts for an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub total_cents: i64,
}

/// Computes per-line and aggregate totals for an ordered sequence of lines.
///
/// Pure function: no side effects, no I/O, deterministic.
///
/// ## Errors
/// Fails with [`CoreError::InvalidLineItem`] on the first line (left to
/// right) with a negative price, non-positive quantity, or tax rate above
/// 100%.
///
/// ## Guarantees
/// - `totals.subtotal_cents == Σ(unit_price_cents × quantity)` exactly
/// - `totals.total_cents == totals.subtotal_cents + totals.tax_cents` exactly
pub fn compute_totals(lines: &[LineInput]) -> CoreResult<(Vec<LineTotals>, InvoiceTotals)> {
    let mut per_line = Vec::with_capacity(lines.len());
    let mut subtotal: i64 = 0;
    // Exact tax sum in cent·bps units (1/10000 of a cent).
    let mut tax_exact: i128 = 0;

    for (index, line) in lines.iter().enumerate() {
        if line.unit_price_cents < 0 {
            return Err(CoreError::InvalidLineItem {
                line: index,
                reason: format!("unit price must not be negative: {}", line.unit_price_cents),
            });
        }
        if line.quantity <= 0 {
            return Err(CoreError::InvalidLineItem {
                line: index,
                reason: format!("quantity must be positive: {}", line.quantity),
            });
        }
        if line.tax_rate_bps > MAX_TAX_RATE_BPS {
            return Err(CoreError::InvalidLineItem {
                line: index,
                reason: format!("tax rate must be within 0-100%: {} bps", line.tax_rate_bps),
            });
        }

        let line_total = line.unit_price_cents * line.quantity;
        let line_tax_exact = line_total as i128 * line.tax_rate_bps as i128;

        subtotal += line_total;
        tax_exact += line_tax_exact;

        per_line.push(LineTotals {
            line_total_cents: line_total,
            tax_cents: round_half_up(line_tax_exact),
        });
    }

    let tax = round_half_up(tax_exact);
    let totals = InvoiceTotals {
        subtotal_cents: subtotal,
        tax_cents: tax,
        total_cents: subtotal + tax,
    };

    Ok((per_line, totals))
}

/// Rounds a cent·bps amount to whole cents, half away from zero.
///
/// Inputs on the invoice path are always non-negative; the negative branch
/// keeps the helper total for any amount.
#[inline]
fn round_half_up(cent_bps: i128) -> i64 {
    let rounded = if cent_bps >= 0 {
        (cent_bps + 5_000) / 10_000
    } else {
        (cent_bps - 5_000) / 10_000
    };
    rounded as i64
}
