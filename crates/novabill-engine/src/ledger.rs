//! # Stock Ledger
//!
//! Authoritative in-memory quantity-on-hand for every stock item. All
//! quantity mutations in the process go through this type; the store is a
//! durable mirror, never the source of truth while the engine runs.
//!
//! ## Atomic Batch Decrement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve_and_decrement( [(pen, 3), (cola, 2)] )                         │
//! │                                                                         │
//! │  under ONE write lock:                                                  │
//! │    1. scan left → right                                                 │
//! │       resolve each key, check requested ≤ remaining                     │
//! │       (duplicates of a key accumulate against the same remaining)       │
//! │    2. first failure → return error, ledger UNTOUCHED                    │
//! │    3. all pass → apply every decrement, return frozen snapshots         │
//! │                                                                         │
//! │  There is no partial decrement, ever.                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write locks are acquired with a bounded timeout; a ledger that cannot be
//! locked within the retry budget reports `Busy` instead of queueing forever.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use tokio::sync::{RwLock, RwLockWriteGuard};
use tokio::time::timeout;
use tracing::{debug, warn};

use novabill_core::{CartLine, CoreError, CoreResult, StockItem};

/// How long a single write-lock acquisition may wait.
const LOCK_WAIT: Duration = Duration::from_millis(200);

/// How many acquisitions are attempted before giving up with `Busy`.
const LOCK_ATTEMPTS: u32 = 3;

/// Frozen per-line snapshot taken at decrement time.
///
/// Carries everything the commit protocol needs to price the line without
/// touching the ledger again, plus the post-decrement quantity for the
/// change notification.
#[derive(Debug, Clone)]
pub struct LineSnapshot {
    pub stock_item_id: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub tax_rate_bps: u32,
    pub remaining_quantity: i64,
}

/// In-memory stock ledger keyed by item id.
///
/// BTreeMap keeps iteration deterministic; listings are re-sorted by name
/// at the edge.
#[derive(Debug, Default)]
pub struct StockLedger {
    items: RwLock<BTreeMap<String, StockItem>>,
}

impl StockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger from persisted stock (startup hydration).
    pub fn hydrate(items: Vec<StockItem>) -> Self {
        let map = items.into_iter().map(|i| (i.id.clone(), i)).collect();
        StockLedger {
            items: RwLock::new(map),
        }
    }

    /// Acquires the write lock within the bounded retry budget.
    async fn write_guard(&self) -> CoreResult<RwLockWriteGuard<'_, BTreeMap<String, StockItem>>> {
        for attempt in 1..=LOCK_ATTEMPTS {
            match timeout(LOCK_WAIT, self.items.write()).await {
                Ok(guard) => return Ok(guard),
                Err(_) => {
                    warn!(attempt, "ledger write lock wait timed out");
                }
            }
        }
        Err(CoreError::Busy)
    }

    // =========================================================================
    // Batch Decrement
    // =========================================================================

    /// Atomically checks and decrements quantity for a whole cart.
    ///
    /// Scans `lines` left to right. On the first line whose item is unknown,
    /// retired, or short on stock, returns the corresponding error and
    /// leaves every quantity untouched. On success every decrement is
    /// applied and the frozen snapshots are returned in cart order.
    pub async fn reserve_and_decrement(
        &self,
        lines: &[CartLine],
    ) -> CoreResult<Vec<LineSnapshot>> {
        let mut items = self.write_guard().await?;

        // Phase 1: validate all lines against remaining quantities. Repeated
        // keys within the batch accumulate against the same remaining count.
        let mut remaining: HashMap<&str, i64> = HashMap::new();
        for line in lines {
            let item = items
                .get(line.stock_item_id.as_str())
                .filter(|i| i.is_active)
                .ok_or_else(|| CoreError::UnknownItem(line.stock_item_id.clone()))?;

            let left = remaining
                .entry(line.stock_item_id.as_str())
                .or_insert(item.quantity_on_hand);
            if line.quantity > *left {
                return Err(CoreError::InsufficientStock {
                    item_id: line.stock_item_id.clone(),
                    available: *left,
                    requested: line.quantity,
                });
            }
            *left -= line.quantity;
        }

        // Phase 2: all lines passed, apply and snapshot.
        let now = chrono::Utc::now();
        let mut snapshots = Vec::with_capacity(lines.len());
        for line in lines {
            // Checked in phase 1; a missing entry here is unreachable.
            let item = items
                .get_mut(line.stock_item_id.as_str())
                .ok_or_else(|| CoreError::UnknownItem(line.stock_item_id.clone()))?;
            item.quantity_on_hand -= line.quantity;
            item.updated_at = now;

            snapshots.push(LineSnapshot {
                stock_item_id: item.id.clone(),
                name: item.name.clone(),
                quantity: line.quantity,
                unit_price_cents: item.unit_price_cents,
                tax_rate_bps: item.tax_rate_bps,
                remaining_quantity: item.quantity_on_hand,
            });
        }

        debug!(lines = lines.len(), "ledger batch decrement applied");
        Ok(snapshots)
    }

    /// Reverses a previously applied decrement (compensation after a failed
    /// persist). Unknown ids are skipped: a concurrent retire cannot make
    /// the rollback fail.
    pub async fn restore(&self, lines: &[CartLine]) -> CoreResult<()> {
        let mut items = self.write_guard().await?;
        for line in lines {
            if let Some(item) = items.get_mut(line.stock_item_id.as_str()) {
                item.quantity_on_hand += line.quantity;
                item.updated_at = chrono::Utc::now();
            }
        }
        warn!(lines = lines.len(), "ledger decrement rolled back");
        Ok(())
    }

    // =========================================================================
    // Item Maintenance
    // =========================================================================

    /// Inserts or replaces a stock item.
    pub async fn upsert(&self, item: StockItem) -> CoreResult<()> {
        let mut items = self.write_guard().await?;
        items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Adds `amount` units to an item's quantity. Returns the updated item.
    pub async fn replenish(&self, item_id: &str, amount: i64) -> CoreResult<StockItem> {
        let mut items = self.write_guard().await?;
        let item = items
            .get_mut(item_id)
            .filter(|i| i.is_active)
            .ok_or_else(|| CoreError::UnknownItem(item_id.to_string()))?;
        item.quantity_on_hand += amount;
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    /// Sets an item's quantity to an absolute value (manual stock take).
    pub async fn set_quantity(&self, item_id: &str, quantity: i64) -> CoreResult<StockItem> {
        let mut items = self.write_guard().await?;
        let item = items
            .get_mut(item_id)
            .filter(|i| i.is_active)
            .ok_or_else(|| CoreError::UnknownItem(item_id.to_string()))?;
        item.quantity_on_hand = quantity;
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    /// Soft-retires an item: hidden from listings and new carts, but still
    /// resolvable from historical invoices.
    pub async fn retire(&self, item_id: &str) -> CoreResult<StockItem> {
        let mut items = self.write_guard().await?;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| CoreError::UnknownItem(item_id.to_string()))?;
        item.is_active = false;
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lists all active items, sorted by name.
    pub async fn list_items(&self) -> Vec<StockItem> {
        let items = self.items.read().await;
        let mut out: Vec<StockItem> = items.values().filter(|i| i.is_active).cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// Fetches a single item by id (active or retired).
    pub async fn get_item(&self, item_id: &str) -> Option<StockItem> {
        let items = self.items.read().await;
        items.get(item_id).cloned()
    }

    /// Current quantity-on-hand for an item.
    pub async fn get_quantity(&self, item_id: &str) -> Option<i64> {
        let items = self.items.read().await;
        items.get(item_id).map(|i| i.quantity_on_hand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn item(id: &str, name: &str, qty: i64) -> StockItem {
        StockItem {
            id: id.to_string(),
            name: name.to_string(),
            quantity_on_hand: qty,
            unit_price_cents: 4000,
            tax_rate_bps: 1800,
            hsn_code: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn cart(entries: &[(&str, i64)]) -> Vec<CartLine> {
        entries
            .iter()
            .map(|(id, qty)| CartLine {
                stock_item_id: id.to_string(),
                quantity: *qty,
            })
            .collect()
    }

    async fn ledger_with(items: Vec<StockItem>) -> StockLedger {
        StockLedger::hydrate(items)
    }

    #[tokio::test]
    async fn test_decrement_applies_all_lines() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5), item("cola", "Cola", 10)]).await;

        let snaps = ledger
            .reserve_and_decrement(&cart(&[("pen", 3), ("cola", 2)]))
            .await
            .unwrap();

        assert_eq!(snaps.len(), 2);
        assert_eq!(snaps[0].remaining_quantity, 2);
        assert_eq!(snaps[1].remaining_quantity, 8);
        assert_eq!(ledger.get_quantity("pen").await, Some(2));
        assert_eq!(ledger.get_quantity("cola").await, Some(8));
    }

    #[tokio::test]
    async fn test_shortfall_leaves_ledger_untouched() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5), item("cola", "Cola", 1)]).await;

        let err = ledger
            .reserve_and_decrement(&cart(&[("pen", 3), ("cola", 2)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock { ref item_id, available: 1, requested: 2 }
                if item_id == "cola"
        ));
        // Earlier lines in the batch must not have been applied.
        assert_eq!(ledger.get_quantity("pen").await, Some(5));
        assert_eq!(ledger.get_quantity("cola").await, Some(1));
    }

    #[tokio::test]
    async fn test_first_offending_key_in_cart_order() {
        let ledger = ledger_with(vec![item("a", "A", 0), item("b", "B", 0)]).await;

        let err = ledger
            .reserve_and_decrement(&cart(&[("b", 1), ("a", 1)]))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock { ref item_id, .. } if item_id == "b"
        ));
    }

    #[tokio::test]
    async fn test_duplicate_lines_accumulate() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5)]).await;

        // 3 + 3 = 6 > 5, must fail even though each line alone fits.
        let err = ledger
            .reserve_and_decrement(&cart(&[("pen", 3), ("pen", 3)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available: 2, requested: 3, .. }
        ));
        assert_eq!(ledger.get_quantity("pen").await, Some(5));

        // 3 + 2 = 5 fits exactly.
        let snaps = ledger
            .reserve_and_decrement(&cart(&[("pen", 3), ("pen", 2)]))
            .await
            .unwrap();
        assert_eq!(snaps[1].remaining_quantity, 0);
        assert_eq!(ledger.get_quantity("pen").await, Some(0));
    }

    #[tokio::test]
    async fn test_unknown_and_retired_items_rejected() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5)]).await;
        ledger.retire("pen").await.unwrap();

        assert!(matches!(
            ledger
                .reserve_and_decrement(&cart(&[("pen", 1)]))
                .await
                .unwrap_err(),
            CoreError::UnknownItem(_)
        ));
        assert!(matches!(
            ledger
                .reserve_and_decrement(&cart(&[("ghost", 1)]))
                .await
                .unwrap_err(),
            CoreError::UnknownItem(_)
        ));
    }

    #[tokio::test]
    async fn test_restore_reverses_decrement() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5)]).await;
        let lines = cart(&[("pen", 4)]);

        ledger.reserve_and_decrement(&lines).await.unwrap();
        assert_eq!(ledger.get_quantity("pen").await, Some(1));

        ledger.restore(&lines).await.unwrap();
        assert_eq!(ledger.get_quantity("pen").await, Some(5));
    }

    #[tokio::test]
    async fn test_listing_is_name_sorted_and_excludes_retired() {
        let ledger = ledger_with(vec![
            item("z", "Zebra pen", 1),
            item("a", "Apple juice", 1),
            item("m", "Marker", 1),
        ])
        .await;
        ledger.retire("m").await.unwrap();

        let names: Vec<String> = ledger
            .list_items()
            .await
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Apple juice", "Zebra pen"]);
    }

    #[tokio::test]
    async fn test_replenish_and_set_quantity() {
        let ledger = ledger_with(vec![item("pen", "Pen", 5)]).await;

        let updated = ledger.replenish("pen", 10).await.unwrap();
        assert_eq!(updated.quantity_on_hand, 15);

        let updated = ledger.set_quantity("pen", 3).await.unwrap();
        assert_eq!(updated.quantity_on_hand, 3);
    }

    #[tokio::test]
    async fn test_concurrent_carts_never_oversell() {
        use std::sync::Arc;

        let ledger = Arc::new(ledger_with(vec![item("pen", "Pen", 5)]).await);

        let a = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.reserve_and_decrement(&cart(&[("pen", 3)])).await })
        };
        let b = {
            let ledger = Arc::clone(&ledger);
            tokio::spawn(async move { ledger.reserve_and_decrement(&cart(&[("pen", 3)])).await })
        };

        let results = [a.await.unwrap(), b.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();

        // 5 on hand, two carts of 3: exactly one can win.
        assert_eq!(successes, 1);
        assert_eq!(ledger.get_quantity("pen").await, Some(2));
    }
}
