//! # Store Trait
//!
//! Persistence seam for the engine. The engine treats the store as a dumb
//! durable mirror: the in-memory ledger is authoritative for quantities
//! while the process runs, and the store is what survives a restart.
//!
//! `MemoryStore` is the test backend; the SQLite backend lives in
//! `novabill-store`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use novabill_core::{Invoice, PaymentStatus, StockItem};

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors produced by persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// A write conflicted with existing state (duplicate key, stale row).
    #[error("write conflict: {0}")]
    Conflict(String),

    /// The backend itself failed (connection, SQL, corruption).
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Durable storage for stock items and invoices.
///
/// ## Contract
/// - `commit_invoice` persists the invoice AND the new stock levels in one
///   atomic unit: either both land or neither does.
/// - `mark_invoice_paid` flips `pending → paid` and returns whether this
///   call performed the flip. A `false` return means the row was already
///   paid; callers use it as the idempotency signal.
/// - `list_invoices` returns newest-first.
#[async_trait]
pub trait Store: Send + Sync {
    /// Loads every stock item (active and retired) for ledger hydration.
    async fn load_stock(&self) -> StoreResult<Vec<StockItem>>;

    /// Inserts or fully replaces a stock item.
    async fn save_stock_item(&self, item: &StockItem) -> StoreResult<()>;

    /// Atomically persists a committed invoice together with the
    /// post-commit quantities of every affected item.
    async fn commit_invoice(
        &self,
        invoice: &Invoice,
        stock_levels: &[(String, i64)],
    ) -> StoreResult<()>;

    /// Fetches a single invoice by id.
    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>>;

    /// Lists invoices, newest first.
    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>>;

    /// Marks an invoice paid if (and only if) it is currently pending.
    /// Returns `true` when this call performed the transition, `false`
    /// when the invoice was already paid. Errs with [`StoreError::NotFound`]
    /// for unknown ids.
    async fn mark_invoice_paid(&self, id: &str) -> StoreResult<bool>;
}

// =============================================================================
// In-Memory Store
// =============================================================================

#[derive(Debug, Default)]
struct MemoryInner {
    stock: HashMap<String, StockItem>,
    invoices: Vec<Invoice>,
}

/// HashMap-backed store for tests and ephemeral runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn load_stock(&self) -> StoreResult<Vec<StockItem>> {
        let inner = self.inner.lock().await;
        Ok(inner.stock.values().cloned().collect())
    }

    async fn save_stock_item(&self, item: &StockItem) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        inner.stock.insert(item.id.clone(), item.clone());
        Ok(())
    }

    async fn commit_invoice(
        &self,
        invoice: &Invoice,
        stock_levels: &[(String, i64)],
    ) -> StoreResult<()> {
        let mut inner = self.inner.lock().await;
        for (item_id, quantity) in stock_levels {
            match inner.stock.get_mut(item_id) {
                Some(item) => item.quantity_on_hand = *quantity,
                None => return Err(StoreError::NotFound(item_id.clone())),
            }
        }
        inner.invoices.push(invoice.clone());
        Ok(())
    }

    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        let inner = self.inner.lock().await;
        Ok(inner.invoices.iter().find(|inv| inv.id == id).cloned())
    }

    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>> {
        let inner = self.inner.lock().await;
        let mut out: Vec<Invoice> = inner.invoices.clone();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_invoice_paid(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.lock().await;
        let invoice = inner
            .invoices
            .iter_mut()
            .find(|inv| inv.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        if invoice.status == PaymentStatus::Paid {
            return Ok(false);
        }
        invoice.status = PaymentStatus::Paid;
        Ok(true)
    }
}
