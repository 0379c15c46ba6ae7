//! # Billing Engine
//!
//! Orchestrates the invoice commit protocol over the stock ledger, the
//! store, and the change bus.
//!
//! ## The Commit Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_invoice(customer, cart, user)                                   │
//! │                                                                         │
//! │   1. REJECT     empty cart / oversized cart / bad quantities            │
//! │                 (no lock taken, ledger untouched)                       │
//! │   2. LOCK       commit mutex, bounded wait → Busy                       │
//! │   3. DECREMENT  ledger.reserve_and_decrement (all-or-nothing)           │
//! │   4. PRICE      compute totals from the frozen snapshots                │
//! │   5. PERSIST    store.commit_invoice (invoice + stock levels, atomic)   │
//! │                 on failure: ledger.restore, error out                   │
//! │   6. PUBLISH    invoiceCreated, then stockChanged                       │
//! │                                                                         │
//! │  Steps 3-6 run under the commit mutex, so subscribers observe events    │
//! │  in exactly the order invoices committed.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payment does not take the commit mutex: marking an invoice paid is a
//! single conditional store write, and its idempotency comes from the
//! store's compare-and-set, not from serialization against commits.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use novabill_core::{
    compute_totals, validation, CartLine, CoreError, Invoice, LineInput, LineItem, PaymentStatus,
    StockItem, DEFAULT_TAX_RATE_BPS,
};

use crate::bus::{ChangeBus, ChangeEvent, StockChange, DEFAULT_EVENT_BUFFER};
use crate::error::{EngineError, EngineResult};
use crate::ledger::StockLedger;
use crate::store::Store;

/// Commit mutex wait per attempt.
const COMMIT_LOCK_WAIT: Duration = Duration::from_millis(200);

/// Commit mutex acquisition attempts before `Busy`.
const COMMIT_LOCK_ATTEMPTS: u32 = 3;

/// Fields for creating a stock item.
#[derive(Debug, Clone)]
pub struct NewStockItem {
    pub name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Defaults to 18% GST when omitted.
    pub tax_rate_bps: Option<u32>,
    pub hsn_code: Option<String>,
}

/// Mutable fields of an existing stock item. `None` leaves a field as-is.
#[derive(Debug, Clone, Default)]
pub struct StockItemUpdate {
    pub name: Option<String>,
    pub unit_price_cents: Option<i64>,
    pub tax_rate_bps: Option<u32>,
    pub hsn_code: Option<Option<String>>,
}

/// The invoice–inventory consistency engine.
///
/// Cheap to clone behind an `Arc`; one instance per process.
pub struct BillingEngine {
    ledger: StockLedger,
    store: Arc<dyn Store>,
    bus: ChangeBus,
    commit_lock: Mutex<()>,
}

impl BillingEngine {
    /// Opens the engine: hydrates the ledger from the store and wires the
    /// change bus.
    pub async fn open(store: Arc<dyn Store>) -> EngineResult<Self> {
        Self::open_with_buffer(store, DEFAULT_EVENT_BUFFER).await
    }

    /// Like [`open`](Self::open) with an explicit event ring-buffer size.
    pub async fn open_with_buffer(store: Arc<dyn Store>, buffer: usize) -> EngineResult<Self> {
        let stock = store.load_stock().await?;
        info!(items = stock.len(), "hydrating stock ledger");

        Ok(BillingEngine {
            ledger: StockLedger::hydrate(stock),
            store,
            bus: ChangeBus::new(buffer),
            commit_lock: Mutex::new(()),
        })
    }

    /// Registers a change-event observer.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChangeEvent> {
        self.bus.subscribe()
    }

    // =========================================================================
    // Inventory Operations
    // =========================================================================

    /// Lists all active stock items, sorted by name.
    pub async fn list_stock(&self) -> Vec<StockItem> {
        self.ledger.list_items().await
    }

    /// Fetches one stock item by id.
    pub async fn get_stock_item(&self, item_id: &str) -> EngineResult<StockItem> {
        self.ledger
            .get_item(item_id)
            .await
            .ok_or_else(|| CoreError::UnknownItem(item_id.to_string()).into())
    }

    /// Creates a stock item, persists it, and announces the new quantity.
    pub async fn create_stock_item(&self, new: NewStockItem) -> EngineResult<StockItem> {
        validation::validate_item_name(&new.name).map_err(CoreError::from)?;
        validation::validate_stock_quantity(new.quantity).map_err(CoreError::from)?;
        validation::validate_price_cents(new.unit_price_cents).map_err(CoreError::from)?;
        let tax_rate_bps = new.tax_rate_bps.unwrap_or(DEFAULT_TAX_RATE_BPS);
        validation::validate_tax_rate_bps(tax_rate_bps).map_err(CoreError::from)?;
        if let Some(code) = &new.hsn_code {
            validation::validate_hsn_code(code).map_err(CoreError::from)?;
        }

        let now = Utc::now();
        let item = StockItem {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            quantity_on_hand: new.quantity,
            unit_price_cents: new.unit_price_cents,
            tax_rate_bps,
            hsn_code: new.hsn_code,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        self.ledger.upsert(item.clone()).await?;
        self.store.save_stock_item(&item).await?;
        self.publish_stock_changed(&[item.clone()]);

        info!(item_id = %item.id, name = %item.name, "stock item created");
        Ok(item)
    }

    /// Updates descriptive fields of an item (name, price, rate, HSN).
    /// Quantity changes go through [`replenish`](Self::replenish) or
    /// [`set_stock_quantity`](Self::set_stock_quantity).
    pub async fn update_stock_item(
        &self,
        item_id: &str,
        update: StockItemUpdate,
    ) -> EngineResult<StockItem> {
        let mut item = self.get_stock_item(item_id).await?;
        if !item.is_active {
            return Err(CoreError::UnknownItem(item_id.to_string()).into());
        }

        if let Some(name) = update.name {
            validation::validate_item_name(&name).map_err(CoreError::from)?;
            item.name = name.trim().to_string();
        }
        if let Some(price) = update.unit_price_cents {
            validation::validate_price_cents(price).map_err(CoreError::from)?;
            item.unit_price_cents = price;
        }
        if let Some(bps) = update.tax_rate_bps {
            validation::validate_tax_rate_bps(bps).map_err(CoreError::from)?;
            item.tax_rate_bps = bps;
        }
        if let Some(hsn) = update.hsn_code {
            if let Some(code) = &hsn {
                validation::validate_hsn_code(code).map_err(CoreError::from)?;
            }
            item.hsn_code = hsn;
        }
        item.updated_at = Utc::now();

        self.ledger.upsert(item.clone()).await?;
        self.store.save_stock_item(&item).await?;

        debug!(item_id = %item.id, "stock item updated");
        Ok(item)
    }

    /// Adds units to an item's quantity-on-hand (goods received).
    pub async fn replenish(&self, item_id: &str, amount: i64) -> EngineResult<StockItem> {
        if amount <= 0 {
            return Err(CoreError::Validation(
                novabill_core::ValidationError::MustBePositive {
                    field: "replenish amount",
                },
            )
            .into());
        }

        let item = self.ledger.replenish(item_id, amount).await?;
        self.store.save_stock_item(&item).await?;
        self.publish_stock_changed(&[item.clone()]);
        Ok(item)
    }

    /// Sets an item's quantity-on-hand to an absolute value (stock take).
    pub async fn set_stock_quantity(&self, item_id: &str, quantity: i64) -> EngineResult<StockItem> {
        validation::validate_stock_quantity(quantity).map_err(CoreError::from)?;

        let item = self.ledger.set_quantity(item_id, quantity).await?;
        self.store.save_stock_item(&item).await?;
        self.publish_stock_changed(&[item.clone()]);
        Ok(item)
    }

    /// Soft-retires an item. Historical invoices keep resolving its name.
    pub async fn retire_stock_item(&self, item_id: &str) -> EngineResult<StockItem> {
        let item = self.ledger.retire(item_id).await?;
        self.store.save_stock_item(&item).await?;
        info!(item_id = %item.id, "stock item retired");
        Ok(item)
    }

    // =========================================================================
    // Invoice Commit Protocol
    // =========================================================================

    /// Commits an invoice from a cart: atomically decrements stock, prices
    /// the frozen snapshots, persists, and publishes change events.
    ///
    /// An empty customer name records the sale against "walk-in".
    pub async fn create_invoice(
        &self,
        customer_name: &str,
        cart: &[CartLine],
        created_by: &str,
    ) -> EngineResult<Invoice> {
        // Step 1: structural rejection, before any lock or ledger access.
        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        validation::validate_cart_size(cart.len()).map_err(CoreError::from)?;
        validation::validate_customer_name(customer_name).map_err(CoreError::from)?;
        for (index, line) in cart.iter().enumerate() {
            if let Err(e) = validation::validate_quantity(line.quantity) {
                return Err(CoreError::InvalidLineItem {
                    line: index,
                    reason: e.to_string(),
                }
                .into());
            }
        }

        // Step 2: serialize commits so events leave in commit order.
        let _commit = self.commit_guard().await?;

        // Step 3: all-or-nothing decrement with frozen price snapshots.
        let snapshots = self.ledger.reserve_and_decrement(cart).await?;

        // Step 4: price the snapshots.
        let inputs: Vec<LineInput> = snapshots
            .iter()
            .map(|s| LineInput {
                unit_price_cents: s.unit_price_cents,
                quantity: s.quantity,
                tax_rate_bps: s.tax_rate_bps,
            })
            .collect();
        let (line_totals, totals) = match compute_totals(&inputs) {
            Ok(v) => v,
            Err(e) => {
                // Decrement already applied; compensate before erroring.
                self.ledger.restore(cart).await?;
                return Err(e.into());
            }
        };

        let lines: Vec<LineItem> = snapshots
            .iter()
            .zip(line_totals.iter())
            .map(|(s, t)| LineItem {
                stock_item_id: s.stock_item_id.clone(),
                name: s.name.clone(),
                quantity: s.quantity,
                unit_price_cents: s.unit_price_cents,
                tax_rate_bps: s.tax_rate_bps,
                line_total_cents: t.line_total_cents,
                tax_cents: t.tax_cents,
            })
            .collect();

        let customer = customer_name.trim();
        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            customer_name: if customer.is_empty() {
                "walk-in".to_string()
            } else {
                customer.to_string()
            },
            lines,
            subtotal_cents: totals.subtotal_cents,
            tax_cents: totals.tax_cents,
            total_cents: totals.total_cents,
            status: PaymentStatus::Pending,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        };

        // Step 5: persist invoice + new quantities atomically.
        let stock_levels: Vec<(String, i64)> = snapshots
            .iter()
            .map(|s| (s.stock_item_id.clone(), s.remaining_quantity))
            .collect();
        if let Err(e) = self.store.commit_invoice(&invoice, &stock_levels).await {
            warn!(invoice_id = %invoice.id, error = %e, "persist failed, rolling back ledger");
            self.ledger.restore(cart).await?;
            return Err(e.into());
        }

        // Step 6: announce, still under the commit lock.
        self.bus.publish(ChangeEvent::InvoiceCreated(invoice.clone()));
        self.bus.publish(ChangeEvent::StockChanged(
            snapshots
                .iter()
                .map(|s| StockChange {
                    stock_item_id: s.stock_item_id.clone(),
                    name: s.name.clone(),
                    quantity_on_hand: s.remaining_quantity,
                })
                .collect(),
        ));

        info!(
            invoice_id = %invoice.id,
            total_cents = invoice.total_cents,
            lines = invoice.lines.len(),
            "invoice committed"
        );
        Ok(invoice)
    }

    /// Marks a pending invoice as paid.
    ///
    /// Exactly one caller wins a concurrent race; everyone else gets
    /// [`CoreError::AlreadyPaid`]. Emits a single `invoiceUpdated` event
    /// for the winning transition.
    pub async fn pay_invoice(&self, invoice_id: &str) -> EngineResult<Invoice> {
        let flipped = match self.store.mark_invoice_paid(invoice_id).await {
            Ok(flipped) => flipped,
            Err(crate::store::StoreError::NotFound(_)) => {
                return Err(CoreError::UnknownInvoice(invoice_id.to_string()).into())
            }
            Err(e) => return Err(e.into()),
        };
        if !flipped {
            return Err(CoreError::AlreadyPaid(invoice_id.to_string()).into());
        }

        let invoice = self
            .store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| CoreError::UnknownInvoice(invoice_id.to_string()))?;

        self.bus.publish(ChangeEvent::InvoiceUpdated(invoice.clone()));
        info!(invoice_id = %invoice.id, "invoice paid");
        Ok(invoice)
    }

    /// Fetches one invoice by id.
    pub async fn get_invoice(&self, invoice_id: &str) -> EngineResult<Invoice> {
        self.store
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| CoreError::UnknownInvoice(invoice_id.to_string()).into())
    }

    /// Lists all invoices, newest first.
    pub async fn list_invoices(&self) -> EngineResult<Vec<Invoice>> {
        Ok(self.store.list_invoices().await?)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn commit_guard(&self) -> EngineResult<tokio::sync::MutexGuard<'_, ()>> {
        for attempt in 1..=COMMIT_LOCK_ATTEMPTS {
            match timeout(COMMIT_LOCK_WAIT, self.commit_lock.lock()).await {
                Ok(guard) => return Ok(guard),
                Err(_) => warn!(attempt, "commit lock wait timed out"),
            }
        }
        Err(CoreError::Busy.into())
    }

    fn publish_stock_changed(&self, items: &[StockItem]) {
        self.bus.publish(ChangeEvent::StockChanged(
            items
                .iter()
                .map(|i| StockChange {
                    stock_item_id: i.id.clone(),
                    name: i.name.clone(),
                    quantity_on_hand: i.quantity_on_hand,
                })
                .collect(),
        ));
    }
}
