//! # SQLite Store
//!
//! [`Store`] implementation over sqlx. The one structural guarantee this
//! module owns: `commit_invoice` writes the invoice header, its lines, and
//! the new stock quantities inside a single transaction.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use tracing::debug;

use novabill_core::{Invoice, LineItem, PaymentStatus, StockItem};
use novabill_engine::{Store, StoreError, StoreResult};

use crate::pool::{connect, StoreConfig};

/// SQLite-backed store.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (and migrates) the database described by `config`.
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        let pool = connect(&config).await?;
        Ok(SqliteStore { pool })
    }

    /// The underlying pool, for maintenance tooling.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct StockItemRow {
    id: String,
    name: String,
    quantity_on_hand: i64,
    unit_price_cents: i64,
    tax_rate_bps: i64,
    hsn_code: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockItemRow> for StockItem {
    fn from(row: StockItemRow) -> Self {
        StockItem {
            id: row.id,
            name: row.name,
            quantity_on_hand: row.quantity_on_hand,
            unit_price_cents: row.unit_price_cents,
            tax_rate_bps: row.tax_rate_bps as u32,
            hsn_code: row.hsn_code,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    customer_name: String,
    subtotal_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, lines: Vec<LineItem>) -> StoreResult<Invoice> {
        let status = PaymentStatus::parse(&self.status).ok_or_else(|| {
            StoreError::Backend(format!("invoice {} has bad status: {}", self.id, self.status))
        })?;
        Ok(Invoice {
            id: self.id,
            customer_name: self.customer_name,
            lines,
            subtotal_cents: self.subtotal_cents,
            tax_cents: self.tax_cents,
            total_cents: self.total_cents,
            status,
            created_by: self.created_by,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LineRow {
    invoice_id: String,
    stock_item_id: String,
    name: String,
    quantity: i64,
    unit_price_cents: i64,
    tax_rate_bps: i64,
    line_total_cents: i64,
    tax_cents: i64,
}

impl From<LineRow> for LineItem {
    fn from(row: LineRow) -> Self {
        LineItem {
            stock_item_id: row.stock_item_id,
            name: row.name,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            tax_rate_bps: row.tax_rate_bps as u32,
            line_total_cents: row.line_total_cents,
            tax_cents: row.tax_cents,
        }
    }
}

// =============================================================================
// Store Impl
// =============================================================================

#[async_trait]
impl Store for SqliteStore {
    async fn load_stock(&self) -> StoreResult<Vec<StockItem>> {
        let rows: Vec<StockItemRow> = sqlx::query_as(
            "SELECT id, name, quantity_on_hand, unit_price_cents, tax_rate_bps,
                    hsn_code, is_active, created_at, updated_at
             FROM stock_items",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(rows.into_iter().map(StockItem::from).collect())
    }

    async fn save_stock_item(&self, item: &StockItem) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO stock_items
                 (id, name, quantity_on_hand, unit_price_cents, tax_rate_bps,
                  hsn_code, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT (id) DO UPDATE SET
                 name = excluded.name,
                 quantity_on_hand = excluded.quantity_on_hand,
                 unit_price_cents = excluded.unit_price_cents,
                 tax_rate_bps = excluded.tax_rate_bps,
                 hsn_code = excluded.hsn_code,
                 is_active = excluded.is_active,
                 updated_at = excluded.updated_at",
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.quantity_on_hand)
        .bind(item.unit_price_cents)
        .bind(item.tax_rate_bps as i64)
        .bind(&item.hsn_code)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        debug!(item_id = %item.id, "stock item saved");
        Ok(())
    }

    async fn commit_invoice(
        &self,
        invoice: &Invoice,
        stock_levels: &[(String, i64)],
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO invoices
                 (id, customer_name, subtotal_cents, tax_cents, total_cents,
                  status, created_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&invoice.id)
        .bind(&invoice.customer_name)
        .bind(invoice.subtotal_cents)
        .bind(invoice.tax_cents)
        .bind(invoice.total_cents)
        .bind(invoice.status.as_str())
        .bind(&invoice.created_by)
        .bind(invoice.created_at)
        .execute(&mut *tx)
        .await
        .map_err(backend)?;

        for (position, line) in invoice.lines.iter().enumerate() {
            sqlx::query(
                "INSERT INTO invoice_lines
                     (invoice_id, position, stock_item_id, name, quantity,
                      unit_price_cents, tax_rate_bps, line_total_cents, tax_cents)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .bind(&invoice.id)
            .bind(position as i64)
            .bind(&line.stock_item_id)
            .bind(&line.name)
            .bind(line.quantity)
            .bind(line.unit_price_cents)
            .bind(line.tax_rate_bps as i64)
            .bind(line.line_total_cents)
            .bind(line.tax_cents)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        for (item_id, quantity) in stock_levels {
            let result = sqlx::query(
                "UPDATE stock_items SET quantity_on_hand = ?1, updated_at = ?2 WHERE id = ?3",
            )
            .bind(quantity)
            .bind(Utc::now())
            .bind(item_id)
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if result.rows_affected() == 0 {
                // Rolls back the whole commit on drop.
                return Err(StoreError::NotFound(item_id.clone()));
            }
        }

        tx.commit().await.map_err(backend)?;
        debug!(invoice_id = %invoice.id, "invoice committed to sqlite");
        Ok(())
    }

    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            "SELECT id, customer_name, subtotal_cents, tax_cents, total_cents,
                    status, created_by, created_at
             FROM invoices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        let Some(row) = row else { return Ok(None) };

        let lines: Vec<LineRow> = sqlx::query_as(
            "SELECT invoice_id, stock_item_id, name, quantity, unit_price_cents,
                    tax_rate_bps, line_total_cents, tax_cents
             FROM invoice_lines WHERE invoice_id = ?1
             ORDER BY position",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        Ok(Some(row.into_invoice(
            lines.into_iter().map(LineItem::from).collect(),
        )?))
    }

    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> = sqlx::query_as(
            "SELECT id, customer_name, subtotal_cents, tax_cents, total_cents,
                    status, created_by, created_at
             FROM invoices ORDER BY created_at DESC, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let line_rows: Vec<LineRow> = sqlx::query_as(
            "SELECT invoice_id, stock_item_id, name, quantity, unit_price_cents,
                    tax_rate_bps, line_total_cents, tax_cents
             FROM invoice_lines ORDER BY invoice_id, position",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        let mut lines_by_invoice: HashMap<String, Vec<LineItem>> = HashMap::new();
        for row in line_rows {
            lines_by_invoice
                .entry(row.invoice_id.clone())
                .or_default()
                .push(LineItem::from(row));
        }

        rows.into_iter()
            .map(|row| {
                let lines = lines_by_invoice.remove(&row.id).unwrap_or_default();
                row.into_invoice(lines)
            })
            .collect()
    }

    async fn mark_invoice_paid(&self, id: &str) -> StoreResult<bool> {
        // Conditional flip: rows_affected tells us whether THIS call won.
        let result = sqlx::query(
            "UPDATE invoices SET status = 'paid' WHERE id = ?1 AND status = 'pending'",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM invoices WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match exists {
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }
}
