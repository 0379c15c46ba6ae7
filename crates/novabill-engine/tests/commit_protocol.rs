//! Integration tests for the invoice commit protocol, the payment
//! lifecycle, and change-event ordering, run against the in-memory store.

use std::sync::Arc;

use async_trait::async_trait;

use novabill_core::{CartLine, CoreError, Invoice, PaymentStatus, StockItem};
use novabill_engine::{
    BillingEngine, ChangeEvent, EngineError, MemoryStore, NewStockItem, Store, StoreError,
    StoreResult,
};

async fn engine_with(items: &[(&str, i64, i64, u32)]) -> (Arc<BillingEngine>, Vec<String>) {
    let store = Arc::new(MemoryStore::new());
    let engine = BillingEngine::open(store).await.unwrap();

    let mut ids = Vec::new();
    for (name, qty, price, bps) in items {
        let item = engine
            .create_stock_item(NewStockItem {
                name: name.to_string(),
                quantity: *qty,
                unit_price_cents: *price,
                tax_rate_bps: Some(*bps),
                hsn_code: None,
            })
            .await
            .unwrap();
        ids.push(item.id);
    }
    (Arc::new(engine), ids)
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

fn core_err(err: EngineError) -> CoreError {
    match err {
        EngineError::Core(e) => e,
        other => panic!("expected core error, got: {other}"),
    }
}

// =============================================================================
// Pricing
// =============================================================================

#[tokio::test]
async fn commit_prices_cart_with_aggregate_rounding() {
    // 2 × 40.00 at 18% → 80.00 subtotal, 14.40 tax, 94.40 total
    let (engine, ids) = engine_with(&[("Cola", 10, 4000, 1800)]).await;

    let invoice = engine
        .create_invoice("Asha", &cart(&[(&ids[0], 2)]), "cashier-1")
        .await
        .unwrap();

    assert_eq!(invoice.subtotal_cents, 8000);
    assert_eq!(invoice.tax_cents, 1440);
    assert_eq!(invoice.total_cents, 9440);
    assert_eq!(invoice.status, PaymentStatus::Pending);
    assert_eq!(invoice.customer_name, "Asha");
    assert_eq!(invoice.lines.len(), 1);
    assert_eq!(invoice.lines[0].name, "Cola");
    assert_eq!(invoice.lines[0].line_total_cents, 8000);

    let stock = engine.list_stock().await;
    assert_eq!(stock[0].quantity_on_hand, 8);
}

#[tokio::test]
async fn blank_customer_records_walk_in() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;

    let invoice = engine
        .create_invoice("   ", &cart(&[(&ids[0], 1)]), "cashier-1")
        .await
        .unwrap();
    assert_eq!(invoice.customer_name, "walk-in");
}

#[tokio::test]
async fn line_snapshots_survive_later_price_changes() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;

    let invoice = engine
        .create_invoice("", &cart(&[(&ids[0], 1)]), "cashier-1")
        .await
        .unwrap();

    engine
        .update_stock_item(
            &ids[0],
            novabill_engine::StockItemUpdate {
                unit_price_cents: Some(900),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let reread = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(reread.lines[0].unit_price_cents, 500);
    assert_eq!(reread.total_cents, invoice.total_cents);
}

// =============================================================================
// Rejections
// =============================================================================

#[tokio::test]
async fn empty_cart_fails_before_touching_anything() {
    let (engine, _) = engine_with(&[("Pen", 5, 500, 1800)]).await;
    let mut rx = engine.subscribe();

    let err = core_err(
        engine
            .create_invoice("Asha", &[], "cashier-1")
            .await
            .unwrap_err(),
    );
    assert_eq!(err, CoreError::EmptyCart);

    assert!(engine.list_invoices().await.unwrap().is_empty());
    assert_eq!(engine.list_stock().await[0].quantity_on_hand, 5);
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn unknown_item_rejected() {
    let (engine, _) = engine_with(&[("Pen", 5, 500, 1800)]).await;

    let err = core_err(
        engine
            .create_invoice("Asha", &cart(&[("no-such-item", 1)]), "cashier-1")
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::UnknownItem(id) if id == "no-such-item"));
}

#[tokio::test]
async fn shortfall_aborts_whole_cart() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800), ("Cola", 1, 4000, 1800)]).await;
    let mut rx = engine.subscribe();

    let err = core_err(
        engine
            .create_invoice("Asha", &cart(&[(&ids[0], 3), (&ids[1], 2)]), "cashier-1")
            .await
            .unwrap_err(),
    );
    assert!(matches!(
        err,
        CoreError::InsufficientStock { ref item_id, available: 1, requested: 2 }
            if *item_id == ids[1]
    ));

    // Nothing decremented, nothing persisted, nothing announced.
    let stock = engine.list_stock().await;
    let pen = stock.iter().find(|i| i.name == "Pen").unwrap();
    let cola = stock.iter().find(|i| i.name == "Cola").unwrap();
    assert_eq!(pen.quantity_on_hand, 5);
    assert_eq!(cola.quantity_on_hand, 1);
    assert!(engine.list_invoices().await.unwrap().is_empty());
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn quantity_bounds_enforced_per_line() {
    let (engine, ids) = engine_with(&[("Pen", 5000, 500, 1800)]).await;

    let err = core_err(
        engine
            .create_invoice("Asha", &cart(&[(&ids[0], 0)]), "cashier-1")
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::InvalidLineItem { line: 0, .. }));

    let err = core_err(
        engine
            .create_invoice("Asha", &cart(&[(&ids[0], 1000)]), "cashier-1")
            .await
            .unwrap_err(),
    );
    assert!(matches!(err, CoreError::InvalidLineItem { line: 0, .. }));
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test]
async fn concurrent_carts_exactly_one_wins() {
    // Pen with 5 on hand, two concurrent carts of 3 each.
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;

    let a = {
        let engine = Arc::clone(&engine);
        let id = ids[0].clone();
        tokio::spawn(async move {
            engine
                .create_invoice("First", &cart(&[(&id, 3)]), "cashier-1")
                .await
        })
    };
    let b = {
        let engine = Arc::clone(&engine);
        let id = ids[0].clone();
        tokio::spawn(async move {
            engine
                .create_invoice("Second", &cart(&[(&id, 3)]), "cashier-2")
                .await
        })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);

    let loser = results.into_iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        core_err(loser.unwrap_err()),
        CoreError::InsufficientStock { available: 2, requested: 3, .. }
    ));

    assert_eq!(engine.list_stock().await[0].quantity_on_hand, 2);
    assert_eq!(engine.list_invoices().await.unwrap().len(), 1);
}

#[tokio::test]
async fn hammering_commits_never_oversells() {
    let (engine, ids) = engine_with(&[("Pen", 50, 500, 1800)]).await;

    let mut handles = Vec::new();
    for n in 0..20 {
        let engine = Arc::clone(&engine);
        let id = ids[0].clone();
        handles.push(tokio::spawn(async move {
            engine
                .create_invoice(&format!("c{n}"), &cart(&[(&id, 4)]), "cashier-1")
                .await
        }));
    }

    let mut wins = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            wins += 1;
        }
    }

    // 50 / 4 = 12 full carts fit; quantity never goes negative.
    assert_eq!(wins, 12);
    assert_eq!(engine.list_stock().await[0].quantity_on_hand, 2);
    assert_eq!(engine.list_invoices().await.unwrap().len(), 12);
}

// =============================================================================
// Payment Lifecycle
// =============================================================================

#[tokio::test]
async fn pay_flips_once_then_already_paid() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;
    let invoice = engine
        .create_invoice("Asha", &cart(&[(&ids[0], 1)]), "cashier-1")
        .await
        .unwrap();

    let mut rx = engine.subscribe();

    let paid = engine.pay_invoice(&invoice.id).await.unwrap();
    assert_eq!(paid.status, PaymentStatus::Paid);

    // Exactly one invoiceUpdated event for the transition.
    match rx.recv().await.unwrap() {
        ChangeEvent::InvoiceUpdated(inv) => {
            assert_eq!(inv.id, invoice.id);
            assert_eq!(inv.status, PaymentStatus::Paid);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let err = core_err(engine.pay_invoice(&invoice.id).await.unwrap_err());
    assert!(matches!(err, CoreError::AlreadyPaid(id) if id == invoice.id));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn pay_unknown_invoice_fails() {
    let (engine, _) = engine_with(&[]).await;
    let err = core_err(engine.pay_invoice("no-such-invoice").await.unwrap_err());
    assert!(matches!(err, CoreError::UnknownInvoice(_)));
}

#[tokio::test]
async fn concurrent_pays_exactly_one_update_event() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;
    let invoice = engine
        .create_invoice("Asha", &cart(&[(&ids[0], 1)]), "cashier-1")
        .await
        .unwrap();

    let mut rx = engine.subscribe();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = Arc::clone(&engine);
        let id = invoice.id.clone();
        handles.push(tokio::spawn(async move { engine.pay_invoice(&id).await }));
    }

    let mut wins = 0;
    for h in handles {
        if h.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);

    assert!(matches!(
        rx.recv().await.unwrap(),
        ChangeEvent::InvoiceUpdated(_)
    ));
    assert!(matches!(
        rx.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

// =============================================================================
// Change Events
// =============================================================================

#[tokio::test]
async fn commit_publishes_invoice_then_stock() {
    let (engine, ids) = engine_with(&[("Pen", 5, 500, 1800)]).await;
    let mut rx = engine.subscribe();

    let invoice = engine
        .create_invoice("Asha", &cart(&[(&ids[0], 2)]), "cashier-1")
        .await
        .unwrap();

    match rx.recv().await.unwrap() {
        ChangeEvent::InvoiceCreated(inv) => assert_eq!(inv.id, invoice.id),
        other => panic!("unexpected first event: {other:?}"),
    }
    match rx.recv().await.unwrap() {
        ChangeEvent::StockChanged(changes) => {
            assert_eq!(changes.len(), 1);
            assert_eq!(changes[0].stock_item_id, ids[0]);
            assert_eq!(changes[0].quantity_on_hand, 3);
        }
        other => panic!("unexpected second event: {other:?}"),
    }
}

#[tokio::test]
async fn events_arrive_in_commit_order() {
    let (engine, ids) = engine_with(&[("Pen", 100, 500, 1800)]).await;
    let mut rx = engine.subscribe();

    let mut committed = Vec::new();
    for n in 0..5 {
        let inv = engine
            .create_invoice(&format!("c{n}"), &cart(&[(&ids[0], 1)]), "cashier-1")
            .await
            .unwrap();
        committed.push(inv.id);
    }

    for expected_id in &committed {
        match rx.recv().await.unwrap() {
            ChangeEvent::InvoiceCreated(inv) => assert_eq!(&inv.id, expected_id),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            rx.recv().await.unwrap(),
            ChangeEvent::StockChanged(_)
        ));
    }
}

// =============================================================================
// Persist-Failure Compensation
// =============================================================================

/// Store that fails every `commit_invoice`, for rollback testing.
struct FailingStore {
    inner: MemoryStore,
}

#[async_trait]
impl Store for FailingStore {
    async fn load_stock(&self) -> StoreResult<Vec<StockItem>> {
        self.inner.load_stock().await
    }
    async fn save_stock_item(&self, item: &StockItem) -> StoreResult<()> {
        self.inner.save_stock_item(item).await
    }
    async fn commit_invoice(
        &self,
        _invoice: &Invoice,
        _stock_levels: &[(String, i64)],
    ) -> StoreResult<()> {
        Err(StoreError::Backend("disk on fire".into()))
    }
    async fn get_invoice(&self, id: &str) -> StoreResult<Option<Invoice>> {
        self.inner.get_invoice(id).await
    }
    async fn list_invoices(&self) -> StoreResult<Vec<Invoice>> {
        self.inner.list_invoices().await
    }
    async fn mark_invoice_paid(&self, id: &str) -> StoreResult<bool> {
        self.inner.mark_invoice_paid(id).await
    }
}

#[tokio::test]
async fn persist_failure_rolls_back_the_decrement() {
    let store = Arc::new(FailingStore {
        inner: MemoryStore::new(),
    });
    let engine = BillingEngine::open(store).await.unwrap();
    let item = engine
        .create_stock_item(NewStockItem {
            name: "Pen".into(),
            quantity: 5,
            unit_price_cents: 500,
            tax_rate_bps: Some(1800),
            hsn_code: None,
        })
        .await
        .unwrap();

    let err = engine
        .create_invoice("Asha", &cart(&[(&item.id, 3)]), "cashier-1")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    // The in-memory quantity must be back where it started.
    assert_eq!(engine.list_stock().await[0].quantity_on_hand, 5);
}
