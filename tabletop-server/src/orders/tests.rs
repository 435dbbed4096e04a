use std::sync::Arc;

use shared::message::{OrderChange, OrderReadyPayload, OrdersChangedPayload, QueuePayload};
use shared::models::StaffRole;
use shared::order::{CreateOrderLine, CreateOrderRequest, ModifierSelection, OrderStatus};

use super::*;
use crate::db::repository::menu;
use crate::test_support::*;
use shared::models::MenuItemUpdate;

fn latte_oat(qty: i64, total: i64) -> CreateOrderRequest {
    CreateOrderRequest {
        table_id: 1,
        items: vec![CreateOrderLine {
            item_id: 100,
            quantity: qty,
            price_cents: 250,
            modifiers: ModifierSelection::from([(11, vec![21])]),
        }],
        total_cents: total,
        note: None,
    }
}

async fn setup() -> (sqlx::SqlitePool, Arc<RecordingPublisher>, OrderEngine) {
    let pool = memory_pool().await;
    seed_cafe(&pool).await;
    let publisher = Arc::new(RecordingPublisher::default());
    let engine = engine_with(&pool, publisher.clone());
    (pool, publisher, engine)
}

// ========================================================================
// create
// ========================================================================

#[tokio::test]
async fn test_create_prices_and_persists() {
    let (_pool, publisher, engine) = setup().await;

    let order = engine.create(latte_oat(2, 560)).await.unwrap();
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.total_cents, 560);
    assert_eq!(order.lines.len(), 1);
    assert_eq!(order.lines[0].item_name, "Latte");
    assert_eq!(order.lines[0].modifier_delta_cents, 30);

    let stored = engine.get(order.id).await.unwrap();
    assert_eq!(stored, order);

    let t = topics();
    assert_eq!(
        publisher.topics(),
        vec![t.printing(), t.table_queue(1), t.orders_changed()]
    );
    let queue: QueuePayload = publisher.on(&t.table_queue(1))[0].parse_payload().unwrap();
    assert_eq!(queue.ahead, 0);
    let changed: OrdersChangedPayload =
        publisher.on(&t.orders_changed())[0].parse_payload().unwrap();
    assert_eq!(changed.change, OrderChange::Created);
    assert_eq!(changed.status, Some(OrderStatus::Placed));
}

#[tokio::test]
async fn test_create_declared_total_mismatch() {
    let (_pool, publisher, engine) = setup().await;

    let err = engine.create(latte_oat(2, 500)).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::PriceMismatch {
            declared: 500,
            computed: 560,
            line: None
        }
    ));
    assert!(publisher.messages().is_empty());
    assert!(engine.list(&OrderFilter::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_stale_line_price() {
    let (_pool, _publisher, engine) = setup().await;
    let mut req = latte_oat(1, 280);
    req.items[0].price_cents = 200;

    let err = engine.create(req).await.unwrap_err();
    assert!(matches!(
        err,
        OrderError::PriceMismatch {
            declared: 200,
            computed: 250,
            line: Some(0)
        }
    ));
}

#[tokio::test]
async fn test_create_validation_failures() {
    let (_pool, _publisher, engine) = setup().await;

    let mut req = latte_oat(1, 280);
    req.items.clear();
    assert!(matches!(engine.create(req).await, Err(OrderError::EmptyOrder)));

    let mut req = latte_oat(1, 280);
    req.table_id = 404;
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::TableNotFound(404))
    ));

    let mut req = latte_oat(1, 280);
    req.table_id = 9;
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::TableInactive(9))
    ));

    let req = latte_oat(0, 0);
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::InvalidQuantity { line: 0 })
    ));

    let mut req = latte_oat(1, 450);
    req.items[0] = CreateOrderLine {
        item_id: 102,
        quantity: 1,
        price_cents: 450,
        modifiers: ModifierSelection::new(),
    };
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::ItemUnavailable { item_id: 102, .. })
    ));

    let mut req = latte_oat(1, 280);
    req.items[0].item_id = 999;
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::ItemNotFound { item_id: 999, .. })
    ));

    // Warm 规格属于 Muffin，不属于 Latte
    let mut req = latte_oat(1, 250);
    req.items[0].modifiers = ModifierSelection::from([(12, vec![23])]);
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::ModifierInvalid { line: 0, .. })
    ));

    let mut req = latte_oat(1, 280);
    req.note = Some("x".repeat(501));
    assert!(matches!(
        engine.create(req).await,
        Err(OrderError::Validation(_))
    ));
}

#[tokio::test]
async fn test_total_frozen_after_price_change() {
    let (pool, _publisher, engine) = setup().await;
    let order = engine.create(latte_oat(2, 560)).await.unwrap();

    menu::update_item(
        &pool,
        100,
        &MenuItemUpdate {
            price_cents: Some(999),
            is_available: None,
        },
    )
    .await
    .unwrap();

    let stored = engine.get(order.id).await.unwrap();
    assert_eq!(stored.total_cents, 560);
    assert_eq!(stored.lines[0].unit_price_cents, 250);
}

#[tokio::test]
async fn test_queue_ahead_counts_earlier_orders() {
    let (_pool, publisher, engine) = setup().await;
    engine.create(latte_oat(1, 280)).await.unwrap();
    engine.create(latte_oat(1, 280)).await.unwrap();

    let t = topics();
    let queue = publisher.on(&t.table_queue(1));
    let last: QueuePayload = queue.last().unwrap().parse_payload().unwrap();
    assert_eq!(last.ahead, 1);
}

#[tokio::test]
async fn test_publish_failure_does_not_fail_create() {
    let pool = memory_pool().await;
    seed_cafe(&pool).await;
    let engine = engine_with(&pool, Arc::new(FailingPublisher));

    let order = engine.create(latte_oat(2, 560)).await.unwrap();
    assert_eq!(engine.get(order.id).await.unwrap().total_cents, 560);

    let t = engine
        .transition(order.id, OrderStatus::Preparing, Some(StaffRole::Cook))
        .await
        .unwrap();
    assert_eq!(t.outcome, TransitionOutcome::Applied);
}

#[tokio::test]
async fn test_failed_line_insert_leaves_no_order() {
    let (pool, publisher, engine) = setup().await;
    sqlx::query(
        "CREATE TRIGGER fail_line_insert BEFORE INSERT ON order_line \
         BEGIN SELECT RAISE(ABORT, 'line insert failed'); END",
    )
    .execute(&pool)
    .await
    .unwrap();

    let err = engine.create(latte_oat(1, 280)).await.unwrap_err();
    assert!(matches!(err, OrderError::Storage(_)));

    // 订单头随事务一起回滚
    let (orders,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(orders, 0);
    assert!(engine.list(&OrderFilter::default()).await.unwrap().is_empty());
    assert!(publisher.messages().is_empty());
}

// ========================================================================
// transition
// ========================================================================

#[tokio::test]
async fn test_full_lifecycle_events() {
    let (_pool, publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();
    publisher.clear();
    let t = topics();

    engine
        .transition(order.id, OrderStatus::Preparing, Some(StaffRole::Cook))
        .await
        .unwrap();
    assert_eq!(publisher.topics(), vec![t.orders_changed()]);

    publisher.clear();
    let ready = engine
        .transition(order.id, OrderStatus::Ready, Some(StaffRole::Cook))
        .await
        .unwrap();
    assert_eq!(ready.order.status, OrderStatus::Ready);
    assert_eq!(publisher.topics(), vec![t.table_ready(1), t.orders_changed()]);
    let payload: OrderReadyPayload = publisher.on(&t.table_ready(1))[0].parse_payload().unwrap();
    assert_eq!(payload.order_id, order.id);

    publisher.clear();
    engine
        .transition(order.id, OrderStatus::Served, Some(StaffRole::Waiter))
        .await
        .unwrap();
    assert_eq!(publisher.topics(), vec![t.orders_changed()]);
    let changed: OrdersChangedPayload =
        publisher.on(&t.orders_changed())[0].parse_payload().unwrap();
    assert_eq!(changed.status, Some(OrderStatus::Served));
    assert_eq!(changed.by, Some(StaffRole::Waiter));
}

#[tokio::test]
async fn test_same_target_is_idempotent() {
    let (_pool, publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();

    let first = engine
        .transition(order.id, OrderStatus::Preparing, None)
        .await
        .unwrap();
    assert_eq!(first.outcome, TransitionOutcome::Applied);

    publisher.clear();
    let second = engine
        .transition(order.id, OrderStatus::Preparing, None)
        .await
        .unwrap();
    assert_eq!(second.outcome, TransitionOutcome::AlreadyApplied);
    assert_eq!(second.order.status, OrderStatus::Preparing);
    assert_eq!(second.order.lines.len(), 1);
    assert!(publisher.messages().is_empty());
}

#[tokio::test]
async fn test_non_whitelisted_pairs_rejected() {
    let (pool, publisher, engine) = setup().await;

    for from in OrderStatus::ALL {
        for to in OrderStatus::ALL {
            if from == to || from.can_transition_to(to) {
                continue;
            }
            let id = 10_000 + (from as i64) * 10 + to as i64;
            seed_order(&pool, id, 1, from.as_str(), 100, 1).await;

            let err = engine.transition(id, to, None).await.unwrap_err();
            assert!(
                matches!(err, OrderError::InvalidTransition { from: f, to: t } if f == from && t == to),
                "{from} -> {to} should be rejected"
            );
            assert_eq!(engine.get(id).await.unwrap().status, from);
        }
    }
    assert!(publisher.messages().is_empty());
}

#[tokio::test]
async fn test_served_cannot_go_back() {
    let (_pool, _publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();
    for to in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Served] {
        engine.transition(order.id, to, None).await.unwrap();
    }

    let err = engine
        .transition(order.id, OrderStatus::Preparing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrderError::InvalidTransition { .. }));
    assert_eq!(engine.get(order.id).await.unwrap().status, OrderStatus::Served);
}

#[tokio::test]
async fn test_cancel_and_missing_order() {
    let (_pool, publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();
    publisher.clear();

    let t = engine.cancel(order.id, Some(StaffRole::Cook)).await.unwrap();
    assert_eq!(t.order.status, OrderStatus::Cancelled);
    let changed: OrdersChangedPayload = publisher.messages()[0].parse_payload().unwrap();
    assert_eq!(changed.by, Some(StaffRole::Cook));

    assert!(matches!(
        engine.transition(42, OrderStatus::Ready, None).await,
        Err(OrderError::NotFound(42))
    ));
}

#[tokio::test]
async fn test_concurrent_transitions_single_winner() {
    let (_pool, publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();
    publisher.clear();

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine
                    .transition(order.id, OrderStatus::Preparing, None)
                    .await
            })
        })
        .collect();
    let results = futures::future::join_all(tasks).await;

    let applied = results
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .filter(|t| t.outcome == TransitionOutcome::Applied)
        .count();
    assert_eq!(applied, 1);
    assert_eq!(publisher.messages().len(), 1);
}

// ========================================================================
// delete / list
// ========================================================================

#[tokio::test]
async fn test_delete_cascades_and_notifies() {
    let (pool, publisher, engine) = setup().await;
    let order = engine.create(latte_oat(1, 280)).await.unwrap();
    publisher.clear();

    engine
        .delete(order.id, Some(StaffRole::Manager))
        .await
        .unwrap();
    assert!(matches!(
        engine.get(order.id).await,
        Err(OrderError::NotFound(_))
    ));
    let lines: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM order_line")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(lines, 0);

    let changed: OrdersChangedPayload = publisher.messages()[0].parse_payload().unwrap();
    assert_eq!(changed.change, OrderChange::Deleted);
    assert_eq!(changed.status, None);

    assert!(matches!(
        engine.delete(order.id, None).await,
        Err(OrderError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_list_filters_newest_first() {
    let (_pool, _publisher, engine) = setup().await;
    let a = engine.create(latte_oat(1, 280)).await.unwrap();
    let mut req = latte_oat(1, 280);
    req.table_id = 2;
    let b = engine.create(req).await.unwrap();
    engine
        .transition(a.id, OrderStatus::Preparing, None)
        .await
        .unwrap();

    let all = engine.list(&OrderFilter::default()).await.unwrap();
    assert_eq!(all.iter().map(|o| o.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    assert!(all.iter().all(|o| o.lines.len() == 1));

    let placed = engine
        .list(&OrderFilter {
            statuses: vec![OrderStatus::Placed],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed[0].id, b.id);

    let table1 = engine
        .list(&OrderFilter {
            table_id: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(table1.len(), 1);
    assert_eq!(table1[0].id, a.id);
}
