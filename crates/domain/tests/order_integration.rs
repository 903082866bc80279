//! Integration tests for order placement, status updates and queries.
//!
//! These tests run the order service against the in-memory store and check
//! the stock, total and atomicity guarantees end to end.

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{
    CustomerId, Money, Order, OrderDetails, OrderId, OrderItem, OrderItemId, OrderStatus, Product,
    ProductId,
};
use domain::{
    ListOrders, OrderError, OrderService, OrderServiceConfig, PlaceOrder, ProductCatalog,
    TransitionPolicy,
};
use order_store::InMemoryStore;
use rust_decimal_macros::dec;

fn product(sku: &str, price: Money, stock: u32) -> Product {
    Product::new(sku, sku, format!("Product {sku}"), price, stock)
}

fn order_for(customer_id: CustomerId) -> PlaceOrder {
    PlaceOrder::new(customer_id, "Calle Falsa 123", "Av. Siempre Viva 742")
}

async fn stock_of(store: &InMemoryStore, product_id: ProductId) -> u32 {
    store.product(product_id).await.unwrap().stock_quantity
}

fn assert_totals(order: &Order) {
    let sum: Money = order.items().iter().map(OrderItem::subtotal).sum();
    assert_eq!(order.total_amount(), sum);
    for item in order.items() {
        assert_eq!(item.subtotal(), item.unit_price().multiply(item.quantity()));
    }
}

mod placement {
    use super::*;

    #[tokio::test]
    async fn place_then_run_out_of_stock() {
        let p = product("SKU-001", Money::new(dec!(100)), 5);
        let store = InMemoryStore::with_products([p.clone()]);
        let service = OrderService::new(store.clone());

        let order = service
            .place_order(order_for(CustomerId::new()).line(p.id, 2))
            .await
            .unwrap();

        assert_eq!(order.status(), OrderStatus::Pending);
        assert_eq!(order.items().len(), 1);
        let item = &order.items()[0];
        assert_eq!(item.product_id(), p.id);
        assert_eq!(item.quantity(), 2);
        assert_eq!(item.unit_price().amount(), dec!(100));
        assert_eq!(item.subtotal().amount(), dec!(200));
        assert_eq!(order.total_amount().amount(), dec!(200));
        assert_eq!(stock_of(&store, p.id).await, 3);

        let err = service
            .place_order(order_for(CustomerId::new()).line(p.id, 10))
            .await
            .unwrap_err();
        match err {
            OrderError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, p.id);
                assert_eq!(requested, 10);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stock_of(&store, p.id).await, 3);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn totals_are_exact_decimals() {
        let a = product("SKU-001", Money::new(dec!(19.99)), 10);
        let b = product("SKU-002", Money::new(dec!(0.10)), 10);
        let store = InMemoryStore::with_products([a.clone(), b.clone()]);
        let service = OrderService::new(store);

        let order = service
            .place_order(order_for(CustomerId::new()).line(a.id, 3).line(b.id, 3))
            .await
            .unwrap();

        assert_eq!(order.total_amount().amount(), dec!(60.27));
        assert_totals(&order);
    }

    #[tokio::test]
    async fn unknown_products_are_all_reported() {
        let known = product("SKU-001", Money::from_units(1), 10);
        let store = InMemoryStore::with_products([known.clone()]);
        let service = OrderService::new(store.clone());
        let missing_a = ProductId::new();
        let missing_b = ProductId::new();

        let err = service
            .place_order(
                order_for(CustomerId::new())
                    .line(missing_a, 1)
                    .line(known.id, 1)
                    .line(missing_b, 1),
            )
            .await
            .unwrap_err();

        match err {
            OrderError::ProductNotFound { product_ids } => {
                assert_eq!(product_ids, vec![missing_a, missing_b]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(stock_of(&store, known.id).await, 10);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn repeated_product_lines_share_one_stock_check() {
        let p = product("SKU-001", Money::from_units(5), 4);
        let store = InMemoryStore::with_products([p.clone()]);
        let service = OrderService::new(store.clone());

        let err = service
            .place_order(order_for(CustomerId::new()).line(p.id, 3).line(p.id, 2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InsufficientStock {
                requested: 5,
                available: 4,
                ..
            }
        ));
        assert_eq!(stock_of(&store, p.id).await, 4);

        let order = service
            .place_order(order_for(CustomerId::new()).line(p.id, 3).line(p.id, 1))
            .await
            .unwrap();
        assert_eq!(order.items().len(), 2);
        assert_eq!(order.total_amount().amount(), dec!(20));
        assert_eq!(stock_of(&store, p.id).await, 0);
    }

    #[tokio::test]
    async fn notes_and_addresses_are_kept() {
        let p = product("SKU-001", Money::from_units(5), 4);
        let service = OrderService::new(InMemoryStore::with_products([p.clone()]));
        let customer_id = CustomerId::new();

        let placed = service
            .place_order(order_for(customer_id).line(p.id, 1).notes("ring twice"))
            .await
            .unwrap();
        let loaded = service.get_order(placed.id()).await.unwrap();

        assert_eq!(loaded.customer_id(), customer_id);
        assert_eq!(loaded.shipping_address(), "Calle Falsa 123");
        assert_eq!(loaded.billing_address(), "Av. Siempre Viva 742");
        assert_eq!(loaded.notes(), Some("ring twice"));
    }
}

mod atomicity {
    use super::*;

    #[tokio::test]
    async fn second_line_short_leaves_first_untouched() {
        let a = product("SKU-001", Money::from_units(10), 10);
        let b = product("SKU-002", Money::from_units(10), 1);
        let store = InMemoryStore::with_products([a.clone(), b.clone()]);
        let service = OrderService::new(store.clone());

        let err = service
            .place_order(order_for(CustomerId::new()).line(a.id, 4).line(b.id, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { product_id, .. } if product_id == b.id));
        assert_eq!(stock_of(&store, a.id).await, 10);
        assert_eq!(stock_of(&store, b.id).await, 1);
        assert_eq!(store.order_count().await, 0);
    }

    #[tokio::test]
    async fn failed_decrement_rolls_back_earlier_decrements() {
        let a = product("SKU-001", Money::from_units(10), 10);
        let b = product("SKU-002", Money::from_units(10), 10);
        let store = InMemoryStore::with_products([a.clone(), b.clone()]);
        store.set_fail_decrement_for(Some(b.id)).await;
        let service = OrderService::new(store.clone());

        let err = service
            .place_order(order_for(CustomerId::new()).line(a.id, 4).line(b.id, 2))
            .await
            .unwrap_err();

        assert!(matches!(err, OrderError::InsufficientStock { product_id, .. } if product_id == b.id));
        assert_eq!(stock_of(&store, a.id).await, 10);
        assert_eq!(stock_of(&store, b.id).await, 10);
        assert_eq!(store.order_count().await, 0);

        store.set_fail_decrement_for(None).await;
        service
            .place_order(order_for(CustomerId::new()).line(a.id, 4).line(b.id, 2))
            .await
            .unwrap();
        assert_eq!(stock_of(&store, a.id).await, 6);
        assert_eq!(stock_of(&store, b.id).await, 8);
    }
}

mod concurrency {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_placements_never_oversell() {
        let p = product("SKU-001", Money::from_units(1), 10);
        let store = InMemoryStore::with_products([p.clone()]);
        let service = Arc::new(OrderService::new(store.clone()));

        let product_id = p.id;
        let attempts = (0..30).map(|i| {
            let service = Arc::clone(&service);
            let quantity = (i % 3) + 1;
            tokio::spawn(async move {
                service
                    .place_order(order_for(CustomerId::new()).line(product_id, quantity))
                    .await
            })
        });

        let results = futures_util::future::join_all(attempts).await;

        let mut reserved = 0;
        for result in results {
            match result.unwrap() {
                Ok(order) => reserved += order.items()[0].quantity(),
                Err(OrderError::InsufficientStock { .. }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        let remaining = stock_of(&store, p.id).await;
        assert!(reserved <= 10);
        assert_eq!(10 - reserved, remaining);
        assert_eq!(
            store.order_count().await,
            service
                .list_orders(ListOrders::new(100))
                .await
                .unwrap()
                .total_count as usize
        );
    }
}

mod status {
    use super::*;

    async fn placed(policy: TransitionPolicy) -> (OrderService<InMemoryStore>, Order) {
        let p = product("SKU-001", Money::from_units(10), 10);
        let service = OrderService::with_config(
            InMemoryStore::with_products([p.clone()]),
            OrderServiceConfig {
                transition_policy: policy,
                ..Default::default()
            },
        );
        let order = service
            .place_order(order_for(CustomerId::new()).line(p.id, 1))
            .await
            .unwrap();
        (service, order)
    }

    #[tokio::test]
    async fn update_to_shipped() {
        let (service, order) = placed(TransitionPolicy::Permissive).await;

        let updated = service.update_status(order.id(), "Shipped").await.unwrap();

        assert_eq!(updated.status(), OrderStatus::Shipped);
        assert_eq!(updated.total_amount(), order.total_amount());
        assert_eq!(updated.items(), order.items());
        assert_eq!(
            service.get_order(order.id()).await.unwrap().status(),
            OrderStatus::Shipped
        );
    }

    #[tokio::test]
    async fn bogus_status_leaves_order_unchanged() {
        let (service, order) = placed(TransitionPolicy::Permissive).await;

        let err = service.update_status(order.id(), "Bogus").await.unwrap_err();

        assert!(matches!(err, OrderError::InvalidStatus(ref s) if s == "Bogus"));
        assert_eq!(
            service.get_order(order.id()).await.unwrap().status(),
            OrderStatus::Pending
        );
    }

    #[tokio::test]
    async fn missing_order_is_reported() {
        let (service, _) = placed(TransitionPolicy::Permissive).await;
        let id = OrderId::new();

        let err = service.update_status(id, "Shipped").await.unwrap_err();

        assert!(matches!(err, OrderError::OrderNotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn permissive_policy_allows_going_back() {
        let (service, order) = placed(TransitionPolicy::Permissive).await;

        service.update_status(order.id(), "Delivered").await.unwrap();
        let reopened = service.update_status(order.id(), "Pending").await.unwrap();

        assert_eq!(reopened.status(), OrderStatus::Pending);
    }

    #[tokio::test]
    async fn lifecycle_policy_follows_the_graph() {
        let (service, order) = placed(TransitionPolicy::Lifecycle).await;

        for next in ["Processing", "Shipped", "Delivered"] {
            service.update_status(order.id(), next).await.unwrap();
        }

        let err = service
            .update_status(order.id(), "Pending")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            }
        ));
        assert_eq!(
            service.get_order(order.id()).await.unwrap().status(),
            OrderStatus::Delivered
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_lifecycle_updates_apply_exactly_one() {
        let (service, order) = placed(TransitionPolicy::Lifecycle).await;
        for next in ["Processing", "Shipped"] {
            service.update_status(order.id(), next).await.unwrap();
        }
        let service = Arc::new(service);

        let handles: Vec<_> = ["Delivered", "Cancelled"]
            .into_iter()
            .map(|next| {
                let service = Arc::clone(&service);
                let order_id = order.id();
                tokio::spawn(async move { service.update_status(order_id, next).await })
            })
            .collect();

        let mut applied = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(updated) => applied.push(updated.status()),
                Err(err) => assert!(matches!(err, OrderError::InvalidTransition { .. })),
            }
        }

        assert_eq!(applied.len(), 1);
        assert_eq!(
            service.get_order(order.id()).await.unwrap().status(),
            applied[0]
        );
    }

    #[tokio::test]
    async fn status_change_does_not_touch_stock() {
        let p = product("SKU-001", Money::from_units(10), 10);
        let store = InMemoryStore::with_products([p.clone()]);
        let service = OrderService::new(store.clone());
        let order = service
            .place_order(order_for(CustomerId::new()).line(p.id, 3))
            .await
            .unwrap();

        service.update_status(order.id(), "Cancelled").await.unwrap();

        assert_eq!(stock_of(&store, p.id).await, 7);
    }
}

mod queries {
    use super::*;

    fn fixture(customer_id: CustomerId, status: OrderStatus, minutes_ago: i64) -> Order {
        let order_id = OrderId::new();
        let item = OrderItem::new(
            OrderItemId::new(),
            order_id,
            ProductId::new(),
            1,
            Money::new(dec!(12.50)),
        );
        Order::restore(
            order_id,
            OrderDetails {
                customer_id,
                shipping_address: "Calle Falsa 123".to_string(),
                billing_address: "Calle Falsa 123".to_string(),
                notes: None,
            },
            Utc::now() - Duration::minutes(minutes_ago),
            status,
            vec![item],
        )
    }

    async fn seeded() -> (OrderService<InMemoryStore>, CustomerId, Vec<Order>) {
        let store = InMemoryStore::new();
        let a = CustomerId::new();
        let b = CustomerId::new();
        let orders = vec![
            fixture(a, OrderStatus::Pending, 40),
            fixture(a, OrderStatus::Shipped, 30),
            fixture(a, OrderStatus::Pending, 20),
            fixture(b, OrderStatus::Pending, 10),
        ];
        for order in &orders {
            store.put_order(order.clone()).await;
        }
        (OrderService::new(store), a, orders)
    }

    #[tokio::test]
    async fn filters_compose() {
        let (service, a, orders) = seeded().await;

        let page = service
            .list_orders(ListOrders::new(10).status("Pending").customer_id(a))
            .await
            .unwrap();

        assert_eq!(page.total_count, 2);
        assert_eq!(
            page.orders.iter().map(Order::id).collect::<Vec<_>>(),
            vec![orders[0].id(), orders[2].id()]
        );
        assert!(
            page.orders
                .iter()
                .all(|o| o.customer_id() == a && o.status() == OrderStatus::Pending)
        );
        assert!(page.orders.iter().all(|o| o.items().len() == 1));

        let beyond = service
            .list_orders(
                ListOrders::new(10)
                    .status("Pending")
                    .customer_id(a)
                    .page(99),
            )
            .await
            .unwrap();
        assert!(beyond.orders.is_empty());
        assert_eq!(beyond.total_count, 2);
    }

    #[tokio::test]
    async fn pages_are_ordered_by_creation() {
        let (service, _, orders) = seeded().await;

        let first = service.list_orders(ListOrders::new(3)).await.unwrap();
        let second = service
            .list_orders(ListOrders::new(3).page(2))
            .await
            .unwrap();

        assert_eq!(first.total_count, 4);
        assert_eq!(first.total_pages(), 2);
        assert_eq!(
            first.orders.iter().map(Order::id).collect::<Vec<_>>(),
            orders[..3].iter().map(Order::id).collect::<Vec<_>>()
        );
        assert_eq!(second.orders.len(), 1);
        assert_eq!(second.orders[0].id(), orders[3].id());
    }

    #[tokio::test]
    async fn empty_and_unknown_status_filters() {
        let (service, _, _) = seeded().await;

        let unfiltered = service
            .list_orders(ListOrders::new(10).status(""))
            .await
            .unwrap();
        assert_eq!(unfiltered.orders.len(), 4);

        let unknown = service
            .list_orders(ListOrders::new(10).status("Lost"))
            .await
            .unwrap();
        assert!(unknown.orders.is_empty());
        assert_eq!(unknown.total_count, 0);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let (service, _, orders) = seeded().await;

        let first = service.get_order(orders[1].id()).await.unwrap();
        let second = service.get_order(orders[1].id()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, orders[1]);
        assert_totals(&first);
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn seeded_products_can_be_ordered() {
        let store = InMemoryStore::new();
        let catalog = ProductCatalog::new(store.clone());
        let service = OrderService::new(store.clone());

        catalog.seed_demo_products().await.unwrap();
        let products = catalog.list_products().await.unwrap();
        let shirt = products.iter().find(|p| p.sku == "SKU-001").unwrap();

        let order = service
            .place_order(order_for(CustomerId::new()).line(shirt.id, 2))
            .await
            .unwrap();

        assert_eq!(order.total_amount().amount(), dec!(5000.00));
        assert_eq!(stock_of(&store, shirt.id).await, 98);
    }
}
