use crate::common::*;

fn order_input(provider_order_id: &str) -> CreateOrder {
    CreateOrder {
        provider: "paystack".to_string(),
        provider_order_id: provider_order_id.to_string(),
        amount_cents: Some(2500),
        currency: Some("NGN".to_string()),
        customer_phone: None,
        status: None,
    }
}

#[test]
fn test_new_order_defaults_to_pending_with_created_at() {
    let conn = setup_test_db();
    let order = queries::create_order(&conn, &order_input("ord-1")).unwrap();

    assert_eq!(order.status, "pending");
    assert!(order.has_status(OrderStatus::Pending));
    assert!(order.created_at > 0);
    assert_eq!(order.amount_cents, Some(2500));
    assert_eq!(order.customer_phone, None);
}

#[test]
fn test_raw_insert_uses_column_defaults() {
    let conn = setup_test_db();
    conn.execute(
        "INSERT INTO orders (id, provider, provider_order_id) VALUES ('o1', 'stripe', 'ext-1')",
        [],
    )
    .unwrap();

    let order = queries::get_order_by_id(&conn, "o1").unwrap().unwrap();
    assert_eq!(order.status, "pending");
    assert!(order.created_at > 0);
    assert_eq!(order.amount_cents, None);
    assert_eq!(order.currency, None);
}

#[test]
fn test_explicit_status_is_kept() {
    let conn = setup_test_db();
    let input = CreateOrder {
        status: Some(OrderStatus::Paid.as_ref().to_string()),
        ..order_input("ord-paid")
    };
    let order = queries::create_order(&conn, &input).unwrap();
    assert!(order.has_status(OrderStatus::Paid));
}

#[test]
fn test_status_is_an_open_string() {
    let conn = setup_test_db();
    let input = CreateOrder {
        status: Some("refunded".to_string()),
        ..order_input("ord-open")
    };
    let order = queries::create_order(&conn, &input).unwrap();
    assert_eq!(order.status, "refunded");
}

#[test]
fn test_duplicate_provider_order_id_is_conflict() {
    let conn = setup_test_db();
    queries::create_order(&conn, &order_input("ord-dup")).unwrap();

    let second = CreateOrder {
        provider: "flutterwave".to_string(),
        ..order_input("ord-dup")
    };
    let result = queries::create_order(&conn, &second);

    assert!(matches!(result, Err(AppError::Conflict(_))), "got {:?}", result);
    let (_, total) = queries::list_orders_paginated(&conn, 10, 0).unwrap();
    assert_eq!(total, 1);
}

#[test]
fn test_missing_provider_is_rejected() {
    let conn = setup_test_db();
    let err: AppError = conn
        .execute(
            "INSERT INTO orders (id, provider_order_id) VALUES ('o1', 'ext-1')",
            [],
        )
        .unwrap_err()
        .into();
    assert!(matches!(err, AppError::MissingValue(_)), "got {:?}", err);
}

#[test]
fn test_create_order_if_absent_is_idempotent() {
    let conn = setup_test_db();
    let input = CreateOrder {
        status: Some("paid".to_string()),
        ..order_input("ord-once")
    };

    let (first, created) = queries::create_order_if_absent(&conn, &input).unwrap();
    assert!(created);
    assert_eq!(first.status, "paid");

    let replay = CreateOrder {
        amount_cents: Some(1),
        status: Some("pending".to_string()),
        ..order_input("ord-once")
    };
    let (second, created) = queries::create_order_if_absent(&conn, &replay).unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(second.status, "paid");
    assert_eq!(second.amount_cents, Some(2500));
}

#[test]
fn test_lookup_by_provider_order_id() {
    let conn = setup_test_db();
    let order = create_test_order(&conn, "ord-find");

    let found = queries::get_order_by_provider_order_id(&conn, "ord-find")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, order.id);

    assert!(
        queries::get_order_by_provider_order_id(&conn, "ord-missing")
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_update_order_status() {
    let conn = setup_test_db();
    let order = create_test_order(&conn, "ord-upd");

    assert!(queries::update_order_status(&conn, &order.id, "paid").unwrap());
    assert!(!queries::update_order_status(&conn, "no-such-order", "paid").unwrap());

    let updated = queries::get_order_by_id(&conn, &order.id).unwrap().unwrap();
    assert!(updated.has_status(OrderStatus::Paid));
}

#[test]
fn test_list_orders_paginated_newest_first() {
    let conn = setup_test_db();
    for i in 0..5 {
        create_test_order(&conn, &format!("ord-{}", i));
    }

    let (page, total) = queries::list_orders_paginated(&conn, 2, 0).unwrap();
    assert_eq!(total, 5);
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].provider_order_id, "ord-4");
    assert_eq!(page[1].provider_order_id, "ord-3");

    let (last, _) = queries::list_orders_paginated(&conn, 2, 4).unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].provider_order_id, "ord-0");
}

#[test]
fn test_list_orders_with_non_positive_limit_returns_no_items() {
    let conn = setup_test_db();
    for i in 0..3 {
        create_test_order(&conn, &format!("ord-{}", i));
    }

    let (page, total) = queries::list_orders_paginated(&conn, -1, 0).unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 3);

    let (page, _) = queries::list_orders_paginated(&conn, 0, 0).unwrap();
    assert!(page.is_empty());
}
