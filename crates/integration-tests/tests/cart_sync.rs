//! Cart store against a mocked backend over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;
use serde_json::json;
use vitrine_core::{LineItemId, Product, ProductId, QuantityDelta, UserId};
use vitrine_integration_tests::{
    TestContext, USER_ID, bearer, line_json, product_json, session,
};
use vitrine_storefront::{NoticeLevel, Session, StoreError};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_cart(ctx: &TestContext, items: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .and(query_param("userId", USER_ID))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": items })))
        .expect(1)
        .mount(&ctx.server)
        .await;
}

async fn load(ctx: &TestContext) {
    ctx.state
        .cart()
        .start(&session(), &UserId::new(USER_ID))
        .await
        .unwrap();
}

fn mug() -> Product {
    serde_json::from_value(product_json("p-1", "Mug", &[("v-1", 12.5, 5)])).unwrap()
}

// ============================================================================
// Fetch & Mirror
// ============================================================================

#[tokio::test]
async fn test_fetch_replaces_cart_and_mirrors_it() {
    let ctx = TestContext::new().await;
    mount_cart(
        &ctx,
        json!([
            line_json("l-1", json!("p-1"), "v-1", 12.5, 2),
            line_json(
                "l-2",
                product_json("p-2", "Plate", &[("v-9", 30.0, 3)]),
                "v-9",
                30.0,
                1
            ),
        ]),
    )
    .await;

    load(&ctx).await;

    let items = ctx.state.cart().items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].max_quantity, 10);
    assert_eq!(items[1].max_quantity, 3);
    assert_eq!(ctx.state.cart().summary().subtotal.amount, Decimal::from(55));
    assert!(!ctx.state.cart().state().restored_from_mirror);

    let reopened = ctx.reopen();
    assert!(reopened.cart().restore_from_mirror());
    assert_eq!(reopened.cart().items(), items);
    assert!(reopened.cart().state().restored_from_mirror);
}

#[tokio::test]
async fn test_fetch_without_token_makes_no_request() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .state
        .cart()
        .fetch_cart(&Session::anonymous(), &UserId::new(USER_ID))
        .await
        .unwrap_err();

    assert!(err.requires_login());
}

#[tokio::test]
async fn test_rejected_token_asks_for_login() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "jwt expired"})))
        .mount(&ctx.server)
        .await;

    let err = ctx
        .state
        .cart()
        .fetch_cart(&session(), &UserId::new(USER_ID))
        .await
        .unwrap_err();

    assert_eq!(err, StoreError::Unauthenticated);
    assert_eq!(ctx.state.cart().state().error, Some(StoreError::Unauthenticated));
}

#[tokio::test]
async fn test_rate_limit_and_server_errors_are_generic_failures() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream timeout"))
        .mount(&ctx.server)
        .await;

    let user_id = UserId::new(USER_ID);
    let limited = ctx.state.cart().fetch_cart(&session(), &user_id).await;
    let failed = ctx.state.cart().fetch_cart(&session(), &user_id).await;

    assert!(matches!(limited, Err(StoreError::NetworkOrServer(_))));
    assert!(matches!(failed, Err(StoreError::NetworkOrServer(_))));
    assert!(!ctx.state.cart().state().loading);
}

// ============================================================================
// Add
// ============================================================================

#[tokio::test]
async fn test_add_sums_increment_onto_existing_line() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 2)])).await;
    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .and(header("authorization", bearer().as_str()))
        .and(body_json(json!({"productId": "p-1", "variantId": "v-1", "quantity": 3})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "item": line_json("l-1", json!("p-1"), "v-1", 99.0, 3)
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;
    let mut notices = ctx.state.notifier().subscribe();

    ctx.state
        .cart()
        .add_item(&session(), &mug(), None, 3)
        .await
        .unwrap();

    let items = ctx.state.cart().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 5);
    assert_eq!(items[0].unit_price_at_addition, Decimal::new(125, 1));

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.message, "Added to cart");
}

#[tokio::test]
async fn test_add_with_whole_cart_response_replaces_lines() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                line_json("l-7", json!("p-7"), "v-7", 4.0, 1),
                line_json("l-1", json!("p-1"), "v-1", 12.5, 1),
            ]
        })))
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state
        .cart()
        .add_item(&session(), &mug(), None, 1)
        .await
        .unwrap();

    let ids: Vec<String> = ctx
        .state
        .cart()
        .items()
        .iter()
        .map(|line| line.id.to_string())
        .collect();
    assert_eq!(ids, ["l-7", "l-1"]);
}

#[tokio::test]
async fn test_backend_stock_refusal_is_out_of_stock() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([])).await;
    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Only 1 left in stock"})),
        )
        .mount(&ctx.server)
        .await;
    load(&ctx).await;
    let mut notices = ctx.state.notifier().subscribe();

    let err = ctx
        .state
        .cart()
        .add_item(&session(), &mug(), None, 2)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::OutOfStock(ref message) if message.contains("stock")));
    assert!(ctx.state.cart().items().is_empty());
    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.message, "This item is out of stock");
}

#[tokio::test]
async fn test_add_beyond_local_stock_makes_no_request() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 4)])).await;
    Mock::given(method("POST"))
        .and(path("/api/cart/items"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    let err = ctx
        .state
        .cart()
        .add_item(&session(), &mug(), None, 2)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::OutOfStock(_)));
    assert_eq!(ctx.state.cart().items()[0].quantity, 4);
}

#[tokio::test]
async fn test_product_lookup_is_cached() {
    let ctx = TestContext::new().await;
    Mock::given(method("GET"))
        .and(path("/api/products/p-1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json("p-1", "Mug", &[("v-1", 12.5, 5)])),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let id = ProductId::new("p-1");
    let first = ctx.state.remote().fetch_product(&id).await.unwrap();
    let second = ctx.state.remote().fetch_product(&id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.first_variant().unwrap().max_quantity(), 5);
}

// ============================================================================
// Update, Remove & Clear
// ============================================================================

#[tokio::test]
async fn test_increment_applies_backend_quantity_and_stock() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 2)])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/cart/items/l-1"))
        .and(body_json(json!({"delta": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "item": {
                "_id": "l-1",
                "productId": "p-1",
                "variantId": "v-1",
                "priceAtAddition": 20,
                "quantity": 3,
                "maxQuantity": 3
            }
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state
        .cart()
        .update_quantity(&session(), &LineItemId::new("l-1"), QuantityDelta::Increment)
        .await
        .unwrap();

    let line = &ctx.state.cart().items()[0];
    assert_eq!(line.quantity, 3);
    assert_eq!(line.max_quantity, 3);
    assert_eq!(line.unit_price_at_addition, Decimal::new(125, 1));
}

#[tokio::test]
async fn test_decrement_at_one_skips_backend_by_default() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 1)])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/cart/items/l-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state
        .cart()
        .update_quantity(&session(), &LineItemId::new("l-1"), QuantityDelta::Decrement)
        .await
        .unwrap();

    assert_eq!(ctx.state.cart().items()[0].quantity, 1);
}

#[tokio::test]
async fn test_decrement_at_one_calls_backend_when_configured() {
    let ctx = TestContext::with_env(&[("VITRINE_QUANTITY_BOUNDARY_POLICY", "always")]).await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 1)])).await;
    Mock::given(method("PATCH"))
        .and(path("/api/cart/items/l-1"))
        .and(body_json(json!({"delta": -1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_id": "l-1",
            "productId": "p-1",
            "quantity": 1
        })))
        .expect(1)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state
        .cart()
        .update_quantity(&session(), &LineItemId::new("l-1"), QuantityDelta::Decrement)
        .await
        .unwrap();

    assert_eq!(ctx.state.cart().items()[0].quantity, 1);
}

#[tokio::test]
async fn test_remove_treats_missing_backend_line_as_removed() {
    let ctx = TestContext::new().await;
    mount_cart(
        &ctx,
        json!([
            line_json("l-1", json!("p-1"), "v-1", 12.5, 1),
            line_json("l-2", json!("p-2"), "v-2", 8.0, 1),
        ]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart/items/l-1"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Item not found"})))
        .expect(1)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state
        .cart()
        .remove_item(&session(), &LineItemId::new("l-1"))
        .await
        .unwrap();

    let items = ctx.state.cart().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id.as_str(), "l-2");

    let reopened = ctx.reopen();
    reopened.cart().restore_from_mirror();
    assert_eq!(reopened.cart().items(), items);
}

#[tokio::test]
async fn test_clear_empties_cart_and_mirror() {
    let ctx = TestContext::new().await;
    mount_cart(&ctx, json!([line_json("l-1", json!("p-1"), "v-1", 12.5, 2)])).await;
    Mock::given(method("DELETE"))
        .and(path("/api/cart"))
        .and(header("authorization", bearer().as_str()))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&ctx.server)
        .await;
    load(&ctx).await;

    ctx.state.cart().clear(&session()).await.unwrap();

    assert!(ctx.state.cart().items().is_empty());
    assert_eq!(ctx.state.cart().summary().total.amount, Decimal::ZERO);

    let reopened = ctx.reopen();
    reopened.cart().restore_from_mirror();
    assert!(reopened.cart().items().is_empty());
}
