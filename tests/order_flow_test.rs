mod common;

use axum::http::{Method, StatusCode};
use common::{
    seed_activity, seed_product, seed_property, seed_variant, ProductSpec, TestApp,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use shorestay_api::entities::{cart_item, property_booking, CartItem, Product, ProductVariant, PropertyBooking};
use uuid::Uuid;

#[tokio::test]
async fn product_order_decrements_stock_and_clears_cart() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let token = app.user_token(user);
    let product_id = seed_product(
        &app,
        ProductSpec {
            price: dec!(19.99),
            stock: Some(10),
            ..ProductSpec::default()
        },
    )
    .await;

    app.request(
        Method::POST,
        "/api/v1/cart/items",
        Some(&token),
        Some(json!({"productId": product_id, "quantity": 2})),
    )
    .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [{"productId": product_id, "quantity": 2}],
                "paymentMethod": "bank_transfer",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let order = &body["order"];
    assert!(order["orderNumber"].as_str().expect("number").starts_with("ORD-"));
    assert_eq!(order["status"], "pending");
    // 39.98 + 15% tax (6.00) + 5.99 shipping
    assert_eq!(order["total"], "51.97");
    assert_eq!(body["payment"]["kind"], "bank_transfer");
    assert_eq!(body["payment"]["reference"], order["orderNumber"]);

    let product = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.stock_quantity, Some(8));

    let remaining = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user))
        .all(&*app.state.db)
        .await
        .expect("query");
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn oversell_is_rejected_before_any_write() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let product_id = seed_product(
        &app,
        ProductSpec {
            stock: Some(1),
            ..ProductSpec::default()
        },
    )
    .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [{"productId": product_id, "quantity": 3}],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["availableQuantity"], 1);

    let product = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.stock_quantity, Some(1));
}

#[tokio::test]
async fn variant_stock_is_the_one_decremented() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let product_id = seed_product(
        &app,
        ProductSpec {
            stock: Some(100),
            ..ProductSpec::default()
        },
    )
    .await;
    let variant_id = seed_variant(&app, product_id, dec!(24.99), Some(5), true).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [{"productId": product_id, "variantId": variant_id, "quantity": 2}],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let variant = ProductVariant::find_by_id(variant_id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("variant");
    assert_eq!(variant.stock_quantity, Some(3));

    let product = Product::find_by_id(product_id)
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("product");
    assert_eq!(product.stock_quantity, Some(100));
}

#[tokio::test]
async fn untracked_stock_orders_any_quantity() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let product_id = seed_product(
        &app,
        ProductSpec {
            stock: None,
            ..ProductSpec::default()
        },
    )
    .await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [{"productId": product_id, "quantity": 500}],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn property_booking_totals_and_overlap_rejection() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let property_id = seed_property(&app, dec!(120.00), 6).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "property",
                "items": [{
                    "propertyId": property_id,
                    "checkIn": "2026-09-10",
                    "checkOut": "2026-09-13",
                    "guests": 4,
                }],
                "paymentMethod": "bank_transfer",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // 3 nights at 120 = 360, 10% tax, no shipping for stays.
    assert_eq!(body["order"]["total"], "396.00");

    // An overlapping stay from another user is rejected as a bad request.
    let other = app.user_token(Uuid::new_v4());
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&other),
            Some(json!({
                "type": "property",
                "items": [{
                    "propertyId": property_id,
                    "checkIn": "2026-09-12",
                    "checkOut": "2026-09-15",
                    "guests": 2,
                }],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"]
        .as_str()
        .unwrap_or_default()
        .contains("not available for the selected dates"));

    // The rejected stay left no booking behind.
    let bookings = PropertyBooking::find()
        .filter(property_booking::Column::PropertyId.eq(property_id))
        .count(&*app.state.db)
        .await
        .unwrap();
    assert_eq!(bookings, 1);

    // Back-to-back is fine: checkout day equals the next check-in.
    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&other),
            Some(json!({
                "type": "property",
                "items": [{
                    "propertyId": property_id,
                    "checkIn": "2026-09-13",
                    "checkOut": "2026-09-16",
                    "guests": 2,
                }],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn property_rejects_inverted_dates_and_guest_overflow() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let property_id = seed_property(&app, dec!(120.00), 2).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "property",
                "items": [{
                    "propertyId": property_id,
                    "checkIn": "2026-09-13",
                    "checkOut": "2026-09-10",
                }],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "property",
                "items": [{
                    "propertyId": property_id,
                    "checkIn": "2026-09-10",
                    "checkOut": "2026-09-12",
                    "guests": 5,
                }],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn activity_booking_enforces_participant_bounds() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let activity_id = seed_activity(&app, dec!(45.00), 2, 8).await;

    for participants in [1, 9] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(&token),
                Some(json!({
                    "type": "activity",
                    "items": [{
                        "activityId": activity_id,
                        "activityDate": "2026-09-20",
                        "participants": participants,
                    }],
                    "paymentMethod": "cash",
                })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "activity",
                "items": [{
                    "activityId": activity_id,
                    "activityDate": "2026-09-20",
                    "participants": 4,
                }],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // 4 x 45 = 180, 10% tax, no shipping.
    assert_eq!(body["order"]["total"], "198.00");
    assert_eq!(body["payment"]["kind"], "cash");
}

#[tokio::test]
async fn orders_are_listed_and_readable_by_owner_only() {
    let app = TestApp::new().await;
    let owner = Uuid::new_v4();
    let token = app.user_token(owner);
    let product_id = seed_product(&app, ProductSpec::default()).await;

    let (_, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [{"productId": product_id, "quantity": 1}],
                "paymentMethod": "card",
            })),
        )
        .await;
    let order_id = body["order"]["id"].as_str().expect("id").to_string();

    let (status, list) = app
        .request(Method::GET, "/api/v1/orders?page=1&limit=10", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["pagination"]["totalCount"], 1);
    assert_eq!(list["pagination"]["hasNext"], false);
    assert_eq!(list["orders"][0]["id"], body["order"]["id"]);

    let (status, detail) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["items"].as_array().map(Vec::len), Some(1));
    // Totals read back from storage match those echoed at creation.
    assert_eq!(detail["order"]["total"], body["order"]["total"]);
    assert_eq!(detail["order"]["total"], "28.98");

    // Another customer cannot read it, an admin can.
    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&app.user_token(Uuid::new_v4())),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/v1/orders/{order_id}"),
            Some(&app.admin_token(Uuid::new_v4())),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn sub_cent_prices_round_once_at_the_subtotal() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());
    let first = seed_product(
        &app,
        ProductSpec {
            price: dec!(1.005),
            ..ProductSpec::default()
        },
    )
    .await;
    let second = seed_product(
        &app,
        ProductSpec {
            price: dec!(1.005),
            ..ProductSpec::default()
        },
    )
    .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [
                    {"productId": first, "quantity": 1},
                    {"productId": second, "quantity": 1},
                ],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    // Raw sum 2.010 rounds to 2.01; rounding each line first would give
    // 2.02. Tax 15% of 2.01 = 0.30, shipping 5.99.
    assert_eq!(body["order"]["total"], "8.30");
}

#[tokio::test]
async fn empty_item_list_is_rejected() {
    let app = TestApp::new().await;
    let token = app.user_token(Uuid::new_v4());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(&token),
            Some(json!({
                "type": "product",
                "items": [],
                "paymentMethod": "cash",
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
