mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn settings_crud_requires_admin() {
    let app = TestApp::new().await;
    let user = app.user_token(Uuid::new_v4());

    let (status, _) = app
        .request(Method::GET, "/api/v1/settings", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/api/v1/settings", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn typed_settings_round_trip() {
    let app = TestApp::new().await;
    let admin = app.admin_token(Uuid::new_v4());

    let fixtures = [
        json!({"key": "site.name", "value": "ShoreStay", "dataType": "string", "category": "general"}),
        json!({"key": "booking.lead_days", "value": "3", "dataType": "number", "category": "booking"}),
        json!({"key": "shop.enabled", "value": "true", "dataType": "boolean", "category": "shop"}),
        json!({"key": "shop.badges", "value": "[\"new\",\"sale\"]", "dataType": "json", "category": "shop"}),
    ];
    for fixture in fixtures {
        let (status, _) = app
            .request(Method::POST, "/api/v1/settings", Some(&admin), Some(fixture))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, setting) = app
        .request(
            Method::GET,
            "/api/v1/settings/booking.lead_days",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(setting["value"], json!(3.0));
    assert_eq!(setting["dataType"], "number");

    // Values must parse for their declared type.
    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/settings/booking.lead_days",
            Some(&admin),
            Some(json!({"value": "soon"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request(
            Method::PUT,
            "/api/v1/settings/booking.lead_days",
            Some(&admin),
            Some(json!({"value": "5"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["value"], json!(5.0));
}

#[tokio::test]
async fn non_editable_settings_reject_update_and_delete() {
    let app = TestApp::new().await;
    let admin = app.admin_token(Uuid::new_v4());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/settings",
            Some(&admin),
            Some(json!({
                "key": "system.version",
                "value": "1",
                "dataType": "string",
                "category": "system",
                "isEditable": false,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(
            Method::PUT,
            "/api/v1/settings/system.version",
            Some(&admin),
            Some(json!({"value": "2"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::DELETE,
            "/api/v1/settings/system.version",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn public_settings_are_grouped_and_cached() {
    let app = TestApp::new().await;
    let admin = app.admin_token(Uuid::new_v4());

    app.request(
        Method::POST,
        "/api/v1/settings",
        Some(&admin),
        Some(json!({"key": "site.name", "value": "ShoreStay", "dataType": "string", "category": "general"})),
    )
    .await;

    // Unauthenticated read, grouped by category.
    let (status, body) = app
        .request(Method::GET, "/api/v1/settings/public", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["general"]["site.name"], "ShoreStay");

    // A write does not invalidate; the cached value is served within TTL.
    app.request(
        Method::PUT,
        "/api/v1/settings/site.name",
        Some(&admin),
        Some(json!({"value": "ShoreStay Resort"})),
    )
    .await;
    let (_, body) = app
        .request(Method::GET, "/api/v1/settings/public", None, None)
        .await;
    assert_eq!(body["general"]["site.name"], "ShoreStay");

    // After explicit invalidation the fresh value appears.
    app.state.settings_cache.invalidate();
    let (_, body) = app
        .request(Method::GET, "/api/v1/settings/public", None, None)
        .await;
    assert_eq!(body["general"]["site.name"], "ShoreStay Resort");
}

#[tokio::test]
async fn duplicate_setting_key_conflicts() {
    let app = TestApp::new().await;
    let admin = app.admin_token(Uuid::new_v4());
    let payload =
        json!({"key": "site.name", "value": "A", "dataType": "string", "category": "general"});

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/settings",
            Some(&admin),
            Some(payload.clone()),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(Method::POST, "/api/v1/settings", Some(&admin), Some(payload))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
