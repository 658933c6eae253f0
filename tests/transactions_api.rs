use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use tower::ServiceExt;
use unit_billing_server::{
    models::{account::Account, balance::Balance},
    repositories::InMemoryStore,
    router,
    state::AppState,
};

const OWNER_KEY: &str = "owner-secret-key";
const OTHER_KEY: &str = "other-secret-key";
const STAFF_KEY: &str = "staff-secret-key";

struct TestApp {
    app: Router,
    store: Arc<InMemoryStore>,
    owner: Account,
    owner_balance: Balance,
    other: Account,
}

async fn setup() -> TestApp {
    let store = Arc::new(InMemoryStore::new());

    let owner = store.add_account("owner@example.com", false, OWNER_KEY).await;
    let owner_balance = store.open_balance(owner.id).await;
    let other = store.add_account("other@example.com", false, OTHER_KEY).await;
    store.open_balance(other.id).await;
    let staff = store.add_account("staff@example.com", true, STAFF_KEY).await;
    store.open_balance(staff.id).await;

    TestApp {
        app: router(AppState::in_memory(store.clone())),
        store,
        owner,
        owner_balance,
        other,
    }
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    api_key: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create(app: &Router, api_key: &str, amount: Value) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/v1/transactions/create",
        Some(api_key),
        Some(json!({ "amount": amount, "payment_channel": "paystack" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

async fn units(test: &TestApp) -> Decimal {
    test.store
        .balance(test.owner_balance.id)
        .await
        .unwrap()
        .units
}

#[tokio::test]
async fn test_health_is_public() {
    let test = setup().await;

    let (status, body) = send(&test.app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_api_key_required() {
    let test = setup().await;

    for (uri, method) in [
        ("/api/v1/transactions/create", Method::POST),
        ("/api/v1/transactions/validate/abc", Method::PUT),
        ("/api/v1/transactions/abc", Method::GET),
        ("/api/v1/transactions", Method::GET),
        ("/api/v1/transactions/list", Method::GET),
    ] {
        let (status, body) = send(&test.app, method.clone(), uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {uri}");
        assert_eq!(body["error"]["code"], "invalid_api_key");
    }

    let (status, _) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions",
        Some("not-a-key"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_transaction() {
    let test = setup().await;

    let body = create(&test.app, OWNER_KEY, json!(500000)).await;

    assert_eq!(body["status"], "pending");
    assert_eq!(body["payment_channel"], "paystack");
    assert_eq!(decimal(&body["purchased_units"]), Decimal::from(10));
    assert_eq!(decimal(&body["amount"]), Decimal::from(500_000));
    assert_eq!(body["reference"].as_str().unwrap().len(), 32);
    // Internal fields stay out of the create projection
    assert!(body.get("owner_id").is_none());
    assert!(body.get("balance_id").is_none());
    // No credit until validation
    assert_eq!(units(&test).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_create_rejects_invalid_amounts() {
    let test = setup().await;

    for payload in [
        json!({ "amount": 0 }),
        json!({ "amount": -50000 }),
        json!({ "amount": "abc" }),
        json!({ "amount": "100.005" }),
        json!({ "payment_channel": "paystack" }),
    ] {
        let (status, body) = send(
            &test.app,
            Method::POST,
            "/api/v1/transactions/create",
            Some(OWNER_KEY),
            Some(payload.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload}");
        assert_eq!(body["error"]["code"], "invalid_request");
    }

    let (_, body) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions",
        Some(OWNER_KEY),
        None,
    )
    .await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_validate_credits_balance() {
    let test = setup().await;
    let created = create(&test.app, OWNER_KEY, json!(500000)).await;
    let reference = created["reference"].as_str().unwrap();

    let (status, body) = send(
        &test.app,
        Method::PUT,
        &format!("/api/v1/transactions/validate/{reference}"),
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["is_active"], true);
    assert_eq!(body["reference"], reference);
    assert_eq!(units(&test).await, Decimal::from(10));
}

#[tokio::test]
async fn test_validate_twice_is_rejected() {
    let test = setup().await;
    let created = create(&test.app, OWNER_KEY, json!(500000)).await;
    let uri = format!(
        "/api/v1/transactions/validate/{}",
        created["reference"].as_str().unwrap()
    );

    let (first, _) = send(&test.app, Method::PUT, &uri, Some(OWNER_KEY), None).await;
    assert_eq!(first, StatusCode::OK);
    let after_first = units(&test).await;

    let (second, body) = send(&test.app, Method::PUT, &uri, Some(OWNER_KEY), None).await;

    assert_eq!(second, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "transaction_validated_already");
    assert_eq!(
        body["error"]["message"],
        "Transaction has already been validated."
    );
    assert_eq!(units(&test).await, after_first);
    assert_eq!(after_first, Decimal::from(10));
}

#[tokio::test]
async fn test_validate_unknown_reference() {
    let test = setup().await;

    let (status, body) = send(
        &test.app,
        Method::PUT,
        "/api/v1/transactions/validate/0123456789abcdef0123456789abcdef",
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "transaction_not_found");
    assert_eq!(units(&test).await, Decimal::ZERO);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_validation_credits_once() {
    let test = setup().await;
    let created = create(&test.app, OWNER_KEY, json!(500000)).await;
    let uri = format!(
        "/api/v1/transactions/validate/{}",
        created["reference"].as_str().unwrap()
    );

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let app = test.app.clone();
            let uri = uri.clone();
            tokio::spawn(async move {
                send(&app, Method::PUT, &uri, Some(OWNER_KEY), None)
                    .await
                    .0
            })
        })
        .collect();

    let mut ok = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::BAD_REQUEST => rejected += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(rejected, 15);
    assert_eq!(units(&test).await, Decimal::from(10));
}

#[tokio::test]
async fn test_get_transaction_by_reference() {
    let test = setup().await;
    let created = create(&test.app, OWNER_KEY, json!(100000)).await;
    let reference = created["reference"].as_str().unwrap();

    let (status, body) = send(
        &test.app,
        Method::GET,
        &format!("/api/v1/transactions/{reference}"),
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reference"], reference);
    assert_eq!(body["owner_id"], test.owner.id.to_string());
    assert_eq!(body["is_active"], false);
    assert_eq!(body["transaction_type"], "credit");

    let (status, _) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions/missing",
        Some(OWNER_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_own_transactions_newest_first() {
    let test = setup().await;
    let first = create(&test.app, OWNER_KEY, json!(100000)).await;
    let second = create(&test.app, OWNER_KEY, json!(100000)).await;
    create(&test.app, OTHER_KEY, json!(100000)).await;

    let (status, body) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions",
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["reference"], second["reference"]);
    assert_eq!(body["results"][1]["reference"], first["reference"]);
}

#[tokio::test]
async fn test_list_all_is_staff_only() {
    let test = setup().await;
    create(&test.app, OWNER_KEY, json!(100000)).await;

    let (status, body) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions/list",
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");
}

#[tokio::test]
async fn test_list_all_with_filters() {
    let test = setup().await;
    let owned = create(&test.app, OWNER_KEY, json!(100000)).await;
    create(&test.app, OWNER_KEY, json!(200000)).await;
    create(&test.app, OTHER_KEY, json!(300000)).await;

    let (status, body) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions/list",
        Some(STAFF_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let ids: Vec<i64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert!(ids.windows(2).all(|w| w[0] > w[1]));

    let (_, body) = send(
        &test.app,
        Method::GET,
        &format!("/api/v1/transactions/list?owner_id={}", test.other.id),
        Some(STAFF_KEY),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["owner_id"], test.other.id.to_string());

    let (_, body) = send(
        &test.app,
        Method::GET,
        &format!("/api/v1/transactions/list?id={}", owned["id"]),
        Some(STAFF_KEY),
        None,
    )
    .await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["reference"], owned["reference"]);

    let (status, _) = send(
        &test.app,
        Method::GET,
        "/api/v1/transactions/list?id=not-a-number",
        Some(STAFF_KEY),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_balance_endpoint_reflects_validation() {
    let test = setup().await;
    let created = create(&test.app, OWNER_KEY, json!(75000)).await;
    send(
        &test.app,
        Method::PUT,
        &format!(
            "/api/v1/transactions/validate/{}",
            created["reference"].as_str().unwrap()
        ),
        Some(OWNER_KEY),
        None,
    )
    .await;

    let (status, body) = send(
        &test.app,
        Method::GET,
        "/api/v1/balance",
        Some(OWNER_KEY),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["owner_id"], test.owner.id.to_string());
    assert_eq!(decimal(&body["units"]), Decimal::new(15, 1));
}
