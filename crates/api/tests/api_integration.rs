//! Integration tests for the API server.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use document_store::InMemoryDocumentStore;
use domain::{InMemoryMailer, Money, Product, UserId};
use metrics_exporter_prometheus::PrometheusHandle;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    state: Arc<api::AppState<InMemoryDocumentStore>>,
    products: Vec<Product>,
    mailer: InMemoryMailer,
    invoice_dir: tempfile::TempDir,
}

async fn setup() -> TestApp {
    let invoice_dir = tempfile::tempdir().unwrap();
    let config = Config {
        invoice_dir: invoice_dir.path().to_path_buf(),
        ..Config::default()
    };
    let mailer = InMemoryMailer::new();
    let state = api::create_default_state(
        InMemoryDocumentStore::new(),
        Arc::new(mailer.clone()),
        &config,
    );
    let products = api::demo::seed_demo_catalog(state.shop.catalog())
        .await
        .unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp {
        app,
        state,
        products,
        mailer,
        invoice_dir,
    }
}

fn user() -> (String, String) {
    let id = UserId::new().to_string();
    let email = format!("{id}@example.com");
    (id, email)
}

fn request(
    method: &str,
    uri: &str,
    who: Option<&(String, String)>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, email)) = who {
        builder = builder
            .header("x-user-id", id.as_str())
            .header("x-user-email", email.as_str());
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn add_to_cart(t: &TestApp, who: &(String, String), product: &Product, quantity: i64) {
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/cart",
            Some(who),
            Some(serde_json::json!({
                "product_id": product.id.to_string(),
                "quantity": quantity,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn wait_for_file(path: &Path) -> bool {
    for _ in 0..100 {
        if path.exists() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_health_check() {
    let t = setup().await;
    let (status, json) = send(&t.app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_product_listing_is_paginated() {
    let t = setup().await;

    let (status, json) = send(&t.app, request("GET", "/products", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["products"].as_array().unwrap().len(), 2);
    assert_eq!(json["total_count"], 5);
    assert_eq!(json["current_page"], 1);
    assert_eq!(json["has_next_page"], true);
    assert_eq!(json["has_previous_page"], false);
    assert_eq!(json["last_page"], 3);

    let (_, json) = send(&t.app, request("GET", "/products?page=3", None, None)).await;
    assert_eq!(json["products"].as_array().unwrap().len(), 1);
    assert_eq!(json["has_next_page"], false);
    assert_eq!(json["previous_page"], 2);
}

#[tokio::test]
async fn test_product_listing_past_the_last_page() {
    let t = setup().await;

    let (status, json) = send(
        &t.app,
        request("GET", &format!("/products?page={}", u64::MAX), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["products"].as_array().unwrap().is_empty());
    assert_eq!(json["has_next_page"], false);
    assert_eq!(json["next_page"], u64::MAX);
    assert_eq!(json["last_page"], 3);
}

#[tokio::test]
async fn test_product_detail() {
    let t = setup().await;
    let book = &t.products[0];

    let (status, json) = send(
        &t.app,
        request("GET", &format!("/products/{}", book.id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["title"], "A Book");
    assert_eq!(json["price_cents"], 1299);
    assert_eq!(json["price"], "$12.99");

    let missing = domain::ProductId::new();
    let (status, _) = send(
        &t.app,
        request("GET", &format!("/products/{missing}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, request("GET", "/products/not-a-uuid", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_requires_identity() {
    let t = setup().await;
    let (status, json) = send(&t.app, request("GET", "/cart", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_cart_add_update_remove() {
    let t = setup().await;
    let who = user();
    let book = &t.products[0];
    let mug = &t.products[1];

    add_to_cart(&t, &who, book, 2).await;
    add_to_cart(&t, &who, mug, 1).await;

    let (status, json) = send(&t.app, request("GET", "/cart", Some(&who), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"].as_array().unwrap().len(), 2);
    assert_eq!(json["total_cents"], 2 * 1299 + 850);

    let (status, json) = send(
        &t.app,
        request(
            "PUT",
            &format!("/cart/{}", book.id),
            Some(&who),
            Some(serde_json::json!({ "quantity": 5 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["total_cents"], 5 * 1299 + 850);

    let (status, json) = send(
        &t.app,
        request("DELETE", &format!("/cart/{}", mug.id), Some(&who), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["lines"].as_array().unwrap().len(), 1);
    assert_eq!(json["total"], "$64.95");
}

#[tokio::test]
async fn test_cart_rejects_non_positive_quantity() {
    let t = setup().await;
    let who = user();
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/cart",
            Some(&who),
            Some(serde_json::json!({
                "product_id": t.products[0].id.to_string(),
                "quantity": 0,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_rejects_line_total_that_does_not_fit() {
    let t = setup().await;
    let who = user();
    let yacht = Product::new("Yacht", "", Money::from_cents(5_000_000_000), "").unwrap();
    t.state.shop.catalog().add_product(&yacht).await.unwrap();

    let (status, json) = send(
        &t.app,
        request(
            "PUT",
            &format!("/cart/{}", yacht.id),
            Some(&who),
            Some(serde_json::json!({ "quantity": u32::MAX })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());

    let (status, json) = send(&t.app, request("GET", "/cart", Some(&who), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(json["lines"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_checkout_and_orders() {
    let t = setup().await;
    let who = user();
    add_to_cart(&t, &who, &t.products[0], 1).await;
    add_to_cart(&t, &who, &t.products[3], 2).await;

    let (status, json) = send(&t.app, request("POST", "/checkout", Some(&who), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["cart_cleared"], true);
    assert_eq!(json["order"]["total_cents"], 1299 + 2 * 550);
    assert_eq!(json["order"]["email"], who.1.as_str());
    let order_id = json["order"]["id"].as_str().unwrap().to_string();

    let (_, cart) = send(&t.app, request("GET", "/cart", Some(&who), None)).await;
    assert!(cart["lines"].as_array().unwrap().is_empty());

    let (status, orders) = send(&t.app, request("GET", "/orders", Some(&who), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 1);

    let (status, order) = send(
        &t.app,
        request("GET", &format!("/orders/{order_id}"), Some(&who), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_checkout_empty_cart_conflicts() {
    let t = setup().await;
    let who = user();
    let (status, _) = send(&t.app, request("POST", "/checkout", Some(&who), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_other_users_order_is_forbidden() {
    let t = setup().await;
    let owner = user();
    let intruder = user();
    add_to_cart(&t, &owner, &t.products[2], 1).await;
    let (_, json) = send(&t.app, request("POST", "/checkout", Some(&owner), None)).await;
    let order_id = json["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        request("GET", &format!("/orders/{order_id}"), Some(&intruder), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &t.app,
        request(
            "GET",
            &format!("/orders/{order_id}/invoice"),
            Some(&intruder),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(
        !t.invoice_dir
            .path()
            .join(format!("invoice-{order_id}.pdf"))
            .exists()
    );

    let (_, orders) = send(&t.app, request("GET", "/orders", Some(&intruder), None)).await;
    assert!(orders.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_invoice_streams_pdf_and_persists_it() {
    let t = setup().await;
    let who = user();
    add_to_cart(&t, &who, &t.products[1], 3).await;
    let (_, json) = send(&t.app, request("POST", "/checkout", Some(&who), None)).await;
    let order_id = json["order"]["id"].as_str().unwrap().to_string();

    let response = t
        .app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/orders/{order_id}/invoice"),
            Some(&who),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    assert_eq!(
        response.headers()["content-disposition"].to_str().unwrap(),
        format!("inline; filename=\"invoice-{order_id}.pdf\"")
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(body.starts_with(b"%PDF-1.4"));
    assert!(body.ends_with(b"%%EOF\n"));

    let path = t.invoice_dir.path().join(format!("invoice-{order_id}.pdf"));
    assert!(wait_for_file(&path).await, "invoice file was not persisted");
    let persisted = tokio::fs::read(&path).await.unwrap();
    assert_eq!(persisted, body.to_vec());
}

#[tokio::test]
async fn test_invoice_for_unknown_order_is_not_found() {
    let t = setup().await;
    let who = user();
    let missing = domain::OrderId::new();
    let (status, _) = send(
        &t.app,
        request("GET", &format!("/orders/{missing}/invoice"), Some(&who), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signup_login_and_password_reset() {
    let t = setup().await;
    let email = "reader@example.com";

    let (status, identity) = send(
        &t.app,
        request(
            "POST",
            "/accounts/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "hunter22",
                "confirm_password": "hunter22",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(identity["email"], email);
    let user_id = identity["user_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/accounts/signup",
            None,
            Some(serde_json::json!({
                "email": email,
                "password": "another1",
                "confirm_password": "another1",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let login = |password: &str| {
        request(
            "POST",
            "/accounts/login",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        )
    };
    let (status, json) = send(&t.app, login("hunter22")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], user_id.as_str());
    let (status, _) = send(&t.app, login("wrong-password")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/accounts/reset",
            None,
            Some(serde_json::json!({ "email": email })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let reset_mail = t
        .mailer
        .sent_to(email)
        .into_iter()
        .find(|n| n.subject == "Password Reset")
        .expect("reset email was sent");
    let start = reset_mail.html_body.find("/reset/").unwrap() + "/reset/".len();
    let token: String = reset_mail.html_body[start..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    assert_eq!(token.len(), 64);

    let (status, json) = send(
        &t.app,
        request("GET", &format!("/accounts/reset/{token}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], user_id.as_str());

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/accounts/new-password",
            None,
            Some(serde_json::json!({
                "user_id": user_id,
                "token": token,
                "password": "correct-horse",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&t.app, login("correct-horse")).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, login("hunter22")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &t.app,
        request("GET", &format!("/accounts/reset/{token}"), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_reset_for_unknown_email_is_not_found() {
    let t = setup().await;
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/accounts/reset",
            None,
            Some(serde_json::json!({ "email": "nobody@example.com" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup().await;
    let who = user();
    add_to_cart(&t, &who, &t.products[0], 1).await;
    send(&t.app, request("POST", "/checkout", Some(&who), None)).await;

    let response = t
        .app
        .clone()
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_placed_total"));
}
