//! HTTP API integration tests for billing-service.

mod common;

use chrono::{Duration, NaiveDate};
use common::{unique_email, TestApp};
use reqwest::StatusCode;
use serde_json::json;

/// Register a user over HTTP and return its id.
async fn create_user(app: &TestApp, email: &str) -> String {
    let response = app
        .client
        .post(format!("{}/users", app.http_address))
        .json(&json!({ "email": email, "password": "s3cret-pass" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    body["user_id"].as_str().expect("user_id missing").to_string()
}

/// Subscribe a user to a plan over HTTP and return the response body.
async fn subscribe(app: &TestApp, user_id: &str, plan_id: &str) -> serde_json::Value {
    let response = app
        .client
        .post(format!("{}/users/{}/subscriptions", app.http_address, user_id))
        .json(&json!({ "plan_id": plan_id }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.expect("Failed to parse JSON")
}

fn parse_date(value: &serde_json::Value) -> NaiveDate {
    value
        .as_str()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .expect("expected an ISO date")
}

#[tokio::test]
async fn create_user_works_and_hides_password_hash() {
    let app = TestApp::spawn().await;
    let email = unique_email("api-user");

    let response = app
        .client
        .post(format!("{}/users", app.http_address))
        .json(&json!({ "email": email, "password": "s3cret-pass" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::CREATED);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["email"], email);
    assert!(body["user_id"].is_string());
    assert!(body.get("password_hash").is_none());

    // The same view comes back on lookup.
    let user_id = body["user_id"].as_str().unwrap();
    let response = app
        .client
        .get(format!("{}/users/{}", app.http_address, user_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["email"], email);
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let app = TestApp::spawn().await;
    let email = unique_email("api-dup");

    create_user(&app, &email).await;

    let response = app
        .client
        .post(format!("{}/users", app.http_address))
        .json(&json!({ "email": email, "password": "another-pass" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn unknown_user_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!(
            "{}/users/00000000-0000-0000-0000-000000000000",
            app.http_address
        ))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn plan_catalog_is_seeded() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!("{}/plans", app.http_address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::OK);

    let plans: serde_json::Value = response.json().await.expect("Failed to parse JSON");
    let plans = plans.as_array().expect("expected a plan array");
    assert_eq!(plans.len(), 3);

    // Catalog is listed in name order.
    assert_eq!(plans[0]["name"], "Basic");
    assert_eq!(plans[0]["price"], "10.00");
    assert_eq!(plans[1]["name"], "Enterprise");
    assert_eq!(plans[1]["price"], "75.00");
    assert_eq!(plans[2]["name"], "Pro");
    assert_eq!(plans[2]["price"], "25.00");
}

#[tokio::test]
async fn subscribe_returns_subscription_with_initial_invoice() {
    let app = TestApp::spawn().await;
    let user_id = create_user(&app, &unique_email("api-subscribe")).await;
    let plan_id = app.plan_id("Pro").await.to_string();

    let body = subscribe(&app, &user_id, &plan_id).await;

    let subscription = &body["subscription"];
    assert_eq!(subscription["status"], "active");
    assert_eq!(subscription["user_id"].as_str().unwrap(), user_id);
    assert!(subscription["end_date"].is_null());

    let invoice = &body["initial_invoice"];
    assert_eq!(invoice["status"], "pending");
    assert_eq!(invoice["amount"], "25.00");

    // Payment terms: due 15 days after issue; billing advances one month.
    let issue_date = parse_date(&invoice["issue_date"]);
    let due_date = parse_date(&invoice["due_date"]);
    assert_eq!(due_date - issue_date, Duration::days(15));
    assert_eq!(parse_date(&subscription["start_date"]), issue_date);
    assert!(parse_date(&subscription["next_billing_date"]) > issue_date);

    // The subscription and invoice are visible on the user's lists.
    let response = app
        .client
        .get(format!("{}/users/{}/subscriptions", app.http_address, user_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let subscriptions: serde_json::Value = response.json().await.unwrap();
    assert_eq!(subscriptions.as_array().unwrap().len(), 1);

    let response = app
        .client
        .get(format!("{}/users/{}/invoices", app.http_address, user_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);
    let invoices: serde_json::Value = response.json().await.unwrap();
    assert_eq!(invoices.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn second_active_subscription_to_same_plan_is_rejected() {
    let app = TestApp::spawn().await;
    let user_id = create_user(&app, &unique_email("api-twice")).await;
    let plan_id = app.plan_id("Basic").await.to_string();

    subscribe(&app, &user_id, &plan_id).await;

    let response = app
        .client
        .post(format!("{}/users/{}/subscriptions", app.http_address, user_id))
        .json(&json!({ "plan_id": plan_id }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn subscribe_to_unknown_plan_returns_404() {
    let app = TestApp::spawn().await;
    let user_id = create_user(&app, &unique_email("api-noplan")).await;

    let response = app
        .client
        .post(format!("{}/users/{}/subscriptions", app.http_address, user_id))
        .json(&json!({ "plan_id": "00000000-0000-0000-0000-000000000000" }))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_subscription_works_once() {
    let app = TestApp::spawn().await;
    let user_id = create_user(&app, &unique_email("api-cancel")).await;
    let plan_id = app.plan_id("Basic").await.to_string();

    let body = subscribe(&app, &user_id, &plan_id).await;
    let subscription_id = body["subscription"]["subscription_id"].as_str().unwrap();

    let response = app
        .client
        .delete(format!("{}/subscriptions/{}", app.http_address, subscription_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let cancelled: serde_json::Value = response.json().await.unwrap();
    assert_eq!(cancelled["status"], "cancelled");
    assert!(cancelled["end_date"].is_string());
    assert!(cancelled["next_billing_date"].is_null());

    let response = app
        .client
        .delete(format!("{}/subscriptions/{}", app.http_address, subscription_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pay_invoice_works_once() {
    let app = TestApp::spawn().await;
    let user_id = create_user(&app, &unique_email("api-pay")).await;
    let plan_id = app.plan_id("Pro").await.to_string();

    let body = subscribe(&app, &user_id, &plan_id).await;
    let invoice_id = body["initial_invoice"]["invoice_id"].as_str().unwrap();

    let response = app
        .client
        .post(format!("{}/invoices/{}/pay", app.http_address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let paid: serde_json::Value = response.json().await.unwrap();
    assert_eq!(paid["status"], "paid");
    assert!(paid["paid_utc"].is_string());

    let response = app
        .client
        .post(format!("{}/invoices/{}/pay", app.http_address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn declined_charge_returns_payment_required() {
    let app = TestApp::spawn_declining().await;
    let user_id = create_user(&app, &unique_email("api-declined")).await;
    let plan_id = app.plan_id("Pro").await.to_string();

    let body = subscribe(&app, &user_id, &plan_id).await;
    let invoice_id = body["initial_invoice"]["invoice_id"].as_str().unwrap();

    let response = app
        .client
        .post(format!("{}/invoices/{}/pay", app.http_address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

    // The invoice is left exactly as it was.
    let response = app
        .client
        .get(format!("{}/invoices/{}", app.http_address, invoice_id))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::OK);

    let invoice: serde_json::Value = response.json().await.unwrap();
    assert_eq!(invoice["status"], "pending");
    assert!(invoice["paid_utc"].is_null());
}

#[tokio::test]
async fn unknown_invoice_returns_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .get(format!(
            "{}/invoices/00000000-0000-0000-0000-000000000000",
            app.http_address
        ))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .client
        .post(format!(
            "{}/invoices/00000000-0000-0000-0000-000000000000/pay",
            app.http_address
        ))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
