#![allow(clippy::unwrap_used)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use proplugin::{
    api::{router, AppState, HealthEnv},
    mail::{EmailMessage, EmailSender, MailError},
    otp::OtpManager,
    store::{DocumentRepository, MemoryStore},
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const SEED: &str = r##"{
    "version": 5,
    "users": [
        {"email": "Owner@Shop.com", "username": "owner", "passwordHash": "old", "role": "admin"}
    ],
    "products": [{"sku": "A-1", "price": 10}],
    "themeColor": "#123456"
}"##;

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<EmailMessage>>,
}

impl Outbox {
    fn last_code(&self) -> String {
        let sent = self.sent.lock().unwrap();
        let html = &sent.last().unwrap().html;
        let marker = "letter-spacing:6px\">";
        let start = html.find(marker).unwrap() + marker.len();
        html[start..start + 6].to_string()
    }
}

#[async_trait]
impl EmailSender for Outbox {
    fn is_configured(&self) -> bool {
        true
    }

    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

struct Harness {
    app: Router,
    store: Arc<MemoryStore>,
    outbox: Arc<Outbox>,
}

fn harness() -> Harness {
    harness_with(SEED)
}

fn harness_with(seed: &str) -> Harness {
    let store = Arc::new(MemoryStore::with_content(seed));
    let outbox = Arc::new(Outbox::default());
    let repo = Arc::new(DocumentRepository::new(store.clone()));
    let otp = OtpManager::new(repo.clone(), outbox.clone());
    let env = HealthEnv::new(true, true, "proplugin_data.json", true);
    Harness {
        app: router(AppState::new(repo, otp, env)),
        store,
        outbox,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn legacy_document_is_upgraded_and_saved_back_intact() {
    let h = harness();

    let (status, mut doc) = call(&h.app, "GET", "/api/data", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["version"], 5);
    assert_eq!(doc["templates"], json!([]));
    assert_eq!(doc["otps"], json!({}));
    assert_eq!(doc["themeColor"], "#123456");
    assert_eq!(doc["users"][0]["role"], "admin");

    doc["logoUrl"] = json!("https://cdn.shop.com/logo.png");
    let (status, body) = call(&h.app, "POST", "/api/save", Some(doc)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true}));

    let (_, again) = call(&h.app, "GET", "/api/data", None).await;
    assert_eq!(again["logoUrl"], "https://cdn.shop.com/logo.png");
    assert_eq!(again["themeColor"], "#123456");
    assert_eq!(again["products"], json!([{"sku": "A-1", "price": 10}]));
    assert_eq!(again["users"][0]["role"], "admin");
}

#[tokio::test]
async fn nulls_and_extra_record_fields_survive_read_and_save() {
    let h = harness_with(
        r#"{
            "dealerNames": {"t9": "Platinum", "t1": null},
            "logs": [{"ts": "t", "user": null, "action": "PRICE_EDIT", "meta": null, "productId": "A-1"}]
        }"#,
    );

    let (status, doc) = call(&h.app, "GET", "/api/data", None).await;
    assert_eq!(status, StatusCode::OK, "{doc}");
    assert_eq!(doc["logs"][0]["productId"], "A-1");
    assert_eq!(doc["dealerNames"], json!({"t9": "Platinum", "t1": null}));

    let (status, body) = call(&h.app, "POST", "/api/save", Some(doc)).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let stored = h.store.content().await.unwrap();
    assert!(stored.contains("\"productId\": \"A-1\""));
    assert!(stored.find("\"t9\"").unwrap() < stored.find("\"t1\"").unwrap());
}

#[tokio::test]
async fn password_reset_flow_over_http() {
    let h = harness();

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/otp",
        Some(json!({"action": "request", "email": "  OWNER@shop.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(h.outbox.sent.lock().unwrap()[0].to, "owner@shop.com");

    let code: u32 = h.outbox.last_code().parse().unwrap();

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/otp",
        Some(json!({"action": "reset", "email": "owner@shop.com", "otp": 1, "newPasswordHash": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "Invalid OTP"}));

    // the code may be sent as a JSON number
    let (status, body) = call(
        &h.app,
        "POST",
        "/api/otp",
        Some(json!({"action": "reset", "email": "Owner@Shop.com", "otp": code, "newPasswordHash": "new"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let doc = h.store.snapshot().await.unwrap();
    assert!(doc.otps.is_empty());
    let owner = doc.find_user("owner@shop.com").unwrap();
    assert_eq!(owner.password_hash.as_deref(), Some("new"));
    let actions: Vec<&str> = doc.logs.iter().map(|entry| entry.action.as_str()).collect();
    assert_eq!(actions, ["PASSWORD_RESET", "OTP_REQUEST"]);

    let (status, body) = call(
        &h.app,
        "POST",
        "/api/otp",
        Some(json!({"action": "reset", "email": "owner@shop.com", "otp": code.to_string(), "newPasswordHash": "again"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": "No OTP requested"}));
}

#[tokio::test]
async fn reset_requires_every_field() {
    let h = harness();
    let cases = [
        (json!({"action": "reset"}), "Email required"),
        (json!({"action": "reset", "email": "owner@shop.com"}), "OTP required"),
        (
            json!({"action": "reset", "email": "owner@shop.com", "otp": "123456"}),
            "newPasswordHash required",
        ),
        (
            json!({"action": "reset", "email": "owner@shop.com", "otp": "123456", "newPasswordHash": "h"}),
            "No OTP requested",
        ),
    ];
    for (payload, message) in cases {
        let (status, body) = call(&h.app, "POST", "/api/otp", Some(payload)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": message}));
    }
    assert_eq!(h.store.write_count(), 0);
}

#[tokio::test]
async fn upstream_failure_is_a_500_with_message() {
    let h = harness();
    h.store.set_unavailable(true);

    let (status, body) = call(&h.app, "GET", "/api/data", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "memory store failed: 503 unavailable"}));

    let (status, body) = call(&h.app, "GET", "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gist_ok"], false);
}
