use crate::{otp::OtpManager, store::DocumentRepository};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    routing::{any, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod error;
pub mod handlers;
mod openapi;

pub use self::handlers::health::HealthEnv;
pub use self::openapi::openapi;

/// Everything the handlers need, shared by all requests.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<DocumentRepository>,
    pub otp: Arc<OtpManager>,
    pub env: Arc<HealthEnv>,
}

impl AppState {
    #[must_use]
    pub fn new(repo: Arc<DocumentRepository>, otp: OtpManager, env: HealthEnv) -> Self {
        Self {
            repo,
            otp: Arc::new(otp),
            env: Arc::new(env),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let method_not_allowed = handlers::method_not_allowed;

    Router::new()
        .route("/", get(handlers::root::root))
        .route(
            "/api/data",
            get(handlers::data::data).fallback(method_not_allowed),
        )
        .route(
            "/api/save",
            post(handlers::save::save).fallback(method_not_allowed),
        )
        .route(
            "/api/otp",
            post(handlers::otp::otp).fallback(method_not_allowed),
        )
        .route("/api/health", any(handlers::health::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(state.repo))
                .layer(Extension(state.otp))
                .layer(Extension(state.env)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = TcpListener::bind(format!("::0:{port}"))
        .await
        .with_context(|| format!("Failed to bind port {port}"))?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {err}");
            }
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        mail::{EmailMessage, EmailSender, MailError},
        store::{DocumentStore, MemoryStore, StoreError},
    };
    use async_trait::async_trait;
    use axum::{
        body::to_bytes,
        http::{HeaderMap, Method, StatusCode},
    };
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<EmailMessage>>);

    #[async_trait]
    impl EmailSender for Outbox {
        fn is_configured(&self) -> bool {
            true
        }

        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            self.0.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    /// Store that is never configured, like a gist store without credentials.
    struct Unconfigured;

    #[async_trait]
    impl DocumentStore for Unconfigured {
        fn ensure_configured(&self) -> Result<(), StoreError> {
            Err(StoreError::MissingCredentials)
        }

        async fn fetch_document(&self) -> Result<crate::document::Document, StoreError> {
            Err(StoreError::MissingCredentials)
        }

        async fn replace_document(
            &self,
            _document: &crate::document::Document,
        ) -> Result<(), StoreError> {
            Err(StoreError::MissingCredentials)
        }
    }

    fn app_with(store: Arc<dyn DocumentStore>) -> Router {
        let repo = Arc::new(DocumentRepository::new(store));
        let otp = OtpManager::new(repo.clone(), Arc::new(Outbox::default()));
        let env = HealthEnv::new(true, true, "data.json", true);
        router(AppState::new(repo, otp, env))
    }

    async fn send(
        app: Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, value)
    }

    #[tokio::test]
    async fn data_returns_normalized_document() {
        let store = Arc::new(MemoryStore::with_content(r#"{"users":[]}"#));
        let (status, headers, body) = send(app_with(store), Method::GET, "/api/data", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["version"], json!(5.1));
        assert_eq!(body["dealerNames"]["t3"], "Dealer T3");
        assert!(headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn wrong_verbs_are_rejected_with_json() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        for (method, uri) in [
            (Method::POST, "/api/data"),
            (Method::GET, "/api/save"),
            (Method::PUT, "/api/otp"),
            (Method::DELETE, "/api/data"),
        ] {
            let (status, _, body) = send(app_with(store.clone()), method, uri, None).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(body, json!({"error": "Method Not Allowed"}));
        }
    }

    #[tokio::test]
    async fn missing_credentials_are_reported_before_validation() {
        let store: Arc<dyn DocumentStore> = Arc::new(Unconfigured);
        for (method, uri) in [
            (Method::GET, "/api/data"),
            (Method::POST, "/api/save"),
            (Method::POST, "/api/otp"),
        ] {
            let (status, _, body) = send(app_with(store.clone()), method, uri, None).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert_eq!(body, json!({"error": "Missing GIST_ID or GITHUB_TOKEN"}));
        }
    }

    #[tokio::test]
    async fn save_rejects_invalid_payloads() {
        let store = Arc::new(MemoryStore::new());
        for body in [None, Some(json!([1, 2])), Some(json!("text")), Some(json!({"users": "x"}))] {
            let (status, _, response) =
                send(app_with(store.clone()), Method::POST, "/api/save", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response, json!({"error": "Invalid payload"}));
        }
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn save_normalizes_before_writing() {
        let store = Arc::new(MemoryStore::new());
        let (status, _, body) = send(
            app_with(store.clone()),
            Method::POST,
            "/api/save",
            Some(json!({"logoUrl": "https://cdn.example.com/l.png", "custom": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));

        let stored: Value = serde_json::from_str(&store.content().await.unwrap()).unwrap();
        assert_eq!(stored["logoUrl"], "https://cdn.example.com/l.png");
        assert_eq!(stored["custom"], 1);
        assert_eq!(stored["users"], json!([]));
    }

    #[tokio::test]
    async fn otp_action_is_required_and_known() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let (status, _, body) =
            send(app_with(store.clone()), Method::POST, "/api/otp", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Missing action"}));

        let (status, _, body) = send(
            app_with(store),
            Method::POST,
            "/api/otp",
            Some(json!({"action": "verify", "email": "a@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({"error": "Unsupported action"}));
    }

    #[tokio::test]
    async fn otp_request_for_unknown_user_is_404() {
        let store = Arc::new(MemoryStore::new());
        let (status, _, body) = send(
            app_with(store.clone()),
            Method::POST,
            "/api/otp",
            Some(json!({"action": "request", "email": "ghost@example.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"error": "User not found"}));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn health_reports_env_and_reachability() {
        let store = Arc::new(MemoryStore::new());
        let (status, headers, body) =
            send(app_with(store.clone()), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "env": {"GIST_ID": true, "GITHUB_TOKEN": true, "GIST_FILE": "data.json", "RESEND_API_KEY": "set"},
                "gist_ok": true
            })
        );
        let x_app = headers.get("X-App").unwrap().to_str().unwrap();
        assert!(x_app.starts_with(&format!("{}:{}:", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))));

        store.set_unavailable(true);
        let (status, _, body) = send(app_with(store), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gist_ok"], false);

        let (status, _, body) =
            send(app_with(Arc::new(Unconfigured)), Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["gist_ok"], false);
    }

    #[tokio::test]
    async fn root_returns_banner() {
        let app = app_with(Arc::new(MemoryStore::new()));
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).starts_with(env!("CARGO_PKG_NAME")));
    }
}
