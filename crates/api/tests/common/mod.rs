#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use obra_core::cache::LocalStorage;
use obra_core::push::{NotificationKind, PushPayload};
use obra_core::retry::RetryOptions;
use obra_core::types::DbId;
use obra_db::models::push_subscription::PushSubscription;
use obra_events::{NotificationDispatcher, PgPushStore, PushError, PushSender, VapidConfig};
use obra_gallery::{FeedOptions, PgProjectSource, ProjectFeed};
use sqlx::PgPool;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use uuid::Uuid;

use obra_api::auth::jwt::{Claims, JwtConfig};
use obra_api::config::ServerConfig;
use obra_api::router::build_app_router;
use obra_api::state::AppState;

pub const TEST_JWT_SECRET: &str = "test-secret-that-is-long-enough-for-hmac";

/// Public half of the test VAPID key pair.
pub const TEST_VAPID_PUBLIC_KEY: &str =
    "BGp2Rmxut3teaHMQXImMIXMbRRE1hsDUlIHPL03mdTyx6UDrvovrWLrZpSW59gcxrnTkpH1DLuwEEtIxuphcqnA";

const TEST_VAPID_PRIVATE_KEY: &str = "Hy49TFtqeYgXJjVEU2JxgZIKGyw9Tl9gcYKTpLXG1-g";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config(cache_dir: &TempDir) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        cache_dir: cache_dir.path().to_path_buf(),
        projects_cache_ttl_mins: 30,
        reminder_interval_secs: 86_400,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
        },
        vapid: VapidConfig {
            public_key: TEST_VAPID_PUBLIC_KEY.to_string(),
            private_key: TEST_VAPID_PRIVATE_KEY.to_string(),
            subject: "mailto:test@example.com".to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Push sender double
// ---------------------------------------------------------------------------

/// [`PushSender`] that records every delivery instead of calling a push
/// service. Endpoints containing `/gone/` answer 410, everything else 201.
#[derive(Default)]
pub struct RecordingSender {
    deliveries: Mutex<Vec<(String, PushPayload, NotificationKind)>>,
    delay: Duration,
}

impl RecordingSender {
    /// A sender whose every delivery takes `delay` to complete.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn deliveries(&self) -> Vec<(String, PushPayload, NotificationKind)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.deliveries()
            .into_iter()
            .map(|(endpoint, _, _)| endpoint)
            .collect()
    }
}

#[async_trait]
impl PushSender for RecordingSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
        kind: NotificationKind,
    ) -> Result<u16, PushError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.deliveries.lock().unwrap().push((
            subscription.endpoint.clone(),
            payload.clone(),
            kind,
        ));
        if subscription.endpoint.contains("/gone/") {
            Ok(410)
        } else {
            Ok(201)
        }
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// The application under test plus the doubles it was built with.
pub struct TestApp {
    pub router: Router,
    pub sender: Arc<RecordingSender>,
    pub feed: Arc<ProjectFeed>,
    _cache_dir: TempDir,
}

/// Build the full application router with all middleware layers, using the
/// given database pool.
///
/// Goes through [`build_app_router`] so integration tests exercise the same
/// middleware stack that production uses. Push delivery is recorded rather
/// than sent, and the feed retries quickly.
pub fn build_test_app(pool: PgPool) -> TestApp {
    build_test_app_with(pool, 30, RecordingSender::default())
}

/// [`build_test_app`] with an explicit request timeout and push sender.
pub fn build_test_app_with(
    pool: PgPool,
    request_timeout_secs: u64,
    sender: RecordingSender,
) -> TestApp {
    let cache_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&cache_dir);
    config.request_timeout_secs = request_timeout_secs;

    let sender = Arc::new(sender);
    let dispatcher = NotificationDispatcher::new(
        Arc::new(PgPushStore::new(pool.clone())),
        sender.clone(),
    );

    let storage = Arc::new(LocalStorage::open(cache_dir.path()).unwrap());
    let feed = Arc::new(ProjectFeed::new(
        Arc::new(PgProjectSource::new(pool.clone())),
        storage,
        FeedOptions {
            cache_ttl_minutes: config.projects_cache_ttl_mins,
            fetch_timeout: Duration::from_secs(5),
            retry: RetryOptions {
                max_attempts: 1,
                delay: Duration::from_millis(1),
                ..RetryOptions::default()
            },
        },
        CancellationToken::new(),
    ));

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        dispatcher,
        feed: Arc::clone(&feed),
    };

    TestApp {
        router: build_app_router(state, &config),
        sender,
        feed,
        _cache_dir: cache_dir,
    }
}

// ---------------------------------------------------------------------------
// Auth helpers
// ---------------------------------------------------------------------------

/// Sign an access token for `user_id` with the test secret.
pub fn token_for(user_id: DbId) -> String {
    let claims = Claims {
        sub: user_id,
        role: Some("authenticated".to_string()),
        exp: chrono::Utc::now().timestamp() + 3600,
        email: Some(format!("{user_id}@test.com")),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// Grant the admin role to a fresh user id and return it.
pub async fn create_admin(pool: &PgPool) -> DbId {
    let user_id = Uuid::new_v4();
    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, 'admin')")
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
    user_id
}

/// Store a push subscription for `user_id` directly.
pub async fn create_subscription(pool: &PgPool, user_id: DbId, endpoint: &str) {
    sqlx::query(
        "INSERT INTO push_subscriptions (user_id, endpoint, p256dh_key, auth_key) \
         VALUES ($1, $2, 'p256dh', 'auth')",
    )
    .bind(user_id)
    .bind(endpoint)
    .execute(pool)
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a request with an optional JSON body and bearer token.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
    token: Option<&str>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, Some(token)).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), None).await
}

pub async fn post_json_auth(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(body), Some(token)).await
}

/// Collect a response body into a string.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
