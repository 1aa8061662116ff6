#![allow(dead_code)]

use axum_test::TestServer;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use url_shortener_pipeline::domain::entities::NewShortUrl;
use url_shortener_pipeline::domain::repositories::UrlRepository;
use url_shortener_pipeline::infrastructure::cache::NullCache;
use url_shortener_pipeline::infrastructure::identity::HmacIdentityProvider;
use url_shortener_pipeline::infrastructure::messaging::MemoryBroker;
use url_shortener_pipeline::infrastructure::persistence::MemoryUrlRepository;
use url_shortener_pipeline::routes::build_router;
use url_shortener_pipeline::state::{AppState, Backends, StateOptions};

pub const SIGNING_SECRET: &str = "test-signing-secret";
pub const CREATED_TOPIC: &str = "url-created-events";
pub const CLICKED_TOPIC: &str = "url-click-events";

/// In-memory application wired the way `STORE_BACKEND=memory` runs it.
pub struct TestApp {
    pub server: TestServer,
    pub state: AppState,
    pub repo: Arc<MemoryUrlRepository>,
    pub broker: MemoryBroker,
    pub identity: Arc<HmacIdentityProvider>,
}

impl TestApp {
    /// `Authorization` header value for `subject`.
    pub fn bearer(&self, subject: &str) -> String {
        format!("Bearer {}", self.identity.issue_token(subject))
    }
}

pub fn create_test_app() -> TestApp {
    create_test_app_with(StateOptions::default())
}

pub fn create_test_app_with(options: StateOptions) -> TestApp {
    let repo = Arc::new(MemoryUrlRepository::new());
    let broker = MemoryBroker::new();
    let identity = Arc::new(HmacIdentityProvider::new(SIGNING_SECRET).unwrap());

    let state = AppState::new(
        Backends {
            repository: repo.clone(),
            cache: Arc::new(NullCache::new()),
            publisher: Arc::new(broker.clone()),
            identity: identity.clone(),
        },
        options,
    );

    let server = TestServer::new(build_router(state.clone())).unwrap();

    TestApp {
        server,
        state,
        repo,
        broker,
        identity,
    }
}

pub async fn seed_url(
    repo: &dyn UrlRepository,
    code: &str,
    url: &str,
    owner: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
) {
    repo.insert_if_absent(NewShortUrl {
        short_code: code.to_string(),
        long_url: url.to_string(),
        owner: owner.map(str::to_string),
        expires_at,
        created_at: Utc::now(),
    })
    .await
    .unwrap()
    .expect("code should be free");
}

/// Polls until `count` records were appended to `topic`; events are published off the request path.
pub async fn wait_for_topic(broker: &MemoryBroker, topic: &str, count: usize) {
    for _ in 0..100 {
        if broker.end_offset(topic) >= count as i64 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} records on {}, found {}",
        count,
        topic,
        broker.end_offset(topic)
    );
}

pub async fn create_db_url(pool: &PgPool, code: &str, url: &str, owner: Option<&str>) {
    sqlx::query("INSERT INTO urls (short_code, long_url, user_id) VALUES ($1, $2, $3)")
        .bind(code)
        .bind(url)
        .bind(owner)
        .execute(pool)
        .await
        .unwrap();
}

pub async fn create_expired_db_url(pool: &PgPool, code: &str, url: &str) {
    sqlx::query(
        "INSERT INTO urls (short_code, long_url, expires_at) VALUES ($1, $2, NOW() - INTERVAL '1 hour')",
    )
    .bind(code)
    .bind(url)
    .execute(pool)
    .await
    .unwrap();
}
