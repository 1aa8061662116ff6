//! Process wiring and runtime lifecycle.
//!
//! Builds the store, cache, broker and identity backends from [`Config`],
//! then runs the HTTP server, the analytics consumers, or both.

use crate::application::services::AnalyticsConsumer;
use crate::config::{BrokerBackend, Config, StoreBackend};
use crate::domain::events::EventKind;
use crate::domain::repositories::{AnalyticsRepository, UrlRepository};
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::identity::HmacIdentityProvider;
#[cfg(feature = "kafka")]
use crate::infrastructure::messaging::{KafkaEventSource, KafkaPublisher};
use crate::infrastructure::messaging::{EventPublisher, EventSource, MemoryBroker};
use crate::infrastructure::persistence::{
    MemoryAnalyticsRepository, MemoryUrlRepository, PgAnalyticsRepository, PgUrlRepository,
};
use crate::routes::app_router;
use crate::state::{AppState, Backends, StateOptions};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// URL Store and analytics sink sharing one backend.
struct Stores {
    urls: Arc<dyn UrlRepository>,
    analytics: Arc<dyn AnalyticsRepository>,
}

/// Broker handle able to produce publishers and per-group sources.
enum Broker {
    Memory(MemoryBroker),
    #[cfg(feature = "kafka")]
    Kafka { brokers: String },
}

impl Broker {
    fn from_config(config: &Config) -> Self {
        match config.broker_backend {
            BrokerBackend::Memory => Broker::Memory(MemoryBroker::new()),
            #[cfg(feature = "kafka")]
            BrokerBackend::Kafka => Broker::Kafka {
                brokers: config.kafka_brokers.clone(),
            },
            // Rejected by `Config::validate` when the feature is off.
            #[cfg(not(feature = "kafka"))]
            BrokerBackend::Kafka => Broker::Memory(MemoryBroker::new()),
        }
    }

    fn is_in_process(&self) -> bool {
        matches!(self, Broker::Memory(_))
    }

    fn publisher(&self, _config: &Config) -> Result<Arc<dyn EventPublisher>> {
        match self {
            Broker::Memory(broker) => Ok(Arc::new(broker.clone())),
            #[cfg(feature = "kafka")]
            Broker::Kafka { brokers } => Ok(Arc::new(KafkaPublisher::new(
                brokers,
                _config.publish_timeout(),
            )?)),
        }
    }

    fn source(&self, topic: &str, group: &str) -> Result<Box<dyn EventSource>> {
        match self {
            Broker::Memory(broker) => Ok(Box::new(broker.subscribe(topic, group))),
            #[cfg(feature = "kafka")]
            Broker::Kafka { brokers } => {
                Ok(Box::new(KafkaEventSource::new(brokers, topic, group)?))
            }
        }
    }
}

/// Connects the configured store; applies migrations for PostgreSQL.
async fn connect_stores(config: &Config) -> Result<Stores> {
    match (config.store_backend, &config.database_url) {
        (StoreBackend::Postgres, Some(database_url)) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
                .idle_timeout(Duration::from_secs(config.db_idle_timeout))
                .max_lifetime(Duration::from_secs(config.db_max_lifetime))
                .connect(database_url)
                .await
                .context("Failed to connect to database")?;
            tracing::info!("Connected to database");

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to apply migrations")?;

            let pool = Arc::new(pool);
            Ok(Stores {
                urls: Arc::new(PgUrlRepository::new(pool.clone())),
                analytics: Arc::new(PgAnalyticsRepository::new(pool)),
            })
        }
        (StoreBackend::Postgres, None) => anyhow::bail!("DATABASE_URL is not configured"),
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            Ok(Stores {
                urls: Arc::new(MemoryUrlRepository::new()),
                analytics: Arc::new(MemoryAnalyticsRepository::new()),
            })
        }
    }
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                Arc::new(redis)
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                Arc::new(NullCache::new())
            }
        }
    } else {
        tracing::info!("Cache disabled (NullCache)");
        Arc::new(NullCache::new())
    }
}

/// One consumer per event stream, each under its own group.
fn build_consumers(
    config: &Config,
    broker: &Broker,
    sink: Arc<dyn AnalyticsRepository>,
) -> Result<Vec<AnalyticsConsumer>> {
    let streams = [
        (
            EventKind::UrlCreated,
            &config.created_topic,
            &config.created_consumer_group,
        ),
        (
            EventKind::UrlClicked,
            &config.click_topic,
            &config.click_consumer_group,
        ),
    ];

    streams
        .into_iter()
        .map(|(kind, topic, group)| {
            Ok(AnalyticsConsumer::new(
                kind,
                topic.as_str(),
                group.as_str(),
                broker.source(topic, group)?,
                sink.clone(),
                config.consumer_settings(),
            ))
        })
        .collect()
}

fn spawn_consumers(
    consumers: Vec<AnalyticsConsumer>,
    shutdown: &watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    consumers
        .into_iter()
        .map(|consumer| tokio::spawn(consumer.run(shutdown.clone())))
        .collect()
}

async fn join_consumers(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "Analytics consumer task failed");
        }
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

/// Runs the HTTP server, plus the analytics consumers when enabled.
///
/// Initializes:
/// - URL Store (PostgreSQL with migrations, or in-memory)
/// - Redis cache (or NullCache fallback)
/// - Event publisher and analytics consumers
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The broker client cannot be created
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let stores = connect_stores(&config).await?;
    let cache = connect_cache(&config).await;
    let broker = Broker::from_config(&config);
    let identity = HmacIdentityProvider::new(&config.token_signing_secret)
        .map_err(|e| anyhow::anyhow!("Invalid TOKEN_SIGNING_SECRET: {e}"))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumer_handles = if config.run_analytics_consumers {
        let consumers = build_consumers(&config, &broker, stores.analytics.clone())?;
        tracing::info!(count = consumers.len(), "Analytics consumers started");
        spawn_consumers(consumers, &shutdown_rx)
    } else {
        if broker.is_in_process() {
            tracing::warn!("In-process broker without consumers: events are never ingested");
        }
        Vec::new()
    };

    let state = AppState::new(
        Backends {
            repository: stores.urls,
            cache,
            publisher: broker.publisher(&config)?,
            identity: Arc::new(identity),
        },
        StateOptions {
            settings: config.service_settings(),
            topics: config.topics(),
            publish_timeout: config.publish_timeout(),
            behind_proxy: config.behind_proxy,
        },
    );

    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    let _ = shutdown_tx.send(true);
    join_consumers(consumer_handles).await;

    Ok(())
}

/// Runs only the analytics consumers until a shutdown signal.
///
/// # Errors
///
/// Returns an error if the store or broker cannot be reached, or if the
/// broker is in-process (a separate consumer process would never see events).
pub async fn run_consumers(config: Config) -> Result<()> {
    let broker = Broker::from_config(&config);
    if broker.is_in_process() {
        anyhow::bail!("`consume` needs an external broker; set BROKER_BACKEND=kafka");
    }

    let stores = connect_stores(&config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let consumers = build_consumers(&config, &broker, stores.analytics)?;
    tracing::info!(count = consumers.len(), "Analytics consumers started");
    let handles = spawn_consumers(consumers, &shutdown_rx);

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    join_consumers(handles).await;

    Ok(())
}
