use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use url_shortener_pipeline::domain::entities::NewAnalyticsRow;
use url_shortener_pipeline::domain::events::EventKind;
use url_shortener_pipeline::domain::repositories::AnalyticsRepository;
use url_shortener_pipeline::infrastructure::persistence::PgAnalyticsRepository;

fn click_row(code: &str, minutes_ago: i64) -> NewAnalyticsRow {
    NewAnalyticsRow {
        event_type: EventKind::UrlClicked,
        short_code: code.to_string(),
        long_url: None,
        user_id: None,
        user_agent: Some("curl/8.0".to_string()),
        referer: None,
        ip_address: Some("203.0.113.9".to_string()),
        timestamp: Utc::now() - Duration::minutes(minutes_ago),
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_insert_and_list_newest_first(pool: PgPool) {
    let repo = PgAnalyticsRepository::new(Arc::new(pool));

    repo.insert(click_row("abc", 10)).await.unwrap();
    repo.insert(click_row("abc", 1)).await.unwrap();
    repo.insert(click_row("other", 0)).await.unwrap();

    let rows = repo.list_for_code("abc", 10).await.unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows[0].timestamp > rows[1].timestamp);
    assert_eq!(rows[0].event_type, EventKind::UrlClicked);
    assert_eq!(rows[0].ip_address.as_deref(), Some("203.0.113.9"));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_rows_are_kept(pool: PgPool) {
    let repo = PgAnalyticsRepository::new(Arc::new(pool));
    let row = click_row("dup", 0);

    repo.insert(row.clone()).await.unwrap();
    repo.insert(row).await.unwrap();

    let rows = repo.list_for_code("dup", 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_ne!(rows[0].id, rows[1].id);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_list_respects_limit(pool: PgPool) {
    let repo = PgAnalyticsRepository::new(Arc::new(pool));
    for i in 0..5 {
        repo.insert(click_row("many", i)).await.unwrap();
    }

    let rows = repo.list_for_code("many", 3).await.unwrap();
    assert_eq!(rows.len(), 3);
}
