//! Analytics rows derived from domain events.

use chrono::{DateTime, Utc};

use crate::domain::events::{DomainEvent, EventKind};

/// A stored analytics row.
///
/// Rows are append-only and carry no uniqueness constraint: a redelivered
/// event produces another row with the same `(event_type, short_code, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsRow {
    pub id: i64,
    pub event_type: EventKind,
    pub short_code: String,
    pub long_url: Option<String>,
    pub user_id: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub ingested_at: DateTime<Utc>,
}

/// Input data for appending an analytics row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnalyticsRow {
    pub event_type: EventKind,
    pub short_code: String,
    pub long_url: Option<String>,
    pub user_id: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl From<&DomainEvent> for NewAnalyticsRow {
    fn from(event: &DomainEvent) -> Self {
        match event {
            DomainEvent::UrlCreated(e) => Self {
                event_type: EventKind::UrlCreated,
                short_code: e.short_code.clone(),
                long_url: Some(e.long_url.clone()),
                user_id: e.user_id.clone(),
                user_agent: None,
                referer: None,
                ip_address: None,
                timestamp: e.created_at,
            },
            DomainEvent::UrlClicked(e) => Self {
                event_type: EventKind::UrlClicked,
                short_code: e.short_code.clone(),
                long_url: None,
                user_id: None,
                user_agent: e.user_agent.clone(),
                referer: e.referer.clone(),
                ip_address: e.ip_address.clone(),
                timestamp: e.clicked_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::{UrlClicked, UrlCreated};

    #[test]
    fn test_row_from_created_event() {
        let now = Utc::now();
        let event = DomainEvent::UrlCreated(UrlCreated {
            short_code: "abc123".to_string(),
            long_url: "https://example.com".to_string(),
            user_id: Some("u1".to_string()),
            created_at: now,
        });

        let row = NewAnalyticsRow::from(&event);

        assert_eq!(row.event_type, EventKind::UrlCreated);
        assert_eq!(row.short_code, "abc123");
        assert_eq!(row.long_url.as_deref(), Some("https://example.com"));
        assert_eq!(row.user_id.as_deref(), Some("u1"));
        assert!(row.ip_address.is_none());
        assert_eq!(row.timestamp, now);
    }

    #[test]
    fn test_row_from_clicked_event() {
        let now = Utc::now();
        let event = DomainEvent::UrlClicked(UrlClicked {
            short_code: "abc123".to_string(),
            clicked_at: now,
            user_agent: Some("Mozilla/5.0".to_string()),
            referer: None,
            ip_address: Some("10.0.0.1".to_string()),
        });

        let row = NewAnalyticsRow::from(&event);

        assert_eq!(row.event_type, EventKind::UrlClicked);
        assert!(row.long_url.is_none());
        assert_eq!(row.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(row.ip_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(row.timestamp, now);
    }
}
