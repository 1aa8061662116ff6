//! Domain events published for asynchronous consumption.
//!
//! Events are immutable facts. On the wire they are plain JSON objects; the
//! topic an event travels on determines its [`EventKind`], so the payload
//! itself carries no type tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Discriminates the two event streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    UrlCreated,
    UrlClicked,
}

impl EventKind {
    /// Value stored in the analytics `event_type` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::UrlCreated => "url_created",
            EventKind::UrlClicked => "url_clicked",
        }
    }

    /// Parses a stored `event_type` value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "url_created" => Some(EventKind::UrlCreated),
            "url_clicked" => Some(EventKind::UrlClicked),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            EventKind::UrlCreated => "URLCreated",
            EventKind::UrlClicked => "URLClicked",
        })
    }
}

/// Emitted once per successfully persisted short URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlCreated {
    pub short_code: String,
    pub long_url: String,
    #[serde(default, deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Emitted once per successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlClicked {
    pub short_code: String,
    pub clicked_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub user_agent: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub referer: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", serialize_with = "none_as_empty")]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainEvent {
    UrlCreated(UrlCreated),
    UrlClicked(UrlClicked),
}

impl DomainEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            DomainEvent::UrlCreated(_) => EventKind::UrlCreated,
            DomainEvent::UrlClicked(_) => EventKind::UrlClicked,
        }
    }

    pub fn short_code(&self) -> &str {
        match self {
            DomainEvent::UrlCreated(e) => &e.short_code,
            DomainEvent::UrlClicked(e) => &e.short_code,
        }
    }

    /// Serializes the event payload as JSON.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            DomainEvent::UrlCreated(e) => serde_json::to_vec(e),
            DomainEvent::UrlClicked(e) => serde_json::to_vec(e),
        }
    }

    /// Decodes a payload read from the topic carrying `kind` events.
    pub fn decode(kind: EventKind, payload: &[u8]) -> Result<Self, serde_json::Error> {
        match kind {
            EventKind::UrlCreated => serde_json::from_slice(payload).map(DomainEvent::UrlCreated),
            EventKind::UrlClicked => serde_json::from_slice(payload).map(DomainEvent::UrlClicked),
        }
    }
}

/// Click metadata supplied by the edge layer; never derived by the resolver.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickMetadata {
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub ip_address: Option<String>,
}

impl ClickMetadata {
    pub fn new(ip_address: Option<String>, user_agent: Option<&str>, referer: Option<&str>) -> Self {
        Self {
            ip_address,
            user_agent: user_agent.map(|s| s.to_string()),
            referer: referer.map(|s| s.to_string()),
        }
    }
}

/// Absent optional fields travel as `""`, never `null`.
fn none_as_empty<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

/// Accepts `""`, `null`, or a missing field as "absent".
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
