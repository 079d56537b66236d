//! Wire protocol: the JSON shapes clients send and receive, framed one object
//! per line.
//!
//! A single flat record with optional fields per [`Operation`] is used
//! instead of a discriminated per-operation type hierarchy; the dispatcher
//! enforces which fields are required for each branch itself. PascalCase
//! field names are part of the external wire contract, not a Rust naming
//! choice, hence the `#[serde(rename = "...")]` on every field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The operation a [`Request`] asks the session to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    Subscribe,
    Unsubscribe,
}

impl Operation {
    /// Parses the raw `Operation` string off the wire. An unrecognized name
    /// is a valid-JSON, invalid-*value* request — it gets a `Success:false`
    /// reply, not a closed connection, so this returns `None` rather than
    /// failing the whole [`Request`] deserialization.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Create" => Some(Operation::Create),
            "Read" => Some(Operation::Read),
            "Update" => Some(Operation::Update),
            "Delete" => Some(Operation::Delete),
            "Subscribe" => Some(Operation::Subscribe),
            "Unsubscribe" => Some(Operation::Unsubscribe),
            _ => None,
        }
    }
}

/// The kind of change a [`crate::events::CacheEvent`] reports.
///
/// Also used as the vocabulary for `SubscribedEventTypes` on `Subscribe` /
/// `Unsubscribe` requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum EventType {
    ItemAdded,
    ItemUpdated,
    ItemRemoved,
    ItemExpired,
    ItemEvicted,
}

impl EventType {
    /// All event types, in a fixed order — the registry's "subscribe with no
    /// event list" replaces a client's filter with this full universe.
    pub const ALL: [EventType; 5] = [
        EventType::ItemAdded,
        EventType::ItemUpdated,
        EventType::ItemRemoved,
        EventType::ItemExpired,
        EventType::ItemEvicted,
    ];
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::ItemAdded => "ItemAdded",
            EventType::ItemUpdated => "ItemUpdated",
            EventType::ItemRemoved => "ItemRemoved",
            EventType::ItemExpired => "ItemExpired",
            EventType::ItemEvicted => "ItemEvicted",
        };
        f.write_str(name)
    }
}

/// A client request: one JSON object, whose `Operation` field selects which of
/// the remaining optional fields are meaningful.
///
/// `operation` is kept as the raw wire string rather than deserialized
/// straight into [`Operation`]: an unrecognized value there is a semantic
/// fault the dispatcher answers with `Success:false`, not a parse failure
/// that should tear down the connection. Use [`Operation::parse`] on it.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(rename = "Operation")]
    pub operation: String,

    #[serde(rename = "Key", default)]
    pub key: Option<String>,

    #[serde(rename = "Value", default)]
    pub value: Option<Value>,

    #[serde(rename = "ExpirationSeconds", default)]
    pub expiration_seconds: Option<i64>,

    #[serde(rename = "SubscribedEventTypes", default)]
    pub subscribed_event_types: Option<Vec<EventType>>,
}

/// A server response: either the reply to a request, or — when
/// `is_notification` is set — an asynchronously pushed [`CacheEvent`].
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    #[serde(rename = "Success")]
    pub success: bool,

    #[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(rename = "IsNotification")]
    pub is_notification: bool,

    #[serde(rename = "Event", skip_serializing_if = "Option::is_none")]
    pub event: Option<CacheEvent>,
}

impl Response {
    /// A plain `{success:true}` reply with no value.
    pub fn ok() -> Self {
        Self {
            success: true,
            value: None,
            error: None,
            is_notification: false,
            event: None,
        }
    }

    /// A successful `Read`/`Create`/`Update`/`Delete` reply carrying a value
    /// (possibly `null`, for a missed `Read`).
    pub fn ok_with_value(value: Value) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            is_notification: false,
            event: None,
        }
    }

    /// A negative reply. Used for duplicate keys, missing keys on `Update`,
    /// and unknown operations (with an `error` message in the last case).
    pub fn fail(error: Option<String>) -> Self {
        Self {
            success: false,
            value: None,
            error,
            is_notification: false,
            event: None,
        }
    }

    /// An asynchronously pushed notification wrapping a committed
    /// [`CacheEvent`].
    pub fn notification(event: CacheEvent) -> Self {
        Self {
            success: true,
            value: None,
            error: None,
            is_notification: true,
            event: Some(event),
        }
    }
}

/// A single committed, terminal cache state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEvent {
    #[serde(rename = "EventType")]
    pub event_type: EventType,

    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Value", skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "Reason", skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_pascal_case_fields() {
        let json = r#"{"Operation":"Create","Key":"a","Value":1,"ExpirationSeconds":30}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(Operation::parse(&req.operation), Some(Operation::Create));
        assert_eq!(req.key.as_deref(), Some("a"));
        assert_eq!(req.value, Some(Value::from(1)));
        assert_eq!(req.expiration_seconds, Some(30));
    }

    #[test]
    fn request_without_optional_fields_defaults_to_none() {
        let json = r#"{"Operation":"Subscribe"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(Operation::parse(&req.operation), Some(Operation::Subscribe));
        assert!(req.key.is_none());
        assert!(req.subscribed_event_types.is_none());
    }

    #[test]
    fn unrecognized_operation_parses_to_none() {
        let json = r#"{"Operation":"Frobnicate"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(Operation::parse(&req.operation), None);
    }

    #[test]
    fn response_omits_absent_optional_fields() {
        let resp = Response::ok();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("Value"));
        assert!(!json.contains("Error"));
        assert!(!json.contains("Event"));
        assert!(json.contains("\"Success\":true"));
        assert!(json.contains("\"IsNotification\":false"));
    }

    #[test]
    fn notification_serializes_embedded_event() {
        let event = CacheEvent {
            event_type: EventType::ItemAdded,
            key: "a".to_string(),
            value: Some(Value::from(1)),
            timestamp: Utc::now(),
            reason: None,
        };
        let resp = Response::notification(event);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"IsNotification\":true"));
        assert!(json.contains("\"EventType\":\"ItemAdded\""));
    }
}
