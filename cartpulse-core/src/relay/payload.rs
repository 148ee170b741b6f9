//! Payload shaping for the conversion-tracking API
//!
//! Projects an [`AnalyticsEvent`] plus the request-derived user signal
//! into the wire format the external service dictates. The schema is a
//! fixed external contract; this module owns nothing but the mapping.
//!
//! ## Identity matching
//!
//! The external service stitches browser and server reports of the
//! same action together using whatever signal it gets: client IP and
//! user-agent always, the two browser correlation cookies (`fbp`,
//! `fbc`) when the caller supplied them, and hashed contact fields when
//! the request carried an authenticated identity. Absent fields are
//! omitted from the JSON entirely — never sent as null or empty
//! strings, which would degrade match quality server-side.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::types::{AnalyticsEvent, RequestContext};

/// Request body for the conversion endpoint.
///
/// The API accepts a batch array; this relay always sends exactly one
/// event per ingestion attempt.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionPayload {
    pub data: Vec<ConversionEvent>,
}

/// One event in the conversion payload.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionEvent {
    pub event_name: String,

    /// Unix seconds of the occurrence
    pub event_time: i64,

    /// Correlation id, forwarded unchanged so the external service can
    /// deduplicate the browser and server channels
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,

    /// Full URL the event originated from
    pub event_source_url: String,

    pub action_source: &'static str,

    pub user_data: UserData,

    /// Caller-supplied custom fields not otherwise consumed
    pub custom_data: serde_json::Map<String, serde_json::Value>,
}

/// User-matching block of a conversion event.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UserData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip_address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fbc: Option<String>,

    /// SHA-256 of the normalized email
    #[serde(skip_serializing_if = "Option::is_none")]
    pub em: Option<String>,

    /// SHA-256 of the normalized phone number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ph: Option<String>,
}

impl ConversionPayload {
    /// Build the outbound payload for one event.
    pub fn build(event: &AnalyticsEvent, ctx: &RequestContext, site_origin: &str) -> Self {
        let user_data = UserData {
            client_ip_address: ctx.ip.clone(),
            client_user_agent: ctx.user_agent.clone(),
            fbp: ctx.fbp.clone(),
            fbc: ctx.fbc.clone(),
            em: ctx
                .identity
                .as_ref()
                .and_then(|id| id.email.as_deref())
                .map(hash_email),
            ph: ctx
                .identity
                .as_ref()
                .and_then(|id| id.phone.as_deref())
                .map(hash_phone),
        };

        ConversionPayload {
            data: vec![ConversionEvent {
                event_name: event.event_type.clone(),
                event_time: event_time(event.recorded_at),
                event_id: event.event_id.clone(),
                event_source_url: event_source_url(site_origin, event.path.as_deref()),
                action_source: "website",
                user_data,
                custom_data: event.data.clone(),
            }],
        }
    }
}

/// Join the configured site origin with an event path.
///
/// An empty or missing path defaults to the site root.
pub fn event_source_url(site_origin: &str, path: Option<&str>) -> String {
    let origin = site_origin.trim_end_matches('/');
    match path {
        Some(p) if !p.is_empty() => {
            if p.starts_with('/') {
                format!("{}{}", origin, p)
            } else {
                format!("{}/{}", origin, p)
            }
        }
        _ => format!("{}/", origin),
    }
}

fn event_time(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

/// Hash an email per the external contract: trimmed, lowercased, SHA-256 hex.
fn hash_email(email: &str) -> String {
    sha256_hex(&email.trim().to_lowercase())
}

/// Hash a phone number per the external contract: digits only, SHA-256 hex.
fn hash_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    sha256_hex(&digits)
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Identity;
    use chrono::TimeZone;

    fn sample_event(event_id: Option<&str>, path: Option<&str>) -> AnalyticsEvent {
        let mut data = serde_json::Map::new();
        data.insert("value".to_string(), serde_json::json!(49.99));
        AnalyticsEvent {
            event_type: "purchase".to_string(),
            event_id: event_id.map(String::from),
            path: path.map(String::from),
            source: None,
            utm: None,
            data,
            recorded_at: Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_event_source_url_join() {
        assert_eq!(
            event_source_url("https://shop.example.com", Some("/checkout")),
            "https://shop.example.com/checkout"
        );
        assert_eq!(
            event_source_url("https://shop.example.com/", Some("checkout")),
            "https://shop.example.com/checkout"
        );
        // Empty or missing path defaults to root
        assert_eq!(
            event_source_url("https://shop.example.com", Some("")),
            "https://shop.example.com/"
        );
        assert_eq!(
            event_source_url("https://shop.example.com", None),
            "https://shop.example.com/"
        );
    }

    #[test]
    fn test_anonymous_context_omits_contact_fields() {
        let event = sample_event(Some("abc123"), Some("/checkout"));
        let ctx = RequestContext {
            ip: Some("203.0.113.9".to_string()),
            user_agent: Some("Mozilla/5.0".to_string()),
            fbp: Some("fb.1.123.456".to_string()),
            fbc: None,
            identity: None,
        };

        let payload = ConversionPayload::build(&event, &ctx, "https://shop.example.com");
        let json = serde_json::to_value(&payload).unwrap();
        let user_data = &json["data"][0]["user_data"];

        // Keys absent entirely, not serialized as null or ""
        assert!(user_data.get("em").is_none());
        assert!(user_data.get("ph").is_none());
        assert!(user_data.get("fbc").is_none());
        assert_eq!(user_data["client_ip_address"], "203.0.113.9");
        assert_eq!(user_data["fbp"], "fb.1.123.456");
    }

    #[test]
    fn test_identity_fields_are_hashed() {
        let event = sample_event(None, None);
        let ctx = RequestContext {
            identity: Some(Identity {
                email: Some("  Ada@Example.COM ".to_string()),
                phone: Some("+1 (555) 010-0123".to_string()),
            }),
            ..Default::default()
        };

        let payload = ConversionPayload::build(&event, &ctx, "https://shop.example.com");
        let user_data = &payload.data[0].user_data;

        assert_eq!(user_data.em.as_deref(), Some(sha256_hex("ada@example.com").as_str()));
        assert_eq!(user_data.ph.as_deref(), Some(sha256_hex("15550100123").as_str()));
    }

    #[test]
    fn test_event_id_forwarded_unchanged() {
        let event = sample_event(Some("abc123"), None);
        let ctx = RequestContext::default();

        let first = ConversionPayload::build(&event, &ctx, "https://shop.example.com");
        let second = ConversionPayload::build(&event, &ctx, "https://shop.example.com");

        assert_eq!(first.data[0].event_id.as_deref(), Some("abc123"));
        assert_eq!(first.data[0].event_id, second.data[0].event_id);
    }

    #[test]
    fn test_custom_data_passthrough() {
        let event = sample_event(None, None);
        let ctx = RequestContext::default();

        let payload = ConversionPayload::build(&event, &ctx, "https://shop.example.com");
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["data"][0]["custom_data"]["value"], 49.99);
        assert_eq!(json["data"][0]["event_name"], "purchase");
        assert_eq!(json["data"][0]["action_source"], "website");
        assert_eq!(
            json["data"][0]["event_time"],
            Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap().timestamp()
        );
    }
}
