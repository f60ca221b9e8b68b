//! Webhook payload parsing and item matching.

use crate::core::TrackedItem;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid payload")]
pub struct InvalidPayload;

/// Decode a webhook body.
///
/// JSON is the default, also for a missing or unknown content type. Form
/// encoded deliveries carry the JSON in the `payload` field; without that
/// field the whole body is tried as JSON. An empty document is invalid.
pub fn parse_payload(content_type: Option<&str>, body: &[u8]) -> Result<Value, InvalidPayload> {
    let is_form = content_type.is_some_and(|ct| ct.contains("application/x-www-form-urlencoded"));

    let value = if is_form {
        let field = url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "payload")
            .map(|(_, value)| value.into_owned());
        match field {
            Some(json) => serde_json::from_str::<Value>(&json),
            None => serde_json::from_slice::<Value>(body),
        }
    } else {
        serde_json::from_slice::<Value>(body)
    }
    .map_err(|_| InvalidPayload)?;

    match &value {
        Value::Object(map) if !map.is_empty() => Ok(value),
        Value::Array(items) if !items.is_empty() => Ok(value),
        _ => Err(InvalidPayload),
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryPayload {
    name: String,
    owner: OwnerPayload,
}

#[derive(Debug, Deserialize)]
struct OwnerPayload {
    #[serde(default)]
    login: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// A delivery the pipeline reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// Commits pushed to `branch`.
    Push {
        owner: String,
        name: String,
        branch: String,
    },
    /// A release was published.
    Release { owner: String, name: String },
}

impl WebhookEvent {
    /// Interpret a parsed payload for the `X-GitHub-Event` type `event`.
    ///
    /// `None` for unhandled event types, release actions other than
    /// `published`, and payloads without a usable repository.
    #[must_use]
    pub fn from_payload(event: &str, payload: &Value) -> Option<Self> {
        let repository = payload
            .get("repository")
            .and_then(|r| RepositoryPayload::deserialize(r).ok())?;
        let owner = repository.owner.login.or(repository.owner.name)?;

        match event {
            "push" => {
                let reference = payload.get("ref").and_then(Value::as_str).unwrap_or_default();
                Some(WebhookEvent::Push {
                    owner,
                    name: repository.name,
                    branch: reference.replace("refs/heads/", ""),
                })
            }
            "release" => {
                let action = payload.get("action").and_then(Value::as_str);
                (action == Some("published")).then_some(WebhookEvent::Release {
                    owner,
                    name: repository.name,
                })
            }
            _ => None,
        }
    }

    /// Whether this event should update `item`.
    #[must_use]
    pub fn matches(&self, item: &TrackedItem) -> bool {
        if !item.auto_update {
            return false;
        }
        match self {
            WebhookEvent::Push {
                owner,
                name,
                branch,
            } => item.repo.matches(owner, name) && !item.use_releases && item.branch == *branch,
            WebhookEvent::Release { owner, name } => item.repo.matches(owner, name) && item.use_releases,
        }
    }

    /// Same repository, ignoring mode and auto-update, for logging skipped items.
    #[must_use]
    pub fn concerns(&self, item: &TrackedItem) -> bool {
        match self {
            WebhookEvent::Push { owner, name, .. } | WebhookEvent::Release { owner, name } => {
                item.repo.matches(owner, name)
            }
        }
    }
}
