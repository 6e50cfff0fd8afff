use std::borrow::Cow;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Unique event identifier assigned at ingestion.
pub type EventId = Uuid;

/// A domain event submitted for rule evaluation (whale transfer, liquidity
/// shift, price move, ...).
///
/// `fields` is an open attribute map produced by external ingestion. Values are
/// untrusted and heterogeneous: the same attribute may arrive as a number in
/// one event and as a numeric string in the next.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default = "Uuid::new_v4")]
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: String,
    /// Wallet address or token id the event is about, if known.
    #[serde(default)]
    pub related_entity: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fields: HashMap<String, Value>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            related_entity: None,
            occurred_at: None,
            fields: HashMap::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_related_entity(mut self, entity: impl Into<String>) -> Self {
        self.related_entity = Some(entity.into());
        self
    }

    /// Look up an attribute by name.
    ///
    /// `type` and `eventType` fall back to the event's own tag when the
    /// attribute map does not carry them. A JSON `null` counts as absent.
    pub fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        match self.fields.get(name) {
            Some(Value::Null) => None,
            Some(v) => Some(Cow::Borrowed(v)),
            None if name == "type" || name == "eventType" => {
                Some(Cow::Owned(Value::String(self.event_type.clone())))
            }
            None => None,
        }
    }
}
