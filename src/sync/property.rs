//! Typed page properties and their wire codec

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

use super::StoreError;

/// Page properties keyed by column name
pub type Properties = BTreeMap<String, PropertyValue>;

/// One typed column value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PropertyValue {
    Title(String),
    RichText(String),
    Number(f64),
    Select(String),
    MultiSelect(Vec<String>),
    /// ISO-8601 date or instant
    Date(String),
    /// Related page ids
    Relation(Vec<String>),
    Checkbox(bool),
}

impl PropertyValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Title(_) => "title",
            Self::RichText(_) => "rich_text",
            Self::Number(_) => "number",
            Self::Select(_) => "select",
            Self::MultiSelect(_) => "multi_select",
            Self::Date(_) => "date",
            Self::Relation(_) => "relation",
            Self::Checkbox(_) => "checkbox",
        }
    }

    /// Multi-select keeping at most `cap` labels
    pub fn multi_select_capped<S: AsRef<str>>(labels: &[S], cap: usize) -> Self {
        Self::MultiSelect(
            labels
                .iter()
                .take(cap)
                .map(|l| l.as_ref().to_string())
                .collect(),
        )
    }

    /// Request body fragment for this value
    pub fn to_json(&self) -> Value {
        match self {
            Self::Title(text) => json!({ "title": [{ "text": { "content": text } }] }),
            Self::RichText(text) => json!({ "rich_text": [{ "text": { "content": text } }] }),
            Self::Number(n) => json!({ "number": n }),
            Self::Select(name) => json!({ "select": { "name": name } }),
            Self::MultiSelect(names) => {
                let items: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
                json!({ "multi_select": items })
            }
            Self::Date(start) => json!({ "date": { "start": start } }),
            Self::Relation(ids) => {
                let items: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
                json!({ "relation": items })
            }
            Self::Checkbox(checked) => json!({ "checkbox": checked }),
        }
    }

    /// Decode a property object from a store response
    ///
    /// Empty selects, dates and numbers decode to `None`, as do property
    /// types this crate never writes (rollups, people, files).
    pub fn from_json(value: &Value) -> Option<Self> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .or_else(|| infer_type(value))?;
        let body = value.get(kind)?;

        match kind {
            "title" => Some(Self::Title(plain_text(body))),
            "rich_text" | "text" => Some(Self::RichText(plain_text(body))),
            "number" => body.as_f64().map(Self::Number),
            "select" | "status" => body
                .get("name")
                .and_then(Value::as_str)
                .map(|name| Self::Select(name.to_string())),
            "multi_select" => Some(Self::MultiSelect(collect_field(body, "name"))),
            "date" => body
                .get("start")
                .and_then(Value::as_str)
                .map(|start| Self::Date(start.to_string())),
            "created_time" | "last_edited_time" => {
                body.as_str().map(|t| Self::Date(t.to_string()))
            }
            "relation" => Some(Self::Relation(collect_field(body, "id"))),
            "checkbox" => body.as_bool().map(Self::Checkbox),
            "formula" => match body.get("type").and_then(Value::as_str) {
                Some("string") => body
                    .get("string")
                    .and_then(Value::as_str)
                    .map(|s| Self::RichText(s.to_string())),
                Some("number") => body.get("number").and_then(Value::as_f64).map(Self::Number),
                Some("boolean") => body.get("boolean").and_then(Value::as_bool).map(Self::Checkbox),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Title(s) | Self::RichText(s) | Self::Select(s) | Self::Date(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Self::MultiSelect(items) | Self::Relation(items) => Some(items),
            _ => None,
        }
    }
}

const KNOWN_TYPES: [&str; 9] = [
    "title",
    "rich_text",
    "text",
    "number",
    "select",
    "multi_select",
    "date",
    "relation",
    "checkbox",
];

fn infer_type(value: &Value) -> Option<&'static str> {
    KNOWN_TYPES.into_iter().find(|kind| value.get(*kind).is_some())
}

/// Concatenated text of a rich text array
fn plain_text(body: &Value) -> String {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.get("plain_text")
                        .or_else(|| item.get("text").and_then(|t| t.get("content")))
                        .and_then(Value::as_str)
                })
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn collect_field(body: &Value, field: &str) -> Vec<String> {
    body.as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get(field).and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Request body `properties` object
pub fn properties_to_json(properties: &Properties) -> Value {
    let map: Map<String, Value> = properties
        .iter()
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect();
    Value::Object(map)
}

/// Decode every supported property of a response object
pub fn properties_from_json(value: &Value) -> Properties {
    value
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(name, prop)| {
                    PropertyValue::from_json(prop).map(|decoded| (name.clone(), decoded))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A stored page with decoded properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub created_time: String,
    pub last_edited_time: String,
    pub properties: Properties,
}

impl Page {
    /// Parse a page object from a store response
    pub fn from_json(value: &Value) -> Result<Self, StoreError> {
        let id = value
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Decode("page without id".to_string()))?;
        let text_field = |field: &str| {
            value
                .get(field)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Ok(Self {
            id: id.to_string(),
            created_time: text_field("created_time"),
            last_edited_time: text_field("last_edited_time"),
            properties: value
                .get("properties")
                .map(properties_from_json)
                .unwrap_or_default(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PropertyValue::as_text)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(PropertyValue::as_number)
    }
}
