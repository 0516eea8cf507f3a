//! Page store abstraction

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{json, Value};
use std::cmp::Ordering;

use super::property::{Page, Properties, PropertyValue};
use super::StoreError;

/// Query filter over page properties
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    TitleEquals { property: String, value: String },
    SelectEquals { property: String, value: String },
    RelationContains { property: String, page_id: String },
    /// Strictly after the given ISO-8601 date or instant
    DateAfter { property: String, date: String },
    And(Vec<Filter>),
}

impl Filter {
    pub fn title_equals(property: &str, value: &str) -> Self {
        Self::TitleEquals {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn select_equals(property: &str, value: &str) -> Self {
        Self::SelectEquals {
            property: property.to_string(),
            value: value.to_string(),
        }
    }

    pub fn relation_contains(property: &str, page_id: &str) -> Self {
        Self::RelationContains {
            property: property.to_string(),
            page_id: page_id.to_string(),
        }
    }

    pub fn date_after(property: &str, date: &str) -> Self {
        Self::DateAfter {
            property: property.to_string(),
            date: date.to_string(),
        }
    }

    /// Query body fragment
    pub fn to_json(&self) -> Value {
        match self {
            Self::TitleEquals { property, value } => {
                json!({ "property": property, "title": { "equals": value } })
            }
            Self::SelectEquals { property, value } => {
                json!({ "property": property, "select": { "equals": value } })
            }
            Self::RelationContains { property, page_id } => {
                json!({ "property": property, "relation": { "contains": page_id } })
            }
            Self::DateAfter { property, date } => {
                json!({ "property": property, "date": { "after": date } })
            }
            Self::And(filters) => {
                let parts: Vec<Value> = filters.iter().map(Filter::to_json).collect();
                json!({ "and": parts })
            }
        }
    }

    /// Evaluate against decoded properties
    pub fn matches(&self, properties: &Properties) -> bool {
        match self {
            Self::TitleEquals { property, value } => matches!(
                properties.get(property),
                Some(PropertyValue::Title(t)) if t == value
            ),
            Self::SelectEquals { property, value } => matches!(
                properties.get(property),
                Some(PropertyValue::Select(s)) if s == value
            ),
            Self::RelationContains { property, page_id } => matches!(
                properties.get(property),
                Some(PropertyValue::Relation(ids)) if ids.contains(page_id)
            ),
            Self::DateAfter { property, date } => match properties.get(property) {
                Some(PropertyValue::Date(value)) => {
                    match (parse_instant(value), parse_instant(date)) {
                        (Some(v), Some(threshold)) => v > threshold,
                        _ => false,
                    }
                }
                _ => false,
            },
            Self::And(filters) => filters.iter().all(|f| f.matches(properties)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

/// Sort key of a query
#[derive(Debug, Clone, PartialEq)]
pub enum Sort {
    Property {
        property: String,
        direction: SortDirection,
    },
    LastEdited(SortDirection),
}

impl Sort {
    pub fn property(property: &str, direction: SortDirection) -> Self {
        Self::Property {
            property: property.to_string(),
            direction,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Property {
                property,
                direction,
            } => json!({ "property": property, "direction": direction.as_str() }),
            Self::LastEdited(direction) => {
                json!({ "timestamp": "last_edited_time", "direction": direction.as_str() })
            }
        }
    }

    /// Compare two pages under this key
    pub fn compare(&self, a: &Page, b: &Page) -> Ordering {
        let (ordering, direction) = match self {
            Self::Property {
                property,
                direction,
            } => (
                compare_values(a.get(property), b.get(property)),
                *direction,
            ),
            Self::LastEdited(direction) => (
                compare_instants(&a.last_edited_time, &b.last_edited_time),
                *direction,
            ),
        };

        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }
}

fn compare_values(a: Option<&PropertyValue>, b: Option<&PropertyValue>) -> Ordering {
    match (a, b) {
        (Some(PropertyValue::Number(x)), Some(PropertyValue::Number(y))) => x.total_cmp(y),
        (Some(PropertyValue::Date(x)), Some(PropertyValue::Date(y))) => compare_instants(x, y),
        (Some(x), Some(y)) => x.as_text().cmp(&y.as_text()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_instants(a: &str, b: &str) -> Ordering {
    match (parse_instant(a), parse_instant(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Parse an ISO-8601 date, naive instant or offset instant
pub fn parse_instant(value: &str) -> Option<NaiveDateTime> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Some(instant.naive_utc());
    }
    if let Ok(instant) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(instant);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Typed-page database with create, query and partial update
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Create a page in `database_id`
    async fn create_page(
        &self,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError>;

    /// First page of results matching `filter`, ordered by `sorts`
    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        sorts: &[Sort],
    ) -> Result<Vec<Page>, StoreError>;

    /// Merge `properties` into an existing page
    async fn update_page(&self, page_id: &str, properties: &Properties)
        -> Result<Page, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(items: &[(&str, PropertyValue)]) -> Properties {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_filter_json() {
        let filter = Filter::And(vec![
            Filter::relation_contains("Keyword", "p1"),
            Filter::date_after("Date", "2025-01-01"),
        ]);
        assert_eq!(
            filter.to_json(),
            json!({"and": [
                {"property": "Keyword", "relation": {"contains": "p1"}},
                {"property": "Date", "date": {"after": "2025-01-01"}}
            ]})
        );
        assert_eq!(
            Sort::LastEdited(SortDirection::Descending).to_json(),
            json!({"timestamp": "last_edited_time", "direction": "descending"})
        );
    }

    #[test]
    fn test_filter_matches() {
        let p = props(&[
            ("Keyword", PropertyValue::Title("rust".into())),
            ("Status", PropertyValue::Select("active".into())),
            ("Base", PropertyValue::Relation(vec!["k1".into()])),
            ("Date", PropertyValue::Date("2025-03-01T10:00:00+00:00".into())),
        ]);

        assert!(Filter::title_equals("Keyword", "rust").matches(&p));
        assert!(!Filter::title_equals("Keyword", "Rust").matches(&p));
        assert!(Filter::select_equals("Status", "active").matches(&p));
        assert!(Filter::relation_contains("Base", "k1").matches(&p));
        assert!(Filter::date_after("Date", "2025-03-01").matches(&p));
        assert!(!Filter::date_after("Date", "2025-03-02").matches(&p));
        assert!(!Filter::select_equals("Missing", "x").matches(&p));
    }

    #[test]
    fn test_parse_instant_formats() {
        assert!(parse_instant("2025-01-01").is_some());
        assert!(parse_instant("2025-01-01T12:30:00").is_some());
        assert!(parse_instant("2025-01-01T12:30:00.000Z").is_some());
        assert!(parse_instant("yesterday").is_none());
    }
}
