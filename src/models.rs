//! Data models for the cash-sales job.
//!
//! This module contains the core data structures shared by the aggregator
//! and the notifier: the day window, the query filter, decoded pages and
//! records, the running total and the outgoing notification.

use chrono::{DateTime, Duration, FixedOffset, Timelike};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Records requested per query call.
pub const PAGE_SIZE: u32 = 100;

/// A half-open day window `[start, end)` in a fixed local offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// The window covering the local calendar day that contains `now`.
    pub fn today(now: DateTime<FixedOffset>) -> Self {
        let since_midnight = Duration::seconds(i64::from(now.num_seconds_from_midnight()))
            + Duration::nanoseconds(i64::from(now.nanosecond()));
        let start = now - since_midnight;
        Self {
            start,
            end: start + Duration::days(1),
        }
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.end
    }

    /// Start inclusive, end exclusive.
    #[allow(dead_code)] // The query API applies the window server-side
    pub fn contains<Tz: chrono::TimeZone>(&self, ts: &DateTime<Tz>) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

/// Predicate applied to the multi-select tag property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagPredicate {
    /// The tag list contains this exact option.
    Contains(String),
    /// The tag list has at least one option.
    NotEmpty,
}

impl TagPredicate {
    fn condition(&self) -> Value {
        match self {
            TagPredicate::Contains(value) => json!({ "contains": value }),
            TagPredicate::NotEmpty => json!({ "is_not_empty": true }),
        }
    }
}

/// Filter sent verbatim with every page request.
#[derive(Debug, Clone)]
pub struct QueryFilter {
    pub window: TimeWindow,
    pub created_property: String,
    pub tag_property: String,
    pub predicate: TagPredicate,
}

impl QueryFilter {
    /// Render the filter as the query API's compound `and` condition.
    pub fn to_json(&self) -> Value {
        json!({
            "and": [
                {
                    "property": self.created_property,
                    "date": { "on_or_after": self.window.start().to_rfc3339() }
                },
                {
                    "property": self.created_property,
                    "date": { "before": self.window.end().to_rfc3339() }
                },
                {
                    "property": self.tag_property,
                    "multi_select": self.predicate.condition()
                }
            ]
        })
    }
}

/// Body of a single query request.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBody {
    pub filter: Value,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

impl QueryBody {
    pub fn first_page(filter: &QueryFilter) -> Self {
        Self {
            filter: filter.to_json(),
            page_size: PAGE_SIZE,
            start_cursor: None,
        }
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub results: Vec<Record>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// A database row; only its property bag is read.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Record {
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Record {
    /// Decode the named property as an amount.
    pub fn amount(&self, property: &str) -> AmountField {
        self.properties
            .get(property)
            .map(AmountField::decode)
            .unwrap_or(AmountField::Unrecognized)
    }
}

/// Amount property as it arrives from the record source.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AmountField {
    /// Plain number property.
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    /// Computed property with a typed result.
    Formula { formula: FormulaResult },
    /// Absent, malformed or of any other type.
    #[serde(other)]
    Unrecognized,
}

/// Evaluated result of a formula property.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaResult {
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    #[serde(other)]
    Other,
}

impl AmountField {
    pub fn decode(value: &Value) -> Self {
        AmountField::deserialize(value).unwrap_or(AmountField::Unrecognized)
    }

    /// Contribution of this field to the total; zero unless numeric.
    pub fn value(&self) -> f64 {
        match self {
            AmountField::Formula {
                formula: FormulaResult::Number { number: Some(n) },
            } => *n,
            AmountField::Number { number: Some(n) } => *n,
            _ => 0.0,
        }
    }
}

/// Running sum of extracted amounts.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AggregateTotal(f64);

impl AggregateTotal {
    pub fn add(&mut self, amount: f64) {
        self.0 += amount;
    }
}

// Output goes through Display; tests compare the unrounded sum.
#[cfg(test)]
impl AggregateTotal {
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for AggregateTotal {
    /// Two decimal places; rounding happens only here.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A push notification ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub device: Option<String>,
    pub priority: Option<i8>,
    pub sound: Option<String>,
}

impl NotificationRequest {
    /// Form fields for this message; optional modifiers only when set.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![
            ("title", self.title.clone()),
            ("message", self.message.clone()),
            ("timestamp", self.timestamp.to_string()),
        ];
        if let Some(ref device) = self.device {
            fields.push(("device", device.clone()));
        }
        if let Some(priority) = self.priority {
            fields.push(("priority", priority.to_string()));
        }
        if let Some(ref sound) = self.sound {
            fields.push(("sound", sound.clone()));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn brunei() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn window() -> TimeWindow {
        let now = brunei().with_ymd_and_hms(2026, 10, 17, 21, 5, 30).unwrap();
        TimeWindow::today(now)
    }

    #[test]
    fn test_window_starts_at_local_midnight() {
        let w = window();
        assert_eq!(w.start().to_rfc3339(), "2026-10-17T00:00:00+08:00");
        assert_eq!(w.end().to_rfc3339(), "2026-10-18T00:00:00+08:00");
    }

    #[test]
    fn test_window_boundaries() {
        let w = window();
        assert!(w.contains(&w.start()));
        assert!(!w.contains(&w.end()));
        assert!(w.contains(&(w.end() - Duration::seconds(1))));
        assert!(!w.contains(&(w.start() - Duration::seconds(1))));
    }

    #[test]
    fn test_window_in_other_offset() {
        let w = window();
        // 2026-10-16T16:00:00Z is local midnight in UTC+8
        let utc = chrono::Utc.with_ymd_and_hms(2026, 10, 16, 16, 0, 0).unwrap();
        assert!(w.contains(&utc));
    }

    #[test]
    fn test_filter_json_contains() {
        let filter = QueryFilter {
            window: window(),
            created_property: "created_at".to_string(),
            tag_property: "payment_method".to_string(),
            predicate: TagPredicate::Contains("Cash".to_string()),
        };
        let json = filter.to_json();
        let clauses = json["and"].as_array().unwrap();
        assert_eq!(clauses.len(), 3);
        assert_eq!(
            clauses[0]["date"]["on_or_after"],
            "2026-10-17T00:00:00+08:00"
        );
        assert_eq!(clauses[1]["date"]["before"], "2026-10-18T00:00:00+08:00");
        assert_eq!(clauses[2]["multi_select"]["contains"], "Cash");
    }

    #[test]
    fn test_filter_json_not_empty() {
        let filter = QueryFilter {
            window: window(),
            created_property: "created_at".to_string(),
            tag_property: "payment_method".to_string(),
            predicate: TagPredicate::NotEmpty,
        };
        let json = filter.to_json();
        assert_eq!(json["and"][2]["multi_select"]["is_not_empty"], true);
    }

    #[test]
    fn test_query_body_omits_absent_cursor() {
        let body = QueryBody {
            filter: json!({}),
            page_size: PAGE_SIZE,
            start_cursor: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["page_size"], 100);
        assert!(json.get("start_cursor").is_none());
    }

    #[test]
    fn test_amount_direct_number() {
        let field = AmountField::decode(&json!({"type": "number", "number": 12.5}));
        assert_eq!(field, AmountField::Number { number: Some(12.5) });
        assert_eq!(field.value(), 12.5);
    }

    #[test]
    fn test_amount_formula_number() {
        let field = AmountField::decode(&json!({
            "type": "formula",
            "formula": {"type": "number", "number": 7.25}
        }));
        assert_eq!(field.value(), 7.25);
    }

    #[test]
    fn test_amount_unrecognized_shapes_contribute_zero() {
        let shapes = [
            json!({"type": "formula", "formula": {"type": "string", "string": "7.25"}}),
            json!({"type": "formula", "formula": {"type": "number", "number": null}}),
            json!({"type": "number", "number": null}),
            json!({"type": "number", "number": "12"}),
            json!({"type": "rich_text", "rich_text": []}),
            json!({"number": 3}),
            json!("12"),
        ];
        for shape in &shapes {
            assert_eq!(AmountField::decode(shape).value(), 0.0, "shape: {}", shape);
        }
    }

    #[test]
    fn test_record_missing_property() {
        let record: Record = serde_json::from_value(json!({"properties": {}})).unwrap();
        assert_eq!(record.amount("actual_money"), AmountField::Unrecognized);
    }

    #[test]
    fn test_total_display_rounds() {
        let mut total = AggregateTotal::default();
        total.add(0.1);
        total.add(0.2);
        assert_eq!(total.to_string(), "0.30");
        assert_eq!(AggregateTotal::default().to_string(), "0.00");
    }

    #[test]
    fn test_form_fields_optional_modifiers() {
        let mut request = NotificationRequest {
            title: "t".to_string(),
            message: "m".to_string(),
            timestamp: 1_790_000_000,
            device: None,
            priority: None,
            sound: None,
        };
        let names: Vec<_> = request.form_fields().iter().map(|(k, _)| *k).collect();
        assert_eq!(names, vec!["title", "message", "timestamp"]);

        request.device = Some("phone".to_string());
        request.priority = Some(-1);
        request.sound = Some("cashregister".to_string());
        let fields = request.form_fields();
        assert!(fields.contains(&("device", "phone".to_string())));
        assert!(fields.contains(&("priority", "-1".to_string())));
        assert!(fields.contains(&("sound", "cashregister".to_string())));
    }
}
