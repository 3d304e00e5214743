//! Tolerant date and number fields.
//!
//! Ticket rows written over several schema revisions store dates either as
//! native BSON dates or as ISO-8601 strings, and amounts as doubles, ints or
//! numeric strings. Everything that reads those fields goes through the types
//! in this module so the coercion rules live in one place.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use mongodb::bson::{self, Bson};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A date field that may be a native date, a string, or nothing at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DateLike {
    Date(DateTime<Utc>),
    Text(String),
    #[default]
    Missing,
}

impl DateLike {
    pub fn is_missing(&self) -> bool {
        matches!(self, DateLike::Missing)
    }

    /// Resolves the field to an instant. Empty and unparseable strings
    /// resolve to `None`.
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            DateLike::Date(dt) => Some(*dt),
            DateLike::Text(s) => parse_date_text(s),
            DateLike::Missing => None,
        }
    }

    /// RFC 3339 when the value resolves, the raw text for legacy strings that
    /// don't, `None` when absent.
    pub fn display(&self) -> Option<String> {
        match (self.resolve(), self) {
            (Some(dt), _) => Some(dt.to_rfc3339()),
            (None, DateLike::Text(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<DateTime<Utc>> for DateLike {
    fn from(dt: DateTime<Utc>) -> Self {
        DateLike::Date(dt)
    }
}

impl From<Bson> for DateLike {
    fn from(value: Bson) -> Self {
        match value {
            Bson::DateTime(dt) => DateLike::Date(dt.to_chrono()),
            Bson::String(s) => DateLike::Text(s),
            _ => DateLike::Missing,
        }
    }
}

impl<'de> Deserialize<'de> for DateLike {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<Bson>::deserialize(deserializer)?
            .map(DateLike::from)
            .unwrap_or_default())
    }
}

impl Serialize for DateLike {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DateLike::Date(dt) => bson::DateTime::from_chrono(*dt).serialize(serializer),
            DateLike::Text(s) => serializer.serialize_str(s),
            DateLike::Missing => serializer.serialize_none(),
        }
    }
}

/// Parses the string forms found in stored tickets. Offset-less values are
/// read as UTC, which is also how the database converts them.
pub fn parse_date_text(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Coerces a stored number. Doubles, ints and numeric strings are accepted;
/// anything else yields `None`.
pub fn coerce_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Double(v) if v.is_finite() => Some(*v),
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// `deserialize_with` helper: missing or malformed amounts become `0`.
pub fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Bson>::deserialize(deserializer)?
        .as_ref()
        .and_then(coerce_number)
        .unwrap_or(0.0))
}

/// `deserialize_with` helper for optional amounts.
pub fn lenient_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Bson>::deserialize(deserializer)?
        .as_ref()
        .and_then(coerce_number))
}

/// `deserialize_with` helper for `_id`: strings pass through, ObjectIds from
/// older rows become their hex form.
pub fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Bson::deserialize(deserializer)? {
        Bson::String(s) => Ok(s),
        Bson::ObjectId(oid) => Ok(oid.to_hex()),
        other => Err(serde::de::Error::custom(format!(
            "unsupported id type: {:?}",
            other.element_type()
        ))),
    }
}

/// `deserialize_with` helper: a string list where non-string entries and a
/// non-array value are dropped.
pub fn lenient_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Bson>::deserialize(deserializer)? {
        Some(Bson::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}
