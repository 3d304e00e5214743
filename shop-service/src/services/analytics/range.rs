//! Reporting periods and the ticket predicate built from them.
//!
//! A ticket is dated by its invoice date when that resolves, otherwise by its
//! creation date. The same rule is rendered twice: as a MongoDB filter for the
//! database store and as [`TicketQuery::matches`] for in-process stores.

use crate::models::Ticket;
use chrono::{DateTime, Days, Local, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use mongodb::bson::{doc, Bson, DateTime as BsonDateTime, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
    All,
    Custom,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
            Period::All => "all",
            Period::Custom => "custom",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "week" => Some(Period::Week),
            "month" => Some(Period::Month),
            "quarter" => Some(Period::Quarter),
            "year" => Some(Period::Year),
            "all" | "" => Some(Period::All),
            "custom" => Some(Period::Custom),
            _ => None,
        }
    }

    /// Start of the lookback window ending at `now`, in calendar days so the
    /// wall-clock time is kept across DST changes. `None` means no bound.
    fn threshold(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        match self {
            Period::Week => now.checked_sub_days(Days::new(7)),
            Period::Month => now.checked_sub_days(Days::new(30)),
            Period::Quarter => now.checked_sub_days(Days::new(90)),
            Period::Year => now.checked_sub_months(Months::new(12)),
            Period::All | Period::Custom => None,
        }
    }
}

/// Inclusive instant range; a missing side is unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at <= end)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

fn local_start_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn local_end_of_day(day: NaiveDate) -> Option<DateTime<Utc>> {
    let last_ms = day.and_hms_milli_opt(23, 59, 59, 999)?;
    Local
        .from_local_datetime(&last_ms)
        .latest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Turns a requested period and optional `YYYY-MM-DD` bounds into a range.
///
/// A complete pair of valid dates always wins over `period`. Malformed dates
/// never error: the report falls back to no date constraint.
pub fn resolve_date_range(
    period: &str,
    start_date: Option<&str>,
    end_date: Option<&str>,
    now: DateTime<Local>,
) -> DateRange {
    let start_raw = non_blank(start_date);
    let end_raw = non_blank(end_date);

    if start_raw.is_some() || end_raw.is_some() {
        let start_day = start_raw.map(parse_day);
        let end_day = end_raw.map(parse_day);

        if matches!(start_day, Some(None)) || matches!(end_day, Some(None)) {
            tracing::warn!(
                start_date = ?start_raw,
                end_date = ?end_raw,
                "Ignoring malformed custom date range; reporting over all tickets"
            );
            return DateRange::unbounded();
        }

        if let (Some(Some(start)), Some(Some(end))) = (start_day, end_day) {
            return match (local_start_of_day(start), local_end_of_day(end)) {
                (Some(start), Some(end)) => DateRange {
                    start: Some(start),
                    end: Some(end),
                },
                _ => {
                    tracing::warn!(%start, %end, "Custom range boundaries do not exist locally");
                    DateRange::unbounded()
                }
            };
        }
    }

    let period = Period::from_string(period).unwrap_or_else(|| {
        tracing::warn!(period = %period, "Unknown reporting period; using all");
        Period::All
    });

    DateRange {
        start: period.threshold(now).map(|dt| dt.with_timezone(&Utc)),
        end: None,
    }
}

/// `"all"`, blank and absent mean no category constraint.
pub fn category_filter(category: Option<&str>) -> Option<String> {
    non_blank(category)
        .filter(|c| !c.eq_ignore_ascii_case("all"))
        .map(|c| c.to_ascii_lowercase())
}

/// Selection criteria for tickets, shared by listings and reports.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketQuery {
    pub range: DateRange,
    pub category: Option<String>,
    pub plate: Option<String>,
}

impl TicketQuery {
    pub fn new(range: DateRange, category: Option<String>) -> Self {
        Self {
            range,
            category,
            plate: None,
        }
    }

    pub fn with_plate(mut self, plate: Option<&str>) -> Self {
        self.plate = non_blank(plate).map(str::to_string);
        self
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        let in_range = self.range.is_unbounded()
            || ticket
                .anchor_date()
                .is_some_and(|anchor| self.range.contains(anchor));

        let in_category = self
            .category
            .as_deref()
            .map_or(true, |c| ticket.has_category(c));

        let plate_matches = self.plate.as_deref().map_or(true, |p| {
            ticket
                .plate_number
                .to_lowercase()
                .contains(&p.to_lowercase())
        });

        in_range && in_category && plate_matches
    }

    /// MongoDB filter equivalent to [`TicketQuery::matches`].
    pub fn to_document(&self) -> Document {
        let mut clauses = Vec::new();

        if !self.range.is_unbounded() {
            clauses.push(date_predicate(&self.range));
        }

        if let Some(category) = &self.category {
            clauses.push(doc! {
                "services.category": {
                    "$regex": format!("^{}$", escape_regex(category)),
                    "$options": "i",
                }
            });
        }

        if let Some(plate) = &self.plate {
            clauses.push(doc! {
                "plateNumber": { "$regex": escape_regex(plate), "$options": "i" }
            });
        }

        match clauses.len() {
            0 => Document::new(),
            1 => clauses.remove(0),
            _ => doc! { "$and": clauses },
        }
    }
}

/// Only strings and native dates are converted, the same forms `DateLike`
/// reads; other types yield null. `$convert` also yields null for absent,
/// null, empty and unparseable values, so "invoice date resolves" is
/// `converted != null` for both storage forms.
fn as_date(field: &str) -> Bson {
    let path = format!("${}", field);
    Bson::Document(doc! {
        "$cond": [
            { "$in": [{ "$type": path.as_str() }, ["string", "date"]] },
            {
                "$convert": {
                    "input": path.as_str(),
                    "to": "date",
                    "onError": null,
                    "onNull": null,
                }
            },
            null
        ]
    })
}

fn within(value: &Bson, range: &DateRange) -> Vec<Bson> {
    let mut bounds = Vec::new();
    if let Some(start) = range.start {
        bounds.push(Bson::Document(
            doc! { "$gte": [value.clone(), BsonDateTime::from_chrono(start)] },
        ));
    }
    if let Some(end) = range.end {
        bounds.push(Bson::Document(
            doc! { "$lte": [value.clone(), BsonDateTime::from_chrono(end)] },
        ));
    }
    bounds
}

fn date_predicate(range: &DateRange) -> Document {
    let invoice = as_date("invoiceDate");
    let created = as_date("createdAt");

    let mut by_invoice = vec![Bson::Document(doc! { "$ne": [invoice.clone(), null] })];
    by_invoice.extend(within(&invoice, range));

    let mut by_created = vec![Bson::Document(doc! { "$eq": [invoice, null] })];
    by_created.extend(within(&created, range));

    doc! {
        "$or": [
            { "$expr": { "$and": by_invoice } },
            { "$expr": { "$and": by_created } },
        ]
    }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateLike, TicketService};

    fn local(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).single().unwrap()
    }

    fn ticket(invoice: DateLike, created: DateLike) -> Ticket {
        let mut t = Ticket::new("ABC-123".into(), "Ana".into(), "555".into(), Utc::now());
        t.invoice_date = invoice;
        t.created_at = created;
        t
    }

    fn text(s: &str) -> DateLike {
        DateLike::Text(s.to_string())
    }

    #[test]
    fn all_period_is_unbounded() {
        let range = resolve_date_range("all", None, None, local(2024, 3, 15));
        assert!(range.is_unbounded());
    }

    #[test]
    fn lookback_thresholds() {
        let now = local(2024, 3, 15);
        let cases = [
            ("week", local(2024, 3, 8)),
            ("month", local(2024, 2, 14)),
            ("quarter", local(2023, 12, 16)),
            ("year", local(2023, 3, 15)),
        ];
        for (period, expected) in cases {
            let range = resolve_date_range(period, None, None, now);
            assert_eq!(range.start, Some(expected.with_timezone(&Utc)), "{period}");
            assert_eq!(range.end, None);
        }
    }

    #[test]
    fn custom_range_covers_whole_days() {
        let range = resolve_date_range(
            "custom",
            Some("2023-12-01"),
            Some("2024-01-31"),
            local(2024, 3, 15),
        );
        let start = range.start.unwrap().with_timezone(&Local);
        let end = range.end.unwrap().with_timezone(&Local);
        assert_eq!(start.format("%Y-%m-%d %H:%M:%S%.3f").to_string(), "2023-12-01 00:00:00.000");
        assert_eq!(end.format("%Y-%m-%d %H:%M:%S%.3f").to_string(), "2024-01-31 23:59:59.999");
    }

    #[test]
    fn explicit_dates_override_period() {
        let range = resolve_date_range("week", Some("2020-01-01"), Some("2020-01-02"), local(2024, 3, 15));
        assert!(range.end.is_some());
        assert!(range.contains(Utc.with_ymd_and_hms(2020, 1, 1, 12, 0, 0).unwrap()));
    }

    #[test]
    fn malformed_dates_fall_back_to_all() {
        let now = local(2024, 3, 15);
        assert!(resolve_date_range("custom", Some("2024-13-45"), Some("2024-01-31"), now).is_unbounded());
        assert!(resolve_date_range("month", Some("yesterday"), None, now).is_unbounded());
    }

    #[test]
    fn custom_without_dates_is_unbounded() {
        assert!(resolve_date_range("custom", None, None, local(2024, 3, 15)).is_unbounded());
        assert!(resolve_date_range("custom", Some(""), Some("  "), local(2024, 3, 15)).is_unbounded());
    }

    #[test]
    fn single_date_uses_period() {
        let now = local(2024, 3, 15);
        let range = resolve_date_range("week", Some("2024-01-01"), None, now);
        assert_eq!(range.start, Some(local(2024, 3, 8).with_timezone(&Utc)));
    }

    #[test]
    fn unknown_period_is_all() {
        assert!(resolve_date_range("fortnight", None, None, local(2024, 3, 15)).is_unbounded());
    }

    #[test]
    fn created_at_fallback_inside_month() {
        let range = resolve_date_range("month", None, None, local(2024, 3, 15));
        let query = TicketQuery::new(range, None);

        assert!(query.matches(&ticket(DateLike::Missing, text("2024-03-01"))));
        assert!(!query.matches(&ticket(DateLike::Missing, text("2023-01-01"))));
    }

    #[test]
    fn invoice_date_wins_over_created_at() {
        let range = resolve_date_range("custom", Some("2023-12-01"), Some("2024-01-31"), local(2024, 3, 15));
        let query = TicketQuery::new(range, None);

        assert!(query.matches(&ticket(text("2024-01-01"), text("2024-06-01"))));
        assert!(!query.matches(&ticket(text("2024-06-01"), text("2024-01-01"))));
    }

    #[test]
    fn empty_or_garbage_invoice_date_falls_back() {
        let range = resolve_date_range("custom", Some("2024-01-01"), Some("2024-01-31"), local(2024, 3, 15));
        let query = TicketQuery::new(range, None);

        assert!(query.matches(&ticket(text(""), text("2024-01-10"))));
        assert!(query.matches(&ticket(text("n/a"), text("2024-01-10"))));
    }

    #[test]
    fn unbounded_query_matches_undated_ticket() {
        let query = TicketQuery::default();
        assert!(query.matches(&ticket(DateLike::Missing, DateLike::Missing)));

        let bounded = TicketQuery::new(
            resolve_date_range("week", None, None, local(2024, 3, 15)),
            None,
        );
        assert!(!bounded.matches(&ticket(DateLike::Missing, DateLike::Missing)));
    }

    #[test]
    fn category_and_plate_filters() {
        let mut t = ticket(DateLike::Missing, text("2024-03-01"));
        t.services.push(TicketService::priced(
            "s1".into(),
            "Tint".into(),
            "tinting".into(),
            100.0,
            None,
        ));

        assert!(TicketQuery::new(DateRange::unbounded(), category_filter(Some("Tinting"))).matches(&t));
        assert!(!TicketQuery::new(DateRange::unbounded(), category_filter(Some("repair"))).matches(&t));
        assert!(TicketQuery::default().with_plate(Some("abc")).matches(&t));
        assert!(!TicketQuery::default().with_plate(Some("zzz")).matches(&t));
    }

    #[test]
    fn category_all_means_none() {
        assert_eq!(category_filter(Some("all")), None);
        assert_eq!(category_filter(Some("ALL")), None);
        assert_eq!(category_filter(None), None);
        assert_eq!(category_filter(Some("Repair")), Some("repair".to_string()));
    }

    #[test]
    fn unbounded_document_is_empty() {
        assert!(TicketQuery::default().to_document().is_empty());
    }

    #[test]
    fn date_document_has_both_branches() {
        let range = resolve_date_range("month", None, None, local(2024, 3, 15));
        let filter = TicketQuery::new(range, None).to_document();

        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);

        let rendered = filter.to_string();
        assert!(rendered.contains("$invoiceDate"));
        assert!(rendered.contains("$createdAt"));
        assert!(!rendered.contains("$lte"));
    }

    #[test]
    fn only_string_and_date_values_are_converted() {
        let converted = as_date("invoiceDate");
        let cond = converted
            .as_document()
            .and_then(|d| d.get_array("$cond").ok())
            .unwrap();
        assert_eq!(cond.len(), 3);

        let guard = cond[0].as_document().unwrap().get_array("$in").unwrap();
        let type_of = guard[0].as_document().unwrap().get_str("$type").unwrap();
        assert_eq!(type_of, "$invoiceDate");
        assert_eq!(
            guard[1],
            Bson::Array(vec![Bson::String("string".into()), Bson::String("date".into())])
        );
        assert_eq!(cond[2], Bson::Null);
    }

    #[test]
    fn numeric_invoice_date_falls_back_to_created_at() {
        let range = resolve_date_range("custom", Some("2024-01-01"), Some("2024-01-31"), local(2024, 3, 15));
        let query = TicketQuery::new(range, None);

        let numeric: Ticket = mongodb::bson::from_document(doc! {
            "_id": "n-1",
            "invoiceDate": 1_717_200_000_000_i64,
            "createdAt": "2024-01-10T12:00:00Z",
        })
        .unwrap();
        assert!(numeric.invoice_date.is_missing());
        assert!(query.matches(&numeric));
    }

    #[test]
    fn combined_document_uses_and() {
        let range = resolve_date_range("custom", Some("2024-01-01"), Some("2024-01-31"), local(2024, 3, 15));
        let filter = TicketQuery::new(range, Some("repair".into()))
            .with_plate(Some("AB.C"))
            .to_document();

        let clauses = filter.get_array("$and").unwrap();
        assert_eq!(clauses.len(), 3);

        let plate = clauses[2]
            .as_document()
            .and_then(|d| d.get_document("plateNumber").ok())
            .and_then(|d| d.get_str("$regex").ok());
        assert_eq!(plate, Some("AB\\.C"));
    }

    #[test]
    fn escape_regex_escapes_metacharacters() {
        assert_eq!(escape_regex("a.b*c"), "a\\.b\\*c");
        assert_eq!(escape_regex("plain"), "plain");
    }
}
