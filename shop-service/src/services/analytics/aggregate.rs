//! Reduction of a ticket set into the sales report.

use crate::models::{ServiceCategory, Ticket};
use chrono::Local;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Ranked lists (`topServices`, `commonRepairParts`) keep this many entries.
pub const TOP_LIMIT: usize = 10;

/// `revenueByDay` key for tickets with neither a usable invoice nor creation
/// date. Sorts after every `yyyy-MM-dd` key, so the day series still sums to
/// `totalRevenue`.
pub const UNDATED_DAY: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRevenue {
    pub id: String,
    pub name: String,
    pub count: u64,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePopularity {
    pub service_id: String,
    pub service_name: String,
    pub count: u64,
    pub revenue: f64,
    pub category_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairPartFrequency {
    pub name: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRevenue {
    pub date: String,
    pub revenue: f64,
    pub ticket_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub total_revenue: f64,
    pub total_tickets: u64,
    pub average_ticket_value: f64,
    pub service_categories: Vec<CategoryRevenue>,
    pub revenue_by_day: Vec<DailyRevenue>,
    pub top_services: Vec<ServicePopularity>,
    pub common_repair_parts: Vec<RepairPartFrequency>,
}

/// Insertion-ordered accumulator keyed by `K`.
struct Tally<K, V> {
    index: HashMap<K, usize>,
    entries: Vec<V>,
}

impl<K: Eq + Hash, V> Tally<K, V> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    fn entry(&mut self, key: K, init: impl FnOnce() -> V) -> &mut V {
        let next = self.entries.len();
        let slot = *self.index.entry(key).or_insert(next);
        if slot == next {
            self.entries.push(init());
        }
        &mut self.entries[slot]
    }

    fn into_entries(self) -> Vec<V> {
        self.entries
    }
}

fn category_name(id: &str) -> String {
    ServiceCategory::from_string(id)
        .map(|c| c.display_name().to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Reduces `tickets` into a [`SalesSummary`]. Pure; malformed numbers were
/// already coerced to zero when the tickets were decoded.
pub fn summarize(tickets: &[Ticket]) -> SalesSummary {
    let mut total_revenue = 0.0;
    let mut categories: Tally<String, CategoryRevenue> = Tally::new();
    let mut services: Tally<String, ServicePopularity> = Tally::new();
    let mut parts: Tally<String, RepairPartFrequency> = Tally::new();
    let mut days: BTreeMap<String, DailyRevenue> = BTreeMap::new();
    let mut total_mentions: u64 = 0;

    for ticket in tickets {
        total_revenue += ticket.total_amount;

        for item in &ticket.services {
            let category = categories.entry(item.category.clone(), || CategoryRevenue {
                id: item.category.clone(),
                name: category_name(&item.category),
                count: 0,
                revenue: 0.0,
            });
            category.count += 1;
            category.revenue += item.price;

            let service = services.entry(item.service_id.clone(), || ServicePopularity {
                service_id: item.service_id.clone(),
                service_name: item.service_name.clone(),
                count: 0,
                revenue: 0.0,
                category_id: item.category.clone(),
            });
            service.count += 1;
            service.revenue += item.price;
        }

        for part in &ticket.repair_parts {
            let name = part.trim();
            if name.is_empty() {
                continue;
            }
            parts
                .entry(name.to_string(), || RepairPartFrequency {
                    name: name.to_string(),
                    count: 0,
                    percentage: 0.0,
                })
                .count += 1;
            total_mentions += 1;
        }

        let date = match ticket.anchor_date() {
            Some(anchor) => anchor.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            None => {
                tracing::warn!(
                    ticket_id = %ticket.id,
                    "Ticket has no usable invoice or creation date; bucketed as {}",
                    UNDATED_DAY
                );
                UNDATED_DAY.to_string()
            }
        };
        let day = days.entry(date.clone()).or_insert_with(|| DailyRevenue {
            date,
            revenue: 0.0,
            ticket_count: 0,
        });
        day.revenue += ticket.total_amount;
        day.ticket_count += 1;
    }

    let total_tickets = tickets.len() as u64;
    let average_ticket_value = if total_tickets == 0 {
        0.0
    } else {
        total_revenue / total_tickets as f64
    };

    let mut top_services = services.into_entries();
    top_services.sort_by(|a, b| b.count.cmp(&a.count));
    top_services.truncate(TOP_LIMIT);

    let mut common_repair_parts = parts.into_entries();
    for part in &mut common_repair_parts {
        part.percentage = if total_mentions == 0 {
            0.0
        } else {
            part.count as f64 * 100.0 / total_mentions as f64
        };
    }
    common_repair_parts.sort_by(|a, b| b.count.cmp(&a.count));
    common_repair_parts.truncate(TOP_LIMIT);

    SalesSummary {
        total_revenue,
        total_tickets,
        average_ticket_value,
        service_categories: categories.into_entries(),
        revenue_by_day: days.into_values().collect(),
        top_services,
        common_repair_parts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateLike, TicketService};
    use chrono::{TimeZone, Utc};

    fn line(id: &str, category: &str, price: f64) -> TicketService {
        TicketService {
            service_id: id.to_string(),
            service_name: format!("Service {id}"),
            category: category.to_string(),
            price,
            discount_type: None,
            discount_value: None,
            final_price: None,
        }
    }

    fn ticket(total: f64, services: Vec<TicketService>, created: &str) -> Ticket {
        let mut t = Ticket::new("P-1".into(), "C".into(), "1".into(), Utc::now());
        t.total_amount = total;
        t.services = services;
        t.created_at = DateLike::Text(created.to_string());
        t
    }

    #[test]
    fn empty_input_yields_zeroed_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary, SalesSummary::default());

        let json = serde_json::to_value(&summary).unwrap();
        for key in [
            "totalRevenue",
            "totalTickets",
            "averageTicketValue",
            "serviceCategories",
            "revenueByDay",
            "topServices",
            "commonRepairParts",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn two_ticket_example() {
        let tickets = vec![
            ticket(100.0, vec![line("r1", "repair", 100.0)], "2024-01-01T12:00:00Z"),
            ticket(50.0, vec![line("p1", "painting", 50.0)], "2024-01-02T12:00:00Z"),
        ];

        let summary = summarize(&tickets);
        assert_eq!(summary.total_revenue, 150.0);
        assert_eq!(summary.total_tickets, 2);
        assert_eq!(summary.average_ticket_value, 75.0);

        let categories: Vec<(&str, u64, f64)> = summary
            .service_categories
            .iter()
            .map(|c| (c.id.as_str(), c.count, c.revenue))
            .collect();
        assert_eq!(categories, vec![("repair", 1, 100.0), ("painting", 1, 50.0)]);
        assert_eq!(summary.service_categories[0].name, "Repair");
    }

    #[test]
    fn category_counts_line_items_not_tickets() {
        let tickets = vec![ticket(
            300.0,
            vec![
                line("d1", "detailing", 100.0),
                line("d2", "detailing", 200.0),
            ],
            "2024-01-01T12:00:00Z",
        )];

        let summary = summarize(&tickets);
        assert_eq!(summary.service_categories.len(), 1);
        assert_eq!(summary.service_categories[0].count, 2);
        assert_eq!(summary.service_categories[0].revenue, 300.0);
    }

    #[test]
    fn unknown_category_keeps_raw_name() {
        let tickets = vec![ticket(10.0, vec![line("x", "wrapping", 10.0)], "2024-01-01")];
        assert_eq!(summarize(&tickets).service_categories[0].name, "wrapping");
    }

    #[test]
    fn top_services_sorted_stable_and_truncated() {
        let mut items = Vec::new();
        for i in 0..12 {
            items.push(line(&format!("s{i}"), "detailing", 10.0));
        }
        items.push(line("s5", "detailing", 10.0));
        items.push(line("s5", "detailing", 10.0));
        items.push(line("s7", "detailing", 10.0));
        items.push(line("s7", "detailing", 10.0));

        let summary = summarize(&[ticket(160.0, items, "2024-01-01T12:00:00Z")]);
        let ids: Vec<&str> = summary
            .top_services
            .iter()
            .map(|s| s.service_id.as_str())
            .collect();

        assert_eq!(ids.len(), TOP_LIMIT);
        assert_eq!(&ids[..4], &["s5", "s7", "s0", "s1"]);
        assert_eq!(summary.top_services[0].count, 3);
        assert_eq!(summary.top_services[0].revenue, 30.0);
        assert!(summary
            .top_services
            .windows(2)
            .all(|w| w[0].count >= w[1].count));
    }

    #[test]
    fn top_service_keeps_first_category() {
        let tickets = vec![
            ticket(10.0, vec![line("s1", "repair", 10.0)], "2024-01-01"),
            ticket(10.0, vec![line("s1", "painting", 10.0)], "2024-01-01"),
        ];
        let summary = summarize(&tickets);
        assert_eq!(summary.top_services[0].category_id, "repair");
        assert_eq!(summary.top_services[0].count, 2);
    }

    #[test]
    fn repair_part_percentages_use_total_mentions() {
        let mut a = ticket(0.0, vec![], "2024-01-01T12:00:00Z");
        a.repair_parts = vec!["bumper".into(), "bumper".into(), "mirror".into()];
        let mut b = ticket(0.0, vec![], "2024-01-02T12:00:00Z");
        b.repair_parts = vec!["headlight".into()];

        let summary = summarize(&[a, b]);
        let parts = &summary.common_repair_parts;
        assert_eq!(parts[0].name, "bumper");
        assert_eq!(parts[0].count, 2);
        assert_eq!(parts[0].percentage, 50.0);
        assert_eq!(parts[1].percentage, 25.0);

        let sum: f64 = parts.iter().map(|p| p.percentage).sum();
        assert!((sum - 100.0).abs() < 1e-9);
    }

    #[test]
    fn repair_parts_empty_when_no_mentions() {
        let summary = summarize(&[ticket(10.0, vec![], "2024-01-01")]);
        assert!(summary.common_repair_parts.is_empty());
    }

    #[test]
    fn repair_parts_truncated_to_ten() {
        let mut t = ticket(0.0, vec![], "2024-01-01");
        t.repair_parts = (0..15).map(|i| format!("part-{i}")).collect();
        let summary = summarize(&[t]);
        assert_eq!(summary.common_repair_parts.len(), TOP_LIMIT);
        assert!((summary.common_repair_parts[0].percentage - 100.0 / 15.0).abs() < 1e-9);
    }

    #[test]
    fn revenue_by_day_uses_invoice_date_then_created_at() {
        let mut invoiced = ticket(80.0, vec![], "2024-06-01T12:00:00Z");
        invoiced.invoice_date = DateLike::Date(Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap());
        let plain = ticket(20.0, vec![], "2024-01-03T12:00:00Z");
        let mut bad_invoice = ticket(5.0, vec![], "2024-01-05T12:00:00Z");
        bad_invoice.invoice_date = DateLike::Text("soon".into());

        let summary = summarize(&[invoiced, plain, bad_invoice]);
        let days: Vec<(&str, f64, u64)> = summary
            .revenue_by_day
            .iter()
            .map(|d| (d.date.as_str(), d.revenue, d.ticket_count))
            .collect();
        assert_eq!(days, vec![("2024-01-03", 20.0, 1), ("2024-01-05", 85.0, 2)]);
    }

    #[test]
    fn day_buckets_sum_to_total_and_are_sorted() {
        let tickets: Vec<Ticket> = (0..40)
            .map(|i| {
                ticket(
                    (i * 7 % 13) as f64 + 0.25,
                    vec![line("s", "repair", 1.0)],
                    &format!("2024-{:02}-{:02}T12:00:00Z", i % 12 + 1, i % 27 + 1),
                )
            })
            .collect();

        let summary = summarize(&tickets);
        let by_day: f64 = summary.revenue_by_day.iter().map(|d| d.revenue).sum();
        assert!((by_day - summary.total_revenue).abs() < 1e-9);
        assert!(summary
            .revenue_by_day
            .windows(2)
            .all(|w| w[0].date < w[1].date));
        assert_eq!(
            summary.revenue_by_day.iter().map(|d| d.ticket_count).sum::<u64>(),
            40
        );
        assert!(
            (summary.average_ticket_value - summary.total_revenue / 40.0).abs() < 1e-9
        );
    }

    #[test]
    fn undated_ticket_lands_in_trailing_bucket() {
        let mut undated = ticket(30.0, vec![], "");
        undated.created_at = DateLike::Missing;
        let dated = ticket(70.0, vec![], "2024-02-10T12:00:00Z");

        let summary = summarize(&[undated, dated]);
        assert_eq!(summary.total_revenue, 100.0);
        assert_eq!(summary.total_tickets, 2);

        let days = &summary.revenue_by_day;
        assert_eq!(days.len(), 2);
        assert_eq!(days[1].date, UNDATED_DAY);
        assert_eq!(days[1].revenue, 30.0);
        assert_eq!(days[1].ticket_count, 1);

        let by_day: f64 = days.iter().map(|d| d.revenue).sum();
        assert_eq!(by_day, summary.total_revenue);
    }
}
