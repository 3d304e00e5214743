//! Sales analytics: date-range resolution, ticket selection and the report
//! reduction.

pub mod aggregate;
pub mod range;

pub use aggregate::{
    summarize, CategoryRevenue, DailyRevenue, RepairPartFrequency, SalesSummary,
    ServicePopularity, TOP_LIMIT, UNDATED_DAY,
};
pub use range::{category_filter, resolve_date_range, DateRange, Period, TicketQuery};

use crate::dtos::{AnalyticsFilter, AnalyticsReport};
use crate::services::metrics::record_report;
use crate::services::store::TicketStore;
use chrono::{DateTime, Local};
use service_core::error::AppError;

/// Builds the selection for a report filter as of `now`.
pub fn query_for(filter: &AnalyticsFilter, now: DateTime<Local>) -> TicketQuery {
    let range = resolve_date_range(
        &filter.period,
        filter.start_date.as_deref(),
        filter.end_date.as_deref(),
        now,
    );
    TicketQuery::new(range, category_filter(Some(&filter.category)))
}

/// Loads the matching tickets in one read and reduces them into a report.
/// A storage failure yields no partial result.
pub async fn generate_report(
    store: &dyn TicketStore,
    filter: AnalyticsFilter,
    now: DateTime<Local>,
) -> Result<AnalyticsReport, AppError> {
    let query = query_for(&filter, now);

    let tickets = store.find_tickets(&query).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load tickets for report");
        AppError::InternalError(anyhow::anyhow!("Failed to generate report"))
    })?;

    let summary = summarize(&tickets);
    record_report(&filter.period, tickets.len());
    tracing::info!(
        period = %filter.period,
        category = %filter.category,
        tickets = summary.total_tickets,
        revenue = summary.total_revenue,
        "Generated sales report"
    );

    Ok(AnalyticsReport {
        period: filter.period.clone(),
        summary,
        filters: filter,
    })
}
