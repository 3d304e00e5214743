use serde::{Deserialize, Serialize};

use crate::services::analytics::SalesSummary;

fn default_all() -> String {
    "all".to_string()
}

/// Report filter, taken from the query string and echoed back in the report.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsFilter {
    #[serde(default = "default_all")]
    pub period: String,
    #[serde(default = "default_all")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl Default for AnalyticsFilter {
    fn default() -> Self {
        Self {
            period: default_all(),
            category: default_all(),
            start_date: None,
            end_date: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    #[serde(flatten)]
    pub summary: SalesSummary,
    pub period: String,
    pub filters: AnalyticsFilter,
}
