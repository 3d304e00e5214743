use super::date_like::{lenient_amount, lenient_id, DateLike};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fixed set of service categories offered by the shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceCategory {
    Protection,
    Tinting,
    Painting,
    Detailing,
    Repair,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        ServiceCategory::Protection,
        ServiceCategory::Tinting,
        ServiceCategory::Painting,
        ServiceCategory::Detailing,
        ServiceCategory::Repair,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Protection => "protection",
            ServiceCategory::Tinting => "tinting",
            ServiceCategory::Painting => "painting",
            ServiceCategory::Detailing => "detailing",
            ServiceCategory::Repair => "repair",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceCategory::Protection => "Paint Protection",
            ServiceCategory::Tinting => "Window Tinting",
            ServiceCategory::Painting => "Painting",
            ServiceCategory::Detailing => "Detailing",
            ServiceCategory::Repair => "Repair",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A service the shop sells, used to price ticket line items.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogService {
    #[serde(rename = "_id", deserialize_with = "lenient_id")]
    pub id: String,
    pub name: String,
    pub category: ServiceCategory,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub created_at: DateLike,
    #[serde(default)]
    pub updated_at: DateLike,
}

fn default_active() -> bool {
    true
}

impl CatalogService {
    pub fn new(
        name: String,
        category: ServiceCategory,
        price: f64,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            category,
            price,
            description,
            active: true,
            created_at: DateLike::Date(now),
            updated_at: DateLike::Date(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(
            ServiceCategory::from_string(" Tinting "),
            Some(ServiceCategory::Tinting)
        );
        assert_eq!(ServiceCategory::from_string("wrapping"), None);
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&ServiceCategory::Detailing).unwrap();
        assert_eq!(json, "\"detailing\"");
    }
}
