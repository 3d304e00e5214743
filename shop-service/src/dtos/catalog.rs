use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::CatalogService;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 120, message = "Service name is required"))]
    pub name: String,

    /// One of `protection`, `tinting`, `painting`, `detailing`, `repair`.
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,

    pub description: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ServiceListParams {
    pub category: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogServiceResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub category_name: String,
    pub price: f64,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl From<CatalogService> for CatalogServiceResponse {
    fn from(service: CatalogService) -> Self {
        Self {
            id: service.id,
            name: service.name,
            category: service.category.as_str().to_string(),
            category_name: service.category.display_name().to_string(),
            price: service.price,
            description: service.description,
            active: service.active,
            created_at: service.created_at.display(),
            updated_at: service.updated_at.display(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ServiceListResponse {
    pub services: Vec<CatalogServiceResponse>,
    pub total: usize,
}
