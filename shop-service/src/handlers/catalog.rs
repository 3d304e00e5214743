use crate::dtos::{
    CatalogServiceResponse, CreateServiceRequest, ServiceListParams, ServiceListResponse,
    UpdateServiceRequest,
};
use crate::models::{CatalogService, DateLike, ServiceCategory};
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use validator::Validate;

fn parse_category(raw: &str) -> Result<ServiceCategory, AppError> {
    ServiceCategory::from_string(raw)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Unknown category: {}", raw)))
}

async fn load_service(state: &AppState, id: &str) -> Result<CatalogService, AppError> {
    state
        .catalog
        .find_service(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service not found")))
}

#[tracing::instrument(skip(state))]
pub async fn create_service(
    State(state): State<AppState>,
    Json(payload): Json<CreateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let category = parse_category(&payload.category)?;

    let service = CatalogService::new(
        payload.name.trim().to_string(),
        category,
        payload.price,
        payload.description,
        Utc::now(),
    );
    state.catalog.insert_service(&service).await?;

    tracing::info!(service_id = %service.id, category = %category, "Catalog service created");
    Ok((StatusCode::CREATED, Json(CatalogServiceResponse::from(service))))
}

#[tracing::instrument(skip(state))]
pub async fn list_services(
    State(state): State<AppState>,
    Query(params): Query<ServiceListParams>,
) -> Result<impl IntoResponse, AppError> {
    let category = params
        .category
        .as_deref()
        .filter(|c| !c.trim().is_empty() && !c.eq_ignore_ascii_case("all"))
        .map(parse_category)
        .transpose()?;

    let services: Vec<CatalogServiceResponse> = state
        .catalog
        .list_services(category, params.active)
        .await?
        .into_iter()
        .map(CatalogServiceResponse::from)
        .collect();

    Ok(Json(ServiceListResponse {
        total: services.len(),
        services,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn get_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let service = load_service(&state, &id).await?;
    Ok(Json(CatalogServiceResponse::from(service)))
}

#[tracing::instrument(skip(state))]
pub async fn update_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let mut service = load_service(&state, &id).await?;

    if let Some(name) = payload.name {
        service.name = name.trim().to_string();
    }
    if let Some(price) = payload.price {
        service.price = price;
    }
    if payload.description.is_some() {
        service.description = payload.description;
    }
    if let Some(active) = payload.active {
        service.active = active;
    }
    service.updated_at = DateLike::Date(Utc::now());

    if !state.catalog.replace_service(&service).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Service not found")));
    }
    tracing::info!(service_id = %service.id, "Catalog service updated");

    Ok(Json(CatalogServiceResponse::from(service)))
}

/// Existing tickets keep their copied line items.
#[tracing::instrument(skip(state))]
pub async fn delete_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.catalog.delete_service(&id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Service not found")));
    }
    tracing::info!(service_id = %id, "Catalog service deleted");
    Ok(StatusCode::NO_CONTENT)
}
