use crate::dtos::{
    AddServiceRequest, CreateTicketRequest, RecordPaymentRequest, TicketListParams,
    TicketListResponse, TicketListSummary, TicketResponse, UpdateTicketRequest,
};
use crate::models::{parse_date_text, DateLike, DiscountType, Payment, Ticket, TicketService};
use crate::services::analytics::{category_filter, resolve_date_range, TicketQuery};
use crate::services::metrics::{record_payment, record_ticket_created};
use crate::services::CatalogStore;
use crate::startup::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{Local, Utc};
use service_core::error::AppError;
use validator::Validate;

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// Request dates: blank clears, otherwise `YYYY-MM-DD` or RFC 3339.
fn parse_request_date(raw: &str, field: &str) -> Result<DateLike, AppError> {
    if raw.trim().is_empty() {
        return Ok(DateLike::Missing);
    }
    parse_date_text(raw)
        .map(DateLike::Date)
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Invalid {}: {}", field, raw)))
}

/// Items to skip before `page`; saturates so out-of-range pages come back
/// empty.
fn page_offset(page: u64, page_size: u64) -> usize {
    usize::try_from(page.saturating_sub(1).saturating_mul(page_size)).unwrap_or(usize::MAX)
}

fn clean_parts(parts: Vec<String>) -> Vec<String> {
    parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Prices a line item from the catalog entry it references.
async fn build_line_item(
    catalog: &dyn CatalogStore,
    request: &AddServiceRequest,
) -> Result<TicketService, AppError> {
    let service = catalog
        .find_service(&request.service_id)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Unknown service: {}", request.service_id))
        })?;

    if !service.active {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Service {} is not active",
            service.name
        )));
    }

    let discount = match (request.discount_type, request.discount_value) {
        (None, None) => None,
        (Some(DiscountType::Percentage), Some(value)) if value > 100.0 => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Percentage discount cannot exceed 100"
            )));
        }
        (Some(kind), Some(value)) => Some((kind, value)),
        _ => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "discountType and discountValue must be given together"
            )));
        }
    };

    Ok(TicketService::priced(
        service.id,
        service.name,
        service.category.as_str().to_string(),
        request.price.unwrap_or(service.price),
        discount,
    ))
}

async fn load_ticket(state: &AppState, id: &str) -> Result<Ticket, AppError> {
    state
        .tickets
        .find_ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Ticket not found")))
}

async fn save_ticket(state: &AppState, ticket: &Ticket) -> Result<(), AppError> {
    if state.tickets.replace_ticket(ticket).await? {
        Ok(())
    } else {
        Err(AppError::NotFound(anyhow::anyhow!("Ticket not found")))
    }
}

#[tracing::instrument(skip(state, payload))]
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(payload): Json<CreateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let mut ticket = Ticket::new(
        payload.plate_number.trim().to_string(),
        payload.customer_name.trim().to_string(),
        payload.customer_phone.trim().to_string(),
        Utc::now(),
    );
    ticket.customer_email = payload.customer_email;
    ticket.invoice_no = payload.invoice_no;
    if let Some(raw) = payload.invoice_date.as_deref() {
        ticket.invoice_date = parse_request_date(raw, "invoiceDate")?;
    }
    for request in &payload.services {
        ticket
            .services
            .push(build_line_item(state.catalog.as_ref(), request).await?);
    }
    ticket.repair_parts = clean_parts(payload.repair_parts);
    ticket.notes = payload.notes;
    ticket.reconcile_total();

    state.tickets.insert_ticket(&ticket).await?;
    record_ticket_created();

    tracing::info!(
        ticket_id = %ticket.id,
        plate = %ticket.plate_number,
        total = ticket.total_amount,
        "Ticket created"
    );

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}

#[tracing::instrument(skip(state))]
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(params): Query<TicketListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let range = resolve_date_range(
        params.period.as_deref().unwrap_or("all"),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        Local::now(),
    );
    let query = TicketQuery::new(range, category_filter(params.category.as_deref()))
        .with_plate(params.plate.as_deref());

    let mut tickets = state.tickets.find_tickets(&query).await?;
    // Newest first; undated legacy rows sink to the end.
    tickets.sort_by(|a, b| b.created_at.resolve().cmp(&a.created_at.resolve()));

    let summary = TicketListSummary {
        ticket_count: tickets.len() as u64,
        total_amount: tickets.iter().map(|t| t.total_amount).sum(),
        total_paid: tickets.iter().map(Ticket::amount_paid).sum(),
    };
    let total = summary.ticket_count;
    let total_pages = total.div_ceil(page_size);

    let tickets = tickets
        .into_iter()
        .skip(page_offset(page, page_size))
        .take(page_size as usize)
        .map(TicketResponse::from)
        .collect();

    Ok(Json(TicketListResponse {
        tickets,
        total,
        page,
        page_size,
        total_pages,
        summary,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = load_ticket(&state, &id).await?;
    Ok(Json(TicketResponse::from(ticket)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let mut ticket = load_ticket(&state, &id).await?;

    if let Some(plate) = payload.plate_number {
        ticket.plate_number = plate.trim().to_string();
    }
    if let Some(name) = payload.customer_name {
        ticket.customer_name = name.trim().to_string();
    }
    if let Some(phone) = payload.customer_phone {
        ticket.customer_phone = phone.trim().to_string();
    }
    if payload.customer_email.is_some() {
        ticket.customer_email = payload.customer_email;
    }
    if payload.invoice_no.is_some() {
        ticket.invoice_no = payload.invoice_no;
    }
    if let Some(raw) = payload.invoice_date.as_deref() {
        ticket.invoice_date = parse_request_date(raw, "invoiceDate")?;
    }
    if let Some(parts) = payload.repair_parts {
        ticket.repair_parts = clean_parts(parts);
    }
    if payload.notes.is_some() {
        ticket.notes = payload.notes;
    }
    ticket.touch(Utc::now());

    save_ticket(&state, &ticket).await?;
    tracing::info!(ticket_id = %ticket.id, "Ticket updated");

    Ok(Json(TicketResponse::from(ticket)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if !state.tickets.delete_ticket(&id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!("Ticket not found")));
    }
    tracing::info!(ticket_id = %id, "Ticket deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[tracing::instrument(skip(state, payload))]
pub async fn add_service(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<AddServiceRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let mut ticket = load_ticket(&state, &id).await?;

    let item = build_line_item(state.catalog.as_ref(), &payload).await?;
    ticket.services.push(item);
    if ticket.reconcile_total() {
        tracing::debug!(ticket_id = %ticket.id, "Stored total differed from line items");
    }
    ticket.touch(Utc::now());

    save_ticket(&state, &ticket).await?;
    tracing::info!(ticket_id = %ticket.id, total = ticket.total_amount, "Service added to ticket");

    Ok(Json(TicketResponse::from(ticket)))
}

#[tracing::instrument(skip(state))]
pub async fn remove_service(
    State(state): State<AppState>,
    Path((id, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, AppError> {
    let mut ticket = load_ticket(&state, &id).await?;

    if index >= ticket.services.len() {
        return Err(AppError::NotFound(anyhow::anyhow!("Service line not found")));
    }
    let removed = ticket.services.remove(index);
    ticket.reconcile_total();
    ticket.touch(Utc::now());

    save_ticket(&state, &ticket).await?;
    tracing::info!(
        ticket_id = %ticket.id,
        service_id = %removed.service_id,
        total = ticket.total_amount,
        "Service removed from ticket"
    );

    Ok(Json(TicketResponse::from(ticket)))
}

#[tracing::instrument(skip(state, payload))]
pub async fn record_ticket_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    if !payload.amount.is_finite() || payload.amount <= 0.0 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Payment amount must be positive"
        )));
    }

    let mut ticket = load_ticket(&state, &id).await?;
    let now = Utc::now();
    let date = match payload.date.as_deref() {
        Some(raw) if !raw.trim().is_empty() => parse_request_date(raw, "date")?,
        _ => DateLike::Date(now),
    };
    let method = payload.payment_method.trim().to_ascii_lowercase();

    ticket.payments.push(Payment {
        amount: payload.amount,
        date,
        payment_method: method.clone(),
    });
    ticket.touch(now);

    save_ticket(&state, &ticket).await?;
    record_payment(&method);
    tracing::info!(
        ticket_id = %ticket.id,
        amount = payload.amount,
        method = %method,
        balance_due = ticket.balance_due(),
        "Payment recorded"
    );

    Ok((StatusCode::CREATED, Json(TicketResponse::from(ticket))))
}
