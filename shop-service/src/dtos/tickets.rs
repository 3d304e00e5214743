use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{DiscountType, Payment, Ticket, TicketService};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    #[validate(length(min = 1, max = 20, message = "Plate number is required"))]
    pub plate_number: String,

    #[validate(length(min = 1, max = 120, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(length(min = 3, max = 30, message = "Customer phone is required"))]
    pub customer_phone: String,

    #[validate(email(message = "Invalid email address"))]
    pub customer_email: Option<String>,

    pub invoice_no: Option<String>,

    /// `YYYY-MM-DD` or RFC 3339.
    pub invoice_date: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub services: Vec<AddServiceRequest>,

    #[serde(default)]
    pub repair_parts: Vec<String>,

    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddServiceRequest {
    #[validate(length(min = 1, message = "Service id is required"))]
    pub service_id: String,

    /// Overrides the catalog price.
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,

    pub discount_type: Option<DiscountType>,

    #[validate(range(min = 0.0, message = "Discount cannot be negative"))]
    pub discount_value: Option<f64>,
}

/// Partial update. `invoiceDate: ""` clears the invoice date.
#[derive(Debug, Deserialize, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    #[validate(length(min = 1, max = 20))]
    pub plate_number: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub customer_name: Option<String>,
    #[validate(length(min = 3, max = 30))]
    pub customer_phone: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub customer_email: Option<String>,
    pub invoice_no: Option<String>,
    pub invoice_date: Option<String>,
    pub repair_parts: Option<Vec<String>>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentRequest {
    pub amount: f64,
    #[validate(length(min = 1, max = 30, message = "Payment method is required"))]
    pub payment_method: String,
    pub date: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TicketListParams {
    pub period: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub category: Option<String>,
    pub plate: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub amount: f64,
    pub date: Option<String>,
    pub payment_method: String,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            amount: payment.amount,
            date: payment.date.display(),
            payment_method: payment.payment_method.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: String,
    pub plate_number: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub invoice_no: Option<String>,
    pub invoice_date: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub total_amount: f64,
    pub amount_paid: f64,
    pub balance_due: f64,
    pub services: Vec<TicketService>,
    pub payments: Vec<PaymentResponse>,
    pub repair_parts: Vec<String>,
    pub notes: Option<String>,
}

impl From<Ticket> for TicketResponse {
    fn from(ticket: Ticket) -> Self {
        Self {
            amount_paid: ticket.amount_paid(),
            balance_due: ticket.balance_due(),
            invoice_date: ticket.invoice_date.display(),
            created_at: ticket.created_at.display(),
            updated_at: ticket.updated_at.display(),
            payments: ticket.payments.iter().map(PaymentResponse::from).collect(),
            id: ticket.id,
            plate_number: ticket.plate_number,
            customer_name: ticket.customer_name,
            customer_phone: ticket.customer_phone,
            customer_email: ticket.customer_email,
            invoice_no: ticket.invoice_no,
            total_amount: ticket.total_amount,
            services: ticket.services,
            repair_parts: ticket.repair_parts,
            notes: ticket.notes,
        }
    }
}

#[derive(Debug, Serialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TicketListSummary {
    pub ticket_count: u64,
    pub total_amount: f64,
    pub total_paid: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketListResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
    pub summary: TicketListSummary,
}
