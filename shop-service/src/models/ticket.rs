use super::date_like::{
    lenient_amount, lenient_id, lenient_optional_amount, lenient_string_list, DateLike,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Fixed => "fixed",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => Some(DiscountType::Percentage),
            "fixed" | "amount" => Some(DiscountType::Fixed),
            _ => None,
        }
    }
}

fn lenient_discount_type<'de, D>(deserializer: D) -> Result<Option<DiscountType>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<mongodb::bson::Bson>::deserialize(deserializer)?
        .and_then(|value| value.as_str().and_then(DiscountType::from_string)))
}

/// One priced service attached to a ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketService {
    #[serde(default)]
    pub service_id: String,
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub price: f64,
    #[serde(
        default,
        deserialize_with = "lenient_discount_type",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_type: Option<DiscountType>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_value: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub final_price: Option<f64>,
}

impl TicketService {
    /// Builds a line item and prices it. Discounts are clamped so the final
    /// price stays within `[0, price]`.
    pub fn priced(
        service_id: String,
        service_name: String,
        category: String,
        price: f64,
        discount: Option<(DiscountType, f64)>,
    ) -> Self {
        let final_price = match discount {
            None => price,
            Some((DiscountType::Percentage, value)) => price - price * value / 100.0,
            Some((DiscountType::Fixed, value)) => price - value,
        }
        .clamp(0.0, price.max(0.0));

        Self {
            service_id,
            service_name,
            category,
            price,
            discount_type: discount.map(|(kind, _)| kind),
            discount_value: discount.map(|(_, value)| value),
            final_price: Some(final_price),
        }
    }

    /// The amount this line contributes to the ticket total.
    pub fn effective_price(&self) -> f64 {
        self.final_price.unwrap_or(self.price)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default, deserialize_with = "lenient_amount")]
    pub amount: f64,
    #[serde(default)]
    pub date: DateLike,
    #[serde(default)]
    pub payment_method: String,
}

/// A work order / invoice for one vehicle visit.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    #[serde(rename = "_id", deserialize_with = "lenient_id")]
    pub id: String,
    #[serde(default)]
    pub plate_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_no: Option<String>,
    #[serde(default, skip_serializing_if = "DateLike::is_missing")]
    pub invoice_date: DateLike,
    #[serde(default)]
    pub created_at: DateLike,
    #[serde(default, skip_serializing_if = "DateLike::is_missing")]
    pub updated_at: DateLike,
    #[serde(default, deserialize_with = "lenient_amount")]
    pub total_amount: f64,
    #[serde(default)]
    pub services: Vec<TicketService>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub repair_parts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Ticket {
    pub fn new(
        plate_number: String,
        customer_name: String,
        customer_phone: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plate_number,
            customer_name,
            customer_phone,
            customer_email: None,
            invoice_no: None,
            invoice_date: DateLike::Missing,
            created_at: DateLike::Date(now),
            updated_at: DateLike::Date(now),
            total_amount: 0.0,
            services: Vec::new(),
            payments: Vec::new(),
            repair_parts: Vec::new(),
            notes: None,
        }
    }

    /// The date a ticket reports against: its invoice date when that
    /// resolves, otherwise its creation date.
    pub fn anchor_date(&self) -> Option<DateTime<Utc>> {
        self.invoice_date
            .resolve()
            .or_else(|| self.created_at.resolve())
    }

    pub fn services_total(&self) -> f64 {
        self.services.iter().map(TicketService::effective_price).sum()
    }

    /// Brings `total_amount` back in line with the line items.
    /// Returns `true` when the stored total had drifted.
    pub fn reconcile_total(&mut self) -> bool {
        let total = self.services_total();
        let drifted = (self.total_amount - total).abs() > f64::EPSILON;
        self.total_amount = total;
        drifted
    }

    pub fn amount_paid(&self) -> f64 {
        self.payments.iter().map(|p| p.amount).sum()
    }

    pub fn balance_due(&self) -> f64 {
        (self.total_amount - self.amount_paid()).max(0.0)
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.services
            .iter()
            .any(|s| s.category.eq_ignore_ascii_case(category))
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = DateLike::Date(now);
    }
}
