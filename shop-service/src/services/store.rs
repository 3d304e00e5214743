use crate::models::{CatalogService, ServiceCategory, Ticket};
use crate::services::analytics::TicketQuery;
use async_trait::async_trait;
use service_core::error::AppError;

#[async_trait]
pub trait TicketStore: Send + Sync {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), AppError>;
    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, AppError>;
    /// All tickets matching `query`, in no particular order.
    async fn find_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, AppError>;
    /// Returns `false` when no ticket with that id exists.
    async fn replace_ticket(&self, ticket: &Ticket) -> Result<bool, AppError>;
    async fn delete_ticket(&self, id: &str) -> Result<bool, AppError>;
    async fn ping(&self) -> Result<(), AppError>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_service(&self, service: &CatalogService) -> Result<(), AppError>;
    async fn find_service(&self, id: &str) -> Result<Option<CatalogService>, AppError>;
    async fn list_services(
        &self,
        category: Option<ServiceCategory>,
        active: Option<bool>,
    ) -> Result<Vec<CatalogService>, AppError>;
    async fn replace_service(&self, service: &CatalogService) -> Result<bool, AppError>;
    async fn delete_service(&self, id: &str) -> Result<bool, AppError>;
}
