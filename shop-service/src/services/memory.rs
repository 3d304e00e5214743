use crate::models::{CatalogService, ServiceCategory, Ticket};
use crate::services::analytics::TicketQuery;
use crate::services::store::{CatalogStore, TicketStore};
use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-process store used by tests and `STORE_BACKEND=memory`. Tickets are
/// returned in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    tickets: RwLock<Vec<Ticket>>,
    services: RwLock<HashMap<String, CatalogService>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TicketStore for MemoryStore {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), AppError> {
        let mut tickets = self.tickets.write().await;
        if tickets.iter().any(|t| t.id == ticket.id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Ticket {} already exists",
                ticket.id
            )));
        }
        tickets.push(ticket.clone());
        Ok(())
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, AppError> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn find_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, AppError> {
        Ok(self
            .tickets
            .read()
            .await
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect())
    }

    async fn replace_ticket(&self, ticket: &Ticket) -> Result<bool, AppError> {
        let mut tickets = self.tickets.write().await;
        match tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => {
                *existing = ticket.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_ticket(&self, id: &str) -> Result<bool, AppError> {
        let mut tickets = self.tickets.write().await;
        let before = tickets.len();
        tickets.retain(|t| t.id != id);
        Ok(tickets.len() != before)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_service(&self, service: &CatalogService) -> Result<(), AppError> {
        self.services
            .write()
            .await
            .insert(service.id.clone(), service.clone());
        Ok(())
    }

    async fn find_service(&self, id: &str) -> Result<Option<CatalogService>, AppError> {
        Ok(self.services.read().await.get(id).cloned())
    }

    async fn list_services(
        &self,
        category: Option<ServiceCategory>,
        active: Option<bool>,
    ) -> Result<Vec<CatalogService>, AppError> {
        let mut services: Vec<CatalogService> = self
            .services
            .read()
            .await
            .values()
            .filter(|s| category.map_or(true, |c| s.category == c))
            .filter(|s| active.map_or(true, |a| s.active == a))
            .cloned()
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(services)
    }

    async fn replace_service(&self, service: &CatalogService) -> Result<bool, AppError> {
        let mut services = self.services.write().await;
        match services.get_mut(&service.id) {
            Some(existing) => {
                *existing = service.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_service(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.services.write().await.remove(id).is_some())
    }
}
