use crate::models::{CatalogService, ServiceCategory, Ticket};
use crate::services::analytics::TicketQuery;
use crate::services::store::{CatalogStore, TicketStore};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Document},
    options::IndexOptions,
    Client as MongoClient, Collection, Database, IndexModel,
};
use serde::de::DeserializeOwned;
use service_core::error::AppError;

#[derive(Clone)]
pub struct ShopDb {
    client: MongoClient,
    db: Database,
}

impl ShopDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for shop-service");

        let ticket_indexes = [
            ("created_at_lookup", doc! { "createdAt": -1 }),
            ("invoice_date_lookup", doc! { "invoiceDate": -1 }),
            ("plate_lookup", doc! { "plateNumber": 1 }),
            ("service_category_lookup", doc! { "services.category": 1 }),
        ];

        for (name, keys) in ticket_indexes {
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(name.to_string()).build())
                .build();
            self.raw_tickets()
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create {} index on tickets collection: {}", name, e);
                    AppError::from(e)
                })?;
            tracing::info!(index = %name, "Created index on tickets");
        }

        let category_index = IndexModel::builder()
            .keys(doc! { "category": 1, "name": 1 })
            .options(
                IndexOptions::builder()
                    .name("category_lookup".to_string())
                    .build(),
            )
            .build();
        self.raw_services()
            .create_index(category_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create category index on services collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on services.(category, name)");

        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    pub fn tickets(&self) -> Collection<Ticket> {
        self.db.collection("tickets")
    }

    pub fn services(&self) -> Collection<CatalogService> {
        self.db.collection("services")
    }

    fn raw_tickets(&self) -> Collection<Document> {
        self.db.collection("tickets")
    }

    fn raw_services(&self) -> Collection<Document> {
        self.db.collection("services")
    }
}

/// Matches a string id, or the ObjectId it spells for rows written before
/// ids were strings.
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "$or": [{ "_id": id }, { "_id": oid }] },
        Err(_) => doc! { "_id": id },
    }
}

/// Serialises `value` for `replace_one`. `_id` is dropped so legacy ObjectId
/// keys survive the replacement.
fn replacement<T: serde::Serialize>(value: &T) -> Result<Document, AppError> {
    let mut document = bson::to_document(value)?;
    document.remove("_id");
    Ok(document)
}

fn decode<T: DeserializeOwned>(raw: Document) -> Result<T, AppError> {
    bson::from_document(raw)
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Undecodable document: {}", e)))
}

/// Drains a raw cursor, skipping rows that no longer decode.
async fn decode_all<T: DeserializeOwned>(
    mut cursor: mongodb::Cursor<Document>,
    collection: &str,
) -> Result<Vec<T>, AppError> {
    let mut items = Vec::new();
    while let Some(raw) = cursor.try_next().await? {
        let id = raw.get("_id").map(|v| v.to_string()).unwrap_or_default();
        match bson::from_document::<T>(raw) {
            Ok(item) => items.push(item),
            Err(e) => {
                tracing::warn!(collection = %collection, id = %id, error = %e, "Skipping undecodable document")
            }
        }
    }
    Ok(items)
}

#[async_trait]
impl TicketStore for ShopDb {
    async fn insert_ticket(&self, ticket: &Ticket) -> Result<(), AppError> {
        self.tickets().insert_one(ticket, None).await?;
        Ok(())
    }

    async fn find_ticket(&self, id: &str) -> Result<Option<Ticket>, AppError> {
        self.raw_tickets()
            .find_one(id_filter(id), None)
            .await?
            .map(decode)
            .transpose()
    }

    async fn find_tickets(&self, query: &TicketQuery) -> Result<Vec<Ticket>, AppError> {
        let filter = query.to_document();
        tracing::debug!(filter = %filter, "Querying tickets");
        let cursor = self.raw_tickets().find(filter, None).await?;
        decode_all(cursor, "tickets").await
    }

    async fn replace_ticket(&self, ticket: &Ticket) -> Result<bool, AppError> {
        let result = self
            .raw_tickets()
            .replace_one(id_filter(&ticket.id), replacement(ticket)?, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_ticket(&self, id: &str) -> Result<bool, AppError> {
        let result = self.raw_tickets().delete_one(id_filter(id), None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.health_check().await
    }
}

#[async_trait]
impl CatalogStore for ShopDb {
    async fn insert_service(&self, service: &CatalogService) -> Result<(), AppError> {
        self.services().insert_one(service, None).await?;
        Ok(())
    }

    async fn find_service(&self, id: &str) -> Result<Option<CatalogService>, AppError> {
        self.raw_services()
            .find_one(id_filter(id), None)
            .await?
            .map(decode)
            .transpose()
    }

    async fn list_services(
        &self,
        category: Option<ServiceCategory>,
        active: Option<bool>,
    ) -> Result<Vec<CatalogService>, AppError> {
        let mut filter = Document::new();
        if let Some(category) = category {
            filter.insert("category", category.as_str());
        }
        if let Some(active) = active {
            filter.insert("active", active);
        }

        let options = mongodb::options::FindOptions::builder()
            .sort(doc! { "name": 1 })
            .build();
        let cursor = self.raw_services().find(filter, options).await?;
        decode_all(cursor, "services").await
    }

    async fn replace_service(&self, service: &CatalogService) -> Result<bool, AppError> {
        let result = self
            .raw_services()
            .replace_one(id_filter(&service.id), replacement(service)?, None)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_service(&self, id: &str) -> Result<bool, AppError> {
        let result = self.raw_services().delete_one(id_filter(id), None).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn id_filter_matches_object_id_spelling() {
        let oid = ObjectId::new();
        let filter = id_filter(&oid.to_hex());
        let branches = filter.get_array("$or").unwrap();
        assert_eq!(branches.len(), 2);

        let plain = id_filter("8f1c2a1e-uuid");
        assert_eq!(plain.get_str("_id").unwrap(), "8f1c2a1e-uuid");
    }

    #[test]
    fn replacement_drops_id() {
        let ticket = Ticket::new("ABC".into(), "Ana".into(), "555".into(), Utc::now());
        let document = replacement(&ticket).unwrap();
        assert!(!document.contains_key("_id"));
        assert_eq!(document.get_str("plateNumber").unwrap(), "ABC");
    }
}
