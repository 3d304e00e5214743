#![allow(dead_code)]

use serde_json::{json, Value};
use shop_service::config::ShopConfig;
use shop_service::services::{CatalogStore, TicketStore};
use shop_service::startup::Application;
use std::sync::Arc;

pub struct TestApp {
    pub http_address: String,
    pub http_port: u16,
    pub tickets: Arc<dyn TicketStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let app = Application::build(ShopConfig::for_memory())
            .await
            .expect("Failed to build test application");

        let http_port = app.http_port();
        let tickets = app.ticket_store();
        let catalog = app.catalog_store();
        let http_address = format!("http://127.0.0.1:{}", http_port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for HTTP server to be ready by polling health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", http_address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            http_address,
            http_port,
            tickets,
            catalog,
            client,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.http_address, path)
    }

    /// Creates a catalog service and returns its id.
    pub async fn create_service(&self, name: &str, category: &str, price: f64) -> String {
        let response = self
            .client
            .post(self.url("/services"))
            .json(&json!({ "name": name, "category": category, "price": price }))
            .send()
            .await
            .expect("Failed to create service");
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.expect("Invalid service body");
        body["id"].as_str().expect("Missing service id").to_string()
    }

    /// Creates a ticket from `body` and returns the response JSON.
    pub async fn create_ticket(&self, body: Value) -> Value {
        let response = self
            .client
            .post(self.url("/tickets"))
            .json(&body)
            .send()
            .await
            .expect("Failed to create ticket");
        assert_eq!(response.status().as_u16(), 201, "ticket creation failed");
        response.json().await.expect("Invalid ticket body")
    }

    pub async fn get_json(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request");
        let status = response.status().as_u16();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

pub fn ticket_body(plate: &str, services: Value) -> Value {
    json!({
        "plateNumber": plate,
        "customerName": "Test Customer",
        "customerPhone": "555-0100",
        "services": services,
    })
}
