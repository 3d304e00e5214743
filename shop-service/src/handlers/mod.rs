pub mod analytics;
pub mod catalog;
pub mod health;
pub mod tickets;

pub use analytics::get_analytics;
pub use catalog::{create_service, delete_service, get_service, list_services, update_service};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use tickets::{
    add_service, create_ticket, delete_ticket, get_ticket, list_tickets, record_ticket_payment,
    remove_service, update_ticket,
};
