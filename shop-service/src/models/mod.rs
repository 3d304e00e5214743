pub mod catalog;
pub mod date_like;
pub mod ticket;

pub use catalog::{CatalogService, ServiceCategory};
pub use date_like::{parse_date_text, DateLike};
pub use ticket::{DiscountType, Payment, Ticket, TicketService};
