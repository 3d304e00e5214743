pub mod analytics;
pub mod catalog;
pub mod tickets;

pub use analytics::*;
pub use catalog::*;
pub use tickets::*;
