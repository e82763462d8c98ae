pub mod customer;
pub mod json;
pub mod metrics;
pub mod request_id;

pub use customer::CustomerContext;
pub use json::PortalJson;
