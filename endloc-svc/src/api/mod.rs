//! HTTP API handlers for endloc-svc

pub mod health;
pub mod maintenance;
pub mod records;
pub mod search;

pub use health::health_routes;
pub use maintenance::maintenance_routes;
pub use records::record_routes;
pub use search::search_routes;
