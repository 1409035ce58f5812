pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Center, CenterStatus, CatalogError, Service};
pub use services::{CenterDirectory, ServiceCatalog};
