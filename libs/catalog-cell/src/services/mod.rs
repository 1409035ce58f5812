pub mod catalog;
pub mod centers;
pub mod documents;
pub mod geo;
pub mod geocoder;

pub use catalog::ServiceCatalog;
pub use centers::CenterDirectory;
pub use geocoder::Geocoder;
