pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::PaymentError;
pub use services::gateway::{PaymentGateway, RazorpayClient};
pub use services::{PaymentService, WebhookService};
