pub mod confirmation;
pub mod gateway;
pub mod signature;
pub mod webhook;

pub use confirmation::PaymentService;
pub use webhook::WebhookService;
