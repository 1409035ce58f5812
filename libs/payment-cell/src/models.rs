use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, BookAppointmentRequest};
use catalog_cell::models::CatalogError;
use shared_models::error::AppError;

/// Rupees to paise.
pub fn to_paise(rupees: f64) -> i64 {
    (rupees * 100.0).round() as i64
}

/// Paise to rupees.
pub fn to_rupees(paise: i64) -> f64 {
    paise as f64 / 100.0
}

// ==============================================================================
// GATEWAY WIRE TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct GatewayOrderRequest {
    /// Paise.
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayPayment {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub order_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub notes: Value,
    pub error_description: Option<String>,
}

impl GatewayPayment {
    pub fn is_captured(&self) -> bool {
        self.status == "captured"
    }

    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_at, 0).single()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRefund {
    pub id: String,
    pub payment_id: String,
    pub amount: i64,
    pub status: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntity<T> {
    pub entity: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookEntity<GatewayPayment>>,
    pub refund: Option<WebhookEntity<GatewayRefund>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

// ==============================================================================
// API REQUESTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub service_id: Uuid,
    pub center_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    pub razorpay_signature: Option<String>,
    /// Appointment to book once the payment checks out.
    pub booking: Option<BookAppointmentRequest>,
}

#[derive(Debug, Deserialize)]
pub struct RefundRequest {
    pub payment_id: Option<String>,
    /// Rupees; the full payment is refunded when absent.
    pub amount: Option<f64>,
    pub reason: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("Payment gateway is not configured")]
    NotConfigured,

    #[error("Missing payment verification parameters")]
    MissingParameters,

    #[error("Payment verification failed")]
    SignatureMismatch,

    #[error("Payment not captured")]
    NotCaptured,

    #[error("Payment amount does not match the service fee")]
    AmountMismatch,

    #[error("This service does not require payment")]
    FreeService,

    #[error("Invalid webhook signature")]
    InvalidWebhookSignature,

    #[error("Payment gateway error ({status}): {message}")]
    Gateway { status: u16, message: String },

    #[error("Payment gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error("Payment {payment_id} was received but the appointment could not be booked: {source}. You can request a refund for this payment.")]
    BookingFailedAfterPayment {
        payment_id: String,
        source: AppointmentError,
    },

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for PaymentError {
    fn from(err: anyhow::Error) -> Self {
        PaymentError::DatabaseError(err.to_string())
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => AppError::ServiceUnavailable(err.to_string()),
            PaymentError::Gateway { .. } | PaymentError::Http(_) => {
                AppError::ExternalService(err.to_string())
            }
            PaymentError::Catalog(inner) => inner.into(),
            PaymentError::Appointment(inner) => inner.into(),
            PaymentError::BookingFailedAfterPayment { source: AppointmentError::DatabaseError(_), .. } => {
                AppError::Database(err.to_string())
            }
            PaymentError::BookingFailedAfterPayment { .. } => AppError::Conflict(err.to_string()),
            PaymentError::Forbidden(msg) => AppError::Forbidden(msg),
            PaymentError::DatabaseError(msg) => AppError::Database(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}
