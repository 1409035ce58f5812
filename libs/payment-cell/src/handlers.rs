use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::user_uuid;

use crate::models::{CreateOrderRequest, PaymentError, RefundRequest, VerifyPaymentRequest};
use crate::services::{PaymentService, WebhookService};

pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

pub async fn get_payment_config(
    State(state): State<Arc<AppConfig>>,
) -> Result<Json<Value>, AppError> {
    if !state.is_payment_configured() {
        return Err(PaymentError::NotConfigured.into());
    }

    Ok(Json(json!({
        "success": true,
        "key_id": state.razorpay_key_id
    })))
}

pub async fn create_order(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PaymentService::new(&state)?;
    let order = service.create_order(&user, request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "order": order,
        "key_id": service.key_id()
    })))
}

pub async fn verify_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = user_uuid(&user)?;
    let verified = PaymentService::new(&state)?
        .verify_payment(user_id, request, auth.token())
        .await?;

    let message = if verified.already_processed {
        "Payment already processed"
    } else {
        "Payment verified successfully"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "payment": verified
    })))
}

pub async fn get_payment_details(
    State(state): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(payment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    debug!("User {} fetching payment {}", user.id, payment_id);
    let payment = PaymentService::new(&state)?.payment_details(&payment_id).await?;

    Ok(Json(json!({
        "success": true,
        "payment": payment
    })))
}

pub async fn refund_payment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RefundRequest>,
) -> Result<Json<Value>, AppError> {
    let refund = PaymentService::new(&state)?
        .refund(&user, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "Refund initiated successfully",
        "refund": refund
    })))
}

pub async fn handle_webhook(
    State(state): State<Arc<AppConfig>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let event = WebhookService::new(&state).handle(&body, signature).await?;

    Ok(Json(json!({
        "status": "ok",
        "event": event
    })))
}
