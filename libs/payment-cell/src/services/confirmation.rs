use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, PaymentEvent, PaymentInfo, RefundStatus};
use appointment_cell::AppointmentBookingService;
use catalog_cell::services::{CenterDirectory, ServiceCatalog};
use shared_config::AppConfig;
use shared_models::auth::{Role, User};

use crate::models::{
    to_paise, to_rupees, CreateOrderRequest, GatewayOrder, GatewayOrderRequest, PaymentError,
    RefundRequest, VerifyPaymentRequest,
};
use crate::services::gateway::{PaymentGateway, RazorpayClient};
use crate::services::signature;

/// Outcome of a checkout verification.
#[derive(Debug, Serialize)]
pub struct VerifiedPayment {
    pub payment_id: String,
    pub order_id: String,
    /// Rupees.
    pub amount: f64,
    pub status: String,
    pub appointment: Option<Appointment>,
    /// The payment had already been used for this appointment.
    pub already_processed: bool,
}

#[derive(Debug, Serialize)]
pub struct PaymentDetails {
    pub id: String,
    /// Rupees.
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub order_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub notes: Value,
}

#[derive(Debug, Serialize)]
pub struct RefundOutcome {
    pub refund_id: String,
    pub payment_id: String,
    /// Rupees.
    pub amount: f64,
    pub status: String,
    pub appointment_id: Option<Uuid>,
}

/// `<last 10 digits of epoch ms>_<last 8 chars of user id>`, within the gateway's 40 char limit.
pub fn receipt_for(user_id: &str, now: DateTime<Utc>) -> String {
    let millis = now.timestamp_millis().to_string();
    let stamp = &millis[millis.len().saturating_sub(10)..];
    let chars: Vec<char> = user_id.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(8)..].iter().collect();
    format!("{}_{}", stamp, tail)
}

pub struct PaymentService {
    gateway: Arc<dyn PaymentGateway>,
    catalog: ServiceCatalog,
    centers: CenterDirectory,
    appointments: AppointmentBookingService,
}

impl PaymentService {
    pub fn new(config: &AppConfig) -> Result<Self, PaymentError> {
        let gateway = RazorpayClient::new(config)?;
        Ok(Self::with_gateway(config, Arc::new(gateway)))
    }

    pub fn with_gateway(config: &AppConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        Self {
            gateway,
            catalog: ServiceCatalog::new(config),
            centers: CenterDirectory::new(config),
            appointments: AppointmentBookingService::new(config),
        }
    }

    pub fn key_id(&self) -> &str {
        self.gateway.key_id()
    }

    pub async fn create_order(
        &self,
        user: &User,
        request: CreateOrderRequest,
        auth_token: &str,
    ) -> Result<GatewayOrder, PaymentError> {
        let service = self.catalog.get_active_service(request.service_id, Some(auth_token)).await?;
        let center = self.centers.get_active_center(request.center_id, Some(auth_token)).await?;

        if !service.requires_payment() {
            return Err(PaymentError::FreeService);
        }

        let order_request = GatewayOrderRequest {
            amount: to_paise(service.fee),
            currency: "INR".to_string(),
            receipt: receipt_for(&user.id, Utc::now()),
            notes: json!({
                "service_id": service.id,
                "service_name": service.name,
                "center_id": center.id,
                "center_name": center.name,
                "user_id": user.id,
            }),
        };

        let order = self.gateway.create_order(&order_request).await?;
        info!(
            "Order {} created for service {} at center {} by user {}",
            order.id, service.id, center.id, user.id
        );
        Ok(order)
    }

    /// Check the checkout signature, confirm the capture with the gateway and,
    /// when a booking is attached, book the paid appointment.
    pub async fn verify_payment(
        &self,
        user_id: Uuid,
        request: VerifyPaymentRequest,
        auth_token: &str,
    ) -> Result<VerifiedPayment, PaymentError> {
        let (order_id, payment_id, signature_hex) = match (
            request.razorpay_order_id.filter(|s| !s.is_empty()),
            request.razorpay_payment_id.filter(|s| !s.is_empty()),
            request.razorpay_signature.filter(|s| !s.is_empty()),
        ) {
            (Some(order), Some(payment), Some(sig)) => (order, payment, sig),
            _ => return Err(PaymentError::MissingParameters),
        };

        if !signature::verify_payment_signature(self.gateway.key_secret(), &order_id, &payment_id, &signature_hex) {
            warn!("Signature mismatch for order {} payment {}", order_id, payment_id);
            return Err(PaymentError::SignatureMismatch);
        }

        if let Some(existing) = self.appointments.find_by_payment_id(&payment_id, auth_token).await? {
            info!("Payment {} already confirmed appointment {}", payment_id, existing.id);
            return Ok(VerifiedPayment {
                payment_id,
                order_id,
                amount: existing.payment.amount,
                status: "captured".to_string(),
                appointment: Some(existing),
                already_processed: true,
            });
        }

        let payment = self.gateway.fetch_payment(&payment_id).await?;
        if !payment.is_captured() {
            warn!("Payment {} is {}, not captured", payment_id, payment.status);
            return Err(PaymentError::NotCaptured);
        }
        if payment.order_id.as_deref().is_some_and(|o| o != order_id) {
            warn!("Payment {} belongs to a different order", payment_id);
            return Err(PaymentError::SignatureMismatch);
        }

        let appointment = match request.booking {
            Some(booking) => {
                let service = self.catalog.get_active_service(booking.service_id, Some(auth_token)).await?;
                if payment.amount != to_paise(service.fee) {
                    warn!(
                        "Payment {} amount {} does not match fee {} for service {}",
                        payment_id, payment.amount, service.fee, service.id
                    );
                    return Err(PaymentError::AmountMismatch);
                }

                let info = PaymentInfo::paid(to_rupees(payment.amount), &order_id, &payment_id, &signature_hex);
                let appointment = self.appointments
                    .book_with_payment(user_id, booking, info, auth_token)
                    .await
                    .map_err(|e| {
                        error!(
                            "Booking failed after payment {} on order {} was captured for user {}: {}",
                            payment_id, order_id, user_id, e
                        );
                        PaymentError::BookingFailedAfterPayment { payment_id: payment_id.clone(), source: e }
                    })?;
                info!("Payment {} confirmed appointment {}", payment_id, appointment.id);
                Some(appointment)
            }
            None => {
                debug!("Payment {} verified without a booking", payment_id);
                None
            }
        };

        Ok(VerifiedPayment {
            payment_id,
            order_id,
            amount: to_rupees(payment.amount),
            status: payment.status,
            appointment,
            already_processed: false,
        })
    }

    pub async fn payment_details(&self, payment_id: &str) -> Result<PaymentDetails, PaymentError> {
        let payment = self.gateway.fetch_payment(payment_id).await?;

        Ok(PaymentDetails {
            amount: to_rupees(payment.amount),
            created_at: payment.created_at_utc(),
            id: payment.id,
            currency: payment.currency,
            status: payment.status,
            method: payment.method,
            order_id: payment.order_id,
            notes: payment.notes,
        })
    }

    /// Citizens may refund only payments on their own appointments.
    pub async fn refund(
        &self,
        user: &User,
        request: RefundRequest,
        auth_token: &str,
    ) -> Result<RefundOutcome, PaymentError> {
        let payment_id = request
            .payment_id
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PaymentError::ValidationError("Payment ID is required".to_string()))?;

        if let Some(amount) = request.amount {
            if amount <= 0.0 {
                return Err(PaymentError::ValidationError(
                    "Refund amount must be greater than zero".to_string(),
                ));
            }
        }

        let appointment = self.appointments.find_by_payment_id(&payment_id, auth_token).await?;

        if user.platform_role() == Role::Citizen {
            let owns = appointment
                .as_ref()
                .is_some_and(|a| Some(a.user_id) == user.uuid());
            if !owns {
                warn!("User {} tried to refund payment {} they do not own", user.id, payment_id);
                return Err(PaymentError::Forbidden("You can only refund your own payments".to_string()));
            }
        }

        let reason = request.reason.unwrap_or_else(|| "Requested by customer".to_string());
        let refund = self.gateway
            .refund(
                &payment_id,
                request.amount.map(to_paise),
                json!({ "reason": reason, "requested_by": user.id }),
            )
            .await?;

        let appointment_id = match appointment {
            Some(appointment) => {
                let mut payment = appointment.payment.clone();
                payment.refund_status = RefundStatus::Requested;
                payment.refund_id = Some(refund.id.clone());
                payment.history.push(PaymentEvent {
                    at: Utc::now(),
                    action: "refund_requested".to_string(),
                    meta: json!({
                        "refund_id": refund.id,
                        "amount": to_rupees(refund.amount),
                        "reason": reason,
                        "requested_by": user.id,
                    }),
                });

                self.appointments.record_payment(appointment.id, &payment, auth_token).await?;
                Some(appointment.id)
            }
            None => {
                debug!("Refund {} has no linked appointment", refund.id);
                None
            }
        };

        info!("Refund {} requested for payment {}", refund.id, payment_id);

        Ok(RefundOutcome {
            amount: to_rupees(refund.amount),
            refund_id: refund.id,
            payment_id,
            status: refund.status,
            appointment_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn receipt_keeps_tails_of_clock_and_user() {
        let now = Utc.timestamp_millis_opt(1_736_000_123_456).unwrap();
        let receipt = receipt_for("5f0c1d2e-aaaa-bbbb-cccc-1234abcd5678", now);

        assert_eq!(receipt, "6000123456_abcd5678");
        assert!(receipt.len() <= 40);
    }

    #[test]
    fn receipt_handles_short_ids() {
        let now = Utc.timestamp_millis_opt(1_736_000_123_456).unwrap();
        assert_eq!(receipt_for("u1", now), "6000123456_u1");
    }
}
