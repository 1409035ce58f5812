use chrono::Utc;
use serde_json::json;
use tracing::{debug, error, info, warn};

use appointment_cell::models::{PaymentEvent, PaymentStatus, RefundStatus};
use appointment_cell::AppointmentBookingService;
use shared_config::AppConfig;

use crate::models::{to_rupees, GatewayPayment, GatewayRefund, PaymentError, WebhookEvent};
use crate::services::signature;

/// Applies gateway webhook events to appointment payment snapshots.
/// Writes use the service role key since no user session is attached.
pub struct WebhookService {
    appointments: AppointmentBookingService,
    secret: String,
    service_key: String,
}

impl WebhookService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            appointments: AppointmentBookingService::new(config),
            secret: config.webhook_secret().to_string(),
            service_key: config.service_key().to_string(),
        }
    }

    /// Verify and apply one delivery. Only signature and payload errors are
    /// returned; failures while applying the event are logged.
    pub async fn handle(&self, body: &[u8], signature_header: Option<&str>) -> Result<String, PaymentError> {
        let signature_hex = signature_header.ok_or(PaymentError::InvalidWebhookSignature)?;
        if !signature::verify_webhook_signature(&self.secret, body, signature_hex) {
            warn!("Rejected webhook with invalid signature");
            return Err(PaymentError::InvalidWebhookSignature);
        }

        let event: WebhookEvent = serde_json::from_slice(body)
            .map_err(|e| PaymentError::ValidationError(format!("Invalid webhook payload: {}", e)))?;

        info!("Received payment webhook: {}", event.event);

        let outcome = match event.event.as_str() {
            "payment.captured" => match event.payload.payment {
                Some(entity) => self.payment_captured(entity.entity).await,
                None => Err(missing_entity("payment")),
            },
            "payment.failed" => match event.payload.payment {
                Some(entity) => self.payment_failed(entity.entity).await,
                None => Err(missing_entity("payment")),
            },
            "refund.processed" => match event.payload.refund {
                Some(entity) => self.refund_processed(entity.entity).await,
                None => Err(missing_entity("refund")),
            },
            other => {
                debug!("Ignoring unhandled webhook event {}", other);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            error!("Failed to apply webhook event {}: {}", event.event, e);
        }

        Ok(event.event)
    }

    async fn payment_captured(&self, payment: GatewayPayment) -> Result<(), PaymentError> {
        let Some(appointment) = self.appointments.find_by_payment_id(&payment.id, &self.service_key).await? else {
            debug!("No appointment for captured payment {}", payment.id);
            return Ok(());
        };

        if appointment.payment.status == PaymentStatus::Paid {
            debug!("Appointment {} already marked paid", appointment.id);
            return Ok(());
        }

        let mut info = appointment.payment.clone();
        info.status = PaymentStatus::Paid;
        info.amount = to_rupees(payment.amount);
        info.history.push(PaymentEvent {
            at: Utc::now(),
            action: "captured".to_string(),
            meta: json!({ "payment_id": payment.id, "method": payment.method, "source": "webhook" }),
        });

        self.appointments.record_payment(appointment.id, &info, &self.service_key).await?;
        info!("Marked appointment {} paid from webhook", appointment.id);
        Ok(())
    }

    async fn payment_failed(&self, payment: GatewayPayment) -> Result<(), PaymentError> {
        let Some(order_id) = payment.order_id.as_deref() else {
            debug!("Failed payment {} carries no order id", payment.id);
            return Ok(());
        };

        let Some(appointment) = self.appointments.find_by_order_id(order_id, &self.service_key).await? else {
            debug!("No appointment for failed order {}", order_id);
            return Ok(());
        };

        let mut info = appointment.payment.clone();
        info.status = PaymentStatus::Failed;
        info.history.push(PaymentEvent {
            at: Utc::now(),
            action: "failed".to_string(),
            meta: json!({
                "payment_id": payment.id,
                "order_id": order_id,
                "error": payment.error_description,
            }),
        });

        self.appointments.record_payment(appointment.id, &info, &self.service_key).await?;
        warn!("Payment for appointment {} failed", appointment.id);
        Ok(())
    }

    async fn refund_processed(&self, refund: GatewayRefund) -> Result<(), PaymentError> {
        let Some(appointment) = self.appointments.find_by_payment_id(&refund.payment_id, &self.service_key).await? else {
            debug!("No appointment for refunded payment {}", refund.payment_id);
            return Ok(());
        };

        let mut info = appointment.payment.clone();
        info.status = PaymentStatus::Refunded;
        info.refund_status = RefundStatus::Processed;
        info.refund_id = Some(refund.id.clone());
        info.history.push(PaymentEvent {
            at: Utc::now(),
            action: "refund_processed".to_string(),
            meta: json!({ "refund_id": refund.id, "amount": to_rupees(refund.amount) }),
        });

        self.appointments.record_payment(appointment.id, &info, &self.service_key).await?;
        info!("Refund {} processed for appointment {}", refund.id, appointment.id);
        Ok(())
    }
}

fn missing_entity(kind: &str) -> PaymentError {
    PaymentError::ValidationError(format!("Webhook event has no {} entity", kind))
}
