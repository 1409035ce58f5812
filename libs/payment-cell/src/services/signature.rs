use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex HMAC-SHA256 of `payload`.
pub fn sign(secret: &str, payload: &[u8]) -> Result<String, String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| "Failed to create HMAC".to_string())?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time comparison of a hex signature against HMAC-SHA256(secret, payload).
pub fn verify(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    if secret.is_empty() {
        return false;
    }

    let Ok(signature) = hex::decode(signature_hex.trim()) else {
        debug!("Signature is not valid hex");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

/// Checkout signature: HMAC over `order_id|payment_id` with the API key secret.
pub fn verify_payment_signature(secret: &str, order_id: &str, payment_id: &str, signature: &str) -> bool {
    let payload = format!("{}|{}", order_id, payment_id);
    verify(secret, payload.as_bytes(), signature)
}

/// Webhook signature: HMAC over the raw request body with the webhook secret.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    verify(secret, body, signature)
}
