use std::sync::Arc;
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::json;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub razorpay_base_url: String,
    pub razorpay_key_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            razorpay_base_url: "http://localhost:54322".to_string(),
            razorpay_key_secret: "test-razorpay-secret".to_string(),
        }
    }
}

impl TestConfig {
    /// Point PostgREST, the payment gateway and the geocoder at one mock server.
    pub fn with_mock_server(uri: &str) -> Self {
        Self {
            supabase_url: uri.to_string(),
            razorpay_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
            supabase_service_role_key: "test-service-role-key".to_string(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: self.razorpay_key_secret.clone(),
            razorpay_webhook_secret: String::new(),
            razorpay_base_url: self.razorpay_base_url.clone(),
            geocoder_base_url: self.razorpay_base_url.clone(),
            center_utc_offset_minutes: 330,
            port: 3000,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "user".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn citizen(email: &str) -> Self {
        Self::new(email, "user")
    }

    pub fn staff(email: &str) -> Self {
        Self::new(email, "staff")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn uuid(&self) -> Uuid {
        Uuid::parse_str(&self.id).unwrap_or_default()
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": "authenticated",
            "app_metadata": { "role": user.role },
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Hex HMAC-SHA256, the signature format the payment gateway uses.
pub fn sign_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn profile_response(user_id: &str, role: &str, approval_status: &str) -> serde_json::Value {
        json!({
            "id": user_id,
            "name": "Test User",
            "email": "test@example.com",
            "phone": "9876543210",
            "role": role,
            "is_active": true,
            "approval_status": approval_status,
            "reviewed_by": null,
            "reviewed_at": null,
            "review_notes": "",
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn service_response(service_id: &str, fee: f64) -> serde_json::Value {
        json!({
            "id": service_id,
            "name": "Income Certificate",
            "description": "Issue of income certificate through e-District",
            "category": "Certificates",
            "fee": fee,
            "service_charge": 0.0,
            "processing_time": "7 days",
            "pre_check_rules": ["Applicant must be a resident of Kerala"],
            "required_documents": [],
            "documents": [
                {
                    "name": "Aadhaar Card",
                    "requirement": "mandatory",
                    "notes": null,
                    "image_url": null,
                    "alternatives": []
                },
                {
                    "name": "Ration Card",
                    "requirement": "mandatory",
                    "notes": null,
                    "image_url": null,
                    "alternatives": [{ "name": "Electricity Bill", "notes": null, "image_url": null }]
                },
                {
                    "name": "Salary Certificate",
                    "requirement": "optional",
                    "notes": "Only for salaried applicants",
                    "image_url": null,
                    "alternatives": []
                }
            ],
            "minimum_required_documents": null,
            "is_active": true,
            "visit_count": 0,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn center_response(center_id: &str, service_ids: &[&str]) -> serde_json::Value {
        json!({
            "id": center_id,
            "name": "Akshaya Centre Kowdiar",
            "address": {
                "street": "Kowdiar Road",
                "city": "Thiruvananthapuram",
                "district": "Thiruvananthapuram",
                "state": "Kerala",
                "pincode": "695003"
            },
            "location": { "lat": 8.5241, "lng": 76.9366 },
            "contact": { "phone": "+919876543210", "email": "kowdiar@akshaya.gov.in" },
            "services": service_ids,
            "status": "active",
            "registered_by": Uuid::new_v4(),
            "max_appointments_per_day": 50,
            "rating": 4.2,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn appointment_response(
        appointment_id: &str,
        user_id: &str,
        service_id: &str,
        center_id: &str,
        date: &str,
        time_slot: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "user_id": user_id,
            "service_id": service_id,
            "center_id": center_id,
            "appointment_date": date,
            "time_slot": time_slot,
            "status": status,
            "notes": null,
            "selected_documents": [],
            "payment": {
                "status": "unpaid",
                "amount": 0.0,
                "currency": "INR",
                "order_id": null,
                "payment_id": null,
                "signature": null,
                "refund_id": null,
                "refund_status": "none",
                "gateway": "razorpay",
                "history": []
            },
            "status_history": [],
            "processing_notes": null,
            "completed_at": null,
            "actual_duration_minutes": null,
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn staff_response(user_id: &str, center_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "user_id": user_id,
            "center_id": center_id,
            "role": "staff",
            "permissions": [
                "manage_appointments",
                "update_status",
                "add_comments",
                "upload_documents",
                "manage_services",
                "view_analytics"
            ],
            "is_active": true,
            "assigned_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn holiday_response(date: &str, reason: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4(),
            "date": date,
            "reason": reason,
            "created_by": null,
            "created_at": "2024-01-01T00:00:00Z"
        })
    }

    pub fn error_response(message: &str, code: &str) -> serde_json::Value {
        json!({
            "message": message,
            "code": code
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let config = TestConfig::default();
        let app_config = config.to_app_config();

        assert_eq!(app_config.supabase_url, "http://localhost:54321");
        assert_eq!(app_config.supabase_anon_key, "test-anon-key");
        assert!(!app_config.supabase_jwt_secret.is_empty());
        assert!(app_config.is_payment_configured());
    }

    #[test]
    fn test_user_creation() {
        let user = TestUser::staff("staff@akshaya.gov.in");
        assert_eq!(user.role, "staff");

        let user_model = user.to_user();
        assert_eq!(user_model.email, Some(user.email.clone()));
        assert_eq!(user_model.id, user.id);
        assert_eq!(user.uuid().to_string(), user.id);
    }

    #[test]
    fn test_jwt_token_creation() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "test-secret", Some(1));

        assert_eq!(token.split('.').count(), 3);
    }

    #[test]
    fn sign_hex_is_lowercase_sha256_hex() {
        let signature = sign_hex("secret", b"order_1|pay_1");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
