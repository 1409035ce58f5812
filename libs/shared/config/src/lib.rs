use std::env;
use tracing::warn;

pub const DEFAULT_RAZORPAY_BASE_URL: &str = "https://api.razorpay.com/v1";
pub const DEFAULT_CENTER_UTC_OFFSET_MINUTES: i32 = 330;
pub const DEFAULT_GEOCODER_BASE_URL: &str = "https://nominatim.openstreetmap.org";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub razorpay_webhook_secret: String,
    pub razorpay_base_url: String,
    /// Nominatim-compatible geocoder used to place centers by address.
    pub geocoder_base_url: String,
    /// Offset of the centers' wall clock from UTC. Booking windows and
    /// edit cutoffs are evaluated in this zone.
    pub center_utc_offset_minutes: i32,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, webhook updates will use the anon key");
                    String::new()
                }),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .unwrap_or_else(|_| {
                    warn!("RAZORPAY_KEY_ID not set, payments disabled");
                    String::new()
                }),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")
                .unwrap_or_else(|_| {
                    warn!("RAZORPAY_KEY_SECRET not set, payments disabled");
                    String::new()
                }),
            razorpay_webhook_secret: env::var("RAZORPAY_WEBHOOK_SECRET")
                .unwrap_or_default(),
            razorpay_base_url: env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_RAZORPAY_BASE_URL.to_string()),
            geocoder_base_url: env::var("GEOCODER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_GEOCODER_BASE_URL.to_string()),
            center_utc_offset_minutes: env::var("CENTER_UTC_OFFSET_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_CENTER_UTC_OFFSET_MINUTES),
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    pub fn is_payment_configured(&self) -> bool {
        !self.razorpay_key_id.is_empty()
            && !self.razorpay_key_secret.is_empty()
            && !self.razorpay_base_url.is_empty()
    }

    /// Secret used to sign gateway webhooks; falls back to the API key secret.
    pub fn webhook_secret(&self) -> &str {
        if self.razorpay_webhook_secret.is_empty() {
            &self.razorpay_key_secret
        } else {
            &self.razorpay_webhook_secret
        }
    }

    /// Key used for writes that happen outside a user session (gateway webhooks).
    pub fn service_key(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon".to_string(),
            supabase_jwt_secret: "secret".to_string(),
            supabase_service_role_key: String::new(),
            razorpay_key_id: "rzp_test_key".to_string(),
            razorpay_key_secret: "key-secret".to_string(),
            razorpay_webhook_secret: String::new(),
            razorpay_base_url: DEFAULT_RAZORPAY_BASE_URL.to_string(),
            geocoder_base_url: DEFAULT_GEOCODER_BASE_URL.to_string(),
            center_utc_offset_minutes: DEFAULT_CENTER_UTC_OFFSET_MINUTES,
            port: 3000,
        }
    }

    #[test]
    fn webhook_secret_falls_back_to_key_secret() {
        let mut config = config();
        assert_eq!(config.webhook_secret(), "key-secret");

        config.razorpay_webhook_secret = "hook-secret".to_string();
        assert_eq!(config.webhook_secret(), "hook-secret");
    }

    #[test]
    fn service_key_falls_back_to_anon_key() {
        let mut config = config();
        assert_eq!(config.service_key(), "anon");

        config.supabase_service_role_key = "service".to_string();
        assert_eq!(config.service_key(), "service");
    }

    #[test]
    fn payment_configuration_requires_credentials() {
        let mut config = config();
        assert!(config.is_payment_configured());

        config.razorpay_key_secret.clear();
        assert!(!config.is_payment_configured());
    }
}
