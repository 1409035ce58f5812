use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AdminError, SystemSettings};

const SETTINGS_PATH: &str = "/rest/v1/system_settings?id=eq.1";
pub const SETTINGS_CACHE_TTL: Duration = Duration::from_secs(60);

struct CachedSettings {
    settings: SystemSettings,
    fetched_at: Instant,
}

/// Shared, time-limited copy of the settings row for per-request checks.
#[derive(Clone)]
pub struct SettingsCache {
    entry: Arc<RwLock<Option<CachedSettings>>>,
    ttl: Duration,
}

impl Default for SettingsCache {
    fn default() -> Self {
        Self::new(SETTINGS_CACHE_TTL)
    }
}

impl SettingsCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entry: Arc::new(RwLock::new(None)),
            ttl,
        }
    }

    /// Cached settings, unless they are older than the TTL.
    pub async fn get(&self) -> Option<SystemSettings> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|cached| cached.fetched_at.elapsed() < self.ttl)
            .map(|cached| cached.settings.clone())
    }

    pub async fn store(&self, settings: SystemSettings) {
        *self.entry.write().await = Some(CachedSettings {
            settings,
            fetched_at: Instant::now(),
        });
    }

    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}

pub struct SettingsService {
    supabase: SupabaseClient,
    service_key: String,
}

impl SettingsService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            service_key: config.service_key().to_string(),
        }
    }

    /// The settings row, or the defaults when none has been saved yet.
    pub async fn get(&self, auth_token: Option<&str>) -> Result<SystemSettings, AdminError> {
        let token = auth_token.unwrap_or(&self.service_key);
        let row: Option<SystemSettings> = self.supabase.select_one(SETTINGS_PATH, Some(token)).await?;
        Ok(row.unwrap_or_default())
    }

    /// Merge `changes` over the stored settings and persist the result.
    pub async fn update(
        &self,
        admin_id: Uuid,
        changes: Value,
        auth_token: &str,
    ) -> Result<SystemSettings, AdminError> {
        let Value::Object(changes) = changes else {
            return Err(AdminError::ValidationError("Settings must be a JSON object".to_string()));
        };

        let current = self.get(Some(auth_token)).await?;
        let mut merged = serde_json::to_value(&current)
            .map_err(|e| AdminError::InvalidSettings(e.to_string()))?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in changes {
                if key != "last_updated_by" && key != "updated_at" {
                    fields.insert(key, value);
                }
            }
        }

        let mut settings: SystemSettings = serde_json::from_value(merged)
            .map_err(|e| AdminError::InvalidSettings(format!("Invalid settings: {}", e)))?;
        settings.validate()?;
        settings.last_updated_by = Some(admin_id);
        settings.updated_at = Some(Utc::now());

        let body = serde_json::to_value(&settings)
            .map_err(|e| AdminError::InvalidSettings(e.to_string()))?;
        let rows: Vec<SystemSettings> = self.supabase.update(SETTINGS_PATH, Some(auth_token), body.clone()).await?;

        let saved = match rows.into_iter().next() {
            Some(saved) => saved,
            None => {
                debug!("No settings row yet, creating it");
                let mut body = body;
                body["id"] = json!(1);
                self.supabase.insert("system_settings", Some(auth_token), body).await?
            }
        };

        info!("System settings updated by {} (maintenance: {})", admin_id, saved.maintenance_mode);
        Ok(saved)
    }

    /// Settings for per-request checks. Lookup failures read as the defaults,
    /// so a database outage never turns on maintenance mode.
    pub async fn current(&self, cache: &SettingsCache) -> SystemSettings {
        if let Some(settings) = cache.get().await {
            return settings;
        }

        match self.get(None).await {
            Ok(settings) => {
                cache.store(settings.clone()).await;
                settings
            }
            Err(e) => {
                error!("Failed to load settings for maintenance check: {}", e);
                SystemSettings::default()
            }
        }
    }
}
