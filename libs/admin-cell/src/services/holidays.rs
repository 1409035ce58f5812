use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use appointment_cell::models::Holiday;
use shared_config::AppConfig;
use shared_database::supabase::{is_unique_violation, SupabaseClient};

use crate::models::{AdminError, CreateHolidayRequest, HolidayQuery};

pub struct HolidayService {
    supabase: SupabaseClient,
}

impl HolidayService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(&self, query: &HolidayQuery, auth_token: &str) -> Result<Vec<Holiday>, AdminError> {
        let mut path = "/rest/v1/holidays?order=date.asc".to_string();
        if let Some((start, end)) = query.month_range()? {
            path.push_str(&format!("&date=gte.{}&date=lt.{}", start, end));
        }

        Ok(self.supabase.select(&path, Some(auth_token)).await?)
    }

    pub async fn create(
        &self,
        admin_id: Uuid,
        request: CreateHolidayRequest,
        auth_token: &str,
    ) -> Result<Holiday, AdminError> {
        let date = request
            .date
            .ok_or_else(|| AdminError::ValidationError("date is required".to_string()))?;

        let existing_path = format!("/rest/v1/holidays?date=eq.{}", date);
        let existing: Option<Holiday> = self.supabase.select_one(&existing_path, Some(auth_token)).await?;
        if existing.is_some() {
            return Err(AdminError::HolidayExists);
        }

        let body = json!({
            "date": date,
            "reason": request.reason.filter(|r| !r.trim().is_empty()),
            "created_by": admin_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let holiday: Holiday = self.supabase
            .insert("holidays", Some(auth_token), body)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AdminError::HolidayExists
                } else {
                    AdminError::DatabaseError(e.to_string())
                }
            })?;

        info!("Holiday declared on {} by {}", holiday.date, admin_id);
        Ok(holiday)
    }

    pub async fn delete(&self, holiday_id: Uuid, auth_token: &str) -> Result<(), AdminError> {
        let path = format!("/rest/v1/holidays?id=eq.{}", holiday_id);
        let existing: Option<Holiday> = self.supabase.select_one(&path, Some(auth_token)).await?;
        let Some(holiday) = existing else {
            warn!("Holiday {} not found for deletion", holiday_id);
            return Err(AdminError::HolidayNotFound);
        };

        self.supabase.delete(&path, Some(auth_token)).await?;
        info!("Holiday on {} removed", holiday.date);
        Ok(())
    }
}
