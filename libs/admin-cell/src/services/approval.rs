use std::collections::HashMap;

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::profile::{ApprovalStatus, Profile};
use staff_cell::models::Staff;

use crate::models::{AdminError, StaffApplication};

/// Admin review of staff sign-ups. Approval activates the staff account,
/// its center assignment and the center itself.
pub struct StaffApprovalService {
    supabase: SupabaseClient,
}

impl StaffApprovalService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_applications(
        &self,
        status: Option<ApprovalStatus>,
        auth_token: &str,
    ) -> Result<Vec<StaffApplication>, AdminError> {
        let mut path = "/rest/v1/profiles?role=eq.staff&order=created_at.desc".to_string();
        if let Some(status) = status {
            path.push_str(&format!("&approval_status=eq.{}", status.as_str()));
        }

        let profiles: Vec<Profile> = self.supabase.select(&path, Some(auth_token)).await?;
        if profiles.is_empty() {
            return Ok(vec![]);
        }

        let ids: Vec<String> = profiles.iter().map(|p| p.id.to_string()).collect();
        let staff_path = format!("/rest/v1/staff?user_id=in.({})", ids.join(","));
        let assignments: Vec<Staff> = self.supabase.select(&staff_path, Some(auth_token)).await?;
        let mut by_user: HashMap<Uuid, Staff> = assignments.into_iter().map(|s| (s.user_id, s)).collect();

        debug!("Found {} staff applications", profiles.len());

        Ok(profiles
            .into_iter()
            .map(|profile| {
                let assignment = by_user.remove(&profile.id);
                StaffApplication { profile, assignment }
            })
            .collect())
    }

    async fn staff_profile(&self, user_id: Uuid, auth_token: &str) -> Result<Profile, AdminError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&role=eq.staff", user_id);
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(AdminError::StaffNotFound)
    }

    async fn pending_profile(&self, user_id: Uuid, auth_token: &str) -> Result<Profile, AdminError> {
        let profile = self.staff_profile(user_id, auth_token).await?;

        if profile.approval_status != ApprovalStatus::Pending {
            warn!("Staff {} is already {}", user_id, profile.approval_status.as_str());
            return Err(AdminError::NotPending(profile.approval_status.as_str()));
        }

        Ok(profile)
    }

    /// Records the decision only while the profile is still pending. When a
    /// concurrent review won, the staff row is brought back in line with it.
    async fn write_review(
        &self,
        user_id: Uuid,
        patch: serde_json::Value,
        auth_token: &str,
    ) -> Result<Profile, AdminError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&approval_status=eq.pending", user_id);
        let rows: Vec<Profile> = self.supabase.update(&path, Some(auth_token), patch).await?;
        if let Some(profile) = rows.into_iter().next() {
            return Ok(profile);
        }

        let current = self.staff_profile(user_id, auth_token).await?;
        warn!(
            "Staff {} was reviewed concurrently and is now {}",
            user_id,
            current.approval_status.as_str()
        );
        let active = current.approval_status == ApprovalStatus::Approved;
        if let Err(e) = self.set_assignment_active(user_id, active, auth_token).await {
            warn!("Could not restore staff assignment for {}: {}", user_id, e);
        }
        Err(AdminError::NotPending(current.approval_status.as_str()))
    }

    async fn set_assignment_active(
        &self,
        user_id: Uuid,
        active: bool,
        auth_token: &str,
    ) -> Result<Vec<Staff>, AdminError> {
        let path = format!("/rest/v1/staff?user_id=eq.{}", user_id);
        let patch = json!({ "is_active": active });
        Ok(self.supabase.update(&path, Some(auth_token), patch).await?)
    }

    /// Staff row and centers go live first, so a failure there leaves the
    /// application pending and the review can be retried.
    pub async fn approve(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        notes: Option<String>,
        auth_token: &str,
    ) -> Result<Profile, AdminError> {
        self.pending_profile(user_id, auth_token).await?;

        let assignments = self.set_assignment_active(user_id, true, auth_token).await?;
        for assignment in &assignments {
            let path = format!("/rest/v1/centers?id=eq.{}", assignment.center_id);
            let _: Vec<serde_json::Value> = self.supabase
                .update(&path, Some(auth_token), json!({ "status": "active" }))
                .await?;
            info!("Center {} activated with staff {}", assignment.center_id, user_id);
        }

        let profile = self.write_review(
            user_id,
            json!({
                "approval_status": ApprovalStatus::Approved,
                "is_active": true,
                "reviewed_by": admin_id,
                "reviewed_at": Utc::now().to_rfc3339(),
                "review_notes": notes,
            }),
            auth_token,
        ).await?;

        info!("Staff {} approved by {}", user_id, admin_id);
        Ok(profile)
    }

    pub async fn reject(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<Profile, AdminError> {
        self.pending_profile(user_id, auth_token).await?;

        self.set_assignment_active(user_id, false, auth_token).await?;

        let profile = self.write_review(
            user_id,
            json!({
                "approval_status": ApprovalStatus::Rejected,
                "reviewed_by": admin_id,
                "reviewed_at": Utc::now().to_rfc3339(),
                "review_notes": reason,
            }),
            auth_token,
        ).await?;

        info!("Staff {} rejected by {}", user_id, admin_id);
        Ok(profile)
    }
}
