use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::profile::Profile;

use crate::models::{AdminError, Pagination, UserListQuery, UserRoleRequest};

/// Account administration over the `profiles` table.
pub struct UserAdminService {
    supabase: SupabaseClient,
}

impl UserAdminService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list(
        &self,
        query: &UserListQuery,
        auth_token: &str,
    ) -> Result<(Vec<Profile>, Pagination), AdminError> {
        let filter = query
            .role_filter()?
            .map(|role| format!("&role=eq.{}", role))
            .unwrap_or_default();

        let count_path = format!("/rest/v1/profiles?select=id{}", filter);
        let ids: Vec<Value> = self.supabase.select(&count_path, Some(auth_token)).await?;

        let (page, limit) = (query.page(), query.limit());
        let path = format!(
            "/rest/v1/profiles?order=created_at.desc&limit={}&offset={}{}",
            limit,
            Pagination::offset(page, limit),
            filter
        );
        let users: Vec<Profile> = self.supabase.select(&path, Some(auth_token)).await?;

        debug!("Listed {} of {} users", users.len(), ids.len());
        Ok((users, Pagination::new(page, limit, ids.len())))
    }

    async fn patch_profile(&self, user_id: Uuid, patch: Value, auth_token: &str) -> Result<Profile, AdminError> {
        let path = format!("/rest/v1/profiles?id=eq.{}", user_id);
        let rows: Vec<Profile> = self.supabase.update(&path, Some(auth_token), patch).await?;
        rows.into_iter().next().ok_or(AdminError::UserNotFound)
    }

    pub async fn set_active(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        is_active: Option<bool>,
        auth_token: &str,
    ) -> Result<Profile, AdminError> {
        let is_active = is_active
            .ok_or_else(|| AdminError::ValidationError("is_active is required".to_string()))?;

        let profile = self.patch_profile(user_id, json!({ "is_active": is_active }), auth_token).await?;
        info!("User {} set active={} by {}", user_id, is_active, admin_id);
        Ok(profile)
    }

    pub async fn set_role(
        &self,
        admin_id: Uuid,
        user_id: Uuid,
        request: UserRoleRequest,
        auth_token: &str,
    ) -> Result<Profile, AdminError> {
        let role = request.target(admin_id, user_id)?;

        let profile = self.patch_profile(user_id, json!({ "role": role }), auth_token).await?;
        info!("User {} is now {} (changed by {})", user_id, role, admin_id);
        Ok(profile)
    }
}
