use tracing::{debug, warn};

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::{Role, User};

use crate::models::{Staff, StaffAccess, StaffError};

pub struct StaffAccessService {
    supabase: SupabaseClient,
}

impl StaffAccessService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Active assignment for a staff account, if any.
    pub async fn active_assignment(&self, user_id: &str, auth_token: &str) -> Result<Option<Staff>, StaffError> {
        let path = format!("/rest/v1/staff?user_id=eq.{}&is_active=eq.true", user_id);
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Admins see all centers; staff need an active assignment and see only its center.
    pub async fn resolve(&self, user: &User, auth_token: &str) -> Result<StaffAccess, StaffError> {
        let user_id = user.uuid().ok_or(StaffError::NotStaff)?;

        match user.platform_role() {
            Role::Admin => Ok(StaffAccess::admin(user_id)),
            Role::Staff => {
                let staff = self.active_assignment(&user.id, auth_token).await?.ok_or_else(|| {
                    warn!("Staff user {} has no active center assignment", user.id);
                    StaffError::NoAssignment
                })?;

                debug!("Staff user {} resolved to center {}", user.id, staff.center_id);
                Ok(StaffAccess::for_staff(&staff))
            }
            Role::Citizen => Err(StaffError::NotStaff),
        }
    }
}
