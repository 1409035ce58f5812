use tracing::debug;
use uuid::Uuid;

use catalog_cell::models::{
    CenterServiceCounts, CenterServiceSettings, CenterServiceView, ServiceSettingsRequest,
};
use catalog_cell::services::CenterDirectory;
use shared_config::AppConfig;

use crate::models::{Permission, StaffAccess, StaffError};

/// Which catalog services a center offers, hides, and how it prices them.
/// Every operation needs `manage_services`.
pub struct CenterServiceManager {
    centers: CenterDirectory,
}

impl CenterServiceManager {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            centers: CenterDirectory::new(config),
        }
    }

    fn center_for(&self, access: &StaffAccess, requested: Option<Uuid>) -> Result<Uuid, StaffError> {
        access.require(Permission::ManageServices)?;
        access.target_center(requested)
    }

    pub async fn available(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(Vec<CenterServiceView>, CenterServiceCounts), StaffError> {
        let center_id = self.center_for(access, requested)?;
        debug!("Listing catalog services for center {}", center_id);
        Ok(self.centers.service_views(center_id, auth_token).await?)
    }

    pub async fn offered(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<CenterServiceView>, StaffError> {
        let center_id = self.center_for(access, requested)?;
        Ok(self.centers.offered_services(center_id, auth_token).await?)
    }

    pub async fn hidden(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Vec<CenterServiceView>, StaffError> {
        let center_id = self.center_for(access, requested)?;
        Ok(self.centers.hidden_services(center_id, auth_token).await?)
    }

    pub async fn set_enabled(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        service_id: Uuid,
        enabled: bool,
        auth_token: &str,
    ) -> Result<(), StaffError> {
        let center_id = self.center_for(access, requested)?;
        self.centers
            .set_service_enabled(center_id, service_id, enabled, auth_token)
            .await?;
        Ok(())
    }

    pub async fn set_hidden(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        service_id: Uuid,
        hidden: bool,
        auth_token: &str,
    ) -> Result<(), StaffError> {
        let center_id = self.center_for(access, requested)?;
        self.centers
            .set_service_hidden(center_id, service_id, hidden, auth_token)
            .await?;
        Ok(())
    }

    pub async fn update_settings(
        &self,
        access: &StaffAccess,
        requested: Option<Uuid>,
        service_id: Uuid,
        request: ServiceSettingsRequest,
        auth_token: &str,
    ) -> Result<CenterServiceSettings, StaffError> {
        let center_id = self.center_for(access, requested)?;
        Ok(self.centers
            .update_service_settings(center_id, service_id, access.user_id, request, auth_token)
            .await?)
    }
}
