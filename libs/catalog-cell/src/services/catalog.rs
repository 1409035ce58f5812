use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    CatalogError, CreateServiceRequest, DocumentChecklist, DocumentValidation, Service,
    UpdateServiceRequest,
};
use crate::services::documents;

pub struct ServiceCatalog {
    supabase: SupabaseClient,
}

impl ServiceCatalog {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn list_services(&self, auth_token: Option<&str>) -> Result<Vec<Service>, CatalogError> {
        debug!("Listing active services");

        let services = self.supabase
            .select("/rest/v1/services?is_active=eq.true&order=name.asc", auth_token)
            .await?;

        Ok(services)
    }

    /// Service by id, including inactive ones.
    pub async fn get_service(&self, service_id: Uuid, auth_token: Option<&str>) -> Result<Service, CatalogError> {
        let path = format!("/rest/v1/services?id=eq.{}", service_id);

        self.supabase
            .select_one(&path, auth_token)
            .await?
            .ok_or(CatalogError::ServiceNotFound)
    }

    /// Service that can currently be booked; inactive services read as missing.
    pub async fn get_active_service(&self, service_id: Uuid, auth_token: Option<&str>) -> Result<Service, CatalogError> {
        let service = self.get_service(service_id, auth_token).await?;
        if !service.is_active {
            return Err(CatalogError::ServiceNotFound);
        }
        Ok(service)
    }

    pub async fn services_by_category(&self, category: &str, auth_token: Option<&str>) -> Result<Vec<Service>, CatalogError> {
        debug!("Listing services in category {}", category);

        let path = format!(
            "/rest/v1/services?is_active=eq.true&category=eq.{}&order=name.asc",
            urlencoding::encode(category)
        );

        Ok(self.supabase.select(&path, auth_token).await?)
    }

    /// Case-insensitive match on name or description.
    pub async fn search_services(&self, query: &str, auth_token: Option<&str>) -> Result<Vec<Service>, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery("Search query is required".to_string()));
        }

        // PostgREST reserves these inside or=(...) filters
        let term: String = query
            .chars()
            .filter(|c| !matches!(c, ',' | '(' | ')' | '*'))
            .collect();
        let pattern = urlencoding::encode(&format!("*{}*", term)).into_owned();

        let path = format!(
            "/rest/v1/services?is_active=eq.true&or=(name.ilike.{p},description.ilike.{p})&order=name.asc",
            p = pattern
        );

        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn services_by_ids(&self, ids: &[Uuid], auth_token: Option<&str>) -> Result<Vec<Service>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_list = ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");
        let path = format!("/rest/v1/services?id=in.({})&is_active=eq.true&order=name.asc", id_list);

        Ok(self.supabase.select(&path, auth_token).await?)
    }

    pub async fn document_checklist(&self, service_id: Uuid, auth_token: Option<&str>) -> Result<DocumentChecklist, CatalogError> {
        let service = self.get_service(service_id, auth_token).await?;
        Ok(documents::checklist(&service))
    }

    pub async fn validate_documents(
        &self,
        service_id: Uuid,
        selected: &[String],
        auth_token: Option<&str>,
    ) -> Result<DocumentValidation, CatalogError> {
        let service = self.get_service(service_id, auth_token).await?;
        Ok(documents::validate_selection(&service, selected))
    }

    /// Every service, active or not, newest first.
    pub async fn list_all_services(&self, auth_token: &str) -> Result<Vec<Service>, CatalogError> {
        Ok(self.supabase
            .select("/rest/v1/services?order=created_at.desc", Some(auth_token))
            .await?)
    }

    pub async fn create_service(
        &self,
        admin_id: Uuid,
        request: CreateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        request.validate()?;

        let now = Utc::now().to_rfc3339();
        let body = json!({
            "name": request.name.as_deref().map(str::trim),
            "description": request.description,
            "category": request.category.as_deref().map(str::trim),
            "fee": request.fee.unwrap_or(0.0),
            "service_charge": request.service_charge.unwrap_or(0.0),
            "processing_time": request.processing_time,
            "pre_check_rules": request.pre_check_rules,
            "required_documents": request.required_documents,
            "documents": request.documents,
            "minimum_required_documents": request.minimum_required_documents,
            "is_active": request.is_active.unwrap_or(true),
            "visit_count": 0,
            "created_by": admin_id,
            "created_at": now,
            "updated_at": now,
        });

        let service: Service = self.supabase.insert("services", Some(auth_token), body).await?;
        info!("Service {} ({}) created by {}", service.id, service.name, admin_id);
        Ok(service)
    }

    pub async fn update_service(
        &self,
        service_id: Uuid,
        request: UpdateServiceRequest,
        auth_token: &str,
    ) -> Result<Service, CatalogError> {
        request.validate()?;

        let mut patch = serde_json::to_value(&request)
            .map_err(|e| CatalogError::InvalidQuery(e.to_string()))?;
        patch["updated_at"] = json!(Utc::now().to_rfc3339());

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        let rows: Vec<Service> = self.supabase.update(&path, Some(auth_token), patch).await?;
        let service = rows.into_iter().next().ok_or(CatalogError::ServiceNotFound)?;

        info!("Service {} updated", service_id);
        Ok(service)
    }

    pub async fn delete_service(&self, service_id: Uuid, auth_token: &str) -> Result<(), CatalogError> {
        self.get_service(service_id, Some(auth_token)).await?;

        let path = format!("/rest/v1/services?id=eq.{}", service_id);
        self.supabase.delete(&path, Some(auth_token)).await?;

        info!("Service {} deleted", service_id);
        Ok(())
    }
}
