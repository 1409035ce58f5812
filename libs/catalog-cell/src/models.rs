use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// SERVICE CATALOG
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRequirement {
    Mandatory,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentAlternative {
    pub name: String,
    pub notes: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDocument {
    pub name: String,
    pub requirement: DocumentRequirement,
    pub notes: Option<String>,
    pub image_url: Option<String>,
    #[serde(default)]
    pub alternatives: Vec<DocumentAlternative>,
}

impl ServiceDocument {
    /// True when the selection names this document or one of its alternatives.
    pub fn satisfied_by(&self, selected: &[String]) -> bool {
        let matches = |name: &str| selected.iter().any(|s| s.eq_ignore_ascii_case(name));
        matches(&self.name) || self.alternatives.iter().any(|alt| matches(&alt.name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub fee: f64,
    #[serde(default)]
    pub service_charge: f64,
    pub processing_time: String,
    #[serde(default)]
    pub pre_check_rules: Vec<String>,
    /// Legacy flat list of document names.
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub documents: Vec<ServiceDocument>,
    pub minimum_required_documents: Option<u32>,
    pub is_active: bool,
    #[serde(default)]
    pub visit_count: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Service {
    pub fn total_documents(&self) -> usize {
        self.documents.len() + self.required_documents.len()
    }

    /// Explicit minimum, else every document but one (never below one).
    pub fn minimum_documents(&self) -> usize {
        match self.minimum_required_documents {
            Some(min) => min as usize,
            None => self.total_documents().saturating_sub(1).max(1),
        }
    }

    pub fn requires_payment(&self) -> bool {
        self.fee > 0.0
    }
}

#[derive(Debug, Serialize)]
pub struct DocumentChecklist {
    pub service_id: Uuid,
    pub service_name: String,
    pub documents: Vec<ServiceDocument>,
    pub required_documents: Vec<String>,
    pub mandatory_count: usize,
    pub optional_count: usize,
    pub minimum_required: usize,
    pub total_documents: usize,
}

#[derive(Debug, Deserialize)]
pub struct ValidateDocumentsRequest {
    pub service_id: Uuid,
    pub selected_documents: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct DocumentValidation {
    pub selected: usize,
    pub minimum_required: usize,
    pub meets_minimum: bool,
    pub missing_mandatory: Vec<String>,
}

impl DocumentValidation {
    pub fn is_valid(&self) -> bool {
        self.meets_minimum && self.missing_mandatory.is_empty()
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Deserialize)]
pub struct CreateServiceRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub fee: Option<f64>,
    pub service_charge: Option<f64>,
    pub processing_time: Option<String>,
    #[serde(default)]
    pub pre_check_rules: Vec<String>,
    #[serde(default)]
    pub required_documents: Vec<String>,
    #[serde(default)]
    pub documents: Vec<ServiceDocument>,
    pub minimum_required_documents: Option<u32>,
    pub is_active: Option<bool>,
}

impl CreateServiceRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if !(non_blank(&self.name) && non_blank(&self.description) && non_blank(&self.category)) {
            return Err(CatalogError::InvalidQuery(
                "Name, description and category are required".to_string(),
            ));
        }
        if !non_blank(&self.processing_time) {
            return Err(CatalogError::InvalidQuery("Processing time is required".to_string()));
        }
        validate_fees(self.fee, self.service_charge)
    }
}

/// Partial service update; absent fields are left alone.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateServiceRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_charge: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_check_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_documents: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<ServiceDocument>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_required_documents: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateServiceRequest {
    pub fn validate(&self) -> Result<(), CatalogError> {
        for field in [&self.name, &self.description, &self.category, &self.processing_time] {
            if field.is_some() && !non_blank(field) {
                return Err(CatalogError::InvalidQuery("Service fields cannot be blank".to_string()));
            }
        }
        validate_fees(self.fee, self.service_charge)
    }
}

fn validate_fees(fee: Option<f64>, service_charge: Option<f64>) -> Result<(), CatalogError> {
    let valid = |amount: Option<f64>| amount.map_or(true, |a| a.is_finite() && a >= 0.0);
    if !valid(fee) || !valid(service_charge) {
        return Err(CatalogError::InvalidQuery("Fees cannot be negative".to_string()));
    }
    Ok(())
}

// ==============================================================================
// SERVICE CENTERS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CenterStatus {
    Active,
    Inactive,
    Maintenance,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CenterAddress {
    pub street: String,
    pub city: String,
    pub district: String,
    pub state: String,
    pub pincode: String,
}

impl CenterAddress {
    /// Single-line form handed to the geocoder.
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {}, {}",
            self.street, self.city, self.district, self.state, self.pincode
        )
    }

    pub fn is_complete(&self) -> bool {
        [&self.street, &self.city, &self.district, &self.state, &self.pincode]
            .iter()
            .all(|part| !part.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CenterContact {
    pub phone: String,
    pub email: String,
}

pub const DEFAULT_DAILY_CAPACITY: u32 = 50;

fn default_daily_capacity() -> u32 {
    DEFAULT_DAILY_CAPACITY
}

/// Per-center overrides staff keep for a service they offer.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CenterServiceSettings {
    #[serde(default)]
    pub availability_notes: String,
    pub custom_fees: Option<f64>,
    /// Minutes.
    pub estimated_duration: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Center {
    pub id: Uuid,
    pub name: String,
    pub address: CenterAddress,
    pub location: Option<GeoPoint>,
    pub contact: CenterContact,
    #[serde(default)]
    pub services: Vec<Uuid>,
    /// Services staff have hidden from their management view.
    #[serde(default)]
    pub hidden_services: Vec<Uuid>,
    #[serde(default)]
    pub service_settings: HashMap<Uuid, CenterServiceSettings>,
    pub status: CenterStatus,
    pub registered_by: Option<Uuid>,
    #[serde(default = "default_daily_capacity")]
    pub max_appointments_per_day: u32,
    #[serde(default)]
    pub rating: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Center {
    pub fn is_active(&self) -> bool {
        self.status == CenterStatus::Active
    }

    pub fn offers(&self, service_id: Uuid) -> bool {
        self.services.contains(&service_id)
    }

    pub fn hides(&self, service_id: Uuid) -> bool {
        self.hidden_services.contains(&service_id)
    }
}

/// Adds or removes `id` from `ids`; true when the list changed.
pub fn toggle_membership(ids: &mut Vec<Uuid>, id: Uuid, present: bool) -> bool {
    match (present, ids.contains(&id)) {
        (true, false) => {
            ids.push(id);
            true
        }
        (false, true) => {
            ids.retain(|existing| *existing != id);
            true
        }
        _ => false,
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyCenter {
    #[serde(flatten)]
    pub center: Center,
    /// Kilometres, rounded to two decimals.
    pub distance: f64,
}

#[derive(Debug, Default, Deserialize)]
pub struct CenterFilters {
    pub district: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub radius_km: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct CenterSearchQuery {
    pub query: Option<String>,
    pub radius_km: Option<f64>,
}

/// Best geocoder match for a free-text place.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeocodedPlace {
    pub location: GeoPoint,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateCenterRequest {
    pub name: Option<String>,
    pub address: Option<CenterAddress>,
    pub contact: Option<CenterContact>,
    #[serde(default)]
    pub services: Vec<Uuid>,
    pub max_appointments_per_day: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCenterRequest {
    pub name: Option<String>,
    pub address: Option<CenterAddress>,
    pub contact: Option<CenterContact>,
    pub services: Option<Vec<Uuid>>,
    pub status: Option<CenterStatus>,
    pub max_appointments_per_day: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ToggleServiceRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct HideServiceRequest {
    pub hidden: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceSettingsRequest {
    pub availability_notes: Option<String>,
    pub custom_fees: Option<f64>,
    pub estimated_duration: Option<u32>,
}

/// A catalog service as seen from one center's management screen.
#[derive(Debug, Serialize)]
pub struct CenterServiceView {
    #[serde(flatten)]
    pub service: Service,
    pub is_enabled: bool,
    pub is_hidden: bool,
    /// A hidden service has to be unhidden before it can be enabled.
    pub can_enable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<CenterServiceSettings>,
}

impl CenterServiceView {
    pub fn new(service: Service, center: &Center) -> Self {
        let is_enabled = center.offers(service.id);
        let is_hidden = center.hides(service.id);
        let settings = center.service_settings.get(&service.id).cloned();
        Self {
            service,
            is_enabled,
            is_hidden,
            can_enable: !is_hidden,
            settings,
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CenterServiceCounts {
    pub total: usize,
    pub enabled: usize,
    pub hidden: usize,
    pub available: usize,
}

impl CenterServiceCounts {
    pub fn tally(views: &[CenterServiceView]) -> Self {
        let enabled = views.iter().filter(|v| v.is_enabled).count();
        let hidden = views.iter().filter(|v| v.is_hidden).count();
        Self {
            total: views.len(),
            enabled,
            hidden,
            available: views.len() - hidden,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Service not found")]
    ServiceNotFound,

    #[error("Center not found")]
    CenterNotFound,

    #[error("{0}")]
    InvalidQuery(String),

    #[error("No location found for the given address")]
    LocationNotFound,

    #[error("Geocoding failed: {0}")]
    Geocoder(String),

    #[error("Center was changed by someone else; reload and try again")]
    ConcurrentUpdate,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for CatalogError {
    fn from(err: anyhow::Error) -> Self {
        CatalogError::DatabaseError(err.to_string())
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::ServiceNotFound | CatalogError::CenterNotFound => {
                AppError::NotFound(err.to_string())
            }
            CatalogError::InvalidQuery(msg) => AppError::BadRequest(msg),
            CatalogError::LocationNotFound => AppError::BadRequest(err.to_string()),
            CatalogError::Geocoder(_) => AppError::ExternalService(err.to_string()),
            CatalogError::ConcurrentUpdate => AppError::Conflict(err.to_string()),
            CatalogError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
