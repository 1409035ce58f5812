use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::{AppointmentError, AppointmentStatus};
use catalog_cell::models::CatalogError;
use shared_models::error::AppError;

// ==============================================================================
// STAFF RECORDS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Staff,
    Supervisor,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageAppointments,
    UpdateStatus,
    AddComments,
    UploadDocuments,
    ManageServices,
    ViewAnalytics,
    ViewRatings,
    ManageRatings,
    #[serde(other)]
    Unknown,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::ManageAppointments => "manage_appointments",
            Permission::UpdateStatus => "update_status",
            Permission::AddComments => "add_comments",
            Permission::UploadDocuments => "upload_documents",
            Permission::ManageServices => "manage_services",
            Permission::ViewAnalytics => "view_analytics",
            Permission::ViewRatings => "view_ratings",
            Permission::ManageRatings => "manage_ratings",
            Permission::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Granted to every newly registered staff member. Rating moderation
/// permissions are granted individually.
pub const DEFAULT_PERMISSIONS: [Permission; 6] = [
    Permission::ManageAppointments,
    Permission::UpdateStatus,
    Permission::AddComments,
    Permission::UploadDocuments,
    Permission::ManageServices,
    Permission::ViewAnalytics,
];

fn default_role() -> StaffRole {
    StaffRole::Staff
}

fn default_permissions() -> Vec<Permission> {
    DEFAULT_PERMISSIONS.to_vec()
}

/// Assignment of a staff account to a service center.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub user_id: Uuid,
    pub center_id: Uuid,
    #[serde(default = "default_role")]
    pub role: StaffRole,
    #[serde(default = "default_permissions")]
    pub permissions: Vec<Permission>,
    pub is_active: bool,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Centers a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenterScope {
    All,
    Center(Uuid),
}

/// What the authenticated caller may do through the staff endpoints.
#[derive(Debug, Clone)]
pub struct StaffAccess {
    pub user_id: Uuid,
    pub scope: CenterScope,
    pub permissions: Vec<Permission>,
}

impl StaffAccess {
    /// Administrators see every center with every permission.
    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            scope: CenterScope::All,
            permissions: DEFAULT_PERMISSIONS.to_vec(),
        }
    }

    pub fn for_staff(staff: &Staff) -> Self {
        Self {
            user_id: staff.user_id,
            scope: CenterScope::Center(staff.center_id),
            permissions: staff.permissions.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.scope == CenterScope::All
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.is_admin() || self.permissions.contains(&permission)
    }

    pub fn require(&self, permission: Permission) -> Result<(), StaffError> {
        if self.has(permission) {
            Ok(())
        } else {
            Err(StaffError::MissingPermission(permission))
        }
    }

    /// Center an action applies to. Staff act on their own center; admins
    /// name one explicitly.
    pub fn target_center(&self, requested: Option<Uuid>) -> Result<Uuid, StaffError> {
        match (self.scope, requested) {
            (CenterScope::Center(own), Some(other)) if own != other => Err(StaffError::OtherCenter),
            (CenterScope::Center(own), _) => Ok(own),
            (CenterScope::All, Some(center_id)) => Ok(center_id),
            (CenterScope::All, None) => Err(StaffError::CenterRequired),
        }
    }

    /// PostgREST filter restricting rows to the caller's center.
    pub fn center_filter(&self) -> Option<String> {
        match self.scope {
            CenterScope::All => None,
            CenterScope::Center(center_id) => Some(format!("center_id=eq.{}", center_id)),
        }
    }
}

// ==============================================================================
// REQUESTS AND RESPONSES
// ==============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE: u32 = 10_000;

#[derive(Debug, Default, Deserialize)]
pub struct StaffAppointmentQuery {
    /// A status name, or `all`.
    pub status: Option<String>,
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl StaffAppointmentQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).clamp(1, MAX_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    pub fn status_filter(&self) -> Result<Option<AppointmentStatus>, StaffError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| StaffError::InvalidStatus(raw.to_string())),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        Self {
            page,
            limit,
            total,
            total_pages: total.div_ceil(limit.max(1) as usize),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Admins pick the center through `center_id`; staff may omit it.
#[derive(Debug, Default, Deserialize)]
pub struct CenterQuery {
    pub center_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct AppointmentStats {
    pub date: Option<NaiveDate>,
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl AppointmentStats {
    pub fn tally(date: NaiveDate, statuses: impl IntoIterator<Item = AppointmentStatus>) -> Self {
        let mut stats = Self {
            date: Some(date),
            ..Self::default()
        };

        for status in statuses {
            stats.total += 1;
            match status {
                AppointmentStatus::Pending => stats.pending += 1,
                AppointmentStatus::Confirmed => stats.confirmed += 1,
                AppointmentStatus::InProgress => stats.in_progress += 1,
                AppointmentStatus::Completed => stats.completed += 1,
                AppointmentStatus::Cancelled => stats.cancelled += 1,
            }
        }

        stats
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum StaffError {
    #[error("Access denied. Staff privileges required.")]
    NotStaff,

    #[error("Access denied. Staff assignment not found or inactive.")]
    NoAssignment,

    #[error("Access denied. Permission '{0}' required.")]
    MissingPermission(Permission),

    #[error("Access denied. You can only manage your own center.")]
    OtherCenter,

    #[error("center_id is required for administrators")]
    CenterRequired,

    #[error("Appointment not found or not accessible")]
    AppointmentNotFound,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Appointment status was changed by someone else; reload and try again")]
    StatusChanged,

    #[error(transparent)]
    Appointment(#[from] AppointmentError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for StaffError {
    fn from(err: anyhow::Error) -> Self {
        StaffError::DatabaseError(err.to_string())
    }
}

impl From<StaffError> for AppError {
    fn from(err: StaffError) -> Self {
        match err {
            StaffError::NotStaff
            | StaffError::NoAssignment
            | StaffError::MissingPermission(_)
            | StaffError::OtherCenter => AppError::Forbidden(err.to_string()),
            StaffError::CenterRequired => AppError::BadRequest(err.to_string()),
            StaffError::AppointmentNotFound => AppError::NotFound(err.to_string()),
            StaffError::InvalidStatus(_) => AppError::BadRequest(err.to_string()),
            StaffError::StatusChanged => AppError::Conflict(err.to_string()),
            StaffError::Appointment(inner) => inner.into(),
            StaffError::Catalog(inner) => inner.into(),
            StaffError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
