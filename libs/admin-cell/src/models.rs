use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use shared_models::error::AppError;
use shared_models::profile::{ApprovalStatus, Profile};
use staff_cell::models::Staff;

// ==============================================================================
// STAFF APPROVAL
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct StaffListQuery {
    /// pending, approved, rejected or all; pending when absent.
    pub status: Option<String>,
}

impl StaffListQuery {
    pub fn approval_filter(&self) -> Result<Option<ApprovalStatus>, AdminError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") | Some("pending") => Ok(Some(ApprovalStatus::Pending)),
            Some("approved") => Ok(Some(ApprovalStatus::Approved)),
            Some("rejected") => Ok(Some(ApprovalStatus::Rejected)),
            Some("all") => Ok(None),
            Some(other) => Err(AdminError::ValidationError(format!(
                "Unknown approval status: {}",
                other
            ))),
        }
    }
}

/// A staff profile with its center assignment, if one was registered.
#[derive(Debug, Serialize)]
pub struct StaffApplication {
    #[serde(flatten)]
    pub profile: Profile,
    pub assignment: Option<Staff>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveStaffRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectStaffRequest {
    pub reason: Option<String>,
}

// ==============================================================================
// HOLIDAYS
// ==============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct HolidayQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

impl HolidayQuery {
    /// Half-open date range of the requested month, when both parts are given.
    pub fn month_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>, AdminError> {
        let (Some(month), Some(year)) = (self.month, self.year) else {
            return Ok(None);
        };

        let invalid = || AdminError::ValidationError("Invalid month or year".to_string());
        let start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let end = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        Ok(Some((start, end)))
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateHolidayRequest {
    pub date: Option<NaiveDate>,
    pub reason: Option<String>,
}

// ==============================================================================
// SYSTEM SETTINGS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

/// The single platform-wide settings row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub office_hours: String,
    pub address: String,

    pub max_appointments_per_day: u32,
    pub appointment_advance_days: u32,
    pub appointment_slot_duration: u32,
    pub working_hours: WorkingHours,
    pub working_days: Vec<String>,

    pub maintenance_mode: bool,
    pub maintenance_message: String,
    pub estimated_downtime: Option<String>,
    pub allow_user_registration: bool,
    pub require_email_verification: bool,
    pub allow_google_sign_in: bool,

    pub enable_center_ratings: bool,
    pub enable_appointment_rescheduling: bool,
    pub enable_document_upload: bool,
    pub enable_chat_support: bool,

    pub welcome_message: String,
    pub footer_text: String,
    pub privacy_policy_url: String,
    pub terms_of_service_url: String,

    pub last_updated_by: Option<Uuid>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub const DEFAULT_MAINTENANCE_MESSAGE: &str = "System is under maintenance. Please try again later.";

impl Default for SystemSettings {
    fn default() -> Self {
        Self {
            site_name: "Akshaya Services".to_string(),
            site_description: "Kerala Government Services Portal".to_string(),
            contact_email: "admin@akshaya.gov.in".to_string(),
            contact_phone: "+91-471-1234567".to_string(),
            office_hours: "9:00 AM - 5:00 PM".to_string(),
            address: "Akshaya Service Center, Thiruvananthapuram, Kerala".to_string(),
            max_appointments_per_day: 50,
            appointment_advance_days: 3,
            appointment_slot_duration: 30,
            working_hours: WorkingHours {
                start: "09:00".to_string(),
                end: "17:00".to_string(),
            },
            working_days: ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday"]
                .iter()
                .map(|d| d.to_string())
                .collect(),
            maintenance_mode: false,
            maintenance_message: DEFAULT_MAINTENANCE_MESSAGE.to_string(),
            estimated_downtime: None,
            allow_user_registration: true,
            require_email_verification: false,
            allow_google_sign_in: true,
            enable_center_ratings: true,
            enable_appointment_rescheduling: true,
            enable_document_upload: true,
            enable_chat_support: false,
            welcome_message: "Welcome to Akshaya Services Portal".to_string(),
            footer_text: "© 2024 Government of Kerala. All rights reserved.".to_string(),
            privacy_policy_url: "/privacy-policy".to_string(),
            terms_of_service_url: "/terms-of-service".to_string(),
            last_updated_by: None,
            updated_at: None,
        }
    }
}

impl SystemSettings {
    pub fn validate(&self) -> Result<(), AdminError> {
        if !(1..=1000).contains(&self.max_appointments_per_day) {
            return Err(AdminError::InvalidSettings(
                "max_appointments_per_day must be between 1 and 1000".to_string(),
            ));
        }
        if !(1..=90).contains(&self.appointment_advance_days) {
            return Err(AdminError::InvalidSettings(
                "appointment_advance_days must be between 1 and 90".to_string(),
            ));
        }
        if !(15..=120).contains(&self.appointment_slot_duration) {
            return Err(AdminError::InvalidSettings(
                "appointment_slot_duration must be between 15 and 120".to_string(),
            ));
        }
        Ok(())
    }

    pub fn maintenance_message(&self) -> &str {
        if self.maintenance_message.trim().is_empty() {
            DEFAULT_MAINTENANCE_MESSAGE
        } else {
            &self.maintenance_message
        }
    }
}

/// Settings safe to show without signing in.
#[derive(Debug, Serialize)]
pub struct PublicSettings {
    pub site_name: String,
    pub site_description: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub office_hours: String,
    pub address: String,
    pub maintenance_mode: bool,
    pub maintenance_message: String,
    pub allow_user_registration: bool,
    pub allow_google_sign_in: bool,
    pub welcome_message: String,
    pub footer_text: String,
    pub working_hours: WorkingHours,
    pub working_days: Vec<String>,
    pub appointment_advance_days: u32,
    pub enable_center_ratings: bool,
    pub enable_appointment_rescheduling: bool,
    pub enable_document_upload: bool,
    pub enable_chat_support: bool,
    pub privacy_policy_url: String,
    pub terms_of_service_url: String,
}

impl From<SystemSettings> for PublicSettings {
    fn from(s: SystemSettings) -> Self {
        Self {
            site_name: s.site_name,
            site_description: s.site_description,
            contact_email: s.contact_email,
            contact_phone: s.contact_phone,
            office_hours: s.office_hours,
            address: s.address,
            maintenance_mode: s.maintenance_mode,
            maintenance_message: s.maintenance_message,
            allow_user_registration: s.allow_user_registration,
            allow_google_sign_in: s.allow_google_sign_in,
            welcome_message: s.welcome_message,
            footer_text: s.footer_text,
            working_hours: s.working_hours,
            working_days: s.working_days,
            appointment_advance_days: s.appointment_advance_days,
            enable_center_ratings: s.enable_center_ratings,
            enable_appointment_rescheduling: s.enable_appointment_rescheduling,
            enable_document_upload: s.enable_document_upload,
            enable_chat_support: s.enable_chat_support,
            privacy_policy_url: s.privacy_policy_url,
            terms_of_service_url: s.terms_of_service_url,
        }
    }
}

// ==============================================================================
// PAGINATION
// ==============================================================================

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MAX_PAGE: u32 = 10_000;

fn page_of(page: Option<u32>) -> u32 {
    page.unwrap_or(1).clamp(1, MAX_PAGE)
}

fn limit_of(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub total_pages: usize,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: usize) -> Self {
        let total_pages = total.div_ceil(limit.max(1) as usize);
        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: (page as usize) < total_pages,
            has_prev: page > 1,
        }
    }

    pub fn offset(page: u32, limit: u32) -> u32 {
        (page - 1) * limit
    }
}

// ==============================================================================
// USERS
// ==============================================================================

/// Profile roles as stored; citizens are `user`.
pub const PROFILE_ROLES: [&str; 3] = ["user", "staff", "admin"];

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl UserListQuery {
    pub fn page(&self) -> u32 {
        page_of(self.page)
    }

    pub fn limit(&self) -> u32 {
        limit_of(self.limit)
    }

    pub fn role_filter(&self) -> Result<Option<&str>, AdminError> {
        match self.role.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(role) if PROFILE_ROLES.contains(&role) => Ok(Some(role)),
            Some(other) => Err(AdminError::ValidationError(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UserStatusRequest {
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UserRoleRequest {
    pub role: Option<String>,
}

impl UserRoleRequest {
    /// Staff accounts go through approval, so only these two are assignable.
    pub fn target(&self, admin_id: Uuid, user_id: Uuid) -> Result<&str, AdminError> {
        let role = match self.role.as_deref().map(str::trim) {
            Some(role @ ("user" | "admin")) => role,
            _ => return Err(AdminError::InvalidRole),
        };
        if admin_id == user_id && role == "user" {
            return Err(AdminError::SelfDemotion);
        }
        Ok(role)
    }
}

// ==============================================================================
// MONITORING
// ==============================================================================

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_staff: usize,
    pub pending_staff: usize,
    pub total_services: usize,
    pub total_centers: usize,
    pub total_appointments: usize,
    pub pending_appointments: usize,
    pub total_news: usize,
    pub published_news: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppointmentListQuery {
    pub status: Option<AppointmentStatus>,
    #[serde(alias = "center")]
    pub center_id: Option<Uuid>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl AppointmentListQuery {
    pub fn page(&self) -> u32 {
        page_of(self.page)
    }

    pub fn limit(&self) -> u32 {
        limit_of(self.limit)
    }

    pub fn filter(&self) -> String {
        let mut filter = Vec::new();
        if let Some(status) = self.status {
            filter.push(format!("status=eq.{}", status.as_str()));
        }
        if let Some(center_id) = self.center_id {
            filter.push(format!("center_id=eq.{}", center_id));
        }
        filter.join("&")
    }
}

/// Id, name and city; enough to label monitoring rows.
#[derive(Debug, Clone, Deserialize)]
pub struct CenterLabel {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub address: Option<CityOnly>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CityOnly {
    #[serde(default)]
    pub city: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceLabel {
    pub id: Uuid,
    pub name: String,
}

pub const UNKNOWN_CENTER: &str = "Unknown Center";
pub const UNKNOWN_SERVICE: &str = "Unknown Service";

#[derive(Debug, Default)]
pub struct Labels {
    pub centers: HashMap<Uuid, CenterLabel>,
    pub services: HashMap<Uuid, String>,
}

impl Labels {
    pub fn center_name(&self, id: Uuid) -> &str {
        self.centers.get(&id).map(|c| c.name.as_str()).unwrap_or(UNKNOWN_CENTER)
    }

    pub fn center_city(&self, id: Uuid) -> &str {
        self.centers
            .get(&id)
            .and_then(|c| c.address.as_ref())
            .map(|a| a.city.as_str())
            .filter(|city| !city.is_empty())
            .unwrap_or("Unknown")
    }

    pub fn service_name(&self, id: Uuid) -> &str {
        self.services.get(&id).map(String::as_str).unwrap_or(UNKNOWN_SERVICE)
    }
}

/// Appointment row with the names an admin reads.
#[derive(Debug, Serialize)]
pub struct MonitoredAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub center_name: String,
    pub service_name: String,
}

/// Appointment ids on the page, grouped by center name.
pub fn group_by_center(rows: &[MonitoredAppointment]) -> BTreeMap<String, Vec<Uuid>> {
    let mut groups: BTreeMap<String, Vec<Uuid>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.center_name.clone()).or_default().push(row.appointment.id);
    }
    groups
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Today,
    Week,
    #[default]
    Month,
}

impl StatsPeriod {
    /// Half-open range of appointment dates; every period ends tomorrow.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let end = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let start = match self {
            StatsPeriod::Today => Some(today),
            StatsPeriod::Week => today.checked_sub_days(Days::new(7)),
            StatsPeriod::Month => today.checked_sub_months(Months::new(1)),
        };
        (start.unwrap_or(today), end)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// Anything unrecognised reads as a month.
    pub period: Option<String>,
}

impl StatsQuery {
    pub fn period(&self) -> StatsPeriod {
        match self.period.as_deref().map(str::trim) {
            Some("today") => StatsPeriod::Today,
            Some("week") => StatsPeriod::Week,
            _ => StatsPeriod::Month,
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub confirmed: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub fn add(&mut self, status: AppointmentStatus) {
        let slot = match status {
            AppointmentStatus::Pending => &mut self.pending,
            AppointmentStatus::Confirmed => &mut self.confirmed,
            AppointmentStatus::InProgress => &mut self.in_progress,
            AppointmentStatus::Completed => &mut self.completed,
            AppointmentStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct CenterStats {
    pub total: usize,
    #[serde(flatten)]
    pub statuses: StatusCounts,
    pub location: String,
}

#[derive(Debug, Serialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct AppointmentStats {
    pub period: StatsPeriod,
    pub date_range: DateRange,
    pub total_appointments: usize,
    pub center_stats: BTreeMap<String, CenterStats>,
    pub service_stats: BTreeMap<String, usize>,
    pub status_stats: StatusCounts,
}

impl AppointmentStats {
    pub fn tally(
        period: StatsPeriod,
        (start_date, end_date): (NaiveDate, NaiveDate),
        appointments: &[Appointment],
        labels: &Labels,
    ) -> Self {
        let mut center_stats: BTreeMap<String, CenterStats> = BTreeMap::new();
        let mut service_stats: BTreeMap<String, usize> = BTreeMap::new();
        let mut status_stats = StatusCounts::default();

        for appointment in appointments {
            let center = center_stats
                .entry(labels.center_name(appointment.center_id).to_string())
                .or_insert_with(|| CenterStats {
                    location: labels.center_city(appointment.center_id).to_string(),
                    ..Default::default()
                });
            center.total += 1;
            center.statuses.add(appointment.status);

            *service_stats
                .entry(labels.service_name(appointment.service_id).to_string())
                .or_default() += 1;
            status_stats.add(appointment.status);
        }

        Self {
            period,
            date_range: DateRange { start_date, end_date },
            total_appointments: appointments.len(),
            center_stats,
            service_stats,
            status_stats,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Staff profile not found")]
    StaffNotFound,

    #[error("Staff application is already {0}")]
    NotPending(&'static str),

    #[error("Holiday already exists for this date")]
    HolidayExists,

    #[error("Holiday not found")]
    HolidayNotFound,

    #[error("{0}")]
    InvalidSettings(String),

    #[error("User not found")]
    UserNotFound,

    #[error("Invalid role. Must be \"user\" or \"admin\"")]
    InvalidRole,

    #[error("You cannot demote yourself from admin")]
    SelfDemotion,

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AdminError {
    fn from(err: anyhow::Error) -> Self {
        AdminError::DatabaseError(err.to_string())
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::StaffNotFound | AdminError::HolidayNotFound | AdminError::UserNotFound => {
                AppError::NotFound(err.to_string())
            }
            AdminError::NotPending(_) => AppError::Conflict(err.to_string()),
            AdminError::HolidayExists
            | AdminError::InvalidRole
            | AdminError::SelfDemotion
            | AdminError::InvalidSettings(_)
            | AdminError::ValidationError(_) => AppError::BadRequest(err.to_string()),
            AdminError::DatabaseError(msg) => AppError::Database(msg),
        }
    }
}
