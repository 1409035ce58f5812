use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentStatus};
use appointment_cell::services::calendar::CenterClock;
use appointment_cell::AppointmentLifecycleService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AppointmentStats, Pagination, Permission, StaffAccess, StaffAppointmentQuery, StaffError,
    UpdateStatusRequest,
};

#[derive(Debug, Deserialize)]
struct StatusRow {
    status: AppointmentStatus,
}

/// Appointment queue of a service center as seen by its staff.
pub struct StaffAppointmentService {
    supabase: SupabaseClient,
    lifecycle: AppointmentLifecycleService,
    clock: CenterClock,
}

impl StaffAppointmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            lifecycle: AppointmentLifecycleService::new(),
            clock: CenterClock::from_config(config),
        }
    }

    fn scoped_path(access: &StaffAccess, base: String) -> String {
        match access.center_filter() {
            Some(filter) => format!("{}&{}", base, filter),
            None => base,
        }
    }

    pub async fn list_appointments(
        &self,
        access: &StaffAccess,
        query: &StaffAppointmentQuery,
        auth_token: &str,
    ) -> Result<(Vec<Appointment>, Pagination), StaffError> {
        access.require(Permission::ManageAppointments)?;

        let mut filters = String::new();
        if let Some(status) = query.status_filter()? {
            filters.push_str(&format!("&status=eq.{}", status));
        }
        if let Some(date) = query.date {
            filters.push_str(&format!("&appointment_date=eq.{}", date));
        }

        let count_path = Self::scoped_path(access, format!("/rest/v1/appointments?select=id{}", filters));
        let ids: Vec<serde_json::Value> = self.supabase.select(&count_path, Some(auth_token)).await?;

        let (page, limit) = (query.page(), query.limit());
        let offset = (page - 1) * limit;
        let page_path = Self::scoped_path(
            access,
            format!(
                "/rest/v1/appointments?order=appointment_date.asc,slot_start.asc&limit={}&offset={}{}",
                limit, offset, filters
            ),
        );

        debug!("Listing staff appointments page {} (limit {})", page, limit);
        let mut appointments: Vec<Appointment> = self.supabase.select(&page_path, Some(auth_token)).await?;
        // Rows written before slot_start existed sort as nulls; order them by slot within the day
        appointments.sort_by_key(|a| (a.appointment_date, a.time_slot));

        Ok((appointments, Pagination::new(page, limit, ids.len())))
    }

    pub async fn get_appointment(
        &self,
        access: &StaffAccess,
        appointment_id: Uuid,
        auth_token: &str,
    ) -> Result<Appointment, StaffError> {
        access.require(Permission::ManageAppointments)?;

        let path = Self::scoped_path(access, format!("/rest/v1/appointments?id=eq.{}", appointment_id));
        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(StaffError::AppointmentNotFound)
    }

    /// Move an appointment along its lifecycle and record who did it.
    pub async fn update_status(
        &self,
        access: &StaffAccess,
        appointment_id: Uuid,
        request: UpdateStatusRequest,
        auth_token: &str,
    ) -> Result<Appointment, StaffError> {
        access.require(Permission::UpdateStatus)?;

        let new_status: AppointmentStatus = request
            .status
            .parse()
            .map_err(|_| StaffError::InvalidStatus(request.status.clone()))?;

        let path = Self::scoped_path(access, format!("/rest/v1/appointments?id=eq.{}", appointment_id));
        let appointment: Appointment = self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(StaffError::AppointmentNotFound)?;

        let patch = self.lifecycle.transition_patch(
            &appointment,
            new_status,
            Some(access.user_id),
            request.reason,
            request.notes,
            Utc::now(),
        )?;

        // Only applies if nobody else moved the appointment since it was read
        let guarded = format!("{}&status=eq.{}", path, appointment.status);
        let rows: Vec<Appointment> = self.supabase.update(&guarded, Some(auth_token), patch).await?;
        let Some(updated) = rows.into_iter().next() else {
            warn!("Appointment {} changed while {} was updating it", appointment_id, access.user_id);
            return Err(StaffError::StatusChanged);
        };

        info!(
            "Appointment {} moved from {} to {} by {}",
            updated.id, appointment.status, updated.status, access.user_id
        );
        Ok(updated)
    }

    /// Counts by status for one day, defaulting to today at the center.
    pub async fn stats_summary(
        &self,
        access: &StaffAccess,
        date: Option<NaiveDate>,
        auth_token: &str,
    ) -> Result<AppointmentStats, StaffError> {
        access.require(Permission::ViewAnalytics)?;

        let date = date.unwrap_or_else(|| self.clock.today());
        let path = Self::scoped_path(
            access,
            format!("/rest/v1/appointments?select=status&appointment_date=eq.{}", date),
        );
        let rows: Vec<StatusRow> = self.supabase.select(&path, Some(auth_token)).await?;

        Ok(AppointmentStats::tally(date, rows.into_iter().map(|row| row.status)))
    }
}
