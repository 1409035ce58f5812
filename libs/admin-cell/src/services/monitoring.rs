use std::collections::BTreeSet;

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use appointment_cell::models::Appointment;
use appointment_cell::services::CenterClock;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{
    AdminError, AppointmentListQuery, AppointmentStats, CenterLabel, DashboardStats, Labels,
    MonitoredAppointment, Pagination, ServiceLabel, StatsPeriod,
};

/// Read-only platform overview for admins.
pub struct MonitoringService {
    supabase: SupabaseClient,
    clock: CenterClock,
}

impl MonitoringService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            clock: CenterClock::from_config(config),
        }
    }

    /// Row count of `table` under `filter`, fetching ids only.
    async fn count(&self, table: &str, filter: &str, auth_token: &str) -> Result<usize, AdminError> {
        let mut path = format!("/rest/v1/{}?select=id", table);
        if !filter.is_empty() {
            path.push('&');
            path.push_str(filter);
        }
        let ids: Vec<Value> = self.supabase.select(&path, Some(auth_token)).await?;
        Ok(ids.len())
    }

    pub async fn dashboard(&self, auth_token: &str) -> Result<DashboardStats, AdminError> {
        Ok(DashboardStats {
            total_users: self.count("profiles", "role=eq.user", auth_token).await?,
            total_staff: self.count("profiles", "role=eq.staff", auth_token).await?,
            pending_staff: self
                .count("profiles", "role=eq.staff&approval_status=eq.pending", auth_token)
                .await?,
            total_services: self.count("services", "", auth_token).await?,
            total_centers: self.count("centers", "status=eq.active", auth_token).await?,
            total_appointments: self.count("appointments", "", auth_token).await?,
            pending_appointments: self.count("appointments", "status=eq.pending", auth_token).await?,
            total_news: self.count("news", "", auth_token).await?,
            published_news: self.count("news", "is_published=eq.true", auth_token).await?,
        })
    }

    /// Names of the centers and services the given appointments refer to.
    async fn labels(&self, appointments: &[Appointment], auth_token: &str) -> Result<Labels, AdminError> {
        let mut labels = Labels::default();
        if appointments.is_empty() {
            return Ok(labels);
        }

        let center_ids: BTreeSet<Uuid> = appointments.iter().map(|a| a.center_id).collect();
        let service_ids: BTreeSet<Uuid> = appointments.iter().map(|a| a.service_id).collect();
        let id_list = |ids: &BTreeSet<Uuid>| ids.iter().map(Uuid::to_string).collect::<Vec<_>>().join(",");

        let path = format!("/rest/v1/centers?select=id,name,address&id=in.({})", id_list(&center_ids));
        let centers: Vec<CenterLabel> = self.supabase.select(&path, Some(auth_token)).await?;
        labels.centers = centers.into_iter().map(|c| (c.id, c)).collect();

        let path = format!("/rest/v1/services?select=id,name&id=in.({})", id_list(&service_ids));
        let services: Vec<ServiceLabel> = self.supabase.select(&path, Some(auth_token)).await?;
        labels.services = services.into_iter().map(|s| (s.id, s.name)).collect();

        Ok(labels)
    }

    pub async fn appointments(
        &self,
        query: &AppointmentListQuery,
        auth_token: &str,
    ) -> Result<(Vec<MonitoredAppointment>, Pagination), AdminError> {
        let filter = query.filter();
        let total = self.count("appointments", &filter, auth_token).await?;

        let (page, limit) = (query.page(), query.limit());
        let mut path = format!(
            "/rest/v1/appointments?order=created_at.desc&limit={}&offset={}",
            limit,
            Pagination::offset(page, limit)
        );
        if !filter.is_empty() {
            path.push('&');
            path.push_str(&filter);
        }
        let appointments: Vec<Appointment> = self.supabase.select(&path, Some(auth_token)).await?;
        let labels = self.labels(&appointments, auth_token).await?;

        let rows = appointments
            .into_iter()
            .map(|appointment| MonitoredAppointment {
                center_name: labels.center_name(appointment.center_id).to_string(),
                service_name: labels.service_name(appointment.service_id).to_string(),
                appointment,
            })
            .collect();

        Ok((rows, Pagination::new(page, limit, total)))
    }

    pub async fn appointment_stats(
        &self,
        period: StatsPeriod,
        auth_token: &str,
    ) -> Result<AppointmentStats, AdminError> {
        let (start, end) = period.range(self.clock.today());
        let path = format!(
            "/rest/v1/appointments?appointment_date=gte.{}&appointment_date=lt.{}",
            start, end
        );
        let appointments: Vec<Appointment> = self.supabase.select(&path, Some(auth_token)).await?;
        let labels = self.labels(&appointments, auth_token).await?;

        debug!("Tallying {} appointments from {} to {}", appointments.len(), start, end);
        Ok(AppointmentStats::tally(period, (start, end), &appointments, &labels))
    }
}
