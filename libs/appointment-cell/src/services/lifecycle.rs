use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Appointment, AppointmentError, AppointmentStatus, StatusChange};

pub struct AppointmentLifecycleService;

impl Default for AppointmentLifecycleService {
    fn default() -> Self {
        Self::new()
    }
}

impl AppointmentLifecycleService {
    pub fn new() -> Self {
        Self
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current_status: AppointmentStatus,
        new_status: AppointmentStatus,
    ) -> Result<(), AppointmentError> {
        debug!("Validating status transition from {} to {}", current_status, new_status);

        if !self.get_valid_transitions(current_status).contains(&new_status) {
            warn!("Invalid status transition attempted: {} -> {}", current_status, new_status);
            return Err(AppointmentError::InvalidStatusTransition {
                from: current_status,
                to: new_status,
            });
        }

        Ok(())
    }

    pub fn get_valid_transitions(&self, current_status: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current_status {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::InProgress,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::InProgress => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Cancelled => vec![],
        }
    }

    pub fn is_terminal(&self, status: AppointmentStatus) -> bool {
        self.get_valid_transitions(status).is_empty()
    }

    /// Minutes from the latest move into `in_progress` until `completed_at`.
    pub fn processing_minutes(&self, history: &[StatusChange], completed_at: DateTime<Utc>) -> Option<i64> {
        history
            .iter()
            .rev()
            .find(|change| change.status == AppointmentStatus::InProgress)
            .map(|started| (completed_at - started.changed_at).num_minutes().max(0))
    }

    /// Validate a staff-driven transition and build the PATCH body that records it.
    pub fn transition_patch(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        changed_by: Option<Uuid>,
        reason: Option<String>,
        processing_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Value, AppointmentError> {
        self.validate_status_transition(appointment.status, new_status)?;

        let mut history = appointment.status_history.clone();
        history.push(StatusChange {
            status: new_status,
            changed_at: now,
            changed_by,
            reason,
        });

        let mut patch = json!({
            "status": new_status,
            "status_history": history,
            "updated_at": now.to_rfc3339(),
        });

        if let Some(notes) = processing_notes {
            patch["processing_notes"] = json!(notes);
        }

        if new_status == AppointmentStatus::Completed {
            patch["completed_at"] = json!(now.to_rfc3339());
            patch["actual_duration_minutes"] = json!(self.processing_minutes(&history, now));
        }

        Ok(patch)
    }
}
