use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use catalog_cell::models::CatalogError;
use catalog_cell::services::{documents, CenterDirectory, ServiceCatalog};
use shared_config::AppConfig;
use shared_database::supabase::{is_unique_violation, SupabaseClient};

use crate::models::{
    Appointment, AppointmentError, AppointmentStatus, AppointmentView, BookAppointmentRequest,
    BookingRules, PaymentInfo, RescheduleAppointmentRequest, SlotAvailability, StatusChange,
    TimeSlot, UpdateAppointmentRequest, ACTIVE_STATUS_FILTER,
};
use crate::services::calendar::{CalendarService, CenterClock};
use crate::services::slots;

#[derive(Debug, Deserialize)]
struct BookedSlot {
    id: Uuid,
    time_slot: TimeSlot,
}

pub struct AppointmentBookingService {
    supabase: SupabaseClient,
    catalog: ServiceCatalog,
    centers: CenterDirectory,
    calendar: CalendarService,
    clock: CenterClock,
    rules: BookingRules,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
            catalog: ServiceCatalog::new(config),
            centers: CenterDirectory::new(config),
            calendar: CalendarService::new(config),
            clock: CenterClock::from_config(config),
            rules: BookingRules::default(),
        }
    }

    pub fn with_rules(config: &AppConfig, rules: BookingRules) -> Self {
        Self {
            rules,
            ..Self::new(config)
        }
    }

    pub fn rules(&self) -> &BookingRules {
        &self.rules
    }

    pub fn clock(&self) -> CenterClock {
        self.clock
    }

    pub fn view(&self, appointment: Appointment) -> AppointmentView {
        let now = self.clock.now();
        let can_modify = slots::can_modify(&appointment, now, &self.rules);
        let can_reschedule = slots::can_reschedule(&appointment, now, &self.rules);

        AppointmentView {
            appointment,
            can_edit: can_modify,
            can_cancel: can_modify,
            can_reschedule,
        }
    }

    // ==========================================================================
    // QUERIES
    // ==========================================================================

    pub async fn list_user_appointments(&self, user_id: Uuid, auth_token: &str) -> Result<Vec<AppointmentView>, AppointmentError> {
        debug!("Listing appointments for user {}", user_id);

        let path = format!(
            "/rest/v1/appointments?user_id=eq.{}&order=created_at.desc",
            user_id
        );
        let appointments: Vec<Appointment> = self.supabase.select(&path, Some(auth_token)).await?;

        Ok(appointments.into_iter().map(|a| self.view(a)).collect())
    }

    pub async fn get_appointment(&self, appointment_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Appointment owned by `user_id`; other users' appointments read as missing.
    pub async fn get_user_appointment(&self, appointment_id: Uuid, user_id: Uuid, auth_token: &str) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&user_id=eq.{}", appointment_id, user_id);

        self.supabase
            .select_one(&path, Some(auth_token))
            .await?
            .ok_or(AppointmentError::NotFound)
    }

    /// Appointment already booked with this gateway payment, if any.
    pub async fn find_by_payment_id(&self, payment_id: &str, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?payment->>payment_id=eq.{}",
            urlencoding::encode(payment_id)
        );
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Appointment whose payment belongs to this gateway order, if any.
    pub async fn find_by_order_id(&self, order_id: &str, auth_token: &str) -> Result<Option<Appointment>, AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?payment->>order_id=eq.{}",
            urlencoding::encode(order_id)
        );
        Ok(self.supabase.select_one(&path, Some(auth_token)).await?)
    }

    /// Overwrite the payment snapshot of an appointment.
    pub async fn record_payment(
        &self,
        appointment_id: Uuid,
        payment: &PaymentInfo,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let patch = json!({
            "payment": payment,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Appointment> = self.supabase.update(&path, Some(auth_token), patch).await?;
        debug!("Recorded payment state {:?} on appointment {}", payment.status, appointment_id);

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }

    pub async fn available_slots(
        &self,
        date: NaiveDate,
        center_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<SlotAvailability, AppointmentError> {
        if let Some(closure) = self.calendar.closure_for(date, Some(auth_token)).await? {
            return Ok(SlotAvailability {
                date,
                available_slots: vec![],
                booked_slots: vec![],
                is_holiday: true,
                reason: Some(closure.reason().to_string()),
            });
        }

        let mut path = format!(
            "/rest/v1/appointments?select=id,time_slot&appointment_date=eq.{}&status={}",
            date, ACTIVE_STATUS_FILTER
        );
        if let Some(center_id) = center_id {
            path.push_str(&format!("&center_id=eq.{}", center_id));
        }

        let booked: Vec<BookedSlot> = self.supabase.select(&path, Some(auth_token)).await?;
        let booked: BTreeSet<TimeSlot> = booked.into_iter().map(|b| b.time_slot).collect();

        let available_slots = slots::all_slots(&self.rules)
            .into_iter()
            .filter(|slot| !booked.contains(slot))
            .collect();

        Ok(SlotAvailability {
            date,
            available_slots,
            booked_slots: booked.into_iter().collect(),
            is_holiday: false,
            reason: None,
        })
    }

    // ==========================================================================
    // BOOKING
    // ==========================================================================

    /// Book directly, without an online payment.
    pub async fn book_appointment(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.book(user_id, request, PaymentInfo::default(), auth_token).await
    }

    /// Book after a verified gateway payment.
    pub async fn book_with_payment(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
        payment: PaymentInfo,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        self.book(user_id, request, payment, auth_token).await
    }

    async fn book(
        &self,
        user_id: Uuid,
        request: BookAppointmentRequest,
        payment: PaymentInfo,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        debug!(
            "Booking {} at center {} on {} {} for user {}",
            request.service_id, request.center_id, request.appointment_date, request.time_slot, user_id
        );

        let service = self.catalog
            .get_active_service(request.service_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                CatalogError::ServiceNotFound => AppointmentError::ServiceNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        let center = self.centers
            .get_active_center(request.center_id, Some(auth_token))
            .await
            .map_err(|e| match e {
                CatalogError::CenterNotFound => AppointmentError::CenterNotFound,
                other => AppointmentError::DatabaseError(other.to_string()),
            })?;

        if !center.offers(service.id) {
            return Err(AppointmentError::ServiceNotOffered);
        }

        let now = self.clock.now();
        slots::check_booking_window(request.appointment_date, request.time_slot, now, &self.rules)?;
        slots::validate_slot(request.time_slot, &self.rules)?;
        self.calendar.ensure_open(request.appointment_date, Some(auth_token)).await?;

        if !request.selected_documents.is_empty() {
            let validation = documents::validate_selection(&service, &request.selected_documents);
            if !validation.meets_minimum {
                return Err(AppointmentError::InsufficientDocuments {
                    required: validation.minimum_required,
                    selected: validation.selected,
                });
            }
        }

        self.ensure_slot_free(
            center.id,
            request.appointment_date,
            request.time_slot,
            Some(center.max_appointments_per_day),
            None,
            auth_token,
        ).await?;

        let created_at = Utc::now();
        let history = vec![StatusChange {
            status: AppointmentStatus::Confirmed,
            changed_at: created_at,
            changed_by: Some(user_id),
            reason: Some("Booked".to_string()),
        }];

        let body = json!({
            "user_id": user_id,
            "service_id": service.id,
            "center_id": center.id,
            "appointment_date": request.appointment_date,
            "time_slot": request.time_slot,
            "slot_start": slot_start(request.time_slot),
            "status": AppointmentStatus::Confirmed,
            "notes": request.notes,
            "selected_documents": request.selected_documents,
            "payment": payment,
            "status_history": history,
            "created_at": created_at.to_rfc3339(),
            "updated_at": created_at.to_rfc3339(),
        });

        let appointment: Appointment = self.supabase
            .insert("appointments", Some(auth_token), body)
            .await
            .map_err(map_write_error)?;

        info!(
            "Appointment {} booked for {} {} at center {}",
            appointment.id, appointment.appointment_date, appointment.time_slot, appointment.center_id
        );

        Ok(appointment)
    }

    // ==========================================================================
    // CHANGES BY THE OWNER
    // ==========================================================================

    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        request: UpdateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_user_appointment(appointment_id, user_id, auth_token).await?;
        let now = self.clock.now();
        slots::ensure_modifiable(&appointment, now, &self.rules, "modified")?;

        let mut patch = json!({ "updated_at": Utc::now().to_rfc3339() });

        if request.appointment_date.is_some() || request.time_slot.is_some() {
            let date = request.appointment_date.unwrap_or(appointment.appointment_date);
            let slot = request.time_slot.unwrap_or(appointment.time_slot);

            slots::check_booking_window(date, slot, now, &self.rules)?;
            slots::validate_slot(slot, &self.rules)?;
            self.calendar.ensure_open(date, Some(auth_token)).await?;

            let capacity = if date != appointment.appointment_date {
                let center = self.centers
                    .get_center(appointment.center_id, Some(auth_token))
                    .await
                    .map_err(|e| match e {
                        CatalogError::CenterNotFound => AppointmentError::CenterNotFound,
                        other => AppointmentError::DatabaseError(other.to_string()),
                    })?;
                Some(center.max_appointments_per_day)
            } else {
                None
            };

            self.ensure_slot_free(appointment.center_id, date, slot, capacity, Some(appointment.id), auth_token)
                .await?;

            patch["appointment_date"] = json!(date);
            patch["time_slot"] = json!(slot);
            patch["slot_start"] = json!(slot_start(slot));
        }

        if let Some(notes) = request.notes {
            patch["notes"] = json!(notes);
        }

        let updated = self.write_patch(appointment.id, user_id, patch, auth_token).await?;
        info!("Appointment {} updated by its owner", updated.id);
        Ok(updated)
    }

    /// Move an appointment that is about to start, or already missed, to a new slot.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let (date, slot) = match (request.appointment_date, request.time_slot) {
            (Some(date), Some(slot)) => (date, slot),
            _ => {
                return Err(AppointmentError::ValidationError(
                    "New appointment date and time slot are required".to_string(),
                ))
            }
        };

        let appointment = self.get_user_appointment(appointment_id, user_id, auth_token).await?;
        if !appointment.status.is_active() {
            return Err(AppointmentError::CannotModify(
                "Appointment not found or cannot be rescheduled".to_string(),
            ));
        }

        let now = self.clock.now();
        if !slots::can_reschedule(&appointment, now, &self.rules) {
            return Err(AppointmentError::CannotModify(format!(
                "Use standard update; appointment is editable (more than {} hours away)",
                self.rules.reschedule_window_hours
            )));
        }

        if date.and_time(slot.time()) <= now {
            return Err(AppointmentError::OutsideBookingWindow(
                "Cannot reschedule to a time that has already passed".to_string(),
            ));
        }

        slots::validate_slot(slot, &self.rules)?;
        self.calendar.ensure_open(date, Some(auth_token)).await?;
        self.ensure_slot_free(appointment.center_id, date, slot, None, Some(appointment.id), auth_token)
            .await?;

        let mut history = appointment.status_history.clone();
        history.push(StatusChange {
            status: appointment.status,
            changed_at: Utc::now(),
            changed_by: Some(user_id),
            reason: Some(format!(
                "Rescheduled from {} {}",
                appointment.appointment_date, appointment.time_slot
            )),
        });

        let patch = json!({
            "appointment_date": date,
            "time_slot": slot,
            "slot_start": slot_start(slot),
            "status_history": history,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let updated = self.write_patch(appointment.id, user_id, patch, auth_token).await?;
        info!("Appointment {} rescheduled to {} {}", updated.id, date, slot);
        Ok(updated)
    }

    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let appointment = self.get_user_appointment(appointment_id, user_id, auth_token).await?;
        slots::ensure_modifiable(&appointment, self.clock.now(), &self.rules, "cancelled")?;

        let mut history = appointment.status_history.clone();
        history.push(StatusChange {
            status: AppointmentStatus::Cancelled,
            changed_at: Utc::now(),
            changed_by: Some(user_id),
            reason: Some(reason.unwrap_or_else(|| "Cancelled by citizen".to_string())),
        });

        let patch = json!({
            "status": AppointmentStatus::Cancelled,
            "status_history": history,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let cancelled = self.write_patch(appointment.id, user_id, patch, auth_token).await?;
        info!("Appointment {} cancelled by its owner", cancelled.id);
        Ok(cancelled)
    }

    // ==========================================================================
    // HELPERS
    // ==========================================================================

    /// Daily capacity and slot exclusivity for one center, from a single query
    /// over its active bookings on `date`.
    async fn ensure_slot_free(
        &self,
        center_id: Uuid,
        date: NaiveDate,
        slot: TimeSlot,
        capacity: Option<u32>,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<(), AppointmentError> {
        let path = format!(
            "/rest/v1/appointments?select=id,time_slot&center_id=eq.{}&appointment_date=eq.{}&status={}",
            center_id, date, ACTIVE_STATUS_FILTER
        );
        let booked: Vec<BookedSlot> = self.supabase.select(&path, Some(auth_token)).await?;
        let others: Vec<&BookedSlot> = booked.iter().filter(|b| Some(b.id) != exclude).collect();

        if let Some(capacity) = capacity {
            if others.len() >= capacity as usize {
                warn!("Center {} is at capacity ({}) on {}", center_id, capacity, date);
                return Err(AppointmentError::CenterFullyBooked);
            }
        }

        if others.iter().any(|b| b.time_slot == slot) {
            warn!("Slot {} on {} at center {} is already booked", slot, date, center_id);
            return Err(AppointmentError::SlotTaken);
        }

        Ok(())
    }

    async fn write_patch(
        &self,
        appointment_id: Uuid,
        user_id: Uuid,
        patch: serde_json::Value,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        let path = format!("/rest/v1/appointments?id=eq.{}&user_id=eq.{}", appointment_id, user_id);

        let rows: Vec<Appointment> = self.supabase
            .update(&path, Some(auth_token), patch)
            .await
            .map_err(map_write_error)?;

        rows.into_iter().next().ok_or(AppointmentError::NotFound)
    }
}

/// Sortable `HH:MM:SS` copy of the slot; the display form does not order by time.
fn slot_start(slot: TimeSlot) -> String {
    slot.time().format("%H:%M:%S").to_string()
}

/// A 409 from the partial unique index on active slots means someone else got there first.
fn map_write_error(err: anyhow::Error) -> AppointmentError {
    if is_unique_violation(&err) {
        AppointmentError::SlotTaken
    } else {
        AppointmentError::DatabaseError(err.to_string())
    }
}
