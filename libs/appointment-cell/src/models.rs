use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::InProgress => "in_progress",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    /// Statuses that hold a slot.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Pending | AppointmentStatus::Confirmed)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "in_progress" => Ok(AppointmentStatus::InProgress),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            other => Err(format!("Unknown appointment status: {}", other)),
        }
    }
}

/// PostgREST filter value for slot-holding statuses.
pub const ACTIVE_STATUS_FILTER: &str = "in.(pending,confirmed)";

// ==============================================================================
// TIME SLOTS
// ==============================================================================

/// Time of day an appointment starts. Always serialized in the canonical
/// `"09:30 AM"` form so stored slots compare by string equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeSlot(NaiveTime);

impl TimeSlot {
    pub fn new(time: NaiveTime) -> Self {
        Self(time.with_second(0).and_then(|t| t.with_nanosecond(0)).unwrap_or(time))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%I:%M %p"))
    }
}

impl FromStr for TimeSlot {
    type Err = String;

    /// Accepts `"9:30 am"`, `"09:30 PM"` and 24-hour `"14:00"`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("Invalid time slot: {}", raw);
        let value = raw.trim().to_ascii_uppercase();

        let (clock, meridiem) = if let Some(rest) = value.strip_suffix("AM") {
            (rest.trim_end(), Some(false))
        } else if let Some(rest) = value.strip_suffix("PM") {
            (rest.trim_end(), Some(true))
        } else {
            (value.as_str(), None)
        };

        let (hour, minute) = clock.split_once(':').ok_or_else(invalid)?;
        let digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
        if !digits(hour) || hour.len() > 2 || !digits(minute) || minute.len() != 2 {
            return Err(invalid());
        }

        let hour: u32 = hour.parse().map_err(|_| invalid())?;
        let minute: u32 = minute.parse().map_err(|_| invalid())?;

        let hour = match meridiem {
            Some(pm) => {
                if !(1..=12).contains(&hour) {
                    return Err(invalid());
                }
                hour % 12 + if pm { 12 } else { 0 }
            }
            None => hour,
        };

        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(TimeSlot)
            .ok_or_else(invalid)
    }
}

impl TryFrom<String> for TimeSlot {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeSlot> for String {
    fn from(slot: TimeSlot) -> Self {
        slot.to_string()
    }
}

// ==============================================================================
// PAYMENT SNAPSHOT
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    Refunded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    None,
    Requested,
    Processed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub at: DateTime<Utc>,
    pub action: String,
    #[serde(default)]
    pub meta: Value,
}

/// Payment state embedded in the appointment row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub status: PaymentStatus,
    #[serde(default)]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub signature: Option<String>,
    pub refund_id: Option<String>,
    #[serde(default = "default_refund_status")]
    pub refund_status: RefundStatus,
    #[serde(default = "default_gateway")]
    pub gateway: String,
    #[serde(default)]
    pub history: Vec<PaymentEvent>,
}

fn default_currency() -> String {
    "INR".to_string()
}

fn default_refund_status() -> RefundStatus {
    RefundStatus::None
}

fn default_gateway() -> String {
    "razorpay".to_string()
}

impl Default for PaymentInfo {
    fn default() -> Self {
        Self {
            status: PaymentStatus::Unpaid,
            amount: 0.0,
            currency: default_currency(),
            order_id: None,
            payment_id: None,
            signature: None,
            refund_id: None,
            refund_status: RefundStatus::None,
            gateway: default_gateway(),
            history: Vec::new(),
        }
    }
}

impl PaymentInfo {
    /// Snapshot for a verified gateway capture. `amount` is in rupees.
    pub fn paid(amount: f64, order_id: &str, payment_id: &str, signature: &str) -> Self {
        Self {
            status: PaymentStatus::Paid,
            amount,
            order_id: Some(order_id.to_string()),
            payment_id: Some(payment_id.to_string()),
            signature: Some(signature.to_string()),
            history: vec![PaymentEvent {
                at: Utc::now(),
                action: "captured".to_string(),
                meta: serde_json::json!({ "order_id": order_id, "payment_id": payment_id }),
            }],
            ..Self::default()
        }
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: AppointmentStatus,
    pub changed_at: DateTime<Utc>,
    pub changed_by: Option<Uuid>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub service_id: Uuid,
    pub center_id: Uuid,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub selected_documents: Vec<String>,
    #[serde(default)]
    pub payment: PaymentInfo,
    #[serde(default)]
    pub status_history: Vec<StatusChange>,
    pub processing_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub actual_duration_minutes: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Appointment as returned to its owner, with what they may still do to it.
#[derive(Debug, Serialize)]
pub struct AppointmentView {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub can_edit: bool,
    pub can_cancel: bool,
    pub can_reschedule: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookAppointmentRequest {
    pub service_id: Uuid,
    pub center_id: Uuid,
    pub appointment_date: NaiveDate,
    pub time_slot: TimeSlot,
    pub notes: Option<String>,
    #[serde(default)]
    pub selected_documents: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub appointment_date: Option<NaiveDate>,
    pub time_slot: Option<TimeSlot>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub center: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SlotAvailability {
    pub date: NaiveDate,
    pub available_slots: Vec<TimeSlot>,
    pub booked_slots: Vec<TimeSlot>,
    pub is_holiday: bool,
    pub reason: Option<String>,
}

// ==============================================================================
// CALENDAR
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holiday {
    pub id: Uuid,
    pub date: NaiveDate,
    pub reason: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayClosure {
    Sunday,
    SecondSaturday,
    Holiday(String),
}

impl DayClosure {
    pub fn reason(&self) -> &str {
        match self {
            DayClosure::Sunday => "Sunday",
            DayClosure::SecondSaturday => "Second Saturday",
            DayClosure::Holiday(reason) => reason,
        }
    }

    pub fn message(&self) -> String {
        match self {
            DayClosure::Sunday => "Bookings are not available on Sundays.".to_string(),
            DayClosure::SecondSaturday => "Bookings are not available on second Saturdays.".to_string(),
            DayClosure::Holiday(reason) => {
                format!("Bookings are not available on this holiday: {}.", reason)
            }
        }
    }
}

fn clock(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Booking policy of the service centers, in center-local time.
#[derive(Debug, Clone)]
pub struct BookingRules {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub slot_minutes: i64,
    pub max_advance_days: i64,
    /// Citizens may edit or cancel until this time on the appointment day.
    pub modify_cutoff: NaiveTime,
    pub reschedule_window_hours: i64,
}

impl Default for BookingRules {
    fn default() -> Self {
        Self {
            opening: clock(9, 0),
            closing: clock(17, 0),
            slot_minutes: 30,
            max_advance_days: 3,
            modify_cutoff: clock(9, 0),
            reschedule_window_hours: 3,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Service not found or inactive")]
    ServiceNotFound,

    #[error("Center not found or inactive")]
    CenterNotFound,

    #[error("Selected service is not available at this center")]
    ServiceNotOffered,

    #[error("{0}")]
    OutsideBookingWindow(String),

    #[error("{0}")]
    InvalidTimeSlot(String),

    #[error("{}", .0.message())]
    DayClosed(DayClosure),

    #[error("Please select at least {required} documents to proceed. You have selected {selected}.")]
    InsufficientDocuments { required: usize, selected: usize },

    #[error("This center is fully booked on the selected date")]
    CenterFullyBooked,

    #[error("This time slot is already booked")]
    SlotTaken,

    #[error("{0}")]
    CannotModify(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidStatusTransition { from: AppointmentStatus, to: AppointmentStatus },

    #[error("{0}")]
    ValidationError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<anyhow::Error> for AppointmentError {
    fn from(err: anyhow::Error) -> Self {
        AppointmentError::DatabaseError(err.to_string())
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::ServiceNotFound
            | AppointmentError::CenterNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::DatabaseError(msg) => AppError::Database(msg),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_twelve_and_twenty_four_hour_slots() {
        assert_eq!("9:30 am".parse::<TimeSlot>().unwrap().to_string(), "09:30 AM");
        assert_eq!("12:00 PM".parse::<TimeSlot>().unwrap().to_string(), "12:00 PM");
        assert_eq!("12:30 AM".parse::<TimeSlot>().unwrap().time(), clock(0, 30));
        assert_eq!("14:00".parse::<TimeSlot>().unwrap().to_string(), "02:00 PM");
        assert_eq!(" 04:30PM ".parse::<TimeSlot>().unwrap().to_string(), "04:30 PM");
    }

    #[test]
    fn rejects_malformed_slots() {
        for raw in ["", "9", "13:00 PM", "0:30 AM", "9:5 AM", "24:00", "09:60", "ab:cd", "123:00"] {
            assert!(raw.parse::<TimeSlot>().is_err(), "{} should not parse", raw);
        }
    }

    #[test]
    fn slot_serializes_as_canonical_string() {
        let slot: TimeSlot = serde_json::from_value(serde_json::json!("2:00 pm")).unwrap();
        assert_eq!(serde_json::to_value(slot).unwrap(), serde_json::json!("02:00 PM"));
    }

    #[test]
    fn payment_defaults_to_unpaid_inr() {
        let info: PaymentInfo = serde_json::from_value(serde_json::json!({
            "status": "unpaid",
            "order_id": null,
            "payment_id": null,
            "signature": null,
            "refund_id": null
        }))
        .unwrap();

        assert_eq!(info.currency, "INR");
        assert_eq!(info.refund_status, RefundStatus::None);
        assert_eq!(info.gateway, "razorpay");
    }

    #[test]
    fn closure_messages_name_the_reason() {
        assert_eq!(DayClosure::Sunday.message(), "Bookings are not available on Sundays.");
        assert_eq!(
            AppointmentError::DayClosed(DayClosure::Holiday("Onam".to_string())).to_string(),
            "Bookings are not available on this holiday: Onam."
        );
    }

    #[test]
    fn maps_errors_to_http_statuses() {
        assert_matches!(AppError::from(AppointmentError::NotFound), AppError::NotFound(_));
        assert_matches!(AppError::from(AppointmentError::SlotTaken), AppError::BadRequest(_));
        assert_matches!(
            AppError::from(AppointmentError::DatabaseError("x".into())),
            AppError::Database(_)
        );
    }
}
