use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::models::{Appointment, AppointmentError, BookingRules, TimeSlot};

fn display_time(time: NaiveTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Every bookable slot start, opening to the last start before closing.
pub fn all_slots(rules: &BookingRules) -> Vec<TimeSlot> {
    let step = Duration::minutes(rules.slot_minutes.max(1));
    let mut slots = Vec::new();
    let mut current = rules.opening;

    while current < rules.closing {
        slots.push(TimeSlot::new(current));
        let (next, wrapped) = current.overflowing_add_signed(step);
        if wrapped != 0 {
            break;
        }
        current = next;
    }

    slots
}

/// Slot must start inside opening hours and on the slot grid.
pub fn validate_slot(slot: TimeSlot, rules: &BookingRules) -> Result<(), AppointmentError> {
    let time = slot.time();
    if time < rules.opening || time >= rules.closing {
        return Err(AppointmentError::InvalidTimeSlot(format!(
            "Appointments can only be booked between {} and {}",
            display_time(rules.opening),
            display_time(rules.closing)
        )));
    }

    let offset = (time - rules.opening).num_minutes();
    if offset % rules.slot_minutes.max(1) != 0 {
        return Err(AppointmentError::InvalidTimeSlot(format!(
            "Time slots start every {} minutes from {}",
            rules.slot_minutes,
            display_time(rules.opening)
        )));
    }

    Ok(())
}

/// Date must be today or within the advance window; same-day bookings
/// need the center open and the slot still ahead.
pub fn check_booking_window(
    date: NaiveDate,
    slot: TimeSlot,
    now: NaiveDateTime,
    rules: &BookingRules,
) -> Result<(), AppointmentError> {
    let today = now.date();

    if date < today {
        return Err(AppointmentError::OutsideBookingWindow(
            "Cannot book appointments for past dates".to_string(),
        ));
    }

    if date > today + Duration::days(rules.max_advance_days) {
        return Err(AppointmentError::OutsideBookingWindow(format!(
            "Appointments can only be booked up to {} days in advance",
            rules.max_advance_days
        )));
    }

    if date == today {
        let time = now.time();
        if time >= rules.closing {
            return Err(AppointmentError::OutsideBookingWindow(format!(
                "Cannot book appointments for today after {}. Please book for tomorrow.",
                display_time(rules.closing)
            )));
        }
        if time < rules.opening {
            return Err(AppointmentError::OutsideBookingWindow(format!(
                "Cannot book appointments before center opening hours ({})",
                display_time(rules.opening)
            )));
        }
        if slot.time() <= time {
            return Err(AppointmentError::OutsideBookingWindow(
                "This time slot has already passed".to_string(),
            ));
        }
    }

    Ok(())
}

fn modify_deadline(appointment: &Appointment, rules: &BookingRules) -> NaiveDateTime {
    appointment.appointment_date.and_time(rules.modify_cutoff)
}

/// Owners may edit or cancel an active appointment until the cutoff on its day.
pub fn can_modify(appointment: &Appointment, now: NaiveDateTime, rules: &BookingRules) -> bool {
    appointment.status.is_active() && now < modify_deadline(appointment, rules)
}

pub fn ensure_modifiable(
    appointment: &Appointment,
    now: NaiveDateTime,
    rules: &BookingRules,
    action: &str,
) -> Result<(), AppointmentError> {
    if !appointment.status.is_active() {
        return Err(AppointmentError::CannotModify(format!(
            "Appointment not found or cannot be {}",
            action
        )));
    }

    if now >= modify_deadline(appointment, rules) {
        return Err(AppointmentError::CannotModify(format!(
            "Appointments cannot be {} after {} on the appointment day",
            action,
            display_time(rules.modify_cutoff)
        )));
    }

    Ok(())
}

/// Rescheduling opens once the appointment start is within the window or has passed.
pub fn can_reschedule(appointment: &Appointment, now: NaiveDateTime, rules: &BookingRules) -> bool {
    let start = appointment.appointment_date.and_time(appointment.time_slot.time());
    appointment.status.is_active() && now >= start - Duration::hours(rules.reschedule_window_hours)
}
