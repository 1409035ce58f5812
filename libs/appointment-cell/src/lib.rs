pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Appointment, AppointmentError, AppointmentStatus, PaymentInfo, TimeSlot};
pub use services::{AppointmentBookingService, AppointmentLifecycleService};
