pub mod booking;
pub mod calendar;
pub mod lifecycle;
pub mod slots;

pub use booking::AppointmentBookingService;
pub use calendar::{CalendarService, CenterClock};
pub use lifecycle::AppointmentLifecycleService;
