pub mod handlers;
pub mod router;
pub mod models;
pub mod services;

pub use models::{Permission, Staff, StaffAccess, StaffError};
pub use services::{CenterServiceManager, StaffAccessService, StaffAppointmentService};
