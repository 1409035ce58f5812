pub mod access;
pub mod appointments;
pub mod center_services;

pub use access::StaffAccessService;
pub use appointments::StaffAppointmentService;
pub use center_services::CenterServiceManager;
