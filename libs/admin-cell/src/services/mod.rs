pub mod approval;
pub mod holidays;
pub mod monitoring;
pub mod settings;
pub mod users;

pub use approval::StaffApprovalService;
pub use holidays::HolidayService;
pub use monitoring::MonitoringService;
pub use settings::{SettingsCache, SettingsService};
pub use users::UserAdminService;
