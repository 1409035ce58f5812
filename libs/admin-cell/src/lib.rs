pub mod handlers;
pub mod middleware;
pub mod router;
pub mod models;
pub mod services;

pub use middleware::{maintenance_mode, MaintenanceGuard};
pub use models::{AdminError, PublicSettings, SystemSettings};
pub use services::{
    HolidayService, MonitoringService, SettingsCache, SettingsService, StaffApprovalService,
    UserAdminService,
};
