use chrono::{Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, Utc, Weekday};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;

use crate::models::{AppointmentError, DayClosure, Holiday};

/// Wall clock of the service centers.
#[derive(Debug, Clone, Copy)]
pub struct CenterClock {
    offset: FixedOffset,
}

impl CenterClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let offset = FixedOffset::east_opt(config.center_utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix());
        Self::new(offset)
    }

    pub fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.offset).naive_local()
    }

    pub fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// The second Saturday always falls on day 8..=14 of the month.
pub fn is_second_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat && (8..=14).contains(&date.day())
}

/// Closures that need no lookup: Sundays and second Saturdays.
pub fn fixed_closure(date: NaiveDate) -> Option<DayClosure> {
    if date.weekday() == Weekday::Sun {
        Some(DayClosure::Sunday)
    } else if is_second_saturday(date) {
        Some(DayClosure::SecondSaturday)
    } else {
        None
    }
}

pub struct CalendarService {
    supabase: SupabaseClient,
}

impl CalendarService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn holiday_on(&self, date: NaiveDate, auth_token: Option<&str>) -> Result<Option<Holiday>, AppointmentError> {
        let path = format!("/rest/v1/holidays?date=eq.{}", date);
        Ok(self.supabase.select_one(&path, auth_token).await?)
    }

    /// Why the centers are closed on `date`, if they are.
    pub async fn closure_for(&self, date: NaiveDate, auth_token: Option<&str>) -> Result<Option<DayClosure>, AppointmentError> {
        if let Some(closure) = fixed_closure(date) {
            return Ok(Some(closure));
        }

        let closure = self.holiday_on(date, auth_token).await?.map(|holiday| {
            DayClosure::Holiday(holiday.reason.filter(|r| !r.trim().is_empty()).unwrap_or_else(|| "Holiday".to_string()))
        });

        if let Some(closure) = &closure {
            debug!("{} is a holiday: {}", date, closure.reason());
        }

        Ok(closure)
    }

    pub async fn ensure_open(&self, date: NaiveDate, auth_token: Option<&str>) -> Result<(), AppointmentError> {
        match self.closure_for(date, auth_token).await? {
            Some(closure) => Err(AppointmentError::DayClosed(closure)),
            None => Ok(()),
        }
    }
}
