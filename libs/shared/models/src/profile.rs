use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staff sign-ups start pending; citizens and admins are created approved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

fn default_approval() -> ApprovalStatus {
    ApprovalStatus::Approved
}

fn default_active() -> bool {
    true
}

/// Row of the `profiles` table, keyed by the auth user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default = "default_approval")]
    pub approval_status: ApprovalStatus,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub review_notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_approval_defaults_to_approved() {
        let profile: Profile = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "name": "Anu",
            "email": "anu@example.com",
            "phone": null,
            "role": "user",
            "reviewed_by": null,
            "reviewed_at": null,
            "created_at": null
        }))
        .unwrap();

        assert!(profile.is_active);
        assert_eq!(profile.approval_status, ApprovalStatus::Approved);
    }
}
