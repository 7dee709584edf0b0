use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::leave_type::LeaveType;
use crate::model::user::UserSummary;

/// Lifecycle of a request: `Pending` moves to `Approved` or `Rejected` once.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, EnumString, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

impl LeaveStatus {
    /// Whether a request in this status may move to `next`.
    pub fn can_transition_to(self, next: LeaveStatus) -> bool {
        matches!(
            (self, next),
            (LeaveStatus::Pending, LeaveStatus::Approved) | (LeaveStatus::Pending, LeaveStatus::Rejected)
        )
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 12,
    "userId": 7,
    "leaveTypeId": 1,
    "startDate": "2026-11-02",
    "endDate": "2026-11-06",
    "totalDays": 5.0,
    "reason": "Family trip",
    "status": "pending",
    "approvedBy": null,
    "approvedAt": null,
    "rejectionReason": null,
    "createdAt": "2026-10-14T09:00:00Z",
    "updatedAt": "2026-10-14T09:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    pub leave_type_id: u64,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = String)]
    pub end_date: NaiveDate,
    pub total_days: f64,
    #[schema(nullable = true)]
    pub reason: Option<String>,
    #[schema(example = "pending")]
    pub status: String,
    #[schema(nullable = true)]
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(nullable = true)]
    pub rejection_reason: Option<String>,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

impl LeaveRequest {
    /// Parsed status; unknown column values read as `None`.
    pub fn status(&self) -> Option<LeaveStatus> {
        self.status.parse().ok()
    }
}

pub const REQUEST_COLUMNS: &str = "lr.id, lr.user_id, lr.leave_type_id, lr.start_date, lr.end_date, \
     lr.total_days, lr.reason, lr.status, lr.approved_by, lr.approved_at, lr.rejection_reason, \
     lr.created_at, lr.updated_at";

/// Request joined with its requester and leave type, one flat row per request.
#[derive(Debug, sqlx::FromRow)]
pub struct LeaveRequestDetailRow {
    pub id: u64,
    pub user_id: u64,
    pub leave_type_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_days: f64,
    pub reason: Option<String>,
    pub status: String,
    pub approved_by: Option<u64>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    pub user_name: Option<String>,
    pub user_email: String,
    pub user_role: String,

    pub type_name: String,
    pub type_color: String,
    pub type_is_paid: bool,
    pub type_requires_approval: bool,
    pub type_created_at: DateTime<Utc>,
    pub type_updated_at: DateTime<Utc>,
}

pub const DETAIL_SELECT: &str = r#"
    SELECT
        lr.id, lr.user_id, lr.leave_type_id, lr.start_date, lr.end_date, lr.total_days,
        lr.reason, lr.status, lr.approved_by, lr.approved_at, lr.rejection_reason,
        lr.created_at, lr.updated_at,
        u.name AS user_name, u.email AS user_email, u.role AS user_role,
        lt.name AS type_name, lt.color AS type_color, lt.is_paid AS type_is_paid,
        lt.requires_approval AS type_requires_approval,
        lt.created_at AS type_created_at, lt.updated_at AS type_updated_at
    FROM leave_requests lr
    INNER JOIN users u ON u.id = lr.user_id
    INNER JOIN leave_types lt ON lt.id = lr.leave_type_id
"#;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequestDetail {
    #[serde(flatten)]
    pub request: LeaveRequest,
    pub user: UserSummary,
    pub leave_type: LeaveType,
}

impl From<LeaveRequestDetailRow> for LeaveRequestDetail {
    fn from(row: LeaveRequestDetailRow) -> Self {
        Self {
            user: UserSummary {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
                role: row.user_role,
            },
            leave_type: LeaveType {
                id: row.leave_type_id,
                name: row.type_name,
                color: row.type_color,
                is_paid: row.type_is_paid,
                requires_approval: row.type_requires_approval,
                created_at: row.type_created_at,
                updated_at: row.type_updated_at,
            },
            request: LeaveRequest {
                id: row.id,
                user_id: row.user_id,
                leave_type_id: row.leave_type_id,
                start_date: row.start_date,
                end_date: row.end_date,
                total_days: row.total_days,
                reason: row.reason,
                status: row.status,
                approved_by: row.approved_by,
                approved_at: row.approved_at,
                rejection_reason: row.rejection_reason,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_is_the_only_state_that_moves() {
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Approved));
        assert!(LeaveStatus::Pending.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Pending.can_transition_to(LeaveStatus::Pending));
        assert!(!LeaveStatus::Approved.can_transition_to(LeaveStatus::Rejected));
        assert!(!LeaveStatus::Rejected.can_transition_to(LeaveStatus::Approved));
        assert!(!LeaveStatus::Approved.can_transition_to(LeaveStatus::Approved));
    }

    #[test]
    fn status_column_values_are_lowercase() {
        assert_eq!(LeaveStatus::Approved.as_ref(), "approved");
        assert_eq!("rejected".parse::<LeaveStatus>().unwrap(), LeaveStatus::Rejected);
        assert!("cancelled".parse::<LeaveStatus>().is_err());
    }
}
