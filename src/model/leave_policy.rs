use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "name": "Annual leave notice",
    "description": "Book annual leave two weeks ahead",
    "leaveTypeId": 1,
    "minNoticeDays": 14,
    "maxConsecutiveDays": 10,
    "maxRequestsPerYear": null,
    "requiresApproval": true,
    "isActive": true,
    "createdAt": "2026-01-01T00:00:00Z",
    "updatedAt": "2026-01-01T00:00:00Z"
}))]
pub struct LeavePolicy {
    pub id: u64,
    pub name: String,
    #[schema(nullable = true)]
    pub description: Option<String>,
    /// `None` applies the policy to every leave type
    #[schema(nullable = true)]
    pub leave_type_id: Option<u64>,
    pub min_notice_days: i32,
    #[schema(nullable = true)]
    pub max_consecutive_days: Option<i32>,
    #[schema(nullable = true)]
    pub max_requests_per_year: Option<i32>,
    pub requires_approval: bool,
    pub is_active: bool,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
