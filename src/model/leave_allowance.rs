use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveAllowance {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 7)]
    pub user_id: u64,
    #[schema(example = 2026)]
    pub year: i32,
    #[schema(example = 25.0)]
    pub total_days: f64,
    #[schema(example = 3.0)]
    pub used_days: f64,
    #[schema(example = 2.0)]
    pub carried_over: f64,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}

/// Allowance joined with its owner, as listed for managers.
#[derive(Debug, sqlx::FromRow)]
pub struct AllowanceWithUserRow {
    pub id: u64,
    pub user_id: u64,
    pub year: i32,
    pub total_days: f64,
    pub used_days: f64,
    pub carried_over: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user_name: Option<String>,
    pub user_email: String,
    pub user_role: String,
}
