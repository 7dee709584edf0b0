use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanySettings {
    pub id: u64,
    #[schema(example = "Your Company")]
    pub company_name: String,
    #[schema(example = 25)]
    pub default_annual_leave_days: i32,
    pub allow_carry_over: bool,
    #[schema(example = 5)]
    pub max_carry_over_days: i32,
    /// `MM-DD`
    #[schema(example = "01-01")]
    pub fiscal_year_start: String,
    pub working_days: i32,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
    #[schema(format = "date-time", value_type = String)]
    pub updated_at: DateTime<Utc>,
}
