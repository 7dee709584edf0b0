use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    /// user id of the member
    #[schema(example = 7)]
    pub id: u64,
    #[schema(example = "Jane Doe", nullable = true)]
    pub name: Option<String>,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "member")]
    pub role: String,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub joined_at: DateTime<Utc>,
}
