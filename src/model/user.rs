use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub name: Option<String>,
    pub email: String,
    pub password_hash: Option<String>,
    pub auth_provider: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("User")
    }
}

/// Public view of an account; never exposes the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Jane Doe", nullable = true)]
    pub name: Option<String>,
    #[schema(example = "jane@company.com")]
    pub email: String,
    #[schema(example = "password")]
    pub auth_provider: String,
    #[schema(example = "member")]
    pub role: String,
    pub has_password: bool,
    #[schema(example = "2026-01-01T00:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            has_password: user.password_hash.is_some(),
            name: user.name,
            email: user.email,
            auth_provider: user.auth_provider,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Short user reference embedded in joined responses.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: u64,
    #[schema(nullable = true)]
    pub name: Option<String>,
    pub email: String,
    pub role: String,
}
