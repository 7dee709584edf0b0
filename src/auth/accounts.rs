use sqlx::MySqlPool;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display};
use tracing::info;

use crate::auth::jwt::TokenSubject;
use crate::model::role::Role;
use crate::model::user::User;
use crate::utils::{email_cache, email_filter};

#[derive(Debug, Clone, Copy, PartialEq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum AuthProvider {
    Password,
    Google,
}

pub struct NewAccount<'a> {
    pub email: &'a str,
    pub name: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub provider: AuthProvider,
}

/// Tokens carry the stored role and e-mail, so a role change reaches the next token.
impl TryFrom<User> for TokenSubject {
    type Error = strum::ParseError;

    fn try_from(user: User) -> Result<Self, Self::Error> {
        Ok(TokenSubject {
            role: Role::from_str(&user.role)?,
            user_id: user.id,
            email: user.email,
        })
    }
}

pub fn team_name(email: &str) -> String {
    format!("{email}'s Team")
}

pub async fn find_by_email(pool: &MySqlPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, auth_provider, role, created_at
        FROM users
        WHERE email = ? AND deleted_at IS NULL
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await
}

pub async fn find_by_id(pool: &MySqlPool, id: u64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password_hash, auth_provider, role, created_at
        FROM users
        WHERE id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Creates the user as owner of a new team in one transaction and returns the user id.
pub async fn create_account(pool: &MySqlPool, account: NewAccount<'_>) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let user_id = sqlx::query(
        r#"
        INSERT INTO users (name, email, password_hash, auth_provider, role)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(account.name)
    .bind(account.email)
    .bind(account.password_hash)
    .bind(account.provider.as_ref())
    .bind(Role::Owner.as_ref())
    .execute(&mut *tx)
    .await?
    .last_insert_id();

    let team_id = sqlx::query("INSERT INTO teams (name) VALUES (?)")
        .bind(team_name(account.email))
        .execute(&mut *tx)
        .await?
        .last_insert_id();

    sqlx::query("INSERT INTO team_members (user_id, team_id, role) VALUES (?, ?, ?)")
        .bind(user_id)
        .bind(team_id)
        .bind(Role::Owner.as_ref())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    email_filter::insert(account.email);
    email_cache::mark_taken(account.email).await;

    info!(user_id, team_id, provider = %account.provider, "Account created");
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn stored_user(role: &str) -> User {
        User {
            id: 7,
            name: Some("Jane".to_string()),
            email: "jane@company.com".to_string(),
            password_hash: None,
            auth_provider: "google".to_string(),
            role: role.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn token_subject_takes_the_stored_role() {
        let subject = TokenSubject::try_from(stored_user("admin")).unwrap();
        assert_eq!(subject.user_id, 7);
        assert_eq!(subject.email, "jane@company.com");
        assert_eq!(subject.role, Role::Admin);

        assert!(TokenSubject::try_from(stored_user("superuser")).is_err());
    }

    #[test]
    fn team_is_named_after_the_owner() {
        assert_eq!(team_name("jane@company.com"), "jane@company.com's Team");
    }

    #[test]
    fn providers_use_their_column_value() {
        assert_eq!(AuthProvider::Password.as_ref(), "password");
        assert_eq!(AuthProvider::Google.to_string(), "google");
    }
}
