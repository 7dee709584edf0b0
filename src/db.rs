use anyhow::{Context, Result};
use sqlx::MySqlPool;
use sqlx::mysql::MySqlPoolOptions;
use tracing::info;

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")
}

pub async fn run_migrations(pool: &MySqlPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// (name, color, is_paid, requires_approval)
const DEFAULT_LEAVE_TYPES: [(&str, &str, bool, bool); 5] = [
    ("Annual Leave", "#10B981", true, true),
    ("Sick Leave", "#EF4444", true, false),
    ("Personal Leave", "#8B5CF6", false, true),
    ("Maternity/Paternity", "#F59E0B", true, true),
    ("Unpaid Leave", "#6B7280", false, true),
];

/// Inserts the default leave types and company settings row into an empty database.
pub async fn seed_defaults(pool: &MySqlPool) -> Result<()> {
    let type_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM leave_types")
        .fetch_one(pool)
        .await
        .context("Failed to count leave types")?;

    if type_count == 0 {
        for (name, color, is_paid, requires_approval) in DEFAULT_LEAVE_TYPES {
            sqlx::query(
                r#"
                INSERT INTO leave_types (name, color, is_paid, requires_approval)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(name)
            .bind(color)
            .bind(is_paid)
            .bind(requires_approval)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to seed leave type {name}"))?;
        }
        info!(count = DEFAULT_LEAVE_TYPES.len(), "Leave types seeded");
    } else {
        info!("Leave types already exist, skipping seed");
    }

    let settings_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM company_settings")
        .fetch_one(pool)
        .await
        .context("Failed to count company settings")?;

    if settings_count == 0 {
        sqlx::query("INSERT INTO company_settings () VALUES ()")
            .execute(pool)
            .await
            .context("Failed to seed company settings")?;
        info!("Default company settings created");
    }

    Ok(())
}
