use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::model::leave_type::LeaveType;

const ALL_TYPES: &str = "all";

/// The catalogue is small and read on almost every request page, so it is kept whole.
static LEAVE_TYPES: Lazy<Cache<&'static str, Arc<Vec<LeaveType>>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(300))
        .build()
});

async fn load(pool: &MySqlPool) -> Result<Arc<Vec<LeaveType>>, sqlx::Error> {
    let types = sqlx::query_as::<_, LeaveType>(
        r#"
        SELECT id, name, color, is_paid, requires_approval, created_at, updated_at
        FROM leave_types
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(Arc::new(types))
}

/// All leave types ordered by name, loaded on first use.
pub async fn all(pool: &MySqlPool) -> ApiResult<Arc<Vec<LeaveType>>> {
    LEAVE_TYPES
        .try_get_with(ALL_TYPES, load(pool))
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch leave types");
            ApiError::Internal("Failed to fetch leave types".to_string())
        })
}

pub async fn find(pool: &MySqlPool, id: u64) -> ApiResult<Option<LeaveType>> {
    Ok(all(pool).await?.iter().find(|t| t.id == id).cloned())
}

pub async fn invalidate() {
    LEAVE_TYPES.invalidate(ALL_TYPES).await;
}
