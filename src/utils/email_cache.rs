use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;
use tracing::info;

use super::email_filter::normalize;

/// Only taken addresses are stored.
static EMAIL_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h
        .build()
});

pub async fn mark_taken(email: &str) {
    EMAIL_CACHE.insert(normalize(email), true).await;
}

pub async fn is_taken(email: &str) -> bool {
    EMAIL_CACHE.get(&normalize(email)).await.unwrap_or(false)
}

/// Caches addresses of users who signed in during the last `days` days.
pub async fn warmup_email_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT email
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row?;
        batch.push(email);
        total += 1;

        if batch.len() >= batch_size {
            futures::future::join_all(batch.iter().map(|e| mark_taken(e))).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        futures::future::join_all(batch.iter().map(|e| mark_taken(e))).await;
    }

    info!(total, days, "E-mail cache warmup complete");
    Ok(())
}
