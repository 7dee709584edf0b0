use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{PoisonError, RwLock};
use tracing::info;

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check if an e-mail might be registered (false positives possible)
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    EMAIL_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&email)
}

pub fn insert(email: &str) {
    let email = normalize(email);
    EMAIL_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&email);
}

/// Load every registered e-mail into the filter using streaming + batching
pub async fn warmup_email_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&email));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    info!(total, "E-mail filter warmup complete");
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let mut filter = EMAIL_FILTER.write().unwrap_or_else(PoisonError::into_inner);

    for email in emails {
        filter.add(email);
    }
}
