use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// person id => number of completed classes (records with a check-in).
/// The admin dashboard and the day roster read this on every request, so the
/// counts are kept hot instead of re-aggregated per hit.
pub static CLASS_COUNT_CACHE: Lazy<Cache<u64, i64>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

pub async fn store_total(person_id: u64, total: i64) {
    CLASS_COUNT_CACHE.insert(person_id, total).await;
}

pub async fn forget(person_id: u64) {
    CLASS_COUNT_CACHE.invalidate(&person_id).await;
}

/// Cached total, falling back to a COUNT query on miss.
pub async fn total_classes(pool: &MySqlPool, person_id: u64) -> Result<i64> {
    if let Some(total) = CLASS_COUNT_CACHE.get(&person_id).await {
        return Ok(total);
    }

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM attendance WHERE person_id = ? AND in_time IS NOT NULL",
    )
    .bind(person_id)
    .fetch_one(pool)
    .await?;

    store_total(person_id, total).await;
    Ok(total)
}

/// Bump after a check-in or a backfill run without re-querying.
pub async fn add_classes(person_id: u64, delta: i64) {
    if let Some(total) = CLASS_COUNT_CACHE.get(&person_id).await {
        CLASS_COUNT_CACHE.insert(person_id, total + delta).await;
    }
}

/// Load every person's class total into the in-memory cache (batched)
pub async fn warmup_class_counts(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64, i64)>(
        r#"
        SELECT person_id, COUNT(*) AS total
        FROM attendance
        WHERE in_time IS NOT NULL
        GROUP BY person_id
        "#,
    )
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let (person_id, total) = row?;
        batch.push((person_id, total));
        total_count += 1;

        if batch.len() >= batch_size {
            insert_batch(&batch).await;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch).await;
    }

    log::info!("Class count cache warmup complete: {} people", total_count);

    Ok(())
}

async fn insert_batch(entries: &[(u64, i64)]) {
    let futures: Vec<_> = entries
        .iter()
        .map(|(person_id, total)| CLASS_COUNT_CACHE.insert(*person_id, *total))
        .collect();

    futures::future::join_all(futures).await;
}
