use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Expected capacity and false-positive rate.
/// Tune these based on real roster sizes.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// Approximate membership of person ids. A negative answer is definitive, so
/// handlers can reject unknown ids without touching the database; a positive
/// answer still gets confirmed by the store.
static PERSON_FILTER: Lazy<RwLock<CuckooFilter<u64>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Until the warmup pass has loaded existing ids, every id must read as
/// "maybe present" or pre-warmup requests would 404 real people.
static WARMED: AtomicBool = AtomicBool::new(false);

/// Check if a person id might exist (false positives possible)
pub fn might_exist(person_id: u64) -> bool {
    if !WARMED.load(Ordering::Acquire) {
        return true;
    }
    PERSON_FILTER
        .read()
        .expect("person filter poisoned")
        .contains(&person_id)
}

/// Insert a newly created person id into the filter
pub fn insert(person_id: u64) {
    PERSON_FILTER
        .write()
        .expect("person filter poisoned")
        .add(&person_id);
}

/// Remove a deleted person id from the filter
pub fn remove(person_id: u64) {
    PERSON_FILTER
        .write()
        .expect("person filter poisoned")
        .remove(&person_id);
}

/// Warm up the person filter using streaming + batching
pub async fn warmup_person_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (u64,)>("SELECT id FROM people").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (person_id,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(person_id);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    WARMED.store(true, Ordering::Release);
    log::info!("Person filter warmup complete: {} people", total);
    Ok(())
}

fn insert_batch(ids: &[u64]) {
    let mut filter = PERSON_FILTER.write().expect("person filter poisoned");

    for id in ids {
        filter.add(id);
    }
}
