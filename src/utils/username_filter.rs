use anyhow::{anyhow, Result};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;

/// Kiosks take free-text usernames, so most garbage input can be bounced
/// before touching the database. The filter is warmed from the full users
/// table at boot and healed whenever a login succeeds against the database.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static KIOSK_USERNAME_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(username: &str) -> String {
    username.to_lowercase()
}

/// False positives possible, false negatives only for users created after
/// the last warmup/heal.
pub fn might_exist(username: &str) -> bool {
    let username = normalize(username);
    KIOSK_USERNAME_FILTER
        .read()
        .expect("username filter poisoned")
        .contains(&username)
}

pub fn insert(username: &str) {
    let username = normalize(username);
    KIOSK_USERNAME_FILTER
        .write()
        .expect("username filter poisoned")
        .add(&username);
}

/// Streams every username into the filter in batches.
pub async fn warmup_username_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT username FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (username,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;

        batch.push(normalize(&username));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    log::info!("Kiosk username filter warmup complete: {} users", total);
    Ok(())
}

fn insert_batch(usernames: &[String]) {
    let mut filter = KIOSK_USERNAME_FILTER
        .write()
        .expect("username filter poisoned");

    for username in usernames {
        filter.add(username);
    }
}
