use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::time::Duration;

/// User row shape the kiosk auth path needs. Cached so four punches a day per
/// employee hit the database once; the argon2 verify still runs every time.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct KioskUser {
    pub id: u64,
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub employee_id: Option<u64>,
}

static KIOSK_USER_CACHE: Lazy<Cache<String, KioskUser>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(100_000)
        .time_to_live(Duration::from_secs(600)) // password changes propagate within 10 min
        .build()
});

pub async fn get(username: &str) -> Option<KioskUser> {
    KIOSK_USER_CACHE.get(&username.to_lowercase()).await
}

pub async fn put(user: KioskUser) {
    KIOSK_USER_CACHE
        .insert(user.username.to_lowercase(), user)
        .await;
}

pub async fn invalidate(username: &str) {
    KIOSK_USER_CACHE.invalidate(&username.to_lowercase()).await;
}

/// Preloads users who punched recently, in batches.
pub async fn warmup_user_cache(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, KioskUser>(
        r#"
        SELECT id, username, password, role_id, employee_id
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total_count = 0usize;

    while let Some(row) = stream.next().await {
        let user: KioskUser = row?;
        batch.push(user);
        total_count += 1;

        if batch.len() >= batch_size {
            batch_put(std::mem::take(&mut batch)).await;
        }
    }

    if !batch.is_empty() {
        batch_put(batch).await;
    }

    log::info!(
        "Kiosk user cache warmup complete: {} recent users (last {} days)",
        total_count,
        days
    );

    Ok(())
}

async fn batch_put(users: Vec<KioskUser>) {
    let futures: Vec<_> = users
        .into_iter()
        .map(|u| KIOSK_USER_CACHE.insert(u.username.to_lowercase(), u))
        .collect();

    futures::future::join_all(futures).await;
}
