use crate::utils::ip_guard;
use dotenvy::dotenv;
use std::env;
use std::net::IpAddr;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    /// Minutes east of UTC for the single-site organizational day window.
    pub utc_offset_minutes: i32,
    /// Empty = punches allowed from anywhere.
    pub punch_allowed_ips: Vec<IpAddr>,
    /// How long after local midnight a day may still not be locked.
    pub day_lock_grace_minutes: i64,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_kiosk_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    pub api_prefix: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        Self {
            server_addr: env::var("SERVER_ADDR").expect("SERVER_ADDR must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            access_token_ttl: env::var("ACCESS_TOKEN_TTL")
                .unwrap_or_else(|_| "900".to_string()) // default 15 min
                .parse()
                .unwrap(),
            refresh_token_ttl: env::var("REFRESH_TOKEN_TTL")
                .unwrap_or_else(|_| "604800".to_string()) // default 7 days
                .parse()
                .unwrap(),

            utc_offset_minutes: env::var("UTC_OFFSET_MINUTES")
                .unwrap_or_else(|_| "480".to_string()) // default UTC+8
                .parse()
                .unwrap(),
            punch_allowed_ips: ip_guard::parse_allow_list(
                &env::var("PUNCH_ALLOWED_IPS").unwrap_or_default(),
            ),
            day_lock_grace_minutes: env::var("DAY_LOCK_GRACE_MINUTES")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),

            rate_login_per_min: env::var("RATE_LOGIN_PER_MIN")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .unwrap(),
            rate_kiosk_per_min: env::var("RATE_KIOSK_PER_MIN")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .unwrap(),
            rate_refresh_per_min: env::var("RATE_REFRESH_PER_MIN")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap(),
            rate_protected_per_min: env::var("RATE_PROTECTED_PER_MIN")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap(),

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
        }
    }
}
