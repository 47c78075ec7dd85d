pub mod ip_guard;
pub mod user_cache;
pub mod username_filter;
