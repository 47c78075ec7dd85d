pub mod auth;
pub mod handlers;
pub mod jwt;
pub mod kiosk;
pub mod middleware;
pub mod password;
