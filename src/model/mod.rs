pub mod attendance;
pub mod employee;
pub mod punch;
pub mod role;
pub mod schedule;
pub mod shift;
