//! Storage-free attendance algorithms: day bucketing, shift derivation,
//! schedule resolution, the punch state machine, and daily aggregation.
//! Everything here is pure over pre-fetched rows so it is testable without
//! a database; `store` and `api` do the fetching and persisting.

pub mod aggregate;
pub mod catalog;
pub mod clock;
pub mod ledger;
pub mod schedule;
