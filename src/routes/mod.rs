//! HTTP route handlers.

mod health;
mod query;

pub use health::{health, live, metrics_prometheus, stats};
pub use query::{alarms_latest, execute_query, execute_query_batch, telemetry_latest};
