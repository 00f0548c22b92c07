//! Database metrics collection.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Histogram of query latency, labelled by query name.
pub const QUERY_DURATION_METRIC: &str = "database_query_duration_seconds";

pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!(QUERY_DURATION_METRIC, "query" => query_name).record(duration_secs);
}

/// Record connection pool gauges.
///
/// Sampled by the health endpoint.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times one repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("find_reminder_rule_by_id");
/// let result = sqlx::query_as::<_, ReminderRuleEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
