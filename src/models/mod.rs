//! Data models shared by the normalizer, analyzer, aggregator and presentation.

mod config;
mod job;
mod state;

pub use config::{
    AppConfig, DEFAULT_PARTITION, DEFAULT_TIMEZONE, DisplayConfig, MAX_LONG_WAIT_SECS, MIN_REFRESH_INTERVAL,
    QueryConfig, RefreshConfig, SystemConfig, parse_timezone,
};
pub use job::{JobRecord, ListingRow, PRIORITY_COMPONENTS, PriorityBreakdown};
pub use state::JobState;
