use std::collections::HashMap;

pub mod items;
pub mod relay;
pub mod sender;
pub mod target;

/// The resolved destination identity for a stat: a Zabbix host and the item
/// key within that host.
///
/// Both fields are non-empty whenever a `Target` is produced by resolution;
/// a stat that cannot yield both fails with [`crate::RelayError::Decode`]
/// instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Host identity known to the Zabbix server.
    pub host: String,
    /// Item key within that host.
    pub key: String,
}

/// One discrete data point sent to the trapper.
///
/// Produced and consumed within a single flush; no identity beyond its
/// fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    /// Destination host.
    pub host: String,
    /// Destination item key, including any `[suffix]` qualifiers.
    pub key: String,
    /// The value for this data point.
    pub value: f64,
}

impl Item {
    /// Creates an item from borrowed host/key parts.
    #[must_use]
    pub fn new(host: &str, key: impl Into<String>, value: f64) -> Self {
        Self {
            host: host.to_string(),
            key: key.into(),
            value,
        }
    }
}

/// A snapshot of aggregated metrics delivered once per flush interval by
/// the statsd daemon.
#[derive(Debug, Clone, Default)]
pub struct MetricBatch {
    /// Counter totals collected during the interval, by stat name.
    pub counters: HashMap<String, f64>,
    /// Timer samples collected during the interval, by stat name.
    pub timers: HashMap<String, Vec<f64>>,
    /// Current gauge values, by stat name.
    pub gauges: HashMap<String, f64>,
    /// Configured percentile thresholds for timer expansion, in (0, 100].
    pub pct_thresholds: Vec<f64>,
}

/// Per-instance status record updated after each flush cycle.
///
/// Replaces the original backend's process-wide stats singleton; owned by
/// the [`crate::Relay`] and read through its status callback.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelayStats {
    /// Unix timestamp of the last successful send.
    pub last_flush: u64,
    /// Unix timestamp of the last decode or send error.
    pub last_exception: u64,
    /// Duration of the last successful flush, in seconds.
    pub flush_time: u64,
    /// Number of items buffered for the last flush.
    pub flush_length: usize,
}
