use std::time::Duration;

use tracing::{debug, error, info};

use crate::zabbix::items::{items_for_counter, items_for_gauge, items_for_timer};
use crate::zabbix::sender::{unix_now, ItemSender, ZabbixSender};
use crate::zabbix::target::TargetResolver;
use crate::zabbix::{Item, MetricBatch, RelayStats};

/// Source name reported through the status callback.
pub const STATUS_SOURCE: &str = "zabbix";

/// Configuration for the relay.
///
/// Mirrors the statsd backend's config surface; all fields have the
/// backend's defaults.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Zabbix server hostname or IP.
    pub zabbix_host: String,
    /// Zabbix trapper port.
    pub zabbix_port: u16,
    /// Send the relay's own timestamps with each item instead of letting
    /// the server use its receive time.
    pub send_timestamps: bool,
    /// Static host to associate all stats with. When unset, host and key
    /// are decoded from each stat name.
    pub target_hostname: Option<String>,
    /// How long stats were collected before each flush, for rate
    /// calculation.
    pub flush_interval: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            zabbix_host: "localhost".to_string(),
            zabbix_port: 10051,
            send_timestamps: false,
            target_hostname: None,
            flush_interval: Duration::from_secs(10),
        }
    }
}

/// The flush orchestrator.
///
/// Owns the resolution strategy, the item sink, and the per-instance
/// status record. One `flush` call processes one metrics snapshot end to
/// end: resolve every stat to a target, expand it to items, buffer them on
/// the sink, then transmit once.
///
/// Nothing here is fatal to the host process: a stat that cannot be
/// decoded is logged and skipped, a failed transmission is logged and the
/// buffered batch discarded. Both leave a trace in [`RelayStats`].
pub struct Relay<S: ItemSender> {
    resolver: TargetResolver,
    sender: S,
    flush_interval: Duration,
    stats: RelayStats,
}

impl Relay<ZabbixSender> {
    /// Builds a relay with a [`ZabbixSender`] sink from the backend config
    /// surface.
    #[must_use]
    pub fn from_options(options: &RelayOptions) -> Self {
        let resolver = match &options.target_hostname {
            Some(host) => TargetResolver::fixed_host(host.clone()),
            None => TargetResolver::decode_from_name(),
        };
        let sender = ZabbixSender::new(
            options.zabbix_host.clone(),
            options.zabbix_port,
            options.send_timestamps,
        );
        Self::new(resolver, sender, options.flush_interval)
    }
}

impl<S: ItemSender> Relay<S> {
    /// Creates a relay from its parts.
    pub const fn new(resolver: TargetResolver, sender: S, flush_interval: Duration) -> Self {
        Self {
            resolver,
            sender,
            flush_interval,
            stats: RelayStats {
                last_flush: 0,
                last_exception: 0,
                flush_time: 0,
                flush_length: 0,
            },
        }
    }

    /// Processes one metrics snapshot and transmits the resulting items.
    ///
    /// `timestamp` is the flush time reported by the statsd daemon, in
    /// unix seconds. Errors never propagate to the caller; they are logged
    /// and recorded in the status record.
    pub fn flush(&mut self, timestamp: u64, batch: &MetricBatch) {
        debug!("starting flush for timestamp {timestamp}");
        let flush_start = unix_now();
        let flush_interval = self.flush_interval;

        for (stat, &total) in &batch.counters {
            self.relay_stat(stat, |host, key| {
                items_for_counter(flush_interval, host, key, total)
            });
        }

        for (stat, samples) in &batch.timers {
            self.relay_stat(stat, |host, key| {
                items_for_timer(&batch.pct_thresholds, host, key, samples)
            });
        }

        for (stat, &value) in &batch.gauges {
            self.relay_stat(stat, |host, key| items_for_gauge(host, key, value));
        }

        self.stats.flush_length = self.sender.item_count();
        debug!("flushing {} items to zabbix", self.stats.flush_length);

        match self.sender.send() {
            Ok(response) => {
                self.stats.last_flush = timestamp;
                self.stats.flush_time = flush_start.saturating_sub(timestamp);
                debug!("flush completed in {} seconds", self.stats.flush_time);
                if !response.info.is_empty() {
                    info!("{}", response.info);
                }
            }
            Err(err) => {
                self.stats.last_exception = unix_now();
                error!("{err}");
                // Drop the batch rather than resend stale data next cycle.
                self.sender.clear();
            }
        }
    }

    /// Resolves one stat and buffers its expanded items.
    ///
    /// A decode failure is recorded and logged; it never aborts the rest
    /// of the batch.
    fn relay_stat(&mut self, stat: &str, expand: impl FnOnce(&str, &str) -> Vec<Item>) {
        match self.resolver.resolve(stat) {
            Ok(target) => {
                for item in expand(&target.host, &target.key) {
                    debug!("{} -> {} -> {}", item.host, item.key, item.value);
                    self.sender.add_item(item);
                }
            }
            Err(err) => {
                self.stats.last_exception = unix_now();
                error!("{err}");
            }
        }
    }

    /// Invokes `write` once per status key with the current value.
    pub fn status(&self, mut write: impl FnMut(&'static str, &'static str, u64)) {
        write(STATUS_SOURCE, "last_flush", self.stats.last_flush);
        write(STATUS_SOURCE, "last_exception", self.stats.last_exception);
        write(STATUS_SOURCE, "flush_time", self.stats.flush_time);
        write(STATUS_SOURCE, "flush_length", self.stats.flush_length as u64);
    }

    /// The status record updated after each flush cycle.
    #[must_use]
    pub const fn stats(&self) -> &RelayStats {
        &self.stats
    }

    /// The underlying item sink.
    pub const fn sender(&self) -> &S {
        &self.sender
    }
}
