//! # statsd-zabbix-relay
//!
//! A StatsD backend relay that forwards aggregated metrics to a
//! [Zabbix](https://www.zabbix.com/) trapper server.
//!
//! ## Features
//!
//! - **Stat-Name Decoding**: Parses flat statsd names into Zabbix
//!   `(host, key)` targets under multiple naming conventions, or pins
//!   everything to a statically configured host
//! - **Item Expansion**: Expands counters, timers, and gauges into the
//!   discrete items a trapper expects, including percentile statistics
//!   for timers
//! - **Fault Isolation**: One undecodable stat never aborts a flush
//!
//! ## Quick Start
//!
//! ```no_run
//! use statsd_zabbix_relay::{MetricBatch, Relay, RelayOptions};
//!
//! let options = RelayOptions {
//!     zabbix_host: "zabbix.example.com".to_string(),
//!     ..RelayOptions::default()
//! };
//! let mut relay = Relay::from_options(&options);
//!
//! let mut batch = MetricBatch::default();
//! batch.counters.insert("webserver_requests".to_string(), 100.0);
//! batch.pct_thresholds = vec![95.0, 99.0];
//!
//! // One call per statsd flush event.
//! relay.flush(1_700_000_000, &batch);
//!
//! relay.status(|source, key, value| {
//!     println!("{source}.{key} = {value}");
//! });
//! ```

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![warn(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

// https://www.zabbix.com/documentation/current/en/manual/appendix/protocols/zabbix_sender
mod error;
mod zabbix;

pub use error::RelayError;
pub use zabbix::items::{items_for_counter, items_for_gauge, items_for_timer};
pub use zabbix::relay::{Relay, RelayOptions, STATUS_SOURCE};
pub use zabbix::sender::{ItemSender, SendResponse, ZabbixSender};
pub use zabbix::target::TargetResolver;
pub use zabbix::{Item, MetricBatch, RelayStats, Target};

/// Result type for relay operations.
///
/// Wraps errors that can occur while decoding stat names or talking to the
/// trapper server.
pub type RelayResult<T> = Result<T, RelayError>;
