use std::time::Duration;

use statsd_zabbix_relay::{
    Item, ItemSender, MetricBatch, Relay, RelayResult, SendResponse, TargetResolver,
};

/// A sink that captures items in memory instead of talking to a trapper.
struct MemorySender {
    items: Vec<Item>,
    sent_batches: Vec<Vec<Item>>,
    send_calls: usize,
    fail_sends: bool,
}

impl MemorySender {
    fn new() -> Self {
        Self {
            items: Vec::new(),
            sent_batches: Vec::new(),
            send_calls: 0,
            fail_sends: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_sends: true,
            ..Self::new()
        }
    }
}

impl ItemSender for MemorySender {
    fn add_item(&mut self, item: Item) {
        self.items.push(item);
    }

    fn item_count(&self) -> usize {
        self.items.len()
    }

    fn send(&mut self) -> RelayResult<SendResponse> {
        self.send_calls += 1;
        if self.fail_sends {
            return Err(statsd_zabbix_relay::RelayError::Server(
                "connection refused".to_string(),
            ));
        }
        let batch = std::mem::take(&mut self.items);
        let info = format!("processed: {}; failed: 0", batch.len());
        self.sent_batches.push(batch);
        Ok(SendResponse {
            response: "success".to_string(),
            info,
        })
    }

    fn clear(&mut self) {
        self.items.clear();
    }
}

fn relay_with(sender: MemorySender) -> Relay<MemorySender> {
    Relay::new(
        TargetResolver::decode_from_name(),
        sender,
        Duration::from_secs(10),
    )
}

#[test]
fn test_flush_relays_all_metric_kinds() {
    let mut batch = MetricBatch::default();
    batch.counters.insert("web01_requests".to_string(), 100.0);
    batch
        .timers
        .insert("web01_latency".to_string(), (1..=100).map(f64::from).collect());
    batch.gauges.insert("web01_connections".to_string(), 42.0);
    batch.pct_thresholds = vec![95.0, 99.0];

    let mut relay = relay_with(MemorySender::new());
    relay.flush(1_700_000_000, &batch);

    let sender = relay.sender();
    assert_eq!(sender.send_calls, 1);
    assert_eq!(sender.sent_batches.len(), 1);

    let sent = &sender.sent_batches[0];
    // 2 counter items + 7 timer items + 1 gauge item.
    assert_eq!(sent.len(), 10);
    assert!(sent.iter().all(|item| item.host == "web01"));

    let find = |key: &str| {
        sent.iter()
            .find(|item| item.key == key)
            .unwrap_or_else(|| panic!("missing item {key}"))
    };
    assert_eq!(find("requests[total]").value, 100.0);
    assert_eq!(find("requests[avg]").value, 10.0);
    assert_eq!(find("latency[lower]").value, 1.0);
    assert_eq!(find("latency[upper]").value, 100.0);
    assert_eq!(find("latency[count]").value, 100.0);
    assert_eq!(find("latency[mean][95]").value, 48.0);
    assert_eq!(find("latency[upper][95]").value, 95.0);
    assert_eq!(find("latency[mean][99]").value, 50.0);
    assert_eq!(find("latency[upper][99]").value, 99.0);
    assert_eq!(find("connections").value, 42.0);

    // Timer items for one stat keep their canonical relative order.
    let timer_keys: Vec<&str> = sent
        .iter()
        .filter(|item| item.key.starts_with("latency"))
        .map(|item| item.key.as_str())
        .collect();
    assert_eq!(
        timer_keys,
        vec![
            "latency[lower]",
            "latency[upper]",
            "latency[count]",
            "latency[mean][95]",
            "latency[upper][95]",
            "latency[mean][99]",
            "latency[upper][99]",
        ]
    );

    assert_eq!(relay.stats().flush_length, 10);
    assert_eq!(relay.stats().last_flush, 1_700_000_000);
}

#[test]
fn test_flush_with_empty_batch_still_sends() {
    let batch = MetricBatch::default();

    let mut relay = relay_with(MemorySender::new());
    relay.flush(123, &batch);

    assert_eq!(relay.sender().send_calls, 1);
    assert_eq!(relay.sender().sent_batches[0].len(), 0);
    assert_eq!(relay.stats().flush_length, 0);
    assert_eq!(relay.stats().last_flush, 123);
}

#[test]
fn test_undecodable_stat_does_not_abort_flush() {
    let mut batch = MetricBatch::default();
    batch.counters.insert("nodelimiter".to_string(), 5.0);
    batch.counters.insert("web01_requests".to_string(), 10.0);
    batch.gauges.insert("web02_connections".to_string(), 3.0);

    let mut relay = relay_with(MemorySender::new());
    relay.flush(456, &batch);

    let sent = &relay.sender().sent_batches[0];
    // The bad stat contributes nothing; both valid stats go through.
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|item| !item.key.contains("nodelimiter")));
    assert!(relay.stats().last_exception > 0);
    assert_eq!(relay.stats().last_flush, 456);
}

#[test]
fn test_send_failure_clears_buffer_and_records_error() {
    let mut batch = MetricBatch::default();
    batch.gauges.insert("web01_connections".to_string(), 7.0);

    let mut relay = relay_with(MemorySender::failing());
    relay.flush(789, &batch);

    assert_eq!(relay.sender().send_calls, 1);
    // Buffered items are discarded so the next cycle starts clean.
    assert_eq!(relay.sender().item_count(), 0);
    assert!(relay.stats().last_exception > 0);
    assert_eq!(relay.stats().last_flush, 0);
    // The item count of the attempted flush is still observable.
    assert_eq!(relay.stats().flush_length, 1);
}

#[test]
fn test_fixed_host_relays_full_stat_names() {
    let mut batch = MetricBatch::default();
    batch.counters.insert("my.statsd.key".to_string(), 1.0);

    let mut relay = Relay::new(
        TargetResolver::fixed_host("pinned"),
        MemorySender::new(),
        Duration::from_secs(1),
    );
    relay.flush(1, &batch);

    let sent = &relay.sender().sent_batches[0];
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|item| item.host == "pinned"));
    assert_eq!(sent[0].key, "my.statsd.key[total]");
    assert_eq!(sent[1].key, "my.statsd.key[avg]");
}

#[test]
fn test_repeated_flushes_are_idempotent() {
    let mut batch = MetricBatch::default();
    batch
        .timers
        .insert("web01_latency".to_string(), vec![5.0, 1.0, 3.0]);
    batch.pct_thresholds = vec![90.0];

    let mut relay = relay_with(MemorySender::new());
    relay.flush(1, &batch);
    relay.flush(2, &batch);

    let batches = &relay.sender().sent_batches;
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0], batches[1]);
}

#[test]
fn test_status_reports_all_fields() {
    let mut batch = MetricBatch::default();
    batch.gauges.insert("web01_connections".to_string(), 1.0);

    let mut relay = relay_with(MemorySender::new());
    relay.flush(42, &batch);

    let mut seen = Vec::new();
    relay.status(|source, key, value| {
        assert_eq!(source, "zabbix");
        seen.push((key, value));
    });

    let keys: Vec<&str> = seen.iter().map(|(key, _)| *key).collect();
    assert_eq!(
        keys,
        vec!["last_flush", "last_exception", "flush_time", "flush_length"]
    );
    assert!(seen.contains(&("last_flush", 42)));
    assert!(seen.contains(&("flush_length", 1)));
}
