use std::time::Duration;

use crate::zabbix::Item;

/// Expands a counter total into its trapper items.
///
/// Emits `key[total]` with the raw total and `key[avg]` with the
/// per-second rate over the flush interval, in that order.
#[must_use]
pub fn items_for_counter(flush_interval: Duration, host: &str, key: &str, total: f64) -> Vec<Item> {
    let avg = total / flush_interval.as_secs_f64();

    vec![
        Item::new(host, format!("{key}[total]"), total),
        Item::new(host, format!("{key}[avg]"), avg),
    ]
}

/// Expands a timer's samples into its trapper items.
///
/// Emits `key[lower]`, `key[upper]`, and `key[count]`, then a
/// `key[mean][p]` / `key[upper][p]` pair per configured percentile, in the
/// caller-supplied percentile order. Duplicate percentiles each produce
/// their own pair.
///
/// The percentile statistics are the count-based approximation statsd
/// itself uses: drop the top `(100 - p)%` of samples by count and report
/// the boundary value and arithmetic mean of the remainder. With one or
/// zero samples there is nothing to slice and the overall bounds are
/// reported instead.
#[must_use]
pub fn items_for_timer(percentiles: &[f64], host: &str, key: &str, samples: &[f64]) -> Vec<Item> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let lower = sorted.first().copied().unwrap_or(0.0);
    let upper = sorted.last().copied().unwrap_or(0.0);

    #[allow(clippy::cast_precision_loss)]
    let mut items = vec![
        Item::new(host, format!("{key}[lower]"), lower),
        Item::new(host, format!("{key}[upper]"), upper),
        Item::new(host, format!("{key}[count]"), count as f64),
    ];

    let mut mean = lower;
    let mut max_at_threshold = upper;

    for &percentile in percentiles {
        let label = percentile_label(percentile);

        if count > 1 {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let threshold_index = ((100.0 - percentile) / 100.0 * count as f64).round() as usize;
            let num_in_threshold = count.saturating_sub(threshold_index);

            if num_in_threshold == 0 {
                // Percentile small enough to exclude every sample.
                mean = 0.0;
                max_at_threshold = 0.0;
            } else {
                let in_threshold = &sorted[..num_in_threshold];
                max_at_threshold = in_threshold[num_in_threshold - 1];
                #[allow(clippy::cast_precision_loss)]
                {
                    mean = in_threshold.iter().sum::<f64>() / num_in_threshold as f64;
                }
            }
        }

        items.push(Item::new(host, format!("{key}[mean][{label}]"), mean));
        items.push(Item::new(
            host,
            format!("{key}[upper][{label}]"),
            max_at_threshold,
        ));
    }

    items
}

/// Expands a gauge into its single trapper item: `key` with the current
/// value.
#[must_use]
pub fn items_for_gauge(host: &str, key: &str, value: f64) -> Vec<Item> {
    vec![Item::new(host, key, value)]
}

/// Formats a percentile for use inside an item key, with dots replaced by
/// underscores (`99.9` -> `99_9`).
fn percentile_label(percentile: f64) -> String {
    let text = if percentile.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation)]
        let whole = percentile as i64;
        itoa::Buffer::new().format(whole).to_string()
    } else {
        percentile.to_string()
    };
    text.replace('.', "_")
}
