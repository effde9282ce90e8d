// ── Telemetry normalization ──
//
// Pure per-cycle computation: raw monotonic counters plus the previous
// baseline in, stable rate-limited metrics out. Counters are glitchy
// in practice -- devices reset, pages get misread, registers overflow
// -- so every derived value passes a low-pass clamp (no negative
// traffic), a stale-read fallback (no false zeroes on live ports) and
// a high-pass clamp (no super-physical rates).
//
// Known accuracy limitation, preserved deliberately: the stale-read
// fallback cannot tell a genuinely idle-but-up link from a misread
// zero, and substitutes the previous value for both.

use tracing::info;

use plusmon_api::RawPortSample;

use crate::metrics::{
    AggregateMetrics, NormalizedMetrics, PortLink, PortMetrics, SampleBaseline,
};

/// Physical ceiling: 1 GB/s per port. Deltas above the equivalent
/// amount over the sample interval are misreads, not traffic.
const MAX_SPEED_BYTES_PER_SEC: f64 = 1e9;

/// Byte-to-megabyte conversion, rounded to two decimals. Applied once
/// at the output boundary, never internally, so rounding error cannot
/// compound across cycles.
pub fn to_megabytes(bytes: f64) -> f64 {
    (bytes * 1e-6 * 100.0).round() / 100.0
}

/// Normalize one cycle's raw sample against the previous baseline.
///
/// `elapsed_secs` is the wall-clock time since the previous successful
/// cycle; zero (first cycle, or offline replay) selects a sample
/// factor of 1 so deltas pass through unscaled and nothing divides by
/// zero. Returns the metrics and the baseline to hand back on the next
/// cycle.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn normalize(
    sample: &RawPortSample,
    links: &[PortLink],
    previous: Option<&SampleBaseline>,
    elapsed_secs: f64,
) -> (NormalizedMetrics, SampleBaseline) {
    let ports = sample.rx.len();
    let sample_factor = if elapsed_secs > 0.0 {
        1.0 / elapsed_secs
    } else {
        1.0
    };
    let max_delta = MAX_SPEED_BYTES_PER_SEC / sample_factor;

    let mut baseline = SampleBaseline {
        rx: sample.rx.clone(),
        tx: sample.tx.clone(),
        crc: sample.crc.clone(),
        sum_rx: sample.rx.clone(),
        sum_tx: sample.tx.clone(),
        speed_io: vec![0.0; ports],
    };

    let mut out_ports = Vec::with_capacity(ports);
    let mut total_traffic_rx = 0.0;
    let mut total_traffic_tx = 0.0;
    let mut total_crc: u64 = 0;
    let mut total_speed_rx = 0.0;
    let mut total_speed_tx = 0.0;

    for i in 0..ports {
        let prev_at = |field: fn(&SampleBaseline) -> &Vec<u64>| -> u64 {
            previous.and_then(|p| field(p).get(i).copied()).unwrap_or(0)
        };

        // Deltas against the baseline; with no baseline (first cycle)
        // the raw values pass through as deltas.
        let (mut delta_rx, mut delta_tx, mut delta_crc) = match previous {
            Some(_) => (
                sample.rx[i] as f64 - prev_at(|p| &p.rx) as f64,
                sample.tx[i] as f64 - prev_at(|p| &p.tx) as f64,
                sample.crc[i] as f64 - prev_at(|p| &p.crc) as f64,
            ),
            None => (
                sample.rx[i] as f64,
                sample.tx[i] as f64,
                sample.crc[i] as f64,
            ),
        };

        let mut speed_rx = delta_rx * sample_factor;
        let mut speed_tx = delta_tx * sample_factor;
        let mut speed_io = speed_rx + speed_tx;

        // Low-pass clamp: a negative delta is a counter reset, never
        // negative traffic.
        delta_rx = delta_rx.max(0.0);
        delta_tx = delta_tx.max(0.0);
        delta_crc = delta_crc.max(0.0);
        speed_rx = speed_rx.max(0.0);
        speed_tx = speed_tx.max(0.0);
        speed_io = speed_io.max(0.0);

        let mut sum_rx = sample.rx[i] as f64;
        let mut sum_tx = sample.tx[i] as f64;

        // Stale-read fallback: a connected port reporting nothing is a
        // misread page, not silence. Substitute the previous value and
        // carry it forward so a single bad scrape cannot zero the
        // series -- see the module note on the idle-link ambiguity.
        let connected = links.get(i).is_some_and(|l| l.connected);
        if connected {
            if let Some(prev) = previous {
                if sum_rx <= 0.0 {
                    let substituted = prev.sum_rx.get(i).copied().unwrap_or(0);
                    info!(port = i + 1, value = substituted, "fallback to previous rx total");
                    sum_rx = substituted as f64;
                    baseline.sum_rx[i] = substituted;
                }
                if sum_tx <= 0.0 {
                    let substituted = prev.sum_tx.get(i).copied().unwrap_or(0);
                    info!(port = i + 1, value = substituted, "fallback to previous tx total");
                    sum_tx = substituted as f64;
                    baseline.sum_tx[i] = substituted;
                }
                if speed_io <= 0.0 {
                    let substituted = prev.speed_io.get(i).copied().unwrap_or(0.0);
                    if substituted > 0.0 {
                        info!(port = i + 1, value = substituted, "fallback to previous io rate");
                    }
                    speed_io = substituted;
                }
            }
        }

        // High-pass clamp: reject misread/overflowed counters.
        delta_rx = delta_rx.min(max_delta);
        delta_tx = delta_tx.min(max_delta);
        delta_crc = delta_crc.min(max_delta);
        speed_rx = speed_rx.min(MAX_SPEED_BYTES_PER_SEC);
        speed_tx = speed_tx.min(MAX_SPEED_BYTES_PER_SEC);

        total_traffic_rx += delta_rx;
        total_traffic_tx += delta_tx;
        total_crc += delta_crc as u64;
        total_speed_rx += speed_rx;
        total_speed_tx += speed_tx;

        baseline.speed_io[i] = speed_io;

        out_ports.push(PortMetrics {
            traffic_rx_mb: to_megabytes(delta_rx),
            traffic_tx_mb: to_megabytes(delta_tx),
            crc_errors: delta_crc as u64,
            speed_rx_mb: to_megabytes(speed_rx),
            speed_tx_mb: to_megabytes(speed_tx),
            speed_io_mb: to_megabytes(speed_io),
            sum_rx_mb: to_megabytes(sum_rx),
            sum_tx_mb: to_megabytes(sum_tx),
            link: links.get(i).copied().unwrap_or_default(),
        });
    }

    let metrics = NormalizedMetrics {
        ports: out_ports,
        totals: AggregateMetrics {
            traffic_rx_mb: to_megabytes(total_traffic_rx),
            traffic_tx_mb: to_megabytes(total_traffic_tx),
            crc_errors: total_crc,
            speed_rx_mb: to_megabytes(total_speed_rx),
            speed_tx_mb: to_megabytes(total_speed_tx),
            speed_io_mb: to_megabytes(total_speed_rx + total_speed_tx),
        },
        response_time_s: (elapsed_secs * 10.0).round() / 10.0,
    };
    (metrics, baseline)
}
