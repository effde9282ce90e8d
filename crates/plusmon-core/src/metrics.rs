// ── Telemetry domain types ──
//
// Canonical per-port and aggregate metrics produced once per poll
// cycle, plus the baseline the next cycle's deltas are computed
// against. Raw scraped values live in `plusmon_api::parse`; everything
// here is already translated and unit-converted.

use serde::Serialize;

use plusmon_api::{RawPortLink, SwitchMetadata};

/// Status labels the firmware uses for a connected port, across
/// localizations.
const PORT_STATUS_CONNECTED: &[&str] = &["Aktiv", "Up", "UP", "CONNECTED"];

/// Modus labels that mean auto-negotiation.
const PORT_MODUS_SPEED: &[&str] = &["Auto"];

/// Normalized link state for one port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PortLink {
    pub connected: bool,
    /// Auto-negotiation enabled.
    pub modus_auto: bool,
    /// Negotiated speed in Mbit/s; 0 when down or unknown.
    pub speed_mbit: u32,
}

impl PortLink {
    /// Translate the scraped status/speed labels. Unknown labels read
    /// as down / 0 Mbit rather than an error -- firmware localization
    /// varies more than the counter layout does.
    pub fn from_raw(raw: &RawPortLink) -> Self {
        let connected = PORT_STATUS_CONNECTED.contains(&raw.status.as_str());
        let modus_auto = PORT_MODUS_SPEED.contains(&raw.modus_speed.as_str());
        let speed_mbit = match raw.connection_speed.to_uppercase().as_str() {
            "10G" => 10_000,
            "5G" => 5_000,
            "2.5G" => 2_500,
            "1G" | "1000M" => 1_000,
            "100M" => 100,
            "10M" => 10,
            _ => 0,
        };
        Self {
            connected,
            modus_auto,
            speed_mbit,
        }
    }
}

/// Final per-port values for one cycle. Byte-denominated fields are in
/// megabytes, rounded once at the output boundary; CRC errors stay raw
/// counts.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PortMetrics {
    /// Bytes received/sent since the previous cycle.
    pub traffic_rx_mb: f64,
    pub traffic_tx_mb: f64,
    /// CRC errors since the previous cycle.
    pub crc_errors: u64,
    /// Instantaneous rates over the sample interval.
    pub speed_rx_mb: f64,
    pub speed_tx_mb: f64,
    pub speed_io_mb: f64,
    /// Cumulative counters as reported by the device.
    pub sum_rx_mb: f64,
    pub sum_tx_mb: f64,
    pub link: PortLink,
}

/// Aggregates across all ports.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateMetrics {
    pub traffic_rx_mb: f64,
    pub traffic_tx_mb: f64,
    pub crc_errors: u64,
    pub speed_rx_mb: f64,
    pub speed_tx_mb: f64,
    pub speed_io_mb: f64,
}

/// Everything the normalizer produces for one cycle. Immutable once
/// returned.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NormalizedMetrics {
    pub ports: Vec<PortMetrics>,
    pub totals: AggregateMetrics,
    /// Elapsed seconds between this cycle and the previous one,
    /// rounded to a tenth.
    pub response_time_s: f64,
}

/// Per-port PoE state scraped in the same cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoeStatus {
    /// Admin state per PoE port, in port order.
    pub active: Vec<bool>,
    /// Delivered power per PoE port in watts.
    pub output_power_w: Vec<f64>,
}

/// One complete poll result: identity, metrics and optional PoE/LED
/// state.
#[derive(Debug, Clone, Serialize)]
pub struct SwitchSnapshot {
    pub metadata: SnapshotMetadata,
    pub metrics: NormalizedMetrics,
    pub led_on: Option<bool>,
    pub poe: Option<PoeStatus>,
}

/// Device identity carried on every snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotMetadata {
    pub host: String,
    pub model: String,
    pub name: String,
    pub serial: String,
    pub firmware: String,
    pub bootloader: String,
}

impl SnapshotMetadata {
    pub fn new(host: &str, model: &str, meta: &SwitchMetadata) -> Self {
        Self {
            host: host.to_owned(),
            model: model.to_owned(),
            name: meta.name.clone(),
            serial: meta.serial.clone(),
            firmware: meta.firmware.clone(),
            bootloader: meta.bootloader.clone(),
        }
    }
}

/// Counter state carried from one successful cycle to the next.
/// Owned exclusively by the connector and replaced atomically at the
/// end of each successful cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBaseline {
    pub rx: Vec<u64>,
    pub tx: Vec<u64>,
    pub crc: Vec<u64>,
    /// Cumulative values after the stale-read fallback, so one bad
    /// scrape does not poison the next cycle's substitution source.
    pub sum_rx: Vec<u64>,
    pub sum_tx: Vec<u64>,
    /// Combined per-port rate of the previous cycle, the fallback
    /// source for misread zeroes on connected ports.
    pub speed_io: Vec<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: &str, modus: &str, speed: &str) -> RawPortLink {
        RawPortLink {
            status: status.to_owned(),
            modus_speed: modus.to_owned(),
            connection_speed: speed.to_owned(),
        }
    }

    #[test]
    fn connected_labels_across_localizations() {
        for status in ["Up", "UP", "Aktiv", "CONNECTED"] {
            assert!(PortLink::from_raw(&raw(status, "Auto", "1G")).connected);
        }
        assert!(!PortLink::from_raw(&raw("Down", "Auto", "No Speed")).connected);
        assert!(!PortLink::from_raw(&raw("", "", "")).connected);
    }

    #[test]
    fn connection_speed_translation() {
        assert_eq!(PortLink::from_raw(&raw("Up", "Auto", "10G")).speed_mbit, 10_000);
        assert_eq!(PortLink::from_raw(&raw("Up", "Auto", "2.5G")).speed_mbit, 2_500);
        assert_eq!(PortLink::from_raw(&raw("Up", "Auto", "1000M")).speed_mbit, 1_000);
        assert_eq!(PortLink::from_raw(&raw("Up", "Auto", "1g")).speed_mbit, 1_000);
        assert_eq!(PortLink::from_raw(&raw("Up", "Auto", "No Speed")).speed_mbit, 0);
    }

    #[test]
    fn modus_auto_flag() {
        assert!(PortLink::from_raw(&raw("Up", "Auto", "1G")).modus_auto);
        assert!(!PortLink::from_raw(&raw("Up", "100M full", "100M")).modus_auto);
    }
}
