//! Polling connector and telemetry normalization for Netgear Plus
//! smart managed switches.
//!
//! Builds on `plusmon-api` (detection, authentication, page parsing)
//! and owns the domain side of a poll cycle:
//!
//! - **[`Connector`]** — per-switch orchestrator: ensure session,
//!   fetch pages with the mandatory inter-request pacing, parse,
//!   normalize, emit a [`SwitchSnapshot`]. Also carries the PoE, LED
//!   and reboot controls with the device's literal `SUCCESS`
//!   acknowledgement contract.
//!
//! - **[`normalize`](normalize())** — pure telemetry normalization:
//!   per-port deltas and rates from raw monotonic counters, with the
//!   low-pass clamp (counter resets are not negative traffic), the
//!   stale-read fallback (a misread zero on a live port reuses the
//!   previous value) and the high-pass clamp (super-physical readings
//!   are rejected). Megabyte conversion happens once at the output
//!   boundary.
//!
//! - **[`token_cache`]** — optional on-disk session token persistence
//!   so restarts do not burn the device's scarce session slots.
//!
//! Every Connector is fully sequential and shares no state with any
//! other; polling N switches composes N independent Connectors.

pub mod config;
pub mod connector;
pub mod error;
pub mod metrics;
pub mod normalize;
pub mod token_cache;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::ConnectorConfig;
pub use connector::Connector;
pub use error::CoreError;
pub use metrics::{
    AggregateMetrics, NormalizedMetrics, PoeStatus, PortLink, PortMetrics, SampleBaseline,
    SnapshotMetadata, SwitchSnapshot,
};
pub use normalize::{normalize, to_megabytes};
pub use token_cache::CachedToken;

// Device-facing types callers commonly need alongside the connector.
pub use plusmon_api::{ModelDescriptor, PortPower, SessionState, SwitchMetadata};
