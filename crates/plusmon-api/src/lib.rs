//! Async client for the web management UI of Netgear Plus smart
//! managed switches.
//!
//! These devices have no structured API -- their only management
//! surface is the HTML configuration UI, and hardware/firmware
//! variants differ in authentication scheme, page layout and counter
//! encoding. This crate owns everything device-facing:
//!
//! - **[`model`]** — the registry of immutable [`ModelDescriptor`]s:
//!   capabilities, endpoint templates and the strategy tags
//!   (credential scheme, parser family, PoE form layout) that select
//!   per-family behavior.
//!
//! - **[`crypt`]** — the password-hashing strategies the login forms
//!   expect, dispatched by descriptor.
//!
//! - **[`fetch`]** — [`PageFetcher`]: live HTTP with manual session
//!   cookies and a silent-expiry body check, or canned pages from disk
//!   for deterministic offline testing.
//!
//! - **[`parse`]** — one [`PageParser`] variant per device family,
//!   extracting challenge tokens, counters, link status and metadata
//!   from the tag soup the firmware serves.
//!
//! - **[`session`]** — [`SwitchClient`]: the detection / login /
//!   re-authentication / lockout state machine, with the bounded
//!   re-login that recovers from sessions the devices expire without
//!   any protocol-level signal.
//!
//! `plusmon-core` builds the polling connector and telemetry
//! normalization on top of this crate.

pub mod crypt;
pub mod error;
pub mod fetch;
pub mod model;
pub mod parse;
pub mod session;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::Error;
pub use fetch::{DEFAULT_TIMEOUT, FetchMode, LoginReply, PageFetcher, PageResponse};
pub use model::{
    CredentialScheme, DetectionCheck, HttpMethod, ModelDescriptor, ParserFamily, PoeForm,
    PortPower, Template, TemplateParam, registry, unique_id,
};
pub use parse::{PageParser, RawPortLink, RawPortSample, SwitchMetadata};
pub use session::{MAX_AUTHENTICATION_FAILURES, SessionState, SwitchClient};
