// ── Page parsing ──
//
// One parser variant per device family. The pages are tag soup from
// embedded firmware, so extraction is anchored-regex based rather than
// a full DOM walk: every field the poller needs sits in a hidden input,
// a fixed table cell, or a script variable.
//
// All counter parsers zero-pad to the expected port count -- firmware
// that omits ports must not shorten the output -- and decode
// unparsable cells as 0.

mod classic;
mod dashboard;
mod emx;
mod iss;
mod script;

use regex::Regex;

use crate::error::Error;
use crate::model::ParserFamily;

pub use classic::ClassicState;

/// Raw monotonic counters scraped this cycle, one entry per port
/// (index 0 = port 1). Values are bytes as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPortSample {
    pub rx: Vec<u64>,
    pub tx: Vec<u64>,
    pub crc: Vec<u64>,
}

impl RawPortSample {
    pub fn zeroed(ports: usize) -> Self {
        Self {
            rx: vec![0; ports],
            tx: vec![0; ports],
            crc: vec![0; ports],
        }
    }
}

/// Raw link attributes for one port, as scraped (untranslated text).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPortLink {
    pub status: String,
    pub modus_speed: String,
    pub connection_speed: String,
}

/// Identity strings scraped from the device info page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchMetadata {
    pub name: String,
    pub serial: String,
    pub firmware: String,
    pub bootloader: String,
}

// ── Extraction helpers ──────────────────────────────────────────────

/// Value of the first `<input>` whose `attr` attribute equals `key`.
/// Both attribute orders occur in the wild.
pub(crate) fn input_value(body: &str, attr: &str, key: &str) -> Option<String> {
    let forward = format!(r#"<input[^>]*\b{attr}="{key}"[^>]*\bvalue="([^"]*)""#);
    if let Some(v) = first_capture(body, &forward) {
        return Some(v);
    }
    let reversed = format!(r#"<input[^>]*\bvalue="([^"]*)"[^>]*\b{attr}="{key}""#);
    first_capture(body, &reversed)
}

/// Values of every `<input>` whose `attr` attribute equals `key`, in
/// document order.
pub(crate) fn input_values(body: &str, attr: &str, key: &str) -> Vec<String> {
    let mut out = Vec::new();
    let anchor = format!(r#"\b{attr}="{key}""#);
    let Ok(tag_re) = Regex::new(r"<input[^>]*>") else {
        return out;
    };
    let Ok(anchor_re) = Regex::new(&anchor) else {
        return out;
    };
    let Ok(value_re) = Regex::new(r#"\bvalue="([^"]*)""#) else {
        return out;
    };
    for tag in tag_re.find_iter(body) {
        if anchor_re.is_match(tag.as_str()) {
            if let Some(c) = value_re.captures(tag.as_str()).and_then(|c| c.get(1)) {
                out.push(c.as_str().to_owned());
            }
        }
    }
    out
}

pub(crate) fn first_capture(body: &str, pattern: &str) -> Option<String> {
    Regex::new(pattern)
        .ok()?
        .captures(body)?
        .get(1)
        .map(|m| m.as_str().to_owned())
}

pub(crate) fn all_captures(body: &str, pattern: &str) -> Vec<String> {
    Regex::new(pattern)
        .map(|re| {
            re.captures_iter(body)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_owned()))
                .collect()
        })
        .unwrap_or_default()
}

/// Strip markup from a table-cell capture and collapse whitespace.
pub(crate) fn cell_text(raw: &str) -> String {
    let text = Regex::new(r"<[^>]+>")
        .map(|re| re.replace_all(raw, "").into_owned())
        .unwrap_or_else(|_| raw.to_owned());
    text.trim().to_owned()
}

/// Remove the duplex suffix from a link-speed label ("1G full" -> "1G").
pub(crate) fn strip_duplex(text: &str) -> String {
    Regex::new(r"(?i)full|half")
        .map(|re| re.replace_all(text, "").into_owned())
        .unwrap_or_else(|_| text.to_owned())
        .trim()
        .to_owned()
}

/// Lenient integer decode: anything unparsable is 0, matching how the
/// firmware renders dashes or blanks into counter cells.
pub(crate) fn parse_counter(text: &str, radix: u32) -> u64 {
    u64::from_str_radix(text.trim(), radix).unwrap_or(0)
}

/// Combine a 64-bit counter split across two 32-bit register halves.
pub(crate) fn combine_registers(high: u64, low: u64) -> u64 {
    high.wrapping_mul(1 << 32).wrapping_add(low)
}

pub(crate) fn pad_counters(mut values: Vec<u64>, ports: usize) -> Vec<u64> {
    values.resize(ports, 0);
    values.truncate(ports);
    values
}

pub(crate) fn pad_links(mut links: Vec<RawPortLink>, ports: usize) -> Vec<RawPortLink> {
    links.resize(ports, RawPortLink::default());
    links.truncate(ports);
    links
}

/// Counter parser for the `<tr class="portID">` table layout shared by
/// the classic and multi-gig families: one row per port, cells
/// port / rx / tx / crc.
pub(crate) fn portid_table_counters(body: &str, ports: usize) -> RawPortSample {
    let rows = all_captures(body, r#"(?is)<tr[^>]*class="portID"[^>]*>(.*?)</tr>"#);
    let mut rx = Vec::new();
    let mut tx = Vec::new();
    let mut crc = Vec::new();
    for row in rows {
        let cells: Vec<String> = all_captures(&row, r"(?is)<td[^>]*>(.*?)</td>")
            .iter()
            .map(|c| cell_text(c))
            .collect();
        rx.push(cells.get(1).map_or(0, |c| parse_counter(c, 10)));
        tx.push(cells.get(2).map_or(0, |c| parse_counter(c, 10)));
        crc.push(cells.get(3).map_or(0, |c| parse_counter(c, 10)));
    }
    RawPortSample {
        rx: pad_counters(rx, ports),
        tx: pad_counters(tx, ports),
        crc: pad_counters(crc, ports),
    }
}

// ── Detection signals ───────────────────────────────────────────────
//
// Model-independent probes run against a candidate login page before
// any descriptor is bound.

/// Hidden one-time challenge field, when the firmware serves one.
pub fn parse_challenge_field(body: &str) -> Option<String> {
    input_value(body, "id", "rand").filter(|v| !v.is_empty())
}

/// Page title with the vendor prefix stripped.
pub fn parse_login_title(body: &str) -> Option<String> {
    let title = first_capture(body, r"(?is)<title>\s*(.*?)\s*</title>")?;
    let cleaned = title.replace("NETGEAR", "").trim().to_owned();
    if cleaned.is_empty() { None } else { Some(cleaned) }
}

/// Info banner div naming the exact model; the strongest signal.
pub fn parse_info_banner(body: &str) -> Option<String> {
    first_capture(body, r#"(?is)<div[^>]*class="switchInfo"[^>]*>\s*(.*?)\s*</div>"#)
        .map(|s| cell_text(&s))
        .filter(|s| !s.is_empty())
}

/// Model name embedded in the first script's metadata variable.
pub fn parse_script_model(body: &str) -> Option<String> {
    first_capture(body, r"sysGeneInfor\s*=\s*'([^?']+)")
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Session token embedded as a hidden form field by families that do
/// not set cookies.
pub fn parse_session_token(body: &str) -> Option<String> {
    input_value(body, "name", "Gambit").filter(|v| !v.is_empty())
}

// ── Family dispatch ─────────────────────────────────────────────────

/// Parser for one bound device family. Holds per-family state where the
/// page layout depends on earlier pages (the classic family's counter
/// encoding is selected by firmware version from the info page).
#[derive(Debug)]
pub enum PageParser {
    Classic(ClassicState),
    Dashboard,
    Emx,
    Iss,
    Script,
}

impl PageParser {
    pub fn new(family: ParserFamily) -> Self {
        match family {
            ParserFamily::Classic => Self::Classic(ClassicState::default()),
            ParserFamily::Dashboard => Self::Dashboard,
            ParserFamily::Emx => Self::Emx,
            ParserFamily::Iss => Self::Iss,
            ParserFamily::Script => Self::Script,
        }
    }

    /// One-time login challenge, if the page carries one.
    pub fn parse_challenge(&self, body: &str) -> Option<String> {
        parse_challenge_field(body)
    }

    /// Per-session page hash required by some request templates.
    pub fn parse_client_hash(&self, body: &str) -> Option<String> {
        match self {
            Self::Classic(_) | Self::Dashboard => {
                input_value(body, "name", "hash").filter(|v| !v.is_empty())
            }
            Self::Emx | Self::Iss => None,
            Self::Script => {
                first_capture(body, r"secureRand\s*=\s*'([^']+)';").filter(|v| !v.is_empty())
            }
        }
    }

    /// Device identity from the info page. Mutates classic-family state
    /// (the firmware version selects the counter encoding).
    pub fn parse_metadata(&mut self, body: &str) -> Result<SwitchMetadata, Error> {
        match self {
            Self::Classic(state) => classic::parse_metadata(state, body),
            Self::Dashboard => dashboard::parse_metadata(body),
            Self::Emx => emx::parse_metadata(body),
            Self::Iss => iss::parse_metadata(body),
            Self::Script => script::parse_metadata(body),
        }
    }

    /// Raw per-port counters from the statistics page.
    pub fn parse_counters(&self, body: &str, ports: usize) -> Result<RawPortSample, Error> {
        match self {
            Self::Classic(state) => classic::parse_counters(state, body, ports),
            Self::Dashboard => Ok(dashboard::parse_counters(body, ports)),
            Self::Emx => Ok(portid_table_counters(body, ports)),
            Self::Iss => iss::parse_counters(body, ports),
            Self::Script => Ok(script::parse_counters(body, ports)),
        }
    }

    /// Per-port link status from the status page.
    pub fn parse_link_status(&self, body: &str, ports: usize) -> Vec<RawPortLink> {
        match self {
            Self::Classic(_) => classic::parse_link_status(body, ports),
            Self::Dashboard => dashboard::parse_link_status(body, ports),
            Self::Emx => emx::parse_link_status(body, ports),
            Self::Iss => iss::parse_link_status(body, ports),
            Self::Script => script::parse_link_status(body, ports),
        }
    }

    /// Human-readable device error message, for diagnostics only.
    pub fn parse_error_message(&self, body: &str) -> Option<String> {
        match self {
            Self::Classic(_) | Self::Emx | Self::Iss => {
                input_value(body, "id", "err_msg").filter(|v| !v.is_empty())
            }
            Self::Dashboard | Self::Script => first_capture(
                body,
                r#"(?is)<div[^>]*class="pwdErrStyle"[^>]*>\s*(.*?)\s*</div>"#,
            )
            .map(|s| cell_text(&s))
            .filter(|s| !s.is_empty()),
        }
    }

    /// Front panel LED state, on families that expose it.
    pub fn parse_led_status(&self, body: &str) -> Option<bool> {
        match self {
            Self::Dashboard => dashboard::parse_led_status(body),
            Self::Iss => iss::parse_led_status(body),
            _ => None,
        }
    }

    /// Per-PoE-port admin state (enabled/disabled), in port order.
    pub fn parse_poe_config(&self, body: &str) -> Vec<bool> {
        match self {
            Self::Dashboard => dashboard::parse_poe_config(body),
            Self::Iss => iss::parse_poe_config(body),
            _ => Vec::new(),
        }
    }

    /// Per-PoE-port output power in watts, in port order.
    pub fn parse_poe_status(&self, body: &str) -> Vec<f64> {
        match self {
            Self::Dashboard => dashboard::parse_poe_status(body),
            Self::Iss => iss::parse_poe_status(body),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn challenge_field_extracted_from_login_page() {
        let body = r#"<form><input type="hidden" id="rand" value="1763184457"></form>"#;
        assert_eq!(parse_challenge_field(body).as_deref(), Some("1763184457"));
        assert_eq!(parse_challenge_field("<form></form>"), None);
    }

    #[test]
    fn login_title_strips_vendor_prefix() {
        let body = "<html><head><title>NETGEAR GS308E</title></head></html>";
        assert_eq!(parse_login_title(body).as_deref(), Some("GS308E"));
    }

    #[test]
    fn info_banner_is_extracted() {
        let body = r#"<div class="switchInfo">GS308E - 8-Port Gigabit ProSAFE Plus Switch</div>"#;
        assert_eq!(
            parse_info_banner(body).as_deref(),
            Some("GS308E - 8-Port Gigabit ProSAFE Plus Switch")
        );
    }

    #[test]
    fn script_model_is_first_metadata_field() {
        let body = "<script>sysGeneInfor = 'JGS516PE?switch?V2.6.0.48?more';</script>";
        assert_eq!(parse_script_model(body).as_deref(), Some("JGS516PE"));
    }

    #[test]
    fn session_token_from_hidden_gambit_field() {
        let body = r#"<input type="hidden" name="Gambit" value="a1b2c3">"#;
        assert_eq!(parse_session_token(body).as_deref(), Some("a1b2c3"));
    }

    #[test]
    fn input_value_handles_either_attribute_order() {
        let forward = r#"<input id="rand" value="42">"#;
        let reversed = r#"<input value="42" id="rand">"#;
        assert_eq!(input_value(forward, "id", "rand").as_deref(), Some("42"));
        assert_eq!(input_value(reversed, "id", "rand").as_deref(), Some("42"));
    }

    #[test]
    fn duplex_suffix_is_stripped() {
        assert_eq!(strip_duplex("1000M Full"), "1000M");
        assert_eq!(strip_duplex("100M half"), "100M");
        assert_eq!(strip_duplex("10G"), "10G");
    }

    #[test]
    fn register_halves_combine() {
        assert_eq!(combine_registers(0, 1234), 1234);
        assert_eq!(combine_registers(2, 5), 2 * 4_294_967_296 + 5);
    }

    #[test]
    fn counters_pad_to_port_count() {
        assert_eq!(pad_counters(vec![1, 2], 4), vec![1, 2, 0, 0]);
        assert_eq!(pad_counters(vec![1, 2, 3, 4, 5], 4), vec![1, 2, 3, 4]);
    }
}
