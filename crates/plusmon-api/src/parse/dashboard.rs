// Dashboard-page models (GS305EP/GS308EP and siblings). Everything the
// poller needs for metadata, link status and the LED bank sits on one
// dashboard page; statistics carry 64-bit counters split into two
// 32-bit register halves per metric.

use regex::Regex;

use crate::error::Error;
use crate::parse::{
    RawPortLink, RawPortSample, SwitchMetadata, all_captures, first_capture, input_values,
    pad_counters, pad_links, parse_counter, strip_duplex,
};

/// Text following a labelled info span ("ml198" serial, "ml089"
/// firmware); the value lives in the next span after the label.
fn labelled_value(body: &str, label: &str) -> Option<String> {
    first_capture(
        body,
        &format!(r"(?s)>\s*{label}\s*</span>.*?<span[^>]*>\s*([^<]*?)\s*</span>"),
    )
    .filter(|v| !v.is_empty())
}

pub(super) fn parse_metadata(body: &str) -> Result<SwitchMetadata, Error> {
    let name = first_capture(body, r#"(?is)<div[^>]*id="switch_name"[^>]*>\s*(.*?)\s*</div>"#)
        .unwrap_or_default();
    let serial = labelled_value(body, "ml198").ok_or_else(|| Error::Parse {
        message: "serial number label not found on dashboard".into(),
    })?;
    let firmware = labelled_value(body, "ml089").ok_or_else(|| Error::Parse {
        message: "firmware label not found on dashboard".into(),
    })?;
    Ok(SwitchMetadata {
        name,
        serial,
        firmware,
        bootloader: "unknown".into(),
    })
}

pub(super) fn parse_led_status(body: &str) -> Option<bool> {
    first_capture(body, r#"(?is)<span[^>]*id="led_switch"[^>]*>\s*(.*?)\s*</span>"#)
        .map(|text| text == "ON")
}

pub(super) fn parse_link_status(body: &str, ports: usize) -> Vec<RawPortLink> {
    let modus = input_values(body, "class", "Speed");
    let linked = input_values(body, "class", "LinkedSpeed");

    let mut links = Vec::with_capacity(ports);
    for port0 in 0..ports {
        let port = port0 + 1;
        // The per-port block is named isShowPot<n>; the first span in
        // it carries the status text.
        let status = first_capture(
            body,
            &format!(r#"(?s)name="isShowPot{port}"(.*?)</span>"#),
        )
        .and_then(|block| first_capture(&block, r"(?s)<span[^>]*>\s*([^<]*?)\s*\z"))
        .unwrap_or_default();

        let modus_speed = match modus.get(port0).map(String::as_str) {
            Some("1") => "Auto".to_owned(),
            Some(other) => other.to_owned(),
            None => String::new(),
        };
        let connection_speed = linked
            .get(port0)
            .map(|v| strip_duplex(v))
            .unwrap_or_default();

        links.push(RawPortLink {
            status,
            modus_speed,
            connection_speed,
        });
    }
    pad_links(links, ports)
}

pub(super) fn parse_counters(body: &str, ports: usize) -> RawPortSample {
    // Statistics live in unnamed hidden inputs inside the status
    // container, six per port: rx, tx and crc as high/low halves.
    let slice = match body.find("settingsStatusContainer") {
        Some(idx) => &body[idx..],
        None => body,
    };
    let mut values = Vec::new();
    if let Ok(tag_re) = Regex::new(r"<input[^>]*>") {
        if let Ok(value_re) = Regex::new(r#"\bvalue="([^"]*)""#) {
            for tag in tag_re.find_iter(slice) {
                if tag.as_str().contains("name=") {
                    continue;
                }
                if let Some(c) = value_re.captures(tag.as_str()).and_then(|c| c.get(1)) {
                    values.push(parse_counter(c.as_str(), 10));
                }
            }
        }
    }

    let mut rx = Vec::new();
    let mut tx = Vec::new();
    let mut crc = Vec::new();
    for chunk in values.chunks_exact(6) {
        rx.push(super::combine_registers(chunk[0], chunk[1]));
        tx.push(super::combine_registers(chunk[2], chunk[3]));
        crc.push(super::combine_registers(chunk[4], chunk[5]));
    }
    RawPortSample {
        rx: pad_counters(rx, ports),
        tx: pad_counters(tx, ports),
        crc: pad_counters(crc, ports),
    }
}

pub(super) fn parse_poe_config(body: &str) -> Vec<bool> {
    input_values(body, "id", "hidPortPwr")
        .iter()
        .map(|v| v == "1")
        .collect()
}

pub(super) fn parse_poe_status(body: &str) -> Vec<f64> {
    body.split("poe_port_status")
        .skip(1)
        .map(|block| {
            let spans = all_captures(block, r"(?s)<span[^>]*>\s*([^<]*?)\s*</span>");
            spans
                .get(5)
                .and_then(|v| v.parse::<f64>().ok())
                .unwrap_or(0.0)
        })
        .collect()
}
