// Rackmount PoE models (GS316EP/GS316EPP). Served under
// `/iss/specific/` with the session token in a hidden form field; the
// status page renders one styled block per port, statistics are a
// plain table with a header row.

use crate::error::Error;
use crate::parse::{
    RawPortLink, RawPortSample, SwitchMetadata, all_captures, cell_text, first_capture,
    input_value, pad_counters, pad_links, parse_counter, strip_duplex,
};

fn next_paragraph_text(body: &str, label: &str) -> Option<String> {
    first_capture(
        body,
        &format!(r"(?is){label}[^<]*</p>\s*<p[^>]*>\s*(.*?)\s*</p>"),
    )
    .map(|c| cell_text(&c))
    .filter(|v| !v.is_empty())
}

pub(super) fn parse_metadata(body: &str) -> Result<SwitchMetadata, Error> {
    let name = input_value(body, "name", "switchName").unwrap_or_default();
    let serial = next_paragraph_text(body, "Serial Number").unwrap_or_else(|| "unknown".into());
    let firmware = next_paragraph_text(body, "Firmware Version").ok_or_else(|| Error::Parse {
        message: "firmware version not found on dashboard".into(),
    })?;
    Ok(SwitchMetadata {
        name,
        serial,
        firmware,
        bootloader: "unknown".into(),
    })
}

pub(super) fn parse_led_status(body: &str) -> Option<bool> {
    let tag = first_capture(body, r#"(?is)(<input[^>]*id="ledStatus"[^>]*>)"#)?;
    Some(tag.contains("checked"))
}

pub(super) fn parse_link_status(body: &str, ports: usize) -> Vec<RawPortLink> {
    let statuses = all_captures(
        body,
        r#"(?is)<span[^>]*class="[^"]*status-on-port[^"]*"[^>]*>\s*(.*?)\s*</span>"#,
    );
    let blocks: Vec<&str> = body.split(r#"<div class="port-status""#).skip(1).collect();

    let mut links = Vec::with_capacity(ports);
    for port0 in 0..ports {
        let paragraphs = blocks
            .get(port0)
            .map(|block| all_captures(block, r"(?is)<p[^>]*>\s*(.*?)\s*</p>"))
            .unwrap_or_default();
        links.push(RawPortLink {
            status: statuses.get(port0).cloned().unwrap_or_default(),
            modus_speed: paragraphs.get(1).cloned().unwrap_or_default(),
            connection_speed: strip_duplex(&paragraphs.get(3).cloned().unwrap_or_default()),
        });
    }
    pad_links(links, ports)
}

pub(super) fn parse_counters(body: &str, ports: usize) -> Result<RawPortSample, Error> {
    // Flat cell list; the first table row is a header, so port N's
    // cells start at index N*4.
    let cells: Vec<String> = all_captures(body, r"(?is)<td[^>]*>(.*?)</td>")
        .iter()
        .map(|c| cell_text(c))
        .collect();

    let mut rx = Vec::new();
    let mut tx = Vec::new();
    let mut crc = Vec::new();
    for port in 1..=ports {
        rx.push(cells.get(port * 4 + 1).map_or(0, |c| parse_counter(c, 10)));
        tx.push(cells.get(port * 4 + 2).map_or(0, |c| parse_counter(c, 10)));
        crc.push(cells.get(port * 4 + 3).map_or(0, |c| parse_counter(c, 10)));
    }
    Ok(RawPortSample {
        rx: pad_counters(rx, ports),
        tx: pad_counters(tx, ports),
        crc: pad_counters(crc, ports),
    })
}

pub(super) fn parse_poe_config(body: &str) -> Vec<bool> {
    all_captures(
        body,
        r#"(?is)<span[^>]*class="[^"]*admin-state[^"]*"[^>]*>\s*(.*?)\s*</span>"#,
    )
    .iter()
    .map(|state| {
        let lowered = state.to_lowercase();
        lowered == "enable" || lowered == "aktiv"
    })
    .collect()
}

pub(super) fn parse_poe_status(body: &str) -> Vec<f64> {
    all_captures(
        body,
        r#"(?is)<p[^>]*class="[^"]*OutputPower-text[^"]*"[^>]*>\s*(.*?)\s*</p>"#,
    )
    .iter()
    .map(|v| v.parse::<f64>().unwrap_or(0.0))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_from_paragraph_labels() {
        let page = r#"
            <input type="text" name="switchName" value="rack-16">
            <p>Serial Number</p><p>6XT00880091</p>
            <p>Firmware Version</p><p>V1.0.4.4</p>
        "#;
        let meta = parse_metadata(page).expect("metadata");
        assert_eq!(meta.name, "rack-16");
        assert_eq!(meta.serial, "6XT00880091");
        assert_eq!(meta.firmware, "V1.0.4.4");
    }

    #[test]
    fn led_status_from_checkbox() {
        assert_eq!(
            parse_led_status(r#"<input type="checkbox" id="ledStatus" checked>"#),
            Some(true)
        );
        assert_eq!(
            parse_led_status(r#"<input type="checkbox" id="ledStatus">"#),
            Some(false)
        );
        assert_eq!(parse_led_status("<html></html>"), None);
    }

    #[test]
    fn link_status_pairs_spans_with_attribute_blocks() {
        let page = r#"
            <span class="status-on-port">UP</span>
            <span class="status-on-port">DOWN</span>
            <div class="port-status"><div><div>
              <p>Mode</p><p>Auto</p><p>Link</p><p>1G Full</p>
            </div></div></div>
            <div class="port-status"><div><div>
              <p>Mode</p><p>Auto</p><p>Link</p><p>No Speed</p>
            </div></div></div>
        "#;
        let links = parse_link_status(page, 2);
        assert_eq!(links[0].status, "UP");
        assert_eq!(links[0].connection_speed, "1G");
        assert_eq!(links[1].status, "DOWN");
    }

    #[test]
    fn counters_skip_header_row() {
        let page = r#"
            <table>
              <tr><td>Port</td><td>Rx</td><td>Tx</td><td>CRC</td></tr>
              <tr><td>1</td><td>1000</td><td>2000</td><td>1</td></tr>
              <tr><td>2</td><td>30</td><td>40</td><td>0</td></tr>
            </table>
        "#;
        let sample = parse_counters(page, 2).expect("counters");
        assert_eq!(sample.rx, vec![1000, 30]);
        assert_eq!(sample.tx, vec![2000, 40]);
        assert_eq!(sample.crc, vec![1, 0]);
    }

    #[test]
    fn poe_admin_state_accepts_localized_labels() {
        let page = r#"
            <span class="admin-state">Enable</span>
            <span class="admin-state">Aktiv</span>
            <span class="admin-state">Disable</span>
        "#;
        assert_eq!(parse_poe_config(page), vec![true, true, false]);
    }

    #[test]
    fn poe_output_power_parses_watts() {
        let page = r#"
            <p class="OutputPower-text">12.3</p>
            <p class="OutputPower-text">--</p>
        "#;
        assert_eq!(parse_poe_status(page), vec![12.3, 0.0]);
    }
}
