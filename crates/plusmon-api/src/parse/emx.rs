// Multi-gig table models (GS110EMX, XS512EM). Served under
// `/iss/specific/`, no client hash, session token resent as a request
// parameter. Counters and link status share the portID row layout.

use crate::error::Error;
use crate::parse::{
    RawPortLink, SwitchMetadata, all_captures, cell_text, first_capture, input_value, pad_links,
    strip_duplex,
};

/// Text of the cell following a labelled cell ("Serial Number",
/// "Firmware Version").
fn next_cell_text(body: &str, label: &str) -> Option<String> {
    first_capture(
        body,
        &format!(r"(?is){label}[^<]*</td>\s*<td[^>]*>\s*(.*?)\s*</td>"),
    )
    .map(|c| cell_text(&c))
    .filter(|v| !v.is_empty())
}

pub(super) fn parse_metadata(body: &str) -> Result<SwitchMetadata, Error> {
    let name = input_value(body, "name", "switch_name").unwrap_or_default();
    let serial = next_cell_text(body, "Serial Number").unwrap_or_else(|| "unknown".into());
    let firmware = next_cell_text(body, "Firmware Version").ok_or_else(|| Error::Parse {
        message: "firmware version cell not found on system info page".into(),
    })?;
    Ok(SwitchMetadata {
        name,
        serial,
        firmware,
        bootloader: "unknown".into(),
    })
}

pub(super) fn parse_link_status(body: &str, ports: usize) -> Vec<RawPortLink> {
    let rows = all_captures(body, r#"(?is)<tr[^>]*class="portID"[^>]*>(.*?)</tr>"#);
    let mut links = vec![RawPortLink::default(); ports];
    for row in rows {
        let Some(port) = input_value(&row, "name", "PORT_NO").and_then(|v| v.parse::<usize>().ok())
        else {
            continue;
        };
        let cells: Vec<String> = all_captures(&row, r"(?is)<td[^>]*>(.*?)</td>")
            .iter()
            .map(|c| cell_text(c))
            .collect();
        if let Some(slot) = links.get_mut(port.wrapping_sub(1)) {
            *slot = RawPortLink {
                status: cells.get(3).cloned().unwrap_or_default(),
                modus_speed: cells.get(4).cloned().unwrap_or_default(),
                connection_speed: strip_duplex(&cells.get(5).cloned().unwrap_or_default()),
            };
        }
    }
    pad_links(links, ports)
}
