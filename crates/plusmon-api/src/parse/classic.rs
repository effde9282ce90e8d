// Classic table-based models (GS108Ev3, GS308E and siblings).
//
// Two counter encodings exist across firmware revisions: the original
// pages render decimal byte counts into table cells, newer revisions
// move them into hex-encoded hidden inputs. Which one a device speaks
// is determined by the firmware/bootloader versions on the info page,
// so metadata must be parsed before the first statistics page.

use crate::error::Error;
use crate::parse::{
    RawPortLink, RawPortSample, SwitchMetadata, all_captures, cell_text, input_value,
    input_values, pad_counters, pad_links, parse_counter, portid_table_counters, strip_duplex,
};

/// Firmware/bootloader revisions that serve the hex-input encoding.
const V2_BOOTLOADERS: &[&str] = &[
    "V1.00.03",
    "V2.06.01",
    "V2.06.02",
    "V2.06.03",
    "V1.6.0.2-VB",
];
const V2_FIRMWARES: &[&str] = &["V2.06.24GR", "V2.06.24EN", "V1.6.0.17"];

/// Versions captured from the info page; selects the counter encoding.
#[derive(Debug, Default)]
pub struct ClassicState {
    firmware: Option<String>,
    bootloader: Option<String>,
}

impl ClassicState {
    fn has_api_v2(&self) -> Result<bool, Error> {
        let (Some(firmware), Some(bootloader)) = (&self.firmware, &self.bootloader) else {
            return Err(Error::Parse {
                message: "firmware version unknown; parse the info page before statistics".into(),
            });
        };
        Ok(V2_BOOTLOADERS.contains(&bootloader.as_str())
            || V2_FIRMWARES.contains(&firmware.as_str()))
    }
}

fn table_rows(body: &str, table_id: &str) -> Vec<Vec<String>> {
    let table = all_captures(
        body,
        &format!(r#"(?is)<table[^>]*id="{table_id}"[^>]*>(.*?)</table>"#),
    );
    let Some(table) = table.first() else {
        return Vec::new();
    };
    all_captures(table, r"(?is)<tr[^>]*>(.*?)</tr>")
        .iter()
        .map(|row| {
            all_captures(row, r"(?is)<td[^>]*>(.*?)</td>")
                .iter()
                .map(|c| cell_text(c))
                .collect()
        })
        .collect()
}

pub(super) fn parse_metadata(state: &mut ClassicState, body: &str) -> Result<SwitchMetadata, Error> {
    let name = input_value(body, "id", "switch_name").unwrap_or_default();
    let rows = table_rows(body, "tbl1");
    let cell = |row: usize| -> Option<String> { rows.get(row)?.get(1).cloned() };

    let serial = cell(2).unwrap_or_else(|| "unknown".into());
    // Older firmware keeps the version two rows higher.
    let firmware = cell(5)
        .filter(|v| !v.is_empty())
        .or_else(|| cell(3))
        .ok_or_else(|| Error::Parse {
            message: "firmware version cell not found on info page".into(),
        })?;
    let bootloader = super::first_capture(body, r#"(?is)<td[^>]*id="loader"[^>]*>(.*?)</td>"#)
        .map(|c| cell_text(&c))
        .unwrap_or_else(|| "unknown".into());

    state.firmware = Some(firmware.clone());
    state.bootloader = Some(bootloader.clone());

    Ok(SwitchMetadata {
        name,
        serial,
        firmware,
        bootloader,
    })
}

pub(super) fn parse_counters(
    state: &ClassicState,
    body: &str,
    ports: usize,
) -> Result<RawPortSample, Error> {
    if state.has_api_v2()? {
        let decode = |key: &str| -> Vec<u64> {
            pad_counters(
                input_values(body, "name", key)
                    .iter()
                    .map(|v| parse_counter(v, 16))
                    .collect(),
                ports,
            )
        };
        Ok(RawPortSample {
            rx: decode("rxPkt"),
            tx: decode("txpkt"),
            crc: decode("crcPkt"),
        })
    } else {
        Ok(portid_table_counters(body, ports))
    }
}

pub(super) fn parse_link_status(body: &str, ports: usize) -> Vec<RawPortLink> {
    let rows = all_captures(body, r#"(?is)<tr[^>]*class="portID"[^>]*>(.*?)</tr>"#);
    let links = rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = all_captures(row, r"(?is)<td[^>]*>(.*?)</td>")
                .iter()
                .map(|c| cell_text(c))
                .collect();
            RawPortLink {
                status: cells.get(2).cloned().unwrap_or_default(),
                modus_speed: cells.get(3).cloned().unwrap_or_default(),
                connection_speed: strip_duplex(&cells.get(4).cloned().unwrap_or_default()),
            }
        })
        .collect();
    pad_links(links, ports)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INFO_PAGE: &str = r#"
        <input type="text" id="switch_name" value="office-sw">
        <table id="tbl1">
          <tr><td>Product Name</td><td>GS108Ev3</td></tr>
          <tr><td>MAC Address</td><td>aa:bb:cc:dd:ee:ff</td></tr>
          <tr><td>Serial Number</td><td>4AB1234X0001</td></tr>
          <tr><td>Hardware</td><td>V3</td></tr>
          <tr><td>Boot</td><td>-</td></tr>
          <tr><td>Firmware Version</td><td>V2.06.24EN</td></tr>
        </table>
        <td id="loader">V2.06.03</td>
    "#;

    #[test]
    fn metadata_from_info_table() {
        let mut state = ClassicState::default();
        let meta = parse_metadata(&mut state, INFO_PAGE).expect("metadata");
        assert_eq!(meta.name, "office-sw");
        assert_eq!(meta.serial, "4AB1234X0001");
        assert_eq!(meta.firmware, "V2.06.24EN");
        assert_eq!(meta.bootloader, "V2.06.03");
    }

    #[test]
    fn counters_require_metadata_first() {
        let state = ClassicState::default();
        assert!(matches!(
            parse_counters(&state, "<html></html>", 8),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn v2_firmware_reads_hex_inputs() {
        let mut state = ClassicState::default();
        parse_metadata(&mut state, INFO_PAGE).expect("metadata");

        let stats = r#"
            <input type="hidden" name="rxPkt" value="1f4">
            <input type="hidden" name="txpkt" value="a">
            <input type="hidden" name="crcPkt" value="0">
            <input type="hidden" name="rxPkt" value="ff">
            <input type="hidden" name="txpkt" value="10">
            <input type="hidden" name="crcPkt" value="2">
        "#;
        let sample = parse_counters(&state, stats, 4).expect("counters");
        assert_eq!(sample.rx, vec![0x1f4, 0xff, 0, 0]);
        assert_eq!(sample.tx, vec![0xa, 0x10, 0, 0]);
        assert_eq!(sample.crc, vec![0, 2, 0, 0]);
    }

    #[test]
    fn v1_firmware_reads_table_cells() {
        let mut state = ClassicState::default();
        let old_info = INFO_PAGE
            .replace("V2.06.24EN", "V2.00.05")
            .replace(r#"<td id="loader">V2.06.03</td>"#, r#"<td id="loader">V1.00.01</td>"#);
        parse_metadata(&mut state, &old_info).expect("metadata");

        let stats = r#"
            <table>
              <tr class="portID"><td>1</td><td>1000</td><td>500</td><td>3</td></tr>
              <tr class="portID"><td>2</td><td>0</td><td>0</td><td>0</td></tr>
            </table>
        "#;
        let sample = parse_counters(&state, stats, 3).expect("counters");
        assert_eq!(sample.rx, vec![1000, 0, 0]);
        assert_eq!(sample.tx, vec![500, 0, 0]);
        assert_eq!(sample.crc, vec![3, 0, 0]);
    }

    #[test]
    fn link_status_from_portid_rows() {
        let page = r#"
            <tr class="portID"><td>x</td><td>1</td><td>Up</td><td>Auto</td><td>1000M Full</td></tr>
            <tr class="portID"><td>x</td><td>2</td><td>Down</td><td>Auto</td><td>No Speed</td></tr>
        "#;
        let links = parse_link_status(page, 2);
        assert_eq!(links[0].status, "Up");
        assert_eq!(links[0].connection_speed, "1000M");
        assert_eq!(links[1].status, "Down");
    }
}
