// Script-variable models (JGS516PE, JGS524Ev2, GS116Ev2). The firmware
// renders every datum into JavaScript assignments; the pages are
// parsed with plain regexes, field lists are `?`-separated.

use regex::Regex;

use crate::error::Error;
use crate::parse::{
    RawPortLink, RawPortSample, SwitchMetadata, first_capture, pad_counters, pad_links,
    parse_counter, strip_duplex,
};

const META_DATA_PARTS: usize = 9;
const META_DATA_NAME: usize = 1;
const META_DATA_FIRMWARE: usize = 3;
const META_DATA_SERIAL_NUMBER: usize = 8;

/// Indexed script entries like `StatisticsEntry[3] = '...';`, returned
/// as (index, payload) pairs.
fn script_entries(body: &str, variable: &str) -> Vec<(usize, String)> {
    Regex::new(&format!(r"{variable}\[(\d+)\]\s*=\s*'([^']+)';"))
        .map(|re| {
            re.captures_iter(body)
                .filter_map(|c| {
                    let index = c.get(1)?.as_str().parse().ok()?;
                    Some((index, c.get(2)?.as_str().to_owned()))
                })
                .collect()
        })
        .unwrap_or_default()
}

pub(super) fn parse_metadata(body: &str) -> Result<SwitchMetadata, Error> {
    let raw = first_capture(body, r"sysGeneInfor\s*=\s*'([^']+)';").ok_or_else(|| {
        Error::Parse {
            message: "sysGeneInfor variable not found".into(),
        }
    })?;
    let fields: Vec<&str> = raw.split('?').collect();
    if fields.len() != META_DATA_PARTS {
        return Err(Error::Parse {
            message: format!(
                "switch metadata has {} fields, expected {META_DATA_PARTS}",
                fields.len()
            ),
        });
    }
    Ok(SwitchMetadata {
        name: fields[META_DATA_NAME].to_owned(),
        serial: fields[META_DATA_SERIAL_NUMBER].to_owned(),
        firmware: fields[META_DATA_FIRMWARE].to_owned(),
        bootloader: "unknown".into(),
    })
}

pub(super) fn parse_link_status(body: &str, ports: usize) -> Vec<RawPortLink> {
    let mut links = vec![RawPortLink::default(); ports];
    for (index, payload) in script_entries(body, "portConfigEntry") {
        let fields: Vec<&str> = payload.split('?').collect();
        if let Some(slot) = links.get_mut(index) {
            *slot = RawPortLink {
                status: fields.get(2).copied().unwrap_or_default().to_owned(),
                modus_speed: fields.get(3).copied().unwrap_or_default().to_owned(),
                connection_speed: strip_duplex(fields.get(4).copied().unwrap_or_default()),
            };
        }
    }
    pad_links(links, ports)
}

pub(super) fn parse_counters(body: &str, ports: usize) -> RawPortSample {
    let mut rx = vec![0; ports];
    let mut tx = vec![0; ports];
    let mut crc = vec![0; ports];
    for (index, payload) in script_entries(body, "StatisticsEntry") {
        let fields: Vec<&str> = payload.split('?').collect();
        if index < ports {
            rx[index] = fields.get(1).map_or(0, |f| parse_counter(f, 10));
            tx[index] = fields.get(2).map_or(0, |f| parse_counter(f, 10));
            crc[index] = fields.get(3).map_or(0, |f| parse_counter(f, 10));
        }
    }
    RawPortSample {
        rx: pad_counters(rx, ports),
        tx: pad_counters(tx, ports),
        crc: pad_counters(crc, ports),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_splits_nine_fields() {
        let body = "<script>sysGeneInfor = 'JGS516PE?basement?V2?V2.6.0.48?16?x?y?z?S4455667';</script>";
        let meta = parse_metadata(body).expect("metadata");
        assert_eq!(meta.name, "basement");
        assert_eq!(meta.firmware, "V2.6.0.48");
        assert_eq!(meta.serial, "S4455667");
    }

    #[test]
    fn metadata_with_wrong_arity_is_an_error() {
        let body = "<script>sysGeneInfor = 'JGS516PE?too?short';</script>";
        assert!(matches!(parse_metadata(body), Err(Error::Parse { .. })));
    }

    #[test]
    fn link_status_from_config_entries() {
        let body = r"
            <script>
            portConfigEntry[0] = '1?name?Up?Auto?1000M full?more';
            portConfigEntry[1] = '2?name?Down?Auto??more';
            </script>
        ";
        let links = parse_link_status(body, 3);
        assert_eq!(links[0].status, "Up");
        assert_eq!(links[0].connection_speed, "1000M");
        assert_eq!(links[1].status, "Down");
        assert_eq!(links[2], RawPortLink::default());
    }

    #[test]
    fn counters_from_statistics_entries() {
        let body = r"
            <script>
            StatisticsEntry[0] = '1?123456?654321?7?x';
            StatisticsEntry[1] = '2?10?20?0?x';
            </script>
        ";
        let sample = parse_counters(body, 3);
        assert_eq!(sample.rx, vec![123_456, 10, 0]);
        assert_eq!(sample.tx, vec![654_321, 20, 0]);
        assert_eq!(sample.crc, vec![7, 0, 0]);
    }
}
