//! Parsers for the console output the server sends back over rcon.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::str::FromStr;

use crate::error::QueryError;
use crate::parse::column;

/// Underline printed beneath the `status` table header.
pub const STATUS_TABLE_SEPARATOR: &str =
    "--- ----- ---- --------------- ------- --------------------- -------- ---";

/// Character offsets of each column of the `status` table.
pub struct StatusColumns {
    pub slot: Range<usize>,
    pub score: Range<usize>,
    pub ping: Range<usize>,
    pub name: Range<usize>,
    pub lastmsg: Range<usize>,
    pub ip_address: Range<usize>,
    pub rate_pps: Range<usize>,
    pub ver: Range<usize>,
}

pub const STATUS_COLUMNS: StatusColumns = StatusColumns {
    slot: 0..3,
    score: 5..9,
    ping: 10..14,
    name: 15..29,
    lastmsg: 31..38,
    ip_address: 39..59,
    rate_pps: 60..69,
    ver: 70..73,
};

const MAP_LINE_PREFIX: &str = "map";
const DIRECTORY_HEADER: &str = "Directory of ";
const DIRECTORY_SEPARATOR: &str = "----";
const SERVERINFO_HEADER: &str = "Server info settings:";

/// One connected client from the `status` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTableRow {
    pub slot: u16,
    pub score: i32,
    /// Milliseconds, or `CNCT`/`ZMBI` for clients not fully in game
    pub ping: String,
    pub name: String,
    pub lastmsg: i32,
    pub ip_address: String,
    pub rate_pps: String,
    pub ver: i32,
}

impl StatusTableRow {
    pub fn parse(line: &str) -> Result<Self, QueryError> {
        let c = &STATUS_COLUMNS;
        let text = |range: &Range<usize>| column(line, range.clone()).trim().to_owned();

        Ok(StatusTableRow {
            slot: numeric(line, "slot", &c.slot)?,
            score: numeric(line, "score", &c.score)?,
            ping: text(&c.ping),
            name: text(&c.name),
            lastmsg: numeric(line, "lastmsg", &c.lastmsg)?,
            ip_address: text(&c.ip_address),
            rate_pps: text(&c.rate_pps),
            ver: numeric(line, "ver", &c.ver)?,
        })
    }
}

fn numeric<T: FromStr>(line: &str, field: &str, range: &Range<usize>) -> Result<T, QueryError> {
    column(line, range.clone())
        .trim()
        .parse()
        .map_err(|_| QueryError::MalformedStatusLine {
            line: line.to_owned(),
            reason: format!("{} is not a number", field),
        })
}

/// Parse `status` output into the current map and the client table.
pub fn parse_status(output: &str) -> Result<(String, Vec<StatusTableRow>), QueryError> {
    let mut current_map: String = String::new();
    let mut rows: Vec<StatusTableRow> = Vec::new();
    let mut in_table: bool = false;

    for line in output.lines() {
        if in_table {
            if !column(line, STATUS_COLUMNS.slot.clone()).trim().is_empty() {
                rows.push(StatusTableRow::parse(line)?);
            }
        } else if line.trim_end() == STATUS_TABLE_SEPARATOR {
            in_table = true;
        } else if line.starts_with(MAP_LINE_PREFIX) && current_map.is_empty() {
            if let Some(name) = line.split(": ").nth(1) {
                current_map = name.trim().to_owned();
            }
        }
    }

    Ok((current_map, rows))
}

/// Parse a `dir maps/` listing into sorted, deduplicated map names.
pub fn parse_map_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != DIRECTORY_SEPARATOR && !l.starts_with(DIRECTORY_HEADER))
        .filter_map(|l| l.split('.').next())
        .map(str::to_owned)
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect()
}

/// Parse `serverinfo` output into its settings.
pub fn parse_server_info(output: &str) -> BTreeMap<String, String> {
    let mut info: BTreeMap<String, String> = BTreeMap::new();
    for line in output.lines() {
        if line.starts_with(SERVERINFO_HEADER) {
            continue;
        }
        let line: &str = line.trim();
        let (key, value) = match line.split_once(char::is_whitespace) {
            Some((key, value)) => (key, value.trim()),
            None => (line, ""),
        };
        if !key.is_empty() {
            info.insert(key.to_owned(), value.to_owned());
        }
    }
    info
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS: &str = "\
map              : q2dm1
num score ping name            lastmsg address               rate/pps ver
--- ----- ---- --------------- ------- --------------------- -------- ---
  0    12   48 Alice             0     192.168.1.20:27901    25000/40  36
  1     3 CNCT Bob               150   10.0.0.7:27901        15000/20  35

";

    #[test]
    fn status_table() {
        let (map, rows) = parse_status(STATUS).unwrap();
        assert_eq!(map, "q2dm1");
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            StatusTableRow {
                slot: 0,
                score: 12,
                ping: "48".to_owned(),
                name: "Alice".to_owned(),
                lastmsg: 0,
                ip_address: "192.168.1.20:27901".to_owned(),
                rate_pps: "25000/40".to_owned(),
                ver: 36,
            }
        );
        assert_eq!(rows[1].ping, "CNCT");
        assert_eq!(rows[1].lastmsg, 150);
    }

    #[test]
    fn short_row_is_rejected() {
        let output = format!("{}\n  0    12   48 Alice\n", STATUS_TABLE_SEPARATOR);
        let err = parse_status(&output).unwrap_err();
        assert!(matches!(err, QueryError::MalformedStatusLine { .. }));
    }

    #[test]
    fn empty_server_status() {
        let output = format!("map              : base1\n{}\n", STATUS_TABLE_SEPARATOR);
        assert_eq!(parse_status(&output).unwrap(), ("base1".to_owned(), Vec::new()));
    }

    #[test]
    fn map_list() {
        let output = "Directory of maps/\nq2dm1.bsp\nq2dm1.bsp\n----\n";
        assert_eq!(parse_map_list(output), vec!["q2dm1"]);
    }

    #[test]
    fn map_list_is_sorted_and_case_sensitive() {
        let output = "Directory of maps/\n----\nbase2.bsp\nQ2DM1.bsp\nbase1.bsp\nq2dm1.bsp\n----\n";
        assert_eq!(parse_map_list(output), vec!["Q2DM1", "base1", "base2", "q2dm1"]);
    }

    #[test]
    fn server_info() {
        let output = "Server info settings:\nmapname        q2dm1\nhostname       My Q2 Server\nmapname        q2dm2\n";
        let info = parse_server_info(output);
        assert_eq!(info.len(), 2);
        assert_eq!(info["mapname"], "q2dm2");
        assert_eq!(info["hostname"], "My Q2 Server");
    }
}
