//! Parser for the statistics dump (`keepalived.stats`).
//!
//! ```text
//! VRRP Instance: VI_1
//!   Advertisements:
//!     Received: 11
//!     Sent: 12
//!   Became master: 2
//!   Released master: 1
//!   Packet Errors:
//!     Length: 1
//! ```
//!
//! Instance headers have no indentation, section headers and the two
//! top-level counters sit at two spaces, section leaves at four.

use crate::error::ParseError;
use crate::types::VRRPCounters;
use std::io::BufRead;
use tracing::trace;

const INSTANCE_HEADER: &str = "VRRP Instance";
const SECTION_INDENT: usize = 2;
const LEAF_INDENT: usize = 4;
const SEPARATOR: char = ':';

/// Counters of one instance, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceCounters {
    pub name: String,
    pub counters: VRRPCounters,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Advertisements,
    PacketErrors,
    AuthenticationErrors,
    PriorityZero,
    Unknown,
}

impl Section {
    fn from_header(name: &str) -> Self {
        match name {
            "Advertisements" => Section::Advertisements,
            "Packet Errors" => Section::PacketErrors,
            "Authentication Errors" => Section::AuthenticationErrors,
            "Priority Zero" => Section::PriorityZero,
            _ => Section::Unknown,
        }
    }

    /// Counter a leaf key of this section maps to.
    fn field<'a>(&self, counters: &'a mut VRRPCounters, key: &str) -> Option<&'a mut u64> {
        let field = match (self, key) {
            (Section::Advertisements, "Received") => &mut counters.advert_rcvd,
            (Section::Advertisements, "Sent") => &mut counters.advert_sent,
            (Section::PacketErrors, "Length") => &mut counters.packet_len_err,
            (Section::PacketErrors, "TTL") => &mut counters.ip_ttl_err,
            (Section::PacketErrors, "Invalid Type") => &mut counters.invalid_type_rcvd,
            (Section::PacketErrors, "Advertisement Interval") => &mut counters.advert_interval_err,
            (Section::PacketErrors, "Address List") => &mut counters.addr_list_err,
            (Section::AuthenticationErrors, "Invalid Type") => &mut counters.invalid_auth_type,
            (Section::AuthenticationErrors, "Type Mismatch") => &mut counters.auth_type_mismatch,
            (Section::AuthenticationErrors, "Failure") => &mut counters.auth_failure,
            (Section::PriorityZero, "Received") => &mut counters.pri_zero_rcvd,
            (Section::PriorityZero, "Sent") => &mut counters.pri_zero_sent,
            _ => return None,
        };
        Some(field)
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// Split a `key: value` line and parse the value as a counter.
fn counter(line_no: usize, line: &str) -> Result<(String, u64), ParseError> {
    let (key, value) = line
        .trim()
        .split_once(SEPARATOR)
        .ok_or_else(|| ParseError::Malformed {
            line: line_no,
            content: line.to_string(),
        })?;
    let (key, value) = (key.trim(), value.trim());
    let value = value
        .parse()
        .map_err(|e| ParseError::invalid(line_no, key, value, e))?;
    Ok((key.to_string(), value))
}

/// Parse a statistics dump into per-instance counters, in file order.
///
/// Counters the dump leaves out stay at zero.
pub fn parse_stats<R: BufRead>(reader: R) -> Result<Vec<InstanceCounters>, ParseError> {
    let mut stats = Vec::new();
    let mut current: Option<InstanceCounters> = None;
    let mut section: Option<Section> = None;

    for (index, line) in reader.lines().enumerate() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let depth = indentation(line);

        if depth == 0 {
            let Some(rest) = line.strip_prefix(INSTANCE_HEADER) else {
                continue;
            };
            let Some((_, name)) = rest.split_once(SEPARATOR) else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(ParseError::Malformed {
                    line: line_no,
                    content: line.to_string(),
                });
            }

            stats.extend(current.take());
            current = Some(InstanceCounters {
                name: name.to_string(),
                counters: VRRPCounters::default(),
            });
            section = None;
            continue;
        }

        let Some(instance) = current.as_mut() else {
            continue;
        };

        if depth >= LEAF_INDENT {
            let Some(active) = section else {
                trace!(line = line_no, "Ignoring leaf outside of a section");
                continue;
            };
            let (key, value) = counter(line_no, line)?;
            match active.field(&mut instance.counters, &key) {
                Some(field) => *field = value,
                None => trace!(instance = %instance.name, key = %key, "Ignoring unrecognized counter"),
            }
        } else if depth >= SECTION_INDENT && line.ends_with(SEPARATOR) {
            let name = line.trim().trim_end_matches(SEPARATOR).trim();
            section = Some(Section::from_header(name));
        } else if depth >= SECTION_INDENT {
            section = None;
            let (key, value) = counter(line_no, line)?;
            match key.as_str() {
                "Became master" => instance.counters.become_master = value,
                "Released master" => instance.counters.release_master = value,
                _ => trace!(instance = %instance.name, key = %key, "Ignoring unrecognized counter"),
            }
        }
    }

    stats.extend(current);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(name: &str, base: u64) -> String {
        format!(
            "VRRP Instance: {name}
  Advertisements:
    Received: {}
    Sent: {}
  Became master: {}
  Released master: {}
  Packet Errors:
    Length: {}
    TTL: {}
    Invalid Type: {}
    Advertisement Interval: {}
    Address List: {}
  Authentication Errors:
    Invalid Type: {}
    Type Mismatch: {}
    Failure: {}
  Priority Zero:
    Received: {}
    Sent: {}
",
            base,
            base + 1,
            base + 2,
            base + 3,
            base + 4,
            base + 5,
            base + 6,
            base + 7,
            base + 8,
            base + 9,
            base + 10,
            base + 11,
            base + 12,
            base + 13,
        )
    }

    #[test]
    fn test_single_instance() {
        let input = "VRRP Instance: VI_1
  Advertisements:
    Received: 11
    Sent: 12
  Became master: 2
  Released master: 1
  Packet Errors:
    Length: 1
    TTL: 1
    Invalid Type: 1
    Advertisement Interval: 1
    Address List: 1
  Authentication Errors:
    Invalid Type: 1
    Type Mismatch: 1
    Failure: 1
  Priority Zero:
    Received: 1
    Sent: 1
";
        let stats = parse_stats(input.as_bytes()).unwrap();
        assert_eq!(
            stats,
            vec![InstanceCounters {
                name: "VI_1".to_string(),
                counters: VRRPCounters {
                    advert_rcvd: 11,
                    advert_sent: 12,
                    become_master: 2,
                    release_master: 1,
                    packet_len_err: 1,
                    advert_interval_err: 1,
                    ip_ttl_err: 1,
                    invalid_type_rcvd: 1,
                    addr_list_err: 1,
                    invalid_auth_type: 1,
                    auth_type_mismatch: 1,
                    auth_failure: 1,
                    pri_zero_rcvd: 1,
                    pri_zero_sent: 1,
                },
            }]
        );
    }

    #[test]
    fn test_three_instances_in_file_order() {
        let input = format!("{}{}{}", block("VI_1", 100), block("VI_2", 200), block("VI_3", 300));
        let stats = parse_stats(input.as_bytes()).unwrap();

        let names: Vec<&str> = stats.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["VI_1", "VI_2", "VI_3"]);

        for (s, base) in stats.iter().zip([100u64, 200, 300]) {
            let c = &s.counters;
            assert_eq!(c.advert_rcvd, base);
            assert_eq!(c.advert_sent, base + 1);
            assert_eq!(c.become_master, base + 2);
            assert_eq!(c.release_master, base + 3);
            assert_eq!(c.packet_len_err, base + 4);
            assert_eq!(c.ip_ttl_err, base + 5);
            assert_eq!(c.invalid_type_rcvd, base + 6);
            assert_eq!(c.advert_interval_err, base + 7);
            assert_eq!(c.addr_list_err, base + 8);
            assert_eq!(c.invalid_auth_type, base + 9);
            assert_eq!(c.auth_type_mismatch, base + 10);
            assert_eq!(c.auth_failure, base + 11);
            assert_eq!(c.pri_zero_rcvd, base + 12);
            assert_eq!(c.pri_zero_sent, base + 13);
        }
    }

    #[test]
    fn test_missing_leaves_default_to_zero() {
        let input = "VRRP Instance: VI_1\n  Advertisements:\n    Received: 5\n  Became master: 0\n";
        let stats = parse_stats(input.as_bytes()).unwrap();
        assert_eq!(
            stats[0].counters,
            VRRPCounters {
                advert_rcvd: 5,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_top_level_counter_resets_section() {
        // "Received" after "Became master" is outside any section and must
        // not land in the advertisement counters.
        let input = "VRRP Instance: VI_1\n  Advertisements:\n    Received: 5\n  Became master: 3\n    Received: 99\n";
        let stats = parse_stats(input.as_bytes()).unwrap();
        assert_eq!(stats[0].counters.advert_rcvd, 5);
        assert_eq!(stats[0].counters.become_master, 3);
    }

    #[test]
    fn test_non_integer_leaf_is_an_error() {
        let input = "VRRP Instance: VI_1\n  Advertisements:\n    Received: many\n";
        let err = parse_stats(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { line: 3, ref key, .. } if key == "Received"));

        let input = "VRRP Instance: VI_1\n  Became master: -1\n";
        assert!(parse_stats(input.as_bytes()).is_err());
    }

    #[test]
    fn test_leaf_without_separator_is_an_error() {
        let input = "VRRP Instance: VI_1\n  Advertisements:\n    Received 5\n";
        assert!(matches!(
            parse_stats(input.as_bytes()),
            Err(ParseError::Malformed { line: 3, .. })
        ));
    }

    #[test]
    fn test_indented_header_is_not_an_instance() {
        let input = "VRRP Instance: VI_1\n  Became master: 1\n VRRP Instance: VI_2\n  Released master: 4\n";
        let stats = parse_stats(input.as_bytes()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].counters.become_master, 1);
        assert_eq!(stats[0].counters.release_master, 4);
    }

    #[test]
    fn test_preamble_is_ignored() {
        let input = "------< VRRP statistics >------\n\nVRRP Instance: VI_1\n  Became master: 7\n";
        let stats = parse_stats(input.as_bytes()).unwrap();
        assert_eq!(stats[0].counters.become_master, 7);
    }
}
