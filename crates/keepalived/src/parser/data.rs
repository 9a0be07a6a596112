//! Parser for the instance dump (`keepalived.data`).
//!
//! ```text
//!  VRRP Instance = VI_1
//!    State = MASTER
//!    Virtual IP = 1
//!      192.168.2.1/32 dev ens192 scope global
//!  VRRP Script = chk_haproxy
//!    Status = GOOD
//!    State = idle
//! ```
//!
//! Blocks open on a header at one space of indentation and hold
//! `key = value` properties at three or more. Any other line closes the
//! open block.

use crate::error::ParseError;
use crate::types::{ScriptState, ScriptStatus, VRRPInstance, VRRPScript, VRRPState, VirtualIp};
use std::io::BufRead;
use tracing::trace;

const INSTANCE_HEADER: &str = " VRRP Instance";
const SCRIPT_HEADER: &str = " VRRP Script";
const PROPERTY_INDENT: &str = "   ";
const SEPARATOR: char = '=';

/// Everything the instance dump describes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataDump {
    /// Instances in dump order
    pub instances: Vec<VRRPInstance>,
    /// Tracked scripts in dump order
    pub scripts: Vec<VRRPScript>,
}

#[derive(Debug, Default)]
struct InstanceBuilder {
    name: String,
    state: Option<VRRPState>,
    want_state: Option<VRRPState>,
    interface: String,
    garp_delay: u64,
    vrid: u64,
    virtual_ips: Vec<VirtualIp>,
}

impl InstanceBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn apply(&mut self, line: usize, key: &str, value: &str) -> Result<(), ParseError> {
        match key {
            "State" => self.state = Some(parse_state(line, key, value)?),
            "Wantstate" => self.want_state = Some(parse_state(line, key, value)?),
            "Interface" | "Listening device" => self.interface = value.to_string(),
            "Gratuitous ARP delay" => self.garp_delay = parse_number(line, key, value)?,
            "Virtual Router ID" => self.vrid = parse_number(line, key, value)?,
            _ => trace!(instance = %self.name, key, "Ignoring unrecognized key"),
        }
        Ok(())
    }

    fn build(self) -> Result<VRRPInstance, ParseError> {
        let state = self.state.ok_or_else(|| ParseError::MissingField {
            name: self.name.clone(),
            field: "State",
        })?;

        Ok(VRRPInstance {
            name: self.name,
            state,
            want_state: self.want_state.unwrap_or(state),
            interface: self.interface,
            garp_delay: self.garp_delay,
            vrid: self.vrid,
            virtual_ips: self.virtual_ips,
        })
    }
}

#[derive(Debug)]
struct ScriptBuilder {
    name: String,
    status: Option<ScriptStatus>,
    state: Option<ScriptState>,
}

impl ScriptBuilder {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: None,
            state: None,
        }
    }

    fn apply(&mut self, line: usize, key: &str, value: &str) -> Result<(), ParseError> {
        match key {
            "Status" => {
                self.status = Some(
                    value
                        .parse()
                        .map_err(|e| ParseError::invalid(line, key, value, e))?,
                )
            }
            "State" => {
                self.state = Some(
                    value
                        .parse()
                        .map_err(|e| ParseError::invalid(line, key, value, e))?,
                )
            }
            _ => {}
        }
        Ok(())
    }

    fn build(self) -> Result<VRRPScript, ParseError> {
        let status = self.status.ok_or_else(|| ParseError::MissingField {
            name: self.name.clone(),
            field: "Status",
        })?;

        Ok(VRRPScript {
            name: self.name,
            status,
            state: self.state,
        })
    }
}

enum Block {
    Instance(InstanceBuilder),
    Script(ScriptBuilder),
}

fn parse_state(line: usize, key: &str, value: &str) -> Result<VRRPState, ParseError> {
    value
        .parse()
        .map_err(|e| ParseError::invalid(line, key, value, e))
}

fn parse_number(line: usize, key: &str, value: &str) -> Result<u64, ParseError> {
    value
        .parse()
        .map_err(|e| ParseError::invalid(line, key, value, e))
}

/// Name from a block header, if `line` is one for `header`.
fn header_name<'a>(line: &'a str, header: &str) -> Option<&'a str> {
    line.strip_prefix(header)?
        .split_once(SEPARATOR)
        .map(|(_, name)| name.trim())
}

fn close(block: Option<Block>, dump: &mut DataDump) -> Result<(), ParseError> {
    match block {
        Some(Block::Instance(b)) => dump.instances.push(b.build()?),
        Some(Block::Script(b)) => dump.scripts.push(b.build()?),
        None => {}
    }
    Ok(())
}

/// Parse an instance dump into instances and tracked scripts.
pub fn parse_data<R: BufRead>(reader: R) -> Result<DataDump, ParseError> {
    let mut dump = DataDump::default();
    let mut block: Option<Block> = None;
    let mut lines = reader.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let line_no = index + 1;
        let line = line?;
        let line = line.trim_end();

        if let Some(name) = header_name(line, INSTANCE_HEADER) {
            close(block.take(), &mut dump)?;
            block = (!name.is_empty()).then(|| Block::Instance(InstanceBuilder::new(name)));
            continue;
        }

        if let Some(name) = header_name(line, SCRIPT_HEADER) {
            close(block.take(), &mut dump)?;
            block = (!name.is_empty()).then(|| Block::Script(ScriptBuilder::new(name)));
            continue;
        }

        if block.is_none() || !line.starts_with(PROPERTY_INDENT) {
            close(block.take(), &mut dump)?;
            continue;
        }

        let Some((key, value)) = line.split_once(SEPARATOR) else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        match block.as_mut() {
            Some(Block::Instance(instance)) if key == "Virtual IP" => {
                let expected: usize = value
                    .parse()
                    .map_err(|e| ParseError::invalid(line_no, key, value, e))?;

                for found in 0..expected {
                    let Some((_, vip)) = lines.next() else {
                        return Err(ParseError::TruncatedVirtualIps {
                            line: line_no,
                            instance: instance.name.clone(),
                            expected,
                            found,
                        });
                    };
                    instance.virtual_ips.push(VirtualIp::new(vip?.trim()));
                }
            }
            Some(Block::Instance(instance)) => instance.apply(line_no, key, value)?,
            Some(Block::Script(script)) => script.apply(line_no, key, value)?,
            None => {}
        }
    }

    close(block, &mut dump)?;
    Ok(dump)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "------< Global definitions >------
 Network namespace = (default)
 Router ID = LVS_DEVEL
------< VRRP Topology >------
 VRRP Instance = VI_1
   Using VRRPv2
   State = MASTER
   Wantstate = MASTER
   Last transition = 1581405637 (Tue Feb 11 10:20:37 2020)
   Listening device = ens192
   Interface = ens192
   Gratuitous ARP delay = 5
   Virtual Router ID = 52
   Priority = 100
   Virtual IP = 2
     192.168.2.1/32 dev ens192 scope global
     192.168.2.2/32 dev ens192 scope global
 VRRP Instance = VI_2
   State = BACKUP
   Wantstate = BACKUP
   Interface = ens224
   Gratuitous ARP delay = 5
   Virtual Router ID = 53
   Virtual IP = 1
     10.0.0.1/24 dev ens224 scope global
------< VRRP Scripts >------
 VRRP Script = chk_haproxy
   Command = /usr/bin/killall -0 haproxy
   Interval = 2 sec
   Status = GOOD
   State = idle
 VRRP Script = chk_nginx
   Command = /usr/local/bin/chk_nginx.sh
   Status = BAD
   State = running
";

    #[test]
    fn test_parse_instances() {
        let dump = parse_data(DATA.as_bytes()).unwrap();
        assert_eq!(dump.instances.len(), 2);

        let vi1 = &dump.instances[0];
        assert_eq!(vi1.name, "VI_1");
        assert_eq!(vi1.state, VRRPState::Master);
        assert_eq!(vi1.want_state, VRRPState::Master);
        assert_eq!(vi1.interface, "ens192");
        assert_eq!(vi1.garp_delay, 5);
        assert_eq!(vi1.vrid, 52);
        assert_eq!(
            vi1.virtual_ips,
            vec![
                VirtualIp::new("192.168.2.1/32 dev ens192 scope global"),
                VirtualIp::new("192.168.2.2/32 dev ens192 scope global"),
            ]
        );

        let vi2 = &dump.instances[1];
        assert_eq!(vi2.name, "VI_2");
        assert_eq!(vi2.state, VRRPState::Backup);
        assert_eq!(vi2.vrid, 53);
        assert_eq!(vi2.virtual_ips[0].interface(), Some("ens224"));
    }

    #[test]
    fn test_parse_scripts() {
        let dump = parse_data(DATA.as_bytes()).unwrap();
        assert_eq!(
            dump.scripts,
            vec![
                VRRPScript {
                    name: "chk_haproxy".to_string(),
                    status: ScriptStatus::Good,
                    state: Some(ScriptState::Idle),
                },
                VRRPScript {
                    name: "chk_nginx".to_string(),
                    status: ScriptStatus::Bad,
                    state: Some(ScriptState::Running),
                },
            ]
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(
            parse_data(DATA.as_bytes()).unwrap(),
            parse_data(DATA.as_bytes()).unwrap()
        );
    }

    #[test]
    fn test_last_block_without_trailing_line() {
        let input = " VRRP Instance = VI_9\n   State = FAULT\n   Virtual Router ID = 9";
        let dump = parse_data(input.as_bytes()).unwrap();
        assert_eq!(dump.instances.len(), 1);
        assert_eq!(dump.instances[0].state, VRRPState::Fault);
        // Wantstate falls back to the current state
        assert_eq!(dump.instances[0].want_state, VRRPState::Fault);
        assert_eq!(dump.instances[0].vrid, 9);
    }

    #[test]
    fn test_listening_device_sets_interface() {
        let input = " VRRP Instance = VI_3\n   State = BACKUP\n   Listening device = bond0\n";
        let dump = parse_data(input.as_bytes()).unwrap();
        assert_eq!(dump.instances[0].interface, "bond0");
    }

    #[test]
    fn test_script_without_state() {
        let input = " VRRP Script = chk_old\n   Status = GOOD\n";
        let dump = parse_data(input.as_bytes()).unwrap();
        assert_eq!(dump.scripts[0].state, None);
    }

    #[test]
    fn test_truncated_virtual_ips() {
        let input = " VRRP Instance = VI_1\n   State = MASTER\n   Virtual IP = 3\n     192.168.2.1/32 dev eth0 scope global\n";
        let err = parse_data(input.as_bytes()).unwrap_err();
        assert_eq!(
            err,
            ParseError::TruncatedVirtualIps {
                line: 3,
                instance: "VI_1".to_string(),
                expected: 3,
                found: 1,
            }
        );
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let input = " VRRP Instance = VI_1\n   State = SLEEPING\n";
        let err = parse_data(input.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::InvalidValue { line: 2, ref key, .. } if key == "State"));

        let input = " VRRP Instance = VI_1\n   State = MASTER\n   Wantstate = UP\n";
        assert!(parse_data(input.as_bytes()).is_err());
    }

    #[test]
    fn test_non_numeric_vrid_is_an_error() {
        let input = " VRRP Instance = VI_1\n   State = MASTER\n   Virtual Router ID = fifty\n";
        assert!(matches!(
            parse_data(input.as_bytes()),
            Err(ParseError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_unknown_script_status_is_an_error() {
        let input = " VRRP Script = chk\n   Status = NOTGOOD\n";
        assert!(parse_data(input.as_bytes()).is_err());
    }

    #[test]
    fn test_indentation_is_strict() {
        // Two-space header is not a block header, so its properties are ignored.
        let input = "  VRRP Instance = VI_1\n   State = MASTER\n VRRP Instance = VI_2\n  State = BACKUP\n   State = FAULT\n";
        let err = parse_data(input.as_bytes()).unwrap_err();
        // VI_2 is closed by the two-space line before any State is seen.
        assert_eq!(
            err,
            ParseError::MissingField {
                name: "VI_2".to_string(),
                field: "State",
            }
        );
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let input = " VRRP Instance = VI_1\n   State = BACKUP\n   Some future field = 42\n   Effective priority = 100\n";
        let dump = parse_data(input.as_bytes()).unwrap();
        assert_eq!(dump.instances.len(), 1);
    }

    #[test]
    fn test_trailing_whitespace_is_tolerated() {
        let input = " VRRP Instance = VI_1  \r\n   State = MASTER \r\n   Virtual Router ID = 7\t\n";
        let dump = parse_data(input.as_bytes()).unwrap();
        assert_eq!(dump.instances[0].name, "VI_1");
        assert_eq!(dump.instances[0].vrid, 7);
    }
}
