//! VISA-style resource names.
//!
//! Instruments are addressed with the resource strings used across lab
//! software: `GPIB0::5::INSTR`, `ASRL2::INSTR`, `TCPIP0::10.0.0.7::5000::SOCKET`.
//! instrlib does not open these itself (the link binding is supplied by the
//! caller as a [`Transport`](crate::Transport)); the parsed name travels with
//! the connection configuration for logging and display.
//!
//! # Example
//!
//! ```
//! use instrlib_core::ResourceName;
//!
//! let name: ResourceName = "gpib0::19::instr".parse().unwrap();
//! assert_eq!(name.to_string(), "GPIB0::19::INSTR");
//!
//! // A bare primary address means board 0.
//! assert_eq!(ResourceName::from(5u8).to_string(), "GPIB0::5::INSTR");
//! ```

use std::fmt;
use std::str::FromStr;

/// Highest valid GPIB primary address.
const MAX_GPIB_ADDRESS: u8 = 30;

/// A parsed instrument address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceName {
    /// GPIB instrument: board index and primary address.
    Gpib {
        /// Interface board number (the `0` in `GPIB0`).
        board: u8,
        /// Primary address, 0-30.
        address: u8,
    },
    /// Serial instrument. `port` is either a number (`ASRL2`) or a device
    /// path (`ASRL/dev/ttyUSB0`).
    Serial {
        /// Port number or device path.
        port: String,
    },
    /// Raw TCP socket (`TCPIP0::host::port::SOCKET`).
    TcpSocket {
        /// Interface board number.
        board: u8,
        /// Host name or IP address.
        host: String,
        /// TCP port.
        port: u16,
    },
    /// VXI-11 / LXI instrument (`TCPIP0::host[::device]::INSTR`).
    TcpInstr {
        /// Interface board number.
        board: u8,
        /// Host name or IP address.
        host: String,
        /// Optional LAN device name (e.g. `inst0`).
        device: Option<String>,
    },
}

impl From<u8> for ResourceName {
    fn from(address: u8) -> Self {
        ResourceName::Gpib { board: 0, address }
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceName::Gpib { board, address } => write!(f, "GPIB{board}::{address}::INSTR"),
            ResourceName::Serial { port } => write!(f, "ASRL{port}::INSTR"),
            ResourceName::TcpSocket { board, host, port } => {
                write!(f, "TCPIP{board}::{host}::{port}::SOCKET")
            }
            ResourceName::TcpInstr {
                board,
                host,
                device: Some(device),
            } => write!(f, "TCPIP{board}::{host}::{device}::INSTR"),
            ResourceName::TcpInstr {
                board,
                host,
                device: None,
            } => write!(f, "TCPIP{board}::{host}::INSTR"),
        }
    }
}

/// Error returned when a string is not a recognised resource name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseResourceError(String);

impl fmt::Display for ParseResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid resource name: {}", self.0)
    }
}

impl std::error::Error for ParseResourceError {}

impl FromStr for ResourceName {
    type Err = ParseResourceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ParseResourceError(s.to_string());

        let parts: Vec<&str> = s.trim().split("::").collect();
        let head = parts[0];
        let upper_head = head.to_ascii_uppercase();
        let class = parts
            .last()
            .map(|p| p.to_ascii_uppercase())
            .unwrap_or_default();

        if upper_head.starts_with("GPIB") {
            if parts.len() != 3 || class != "INSTR" {
                return Err(invalid());
            }
            let board = parse_board(&head[4..]).ok_or_else(invalid)?;
            let address: u8 = parts[1].parse().map_err(|_| invalid())?;
            if address > MAX_GPIB_ADDRESS {
                return Err(invalid());
            }
            return Ok(ResourceName::Gpib { board, address });
        }

        if upper_head.starts_with("ASRL") {
            let port = &head[4..];
            if parts.len() != 2 || class != "INSTR" || port.is_empty() {
                return Err(invalid());
            }
            return Ok(ResourceName::Serial {
                port: port.to_string(),
            });
        }

        if upper_head.starts_with("TCPIP") {
            let board = parse_board(&head[5..]).ok_or_else(invalid)?;
            let host = parts.get(1).filter(|h| !h.is_empty()).ok_or_else(invalid)?;
            return match (parts.len(), class.as_str()) {
                (4, "SOCKET") => {
                    let port: u16 = parts[2].parse().map_err(|_| invalid())?;
                    Ok(ResourceName::TcpSocket {
                        board,
                        host: host.to_string(),
                        port,
                    })
                }
                (3, "INSTR") => Ok(ResourceName::TcpInstr {
                    board,
                    host: host.to_string(),
                    device: None,
                }),
                (4, "INSTR") => Ok(ResourceName::TcpInstr {
                    board,
                    host: host.to_string(),
                    device: Some(parts[2].to_string()),
                }),
                _ => Err(invalid()),
            };
        }

        Err(invalid())
    }
}

/// Parse the optional board number after an interface prefix (`""` is 0).
fn parse_board(digits: &str) -> Option<u8> {
    if digits.is_empty() {
        Some(0)
    } else {
        digits.parse().ok()
    }
}
