// Library lints
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(unsafe_code)]

pub use crate::parser::{DecodeError, decode};
pub use crate::protocols::{HasPorts, IpPacket, TransportPacket};

pub mod filter;
pub mod parser;
pub mod protocols;
