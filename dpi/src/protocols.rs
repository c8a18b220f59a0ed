use crate::parser::DecodeError;
use crate::protocols::icmpv4::IcmpPacket;
use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ip::version::IpVersion;
use crate::protocols::ipv4::Ipv4Packet;
use crate::protocols::tcp::TcpPacket;
use crate::protocols::udp::UdpPacket;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// Decoded network-layer packet. Every slice borrows the captured frame.
#[derive(Clone, Debug, PartialEq)]
pub enum IpPacket<'a> {
    V4(Ipv4Packet<'a>),
    Unsupported(UnsupportedPacket<'a>),
}

impl<'a> IpPacket<'a> {
    pub fn version(&self) -> IpVersion {
        match self {
            Self::V4(_) => IpVersion::V4,
            Self::Unsupported(packet) => packet.version,
        }
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        match self {
            Self::V4(packet) => packet.captured_at,
            Self::Unsupported(packet) => packet.captured_at,
        }
    }

    pub fn protocol(&self) -> Option<IpProtocol> {
        match self {
            Self::V4(packet) => Some(packet.protocol),
            Self::Unsupported(_) => None,
        }
    }

    pub fn address_source(&self) -> Option<IpAddr> {
        match self {
            Self::V4(packet) => Some(IpAddr::V4(packet.address_source)),
            Self::Unsupported(_) => None,
        }
    }

    pub fn address_destination(&self) -> Option<IpAddr> {
        match self {
            Self::V4(packet) => Some(IpAddr::V4(packet.address_destination)),
            Self::Unsupported(_) => None,
        }
    }

    pub fn transport(&self) -> Option<&TransportPacket<'a>> {
        match self {
            Self::V4(packet) => packet.transport.as_ref(),
            Self::Unsupported(_) => None,
        }
    }

    /// The whole datagram, header included.
    pub fn raw(&self) -> &'a [u8] {
        match self {
            Self::V4(packet) => packet.raw,
            Self::Unsupported(packet) => packet.raw,
        }
    }
}

/// IPv6 and friends: recognised, kept as raw bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsupportedPacket<'a> {
    pub version: IpVersion,
    pub captured_at: DateTime<Utc>,
    pub raw: &'a [u8],
}

#[derive(Clone, Debug, PartialEq)]
pub enum TransportPacket<'a> {
    Tcp(TcpPacket<'a>),
    Udp(UdpPacket<'a>),
    Icmp(IcmpPacket<'a>),
    Raw(RawPacket<'a>),
}

impl<'a> TransportPacket<'a> {
    /// Dispatches on the IP protocol number. Protocols without a decoder are kept as `Raw`.
    pub fn decode(ip: &Ipv4Packet<'a>) -> Result<Self, DecodeError> {
        match ip.protocol {
            IpProtocol::Tcp => tcp::parse(ip).map(Self::Tcp),
            IpProtocol::Udp => udp::parse(ip).map(Self::Udp),
            IpProtocol::Icmp => icmpv4::parse(ip).map(Self::Icmp),
            _ => Ok(Self::Raw(RawPacket::new(ip.payload))),
        }
    }

    pub fn ports(&self) -> Option<&dyn HasPorts> {
        match self {
            Self::Tcp(packet) => Some(packet),
            Self::Udp(packet) => Some(packet),
            Self::Icmp(_) | Self::Raw(_) => None,
        }
    }

    pub fn payload(&self) -> &'a [u8] {
        match self {
            Self::Tcp(packet) => packet.payload,
            Self::Udp(packet) => packet.payload,
            Self::Icmp(packet) => packet.payload,
            Self::Raw(packet) => packet.payload,
        }
    }
}

/// Transport protocols with a port abstraction.
pub trait HasPorts {
    fn port_source(&self) -> u16;
    fn port_destination(&self) -> u16;
}

/// Transport payload that was not parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPacket<'a> {
    pub payload: &'a [u8],
}

impl<'a> RawPacket<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload }
    }
}

pub mod ethernet;
pub mod icmpv4;
pub mod ip {
    pub mod address;
    pub mod protocol;
    pub mod version;
}
pub mod ipv4;
pub mod tcp;
pub mod udp;
