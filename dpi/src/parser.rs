use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ip::version::IpVersion;
use crate::protocols::{IpPacket, TransportPacket, UnsupportedPacket, ipv4};
use chrono::{DateTime, Utc};
use strum_macros::Display;
use thiserror::Error;

/// Decodes a raw IP datagram (no link-layer header) into a borrowed packet view.
/// IPv4 packets carry their transport: TCP, UDP and ICMP are parsed, other protocols stay raw.
/// A truncated or malformed transport header fails the whole decode.
pub fn decode(bytes: &[u8], captured_at: DateTime<Utc>) -> Result<IpPacket<'_>, DecodeError> {
    let first_byte = bytes.first().ok_or(DecodeError::Empty)?;

    match IpVersion::from_first_byte(*first_byte) {
        IpVersion::V4 => {
            let mut packet = ipv4::parse(bytes, captured_at)?;
            packet.transport = Some(TransportPacket::decode(&packet)?);
            Ok(IpPacket::V4(packet))
        },
        IpVersion::V6 => Ok(IpPacket::Unsupported(UnsupportedPacket {
            version: IpVersion::V6,
            captured_at,
            raw: bytes,
        })),
        IpVersion::Other(version) => Err(DecodeError::UnknownVersion(version)),
    }
}

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Layer {
    #[strum(to_string = "Ethernet")]
    Ethernet,

    #[strum(to_string = "IPv4")]
    Ipv4,

    #[strum(to_string = "TCP")]
    Tcp,

    #[strum(to_string = "UDP")]
    Udp,

    #[strum(to_string = "ICMP")]
    Icmp,
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    #[error("Empty packet.")]
    Empty,

    #[error("Unexpected IP packet version: {0}.")]
    UnknownVersion(u8),

    #[error("{0} header is truncated.")]
    Truncated(Layer),

    #[error("{layer} header length {length} is out of bounds.")]
    HeaderLength { layer: Layer, length: usize },

    #[error("{layer} decoder cannot be used for a packet with protocol {actual}.")]
    ProtocolMismatch { layer: Layer, actual: IpProtocol },
}

impl DecodeError {
    // Every nom failure here means the header ended before a fixed-offset field.
    pub(crate) fn from_nom(layer: Layer) -> impl Fn(nom::Err<nom::error::Error<&[u8]>>) -> Self {
        move |_| Self::Truncated(layer)
    }
}

/// Length in bytes of a header length field expressed in 32-bit words.
pub(crate) fn words_to_bytes(words: u8) -> usize {
    usize::from(words) * 4
}
