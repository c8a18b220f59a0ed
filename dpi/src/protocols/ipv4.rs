use crate::parser::{DecodeError, Layer, words_to_bytes};
use crate::protocols::TransportPacket;
use crate::protocols::ip::address;
use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ip::version::{IpVersion, VERSION_LENGTH_BITS};
use chrono::{DateTime, Utc};
use nom::number::{be_u8, be_u16};
use nom::{Parser, bits};
use std::net::Ipv4Addr;

// IPv4 Protocol
// RFC 791: https://datatracker.ietf.org/doc/html/rfc791

pub const IHL_LENGTH_BITS: usize = 4;
pub const FLAGS_LENGTH_BITS: usize = 3;
pub const FRAGMENT_OFFSET_LENGTH_BITS: usize = 13;
pub const MIN_HEADER_LENGTH_BYTES: usize = 20;

pub fn parse(bytes: &[u8], captured_at: DateTime<Utc>) -> Result<Ipv4Packet<'_>, DecodeError> {
    let truncated = DecodeError::from_nom(Layer::Ipv4);

    // Version, IHL. Both - 4 bits
    let (rest, (version, ihl)): (&[u8], (u8, u8)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(VERSION_LENGTH_BITS),
            bits::complete::take(IHL_LENGTH_BITS),
        ))(bytes)
        .map_err(&truncated)?;

    // Type of service. 1 byte
    let (rest, type_of_service) = be_u8().parse(rest).map_err(&truncated)?;
    // Total length. 2 bytes
    let (rest, total_length) = be_u16().parse(rest).map_err(&truncated)?;
    // Identification. 2 bytes
    let (rest, identification) = be_u16().parse(rest).map_err(&truncated)?;

    // Flags - 3 bits, Fragment offset - 13 bits
    let (rest, (flags, fragment_offset)): (&[u8], (u8, u16)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(FLAGS_LENGTH_BITS),
            bits::complete::take(FRAGMENT_OFFSET_LENGTH_BITS),
        ))(rest)
        .map_err(&truncated)?;

    // TTL. 1 byte
    let (rest, time_to_live) = be_u8().parse(rest).map_err(&truncated)?;
    // Protocol. 1 byte
    let (rest, protocol) = be_u8().parse(rest).map_err(&truncated)?;
    // Header checksum. 2 bytes
    let (rest, checksum) = be_u16().parse(rest).map_err(&truncated)?;

    let (rest, address_source) = address::v4_parse(rest).map_err(&truncated)?;
    let (_, address_destination) = address::v4_parse(rest).map_err(&truncated)?;

    // IHL is stored in 32bit words. Options between byte 20 and the header end are skipped.
    let header_length = words_to_bytes(ihl);
    if header_length < MIN_HEADER_LENGTH_BYTES || header_length > bytes.len() {
        return Err(DecodeError::HeaderLength {
            layer: Layer::Ipv4,
            length: header_length,
        });
    }
    let payload = bytes.get(header_length..).ok_or(DecodeError::HeaderLength {
        layer: Layer::Ipv4,
        length: header_length,
    })?;

    Ok(Ipv4Packet {
        captured_at,
        version: IpVersion::from(version),
        header_length,
        type_of_service,
        total_length,
        identification,
        flags: FragmentationFlags::from(flags),
        fragment_offset,
        time_to_live,
        protocol: IpProtocol::from(protocol),
        checksum,
        address_source,
        address_destination,
        raw: bytes,
        payload,
        transport: None,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct Ipv4Packet<'a> {
    pub captured_at: DateTime<Utc>,
    pub version: IpVersion,
    /// In bytes, IHL already multiplied.
    pub header_length: usize,
    pub type_of_service: u8,
    pub total_length: u16,
    pub identification: u16,
    pub flags: FragmentationFlags,
    pub fragment_offset: u16,
    pub time_to_live: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub address_source: Ipv4Addr,
    pub address_destination: Ipv4Addr,
    pub raw: &'a [u8],
    pub payload: &'a [u8],
    pub transport: Option<TransportPacket<'a>>,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FragmentationFlags {
    pub reserved: bool,
    pub dont_fragment: bool,
    pub more_fragments: bool,
}

impl From<u8> for FragmentationFlags {
    fn from(value: u8) -> Self {
        Self {
            reserved: value & 0b100 != 0,
            dont_fragment: value & 0b010 != 0,
            more_fragments: value & 0b001 != 0,
        }
    }
}
