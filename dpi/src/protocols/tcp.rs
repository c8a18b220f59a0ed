use crate::parser::{DecodeError, Layer, words_to_bytes};
use crate::protocols::HasPorts;
use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ipv4::Ipv4Packet;
use nom::number::{be_u16, be_u32};
use nom::{Parser, bits};
use std::fmt;
use std::ops::BitOr;

// TCP Protocol
// RFC 9293: https://datatracker.ietf.org/doc/html/rfc9293

pub const DATA_OFFSET_LENGTH_BITS: usize = 4;
pub const CONTROL_FLAGS_LENGTH_BITS: usize = 12;
pub const MIN_HEADER_LENGTH_BYTES: usize = 20;

pub fn parse<'a>(ip: &Ipv4Packet<'a>) -> Result<TcpPacket<'a>, DecodeError> {
    if ip.protocol != IpProtocol::Tcp {
        return Err(DecodeError::ProtocolMismatch {
            layer: Layer::Tcp,
            actual: ip.protocol,
        });
    }

    let bytes = ip.payload;
    let truncated = DecodeError::from_nom(Layer::Tcp);

    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(bytes).map_err(&truncated)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest).map_err(&truncated)?;

    // Sequence number, 4 bytes
    let (rest, sequence_number) = be_u32().parse(rest).map_err(&truncated)?;
    // Acknowledgement number, 4 bytes
    let (rest, acknowledgement_number) = be_u32().parse(rest).map_err(&truncated)?;

    // Data Offset - 4 bits, reserved and control bits - 12 bits
    let (rest, (data_offset, flags)): (&[u8], (u8, u16)) =
        bits::bits::<_, _, nom::error::Error<_>, _, _>((
            bits::complete::take(DATA_OFFSET_LENGTH_BITS),
            bits::complete::take(CONTROL_FLAGS_LENGTH_BITS),
        ))(rest)
        .map_err(&truncated)?;

    // Window: 2 bytes.
    let (rest, window) = be_u16().parse(rest).map_err(&truncated)?;
    // Checksum: 2 bytes.
    let (rest, checksum) = be_u16().parse(rest).map_err(&truncated)?;
    // Urgent pointer: 2 bytes.
    let (_, urgent_pointer) = be_u16().parse(rest).map_err(&truncated)?;

    // Data Offset is stored in 32bit words. Options up to it are not parsed.
    let header_length = words_to_bytes(data_offset);
    if header_length < MIN_HEADER_LENGTH_BYTES || header_length > bytes.len() {
        return Err(DecodeError::HeaderLength {
            layer: Layer::Tcp,
            length: header_length,
        });
    }
    let payload = bytes.get(header_length..).ok_or(DecodeError::HeaderLength {
        layer: Layer::Tcp,
        length: header_length,
    })?;

    Ok(TcpPacket {
        port_source,
        port_destination,
        sequence_number,
        acknowledgement_number,
        header_length,
        flags: ControlFlags::from_bits(flags),
        window,
        checksum,
        urgent_pointer,
        payload,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct TcpPacket<'a> {
    pub port_source: u16,
    pub port_destination: u16,
    pub sequence_number: u32,
    pub acknowledgement_number: u32,
    /// In bytes, data offset already multiplied.
    pub header_length: usize,
    pub flags: ControlFlags,
    pub window: u16,
    pub checksum: u16,
    pub urgent_pointer: u16,
    pub payload: &'a [u8],
}

impl HasPorts for TcpPacket<'_> {
    fn port_source(&self) -> u16 {
        self.port_source
    }

    fn port_destination(&self) -> u16 {
        self.port_destination
    }
}

/// The nine control bits. The three reserved bits above NS are kept as read.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ControlFlags(u16);

impl ControlFlags {
    pub const FIN: Self = Self(0x001);
    pub const SYN: Self = Self(0x002);
    pub const RST: Self = Self(0x004);
    pub const PSH: Self = Self(0x008);
    pub const ACK: Self = Self(0x010);
    pub const URG: Self = Self(0x020);
    pub const ECE: Self = Self(0x040);
    pub const CWR: Self = Self(0x080);
    pub const NS: Self = Self(0x100);

    const NAMED: [(Self, &'static str); 9] = [
        (Self::NS, "NS"),
        (Self::CWR, "CWR"),
        (Self::ECE, "ECE"),
        (Self::URG, "URG"),
        (Self::ACK, "ACK"),
        (Self::PSH, "PSH"),
        (Self::RST, "RST"),
        (Self::SYN, "SYN"),
        (Self::FIN, "FIN"),
    ];

    pub fn from_bits(bits: u16) -> Self {
        Self(bits & 0x0FFF)
    }

    pub fn bits(&self) -> u16 {
        self.0
    }

    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ControlFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for ControlFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        write!(f, "{}", names.join("|"))
    }
}
