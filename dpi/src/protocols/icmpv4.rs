use crate::parser::{DecodeError, Layer};
use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ipv4::Ipv4Packet;
use nom::Parser;
use nom::number::{be_u8, be_u16, be_u32};

// ICMPv4 Protocol
// RFC 792: https://datatracker.ietf.org/doc/html/rfc792

pub const HEADER_LENGTH_BYTES: usize = 8;

/// Type and code stay raw, their meaning depends on the message.
pub fn parse<'a>(ip: &Ipv4Packet<'a>) -> Result<IcmpPacket<'a>, DecodeError> {
    if ip.protocol != IpProtocol::Icmp {
        return Err(DecodeError::ProtocolMismatch {
            layer: Layer::Icmp,
            actual: ip.protocol,
        });
    }

    let truncated = DecodeError::from_nom(Layer::Icmp);

    // Message type. 1 byte
    let (rest, message_type) = be_u8().parse(ip.payload).map_err(&truncated)?;
    // Code. 1 byte
    let (rest, code) = be_u8().parse(rest).map_err(&truncated)?;
    // Checksum. 2 bytes
    let (rest, checksum) = be_u16().parse(rest).map_err(&truncated)?;
    // Rest of header, depending on type & code. 4 bytes
    let (payload, rest_of_header) = be_u32().parse(rest).map_err(&truncated)?;

    Ok(IcmpPacket {
        message_type,
        code,
        checksum,
        rest_of_header,
        payload,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct IcmpPacket<'a> {
    pub message_type: u8,
    pub code: u8,
    pub checksum: u16,
    pub rest_of_header: u32,
    pub payload: &'a [u8],
}
