use crate::parser::{DecodeError, Layer};
use crate::protocols::HasPorts;
use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::ipv4::Ipv4Packet;
use nom::Parser;
use nom::number::be_u16;

// UDP Protocol
// RFC 768: https://datatracker.ietf.org/doc/html/rfc768

pub const HEADER_LENGTH_BYTES: usize = 8;

pub fn parse<'a>(ip: &Ipv4Packet<'a>) -> Result<UdpPacket<'a>, DecodeError> {
    if ip.protocol != IpProtocol::Udp {
        return Err(DecodeError::ProtocolMismatch {
            layer: Layer::Udp,
            actual: ip.protocol,
        });
    }

    let truncated = DecodeError::from_nom(Layer::Udp);

    // Source port. 2 bytes
    let (rest, port_source) = be_u16().parse(ip.payload).map_err(&truncated)?;
    // Destination port. 2 bytes
    let (rest, port_destination) = be_u16().parse(rest).map_err(&truncated)?;
    // Length. 2 bytes
    let (rest, length) = be_u16().parse(rest).map_err(&truncated)?;
    // Checksum. 2 bytes
    let (payload, checksum) = be_u16().parse(rest).map_err(&truncated)?;

    Ok(UdpPacket {
        port_source,
        port_destination,
        length,
        checksum,
        payload,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct UdpPacket<'a> {
    pub port_source: u16,
    pub port_destination: u16,
    pub length: u16,
    pub checksum: u16,
    pub payload: &'a [u8],
}

impl HasPorts for UdpPacket<'_> {
    fn port_source(&self) -> u16 {
        self.port_source
    }

    fn port_destination(&self) -> u16 {
        self.port_destination
    }
}
