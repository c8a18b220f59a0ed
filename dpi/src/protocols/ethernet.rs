use crate::parser::{DecodeError, Layer};
use nom::Parser;
use nom::bytes::take;
use nom::number::be_u16;
use num_enum::FromPrimitive;

// Ethernet II, IEEE 802.1Q and 802.1ad tags
// https://standards.ieee.org/ieee/802.1Q/10323/

pub const MAC_LENGTH_BYTES: usize = 6;
pub const VLAN_TAG_CONTROL_LENGTH_BYTES: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromPrimitive)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
    Vlan = 0x8100,
    Ipv6 = 0x86DD,
    QinQ = 0x88A8,

    #[num_enum(catch_all)]
    Other(u16),
}

/// Network-layer part of an Ethernet frame with VLAN tags skipped.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EthernetFrame<'a> {
    pub ether_type: EtherType,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    /// The IPv4 datagram carried by the frame, if that is what it carries.
    pub fn ipv4(&self) -> Option<&'a [u8]> {
        match self.ether_type {
            EtherType::Ipv4 => Some(self.payload),
            _ => None,
        }
    }
}

pub fn parse(bytes: &[u8]) -> Result<EthernetFrame<'_>, DecodeError> {
    let truncated = DecodeError::from_nom(Layer::Ethernet);

    // Destination and source MAC. 6 bytes each
    let (rest, _) = take(MAC_LENGTH_BYTES * 2).parse(bytes).map_err(&truncated)?;
    // EtherType. 2 bytes
    let (mut rest, mut ether_type) = be_u16().parse(rest).map_err(&truncated)?;

    // Tag control information, then the next EtherType.
    while matches!(
        EtherType::from(ether_type),
        EtherType::Vlan | EtherType::QinQ
    ) {
        let (after_tag, _) = take(VLAN_TAG_CONTROL_LENGTH_BYTES)
            .parse(rest)
            .map_err(&truncated)?;
        (rest, ether_type) = be_u16().parse(after_tag).map_err(&truncated)?;
    }

    Ok(EthernetFrame {
        ether_type: EtherType::from(ether_type),
        payload: rest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::tests::bytes;

    const MACS: &str = "00 1A 2B 3C 4D 5E 00 5E 4D 3C 2B 1A";
    const IPV4: &str = "45 00 00 14 00 00 00 00 40 06 00 00 0A 00 00 01 0A 00 00 02";

    #[test]
    fn test_untagged_ipv4() {
        let frame = bytes(&format!("{MACS} 08 00 {IPV4}"));
        let ethernet = parse(&frame).unwrap();

        assert_eq!(ethernet.ether_type, EtherType::Ipv4);
        assert_eq!(ethernet.ipv4(), Some(&frame[14..]));
    }

    #[test]
    fn test_vlan_tags_are_skipped() {
        let frame = bytes(&format!("{MACS} 88 A8 00 64 81 00 00 0A 08 00 {IPV4}"));
        let ethernet = parse(&frame).unwrap();

        assert_eq!(ethernet.ether_type, EtherType::Ipv4);
        assert_eq!(ethernet.ipv4(), Some(&frame[22..]));
    }

    #[test]
    fn test_other_ether_types_carry_no_ipv4() {
        let frame = bytes(&format!("{MACS} 08 06 00 01 08 00 06 04 00 01"));
        let ethernet = parse(&frame).unwrap();

        assert_eq!(ethernet.ether_type, EtherType::Arp);
        assert!(ethernet.ipv4().is_none());

        let frame = bytes(&format!("{MACS} 88 CC 02 07"));
        assert_eq!(parse(&frame).unwrap().ether_type, EtherType::Other(0x88CC));
    }

    #[test]
    fn test_truncated() {
        let frame = bytes("00 1A 2B 3C 4D 5E 00 5E 4D 3C 2B 1A 08");
        assert_eq!(
            parse(&frame).unwrap_err(),
            DecodeError::Truncated(Layer::Ethernet)
        );

        let frame = bytes(&format!("{MACS} 81 00 00"));
        assert_eq!(
            parse(&frame).unwrap_err(),
            DecodeError::Truncated(Layer::Ethernet)
        );
    }
}
