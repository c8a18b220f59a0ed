use num_enum::FromPrimitive;
use std::fmt::{Display, Formatter};

/// Protocol numbers assigned by IANA.
/// Only the protocols that get a transport decoder (and a few common ones, for logs) are named.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Igmp = 2,
    Tcp = 6,
    Udp = 17,
    Gre = 47,
    Esp = 50,
    Ah = 51,
    Ipv6Icmp = 58,
    Ospf = 89,
    Sctp = 132,

    #[num_enum(catch_all)]
    Other(u8),
}

impl IpProtocol {
    pub fn number(&self) -> u8 {
        match self {
            Self::Icmp => 1,
            Self::Igmp => 2,
            Self::Tcp => 6,
            Self::Udp => 17,
            Self::Gre => 47,
            Self::Esp => 50,
            Self::Ah => 51,
            Self::Ipv6Icmp => 58,
            Self::Ospf => 89,
            Self::Sctp => 132,
            Self::Other(value) => *value,
        }
    }
}

// Other(6) and Tcp are the same protocol on the wire.
impl PartialEq<u8> for IpProtocol {
    fn eq(&self, other: &u8) -> bool {
        self.number() == *other
    }
}

impl Display for IpProtocol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Icmp => write!(f, "ICMP"),
            Self::Igmp => write!(f, "IGMP"),
            Self::Tcp => write!(f, "TCP"),
            Self::Udp => write!(f, "UDP"),
            Self::Gre => write!(f, "GRE"),
            Self::Esp => write!(f, "ESP"),
            Self::Ah => write!(f, "AH"),
            Self::Ipv6Icmp => write!(f, "IPv6-ICMP"),
            Self::Ospf => write!(f, "OSPF"),
            Self::Sctp => write!(f, "SCTP"),
            Self::Other(value) => write!(f, "Protocol {}", value),
        }
    }
}
