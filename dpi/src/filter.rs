use crate::protocols::ip::protocol::IpProtocol;
use crate::protocols::{HasPorts, IpPacket};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use strum_macros::Display;

#[derive(Clone, Copy, Debug, Default, Display, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    #[default]
    #[strum(to_string = "AND")]
    And,

    #[strum(to_string = "OR")]
    Or,
}

/// Field selector with the expected value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Predicate {
    Protocol(IpProtocol),
    SourceAddress(IpAddr),
    DestinationAddress(IpAddr),
    SourcePort(u16),
    DestinationPort(u16),
}

impl Predicate {
    pub fn is_match(&self, packet: &IpPacket) -> bool {
        match self {
            Self::Protocol(expected) => packet.protocol() == Some(*expected),
            Self::SourceAddress(expected) => packet.address_source() == Some(*expected),
            Self::DestinationAddress(expected) => {
                packet.address_destination() == Some(*expected)
            },
            Self::SourcePort(expected) => {
                Self::ports(packet).is_some_and(|ports| ports.port_source() == *expected)
            },
            Self::DestinationPort(expected) => Self::ports(packet)
                .is_some_and(|ports| ports.port_destination() == *expected),
        }
    }

    fn ports<'p>(packet: &'p IpPacket) -> Option<&'p dyn HasPorts> {
        packet.transport().and_then(|transport| transport.ports())
    }
}

/// Predicates combined with a single operator.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Filters {
    operator: Operator,
    predicates: Vec<Predicate>,
}

impl Filters {
    pub fn new(operator: Operator) -> Self {
        Self {
            operator,
            predicates: Vec::new(),
        }
    }

    pub fn with_predicates(operator: Operator, predicates: Vec<Predicate>) -> Self {
        Self {
            operator,
            predicates,
        }
    }

    pub fn push(&mut self, predicate: Predicate) {
        self.predicates.push(predicate);
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// AND of nothing is true, OR of nothing is false.
    pub fn is_match(&self, packet: &IpPacket) -> bool {
        match self.operator {
            Operator::And => self.predicates.iter().all(|value| value.is_match(packet)),
            Operator::Or => self.predicates.iter().any(|value| value.is_match(packet)),
        }
    }
}

impl std::fmt::Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Protocol(value) => write!(f, "protocol = {}", value),
            Self::SourceAddress(value) => write!(f, "source address = {}", value),
            Self::DestinationAddress(value) => write!(f, "destination address = {}", value),
            Self::SourcePort(value) => write!(f, "source port = {}", value),
            Self::DestinationPort(value) => write!(f, "destination port = {}", value),
        }
    }
}

impl std::fmt::Display for Filters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.predicates.is_empty() {
            return write!(f, "everything");
        }

        let separator = format!(" {} ", self.operator);
        let predicates: Vec<String> = self
            .predicates
            .iter()
            .map(|value| value.to_string())
            .collect();

        write!(f, "{}", predicates.join(&separator))
    }
}
