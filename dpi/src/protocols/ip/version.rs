use num_enum::FromPrimitive;
use std::fmt::{Display, Formatter};

pub const VERSION_LENGTH_BITS: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, FromPrimitive)]
#[repr(u8)]
pub enum IpVersion {
    V4 = 4,
    V6 = 6,

    #[num_enum(catch_all)]
    Other(u8),
}

impl IpVersion {
    /// Version is stored in the top nibble of the first header byte.
    pub fn from_first_byte(byte: u8) -> Self {
        Self::from(byte >> VERSION_LENGTH_BITS)
    }

    pub fn number(&self) -> u8 {
        match self {
            Self::V4 => 4,
            Self::V6 => 6,
            Self::Other(value) => *value,
        }
    }
}

impl Display for IpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "IPv{}", self.number())
    }
}
