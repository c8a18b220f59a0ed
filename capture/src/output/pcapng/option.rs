use crate::output::pcapng::{EncodeError, padded_length};
use bytes::{BufMut, BytesMut};

pub mod codes {
    pub const END_OF_OPTIONS: u16 = 0;

    pub const SHB_OS: u16 = 3;
    pub const SHB_USER_APPLICATION: u16 = 4;

    pub const IF_NAME: u16 = 2;
    pub const IF_DESCRIPTION: u16 = 3;
    pub const IF_TIMESTAMP_RESOLUTION: u16 = 9;
}

pub const HEADER_LENGTH_BYTES: usize = 4;

/// `[Code:2][Length:2][Value, zero-padded to 4 bytes]`
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockOption {
    code: u16,
    value: Vec<u8>,
}

impl BlockOption {
    pub fn new(code: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }

    pub fn end_of_options() -> Self {
        Self::new(codes::END_OF_OPTIONS, Vec::new())
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Serialized size, padding included.
    pub fn length(&self) -> usize {
        HEADER_LENGTH_BYTES + padded_length(self.value.len())
    }

    pub fn encode(&self, buffer: &mut BytesMut) -> Result<(), EncodeError> {
        let length = u16::try_from(self.value.len()).map_err(|_| EncodeError::OptionTooLong {
            code: self.code,
            length: self.value.len(),
        })?;

        buffer.put_u16_le(self.code);
        buffer.put_u16_le(length);
        buffer.put_slice(&self.value);
        buffer.put_bytes(0, padded_length(self.value.len()) - self.value.len());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_byte_value() {
        let option = BlockOption::new(codes::IF_NAME, "eth");
        let mut buffer = BytesMut::new();
        option.encode(&mut buffer).unwrap();

        assert_eq!(option.length(), 8);
        assert_eq!(buffer.len(), option.length());
        assert_eq!(&buffer[..], hex::decode("0200030065746800").unwrap());
    }

    #[test]
    fn test_aligned_value_has_no_padding() {
        let option = BlockOption::new(codes::SHB_OS, "Unix");
        let mut buffer = BytesMut::new();
        option.encode(&mut buffer).unwrap();

        assert_eq!(&buffer[..], hex::decode("03000400556E6978").unwrap());
    }

    #[test]
    fn test_end_of_options() {
        let option = BlockOption::end_of_options();
        let mut buffer = BytesMut::new();
        option.encode(&mut buffer).unwrap();

        assert_eq!(option.length(), 4);
        assert_eq!(&buffer[..], [0u8; 4]);
    }

    #[test]
    fn test_value_too_long() {
        let option = BlockOption::new(codes::IF_DESCRIPTION, vec![0x41; 65536]);
        let mut buffer = BytesMut::new();

        assert_eq!(
            option.encode(&mut buffer).unwrap_err(),
            EncodeError::OptionTooLong {
                code: codes::IF_DESCRIPTION,
                length: 65536
            }
        );
        assert!(buffer.is_empty());
    }
}
