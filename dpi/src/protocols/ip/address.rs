use nom::IResult;
use nom::Parser;
use nom::bytes::take;
use std::net::Ipv4Addr;

pub const V4_LENGTH_BYTES: usize = 4;

pub fn v4_parse(input: &[u8]) -> IResult<&[u8], Ipv4Addr> {
    let (rest, address) = take(V4_LENGTH_BYTES).parse(input)?;

    let address = <[u8; V4_LENGTH_BYTES]>::try_from(address).map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Verify))
    })?;

    Ok((rest, Ipv4Addr::from(address)))
}
