use slp_types::{error::SlpError, message::Message};

use crate::{rfc2165, rfc2608};

pub trait Decode<'a>: Sized + 'a {
    fn decode(input: &'a [u8]) -> Result<Self, SlpError>;
}

impl<'a> Decode<'a> for Message<'a> {
    /// Parse a complete PDU, dispatching on the version byte.
    ///
    /// SLPv2 messages borrow their string fields from `input`; SLPv1
    /// messages own them (the character set is transcoded to UTF-8).
    fn decode(input: &'a [u8]) -> Result<Self, SlpError> {
        match input.first() {
            Some(1) => rfc2165::message(input),
            Some(2) => rfc2608::message(input),
            Some(_) => Err(SlpError::Parse("unsupported protocol version")),
            None => Err(SlpError::Parse("empty buffer")),
        }
    }
}
