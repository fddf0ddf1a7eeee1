//! Typed SLP messages.
//!
//! A [`Message`] is a value: it is created by decoding a PDU or by an
//! application builder, consumed by encoding or by dispatch, and never shares
//! mutable state. String fields are [`Cow`]s so that SLPv2 decoding can
//! borrow from the receive buffer while SLPv1 decoding (which transcodes the
//! character set) and application builders own their storage.

use std::borrow::Cow;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{core::LanguageTag, error::ErrorCode};

/// The protocol version carried in the first byte of every PDU.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Version {
    V1,
    V2,
}

impl TryFrom<u8> for Version {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            other => Err(other),
        }
    }
}

/// SLPv2 function ids (RFC 2608, section 8).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum FunctionId {
    SrvRqst = 1,
    SrvRply = 2,
    SrvReg = 3,
    SrvDeReg = 4,
    SrvAck = 5,
    AttrRqst = 6,
    AttrRply = 7,
    DaAdvert = 8,
    SrvTypeRqst = 9,
    SrvTypeRply = 10,
    SaAdvert = 11,
}

impl TryFrom<u8> for FunctionId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => FunctionId::SrvRqst,
            2 => FunctionId::SrvRply,
            3 => FunctionId::SrvReg,
            4 => FunctionId::SrvDeReg,
            5 => FunctionId::SrvAck,
            6 => FunctionId::AttrRqst,
            7 => FunctionId::AttrRply,
            8 => FunctionId::DaAdvert,
            9 => FunctionId::SrvTypeRqst,
            10 => FunctionId::SrvTypeRply,
            11 => FunctionId::SaAdvert,
            other => return Err(other),
        })
    }
}

/// Header flags in the SLPv2 bit layout.
///
/// The SLPv1 parser maps the v1 flag byte onto the same logical bits, so the
/// rest of the engine only ever sees this representation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Flags(u16);

impl Flags {
    /// The PDU was truncated to fit the transport.
    pub const OVERFLOW: u16 = 0x8000;
    /// The registration is fresh (SrvReg only).
    pub const FRESH: u16 = 0x4000;
    /// The request was multicast.
    pub const MCAST: u16 = 0x2000;

    /// All bits outside the three assigned flags; must be zero on the wire.
    pub const RESERVED: u16 = !(Self::OVERFLOW | Self::FRESH | Self::MCAST);

    pub fn new(bits: u16) -> Self {
        Flags(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn overflow(self) -> bool {
        self.0 & Self::OVERFLOW != 0
    }

    pub fn fresh(self) -> bool {
        self.0 & Self::FRESH != 0
    }

    pub fn mcast(self) -> bool {
        self.0 & Self::MCAST != 0
    }

    pub fn with(self, flag: u16) -> Self {
        Flags(self.0 | flag)
    }
}

/// SLPv1 string encodings (IANA MIBenum values).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Charset {
    Ascii,
    Utf8,
    Ucs2,
    Ucs4,
}

impl Charset {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            3 => Some(Charset::Ascii),
            106 => Some(Charset::Utf8),
            1000 => Some(Charset::Ucs2),
            1001 => Some(Charset::Ucs4),
            _ => None,
        }
    }

    pub fn to_u16(self) -> u16 {
        match self {
            Charset::Ascii => 3,
            Charset::Utf8 => 106,
            Charset::Ucs2 => 1000,
            Charset::Ucs4 => 1001,
        }
    }
}

/// The version-independent part of a message header.
///
/// Lengths and extension offsets are wire artifacts; they are recomputed on
/// encode and never stored here.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Header<'a> {
    pub version: Version,
    pub flags: Flags,
    pub xid: u16,
    pub lang_tag: LanguageTag<'a>,
}

impl<'a> Header<'a> {
    /// A v2 header with no flags set.
    pub fn v2(xid: u16, lang_tag: LanguageTag<'a>) -> Self {
        Header {
            version: Version::V2,
            flags: Flags::default(),
            xid,
            lang_tag,
        }
    }
}

/// A URL entry: lifetime, URL, and authentication blocks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct UrlEntry<'a> {
    pub reserved: u8,
    /// Registration lifetime in seconds.
    pub lifetime: u16,
    pub url: Cow<'a, str>,
    pub auths: Vec<AuthBlock<'a>>,
}

impl<'a> UrlEntry<'a> {
    pub fn new(lifetime: u16, url: impl Into<Cow<'a, str>>) -> Self {
        UrlEntry {
            reserved: 0,
            lifetime,
            url: url.into(),
            auths: Vec::new(),
        }
    }
}

/// An authentication block. Opaque to the engine and immutable after
/// construction; it is carried, never verified.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AuthBlock<'a> {
    /// Block structure descriptor.
    pub bsd: u16,
    pub timestamp: u32,
    pub spi: Cow<'a, str>,
    pub data: Cow<'a, [u8]>,
}

/// One node of the extension chain at the tail of a v2 PDU.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Extension<'a> {
    pub id: u16,
    pub data: Cow<'a, [u8]>,
}

/// The naming-authority field of a SrvTypeRqst.
///
/// A zero wire length selects the IANA default; `0xFFFF` matches every
/// naming authority. Both carry no string bytes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum NamingAuthority<'a> {
    Iana,
    All,
    Other(Cow<'a, str>),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvRqst<'a> {
    pub prlist: Cow<'a, str>,
    pub service_type: Cow<'a, str>,
    pub scope_list: Cow<'a, str>,
    pub predicate: Cow<'a, str>,
    pub spi: Cow<'a, str>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvRply<'a> {
    pub error_code: ErrorCode,
    pub url_entries: Vec<UrlEntry<'a>>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvReg<'a> {
    pub url_entry: UrlEntry<'a>,
    pub service_type: Cow<'a, str>,
    pub scope_list: Cow<'a, str>,
    pub attr_list: Cow<'a, str>,
    pub attr_auths: Vec<AuthBlock<'a>>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvDeReg<'a> {
    pub scope_list: Cow<'a, str>,
    pub url_entry: UrlEntry<'a>,
    pub tag_list: Cow<'a, str>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SrvAck {
    pub error_code: ErrorCode,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AttrRqst<'a> {
    pub prlist: Cow<'a, str>,
    pub url: Cow<'a, str>,
    pub scope_list: Cow<'a, str>,
    pub tag_list: Cow<'a, str>,
    pub spi: Cow<'a, str>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct AttrRply<'a> {
    pub error_code: ErrorCode,
    pub attr_list: Cow<'a, str>,
    pub attr_auths: Vec<AuthBlock<'a>>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct DaAdvert<'a> {
    pub error_code: ErrorCode,
    pub boot_timestamp: u32,
    pub url: Cow<'a, str>,
    pub scope_list: Cow<'a, str>,
    pub attr_list: Cow<'a, str>,
    pub spi_list: Cow<'a, str>,
    pub auths: Vec<AuthBlock<'a>>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvTypeRqst<'a> {
    pub prlist: Cow<'a, str>,
    pub naming_auth: NamingAuthority<'a>,
    pub scope_list: Cow<'a, str>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SrvTypeRply<'a> {
    pub error_code: ErrorCode,
    pub srvtype_list: Cow<'a, str>,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SaAdvert<'a> {
    pub url: Cow<'a, str>,
    pub scope_list: Cow<'a, str>,
    pub attr_list: Cow<'a, str>,
    pub auths: Vec<AuthBlock<'a>>,
}

/// A message body, discriminated on the function id.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Body<'a> {
    SrvRqst(SrvRqst<'a>),
    SrvRply(SrvRply<'a>),
    SrvReg(SrvReg<'a>),
    SrvDeReg(SrvDeReg<'a>),
    SrvAck(SrvAck),
    AttrRqst(AttrRqst<'a>),
    AttrRply(AttrRply<'a>),
    DaAdvert(DaAdvert<'a>),
    SrvTypeRqst(SrvTypeRqst<'a>),
    SrvTypeRply(SrvTypeRply<'a>),
    SaAdvert(SaAdvert<'a>),
}

impl Body<'_> {
    pub fn function_id(&self) -> FunctionId {
        match self {
            Body::SrvRqst(_) => FunctionId::SrvRqst,
            Body::SrvRply(_) => FunctionId::SrvRply,
            Body::SrvReg(_) => FunctionId::SrvReg,
            Body::SrvDeReg(_) => FunctionId::SrvDeReg,
            Body::SrvAck(_) => FunctionId::SrvAck,
            Body::AttrRqst(_) => FunctionId::AttrRqst,
            Body::AttrRply(_) => FunctionId::AttrRply,
            Body::DaAdvert(_) => FunctionId::DaAdvert,
            Body::SrvTypeRqst(_) => FunctionId::SrvTypeRqst,
            Body::SrvTypeRply(_) => FunctionId::SrvTypeRply,
            Body::SaAdvert(_) => FunctionId::SaAdvert,
        }
    }
}

/// A complete SLP message: header, body, and any v2 extensions.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Message<'a> {
    pub header: Header<'a>,
    pub body: Body<'a>,
    pub extensions: Vec<Extension<'a>>,
}

impl<'a> Message<'a> {
    pub fn new(header: Header<'a>, body: Body<'a>) -> Self {
        Message {
            header,
            body,
            extensions: Vec::new(),
        }
    }
}
