//! Raw parsers for the SLPv1 wire format (RFC 2165).
//!
//! SLPv1 frames a 12-byte header and carries a character-set field; every
//! string is transcoded into a freshly allocated UTF-8 buffer during the
//! parse, so v1 messages own their strings. Only the message types a v2
//! agent needs for backward compatibility are parsed; v1 reply frames fail
//! with [`SlpError::NotSupported`], and nothing here is ever encoded.

use std::borrow::Cow;

use nom::{
    error::Error,
    multi::length_data,
    number::complete::be_u16,
};
use slp_types::{
    core::LanguageTag,
    error::{ErrorCode, SlpError},
    message::{
        AttrRqst, Body, Charset, DaAdvert, Flags, Header, Message, NamingAuthority, SrvDeReg,
        SrvReg, SrvRqst, SrvTypeRqst, UrlEntry, Version,
    },
};

use crate::compare::strings_eq;

const V1_HEADER_LEN: usize = 12;

const V1_FLAG_OVERFLOW: u8 = 0x80;
const V1_FLAG_FRESH: u8 = 0x08;
/// The low three flag bits are reserved in SLPv1.
const V1_FLAG_RESERVED: u8 = 0x07;

/// Scope substituted when a v1 request carries none.
pub(crate) const DEFAULT_SCOPE: &str = "default";

/// Parse a complete SLPv1 PDU.
///
/// ```text
/// header = version function-id length flags dialect lang-tag charset xid
/// ```
pub fn message(input: &[u8]) -> Result<Message<'_>, SlpError> {
    if input.len() < V1_HEADER_LEN {
        return Err(SlpError::Parse("PDU shorter than the SLPv1 header"));
    }

    if input[0] != 1 {
        return Err(SlpError::Parse("not an SLPv1 PDU"));
    }
    let function_id = input[1];

    let length = usize::from(u16::from_be_bytes([input[2], input[3]]));
    if length != input.len() {
        return Err(SlpError::Parse("declared length disagrees with the buffer"));
    }

    let v1_flags = input[4];
    if v1_flags & V1_FLAG_RESERVED != 0 {
        return Err(SlpError::Parse("reserved flag bits set"));
    }
    // input[5] is the dialect byte; it never acquired a meaning.

    let lang_tag = LanguageTag::try_from(&input[6..8])
        .map_err(|_| SlpError::Parse("invalid language tag"))?;

    let charset = Charset::from_u16(u16::from_be_bytes([input[8], input[9]]))
        .ok_or(SlpError::Parse("character set not understood"))?;
    let xid = u16::from_be_bytes([input[10], input[11]]);

    let mut flags = Flags::default();
    if v1_flags & V1_FLAG_OVERFLOW != 0 {
        flags = flags.with(Flags::OVERFLOW);
    }
    if v1_flags & V1_FLAG_FRESH != 0 {
        flags = flags.with(Flags::FRESH);
    }

    let body_input = &input[V1_HEADER_LEN..];
    let (rest, body) = match function_id {
        1 => srv_rqst(body_input, charset)?,
        3 => srv_reg(body_input, charset)?,
        4 => srv_dereg(body_input, charset)?,
        6 => attr_rqst(body_input, charset)?,
        8 => da_advert(body_input, charset)?,
        9 => srv_type_rqst(body_input, charset)?,
        2 | 5 | 7 | 10 => return Err(SlpError::NotSupported),
        _ => return Err(SlpError::Parse("function id out of range")),
    };

    if !rest.is_empty() && !flags.overflow() {
        return Err(SlpError::Parse("trailing bytes without the overflow flag"));
    }

    Ok(Message {
        header: Header {
            version: Version::V1,
            flags,
            xid,
            lang_tag,
        },
        body,
        extensions: Vec::new(),
    })
}

/// Transcode a v1 string into UTF-8.
///
/// UCS-2 is decoded as UTF-16BE and UCS-4 as UTF-32BE, always into a fresh
/// allocation; transcoding in place is unsound when the UTF-8 form is
/// longer than the source.
pub(crate) fn transcode(charset: Charset, raw: &[u8]) -> Result<String, SlpError> {
    match charset {
        Charset::Ascii => {
            if !raw.is_ascii() {
                return Err(SlpError::Parse("non-ASCII byte in an ASCII string"));
            }
            // Safety: `unwrap` can't panic, ASCII is valid UTF-8.
            Ok(std::str::from_utf8(raw).unwrap().to_owned())
        }
        Charset::Utf8 => std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| SlpError::Parse("invalid UTF-8 string")),
        Charset::Ucs2 => {
            if raw.len() % 2 != 0 {
                return Err(SlpError::Parse("odd byte count in a UCS-2 string"));
            }
            let units = raw
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .map_err(|_| SlpError::Parse("invalid UCS-2 string"))
        }
        Charset::Ucs4 => {
            if raw.len() % 4 != 0 {
                return Err(SlpError::Parse("invalid byte count in a UCS-4 string"));
            }
            raw.chunks_exact(4)
                .map(|quad| {
                    let unit = u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]);
                    char::from_u32(unit).ok_or(SlpError::Parse("invalid UCS-4 code point"))
                })
                .collect()
        }
    }
}

/// A 16-bit length followed by string bytes in the PDU's character set.
fn take_string(input: &[u8], charset: Charset) -> Result<(&[u8], String), SlpError> {
    let (rest, raw) = length_data(be_u16)(input)
        .map_err(|_: nom::Err<Error<&[u8]>>| SlpError::Parse("truncated string"))?;

    Ok((rest, transcode(charset, raw)?))
}

/// `url-entry = lifetime url-len url` — no reserved byte and no
/// authentication blocks in SLPv1.
fn url_entry(input: &[u8], charset: Charset) -> Result<(&[u8], UrlEntry<'static>), SlpError> {
    let (rest, lifetime) = be_u16::<_, Error<&[u8]>>(input)
        .map_err(|_| SlpError::Parse("truncated URL entry"))?;
    let (rest, url) = take_string(rest, charset)?;

    Ok((
        rest,
        UrlEntry {
            reserved: 0,
            lifetime,
            url: Cow::Owned(url),
            auths: Vec::new(),
        },
    ))
}

/// `SrvRqst = prlist predicate`
///
/// The v1 predicate string packs `srvtype/scope/where-clause/` into one
/// field. An empty scope selects `"default"`, except for `directory-agent`
/// discovery where an empty scope is meaningful.
fn srv_rqst(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, prlist) = take_string(input, charset)?;
    let (rest, request) = take_string(rest, charset)?;

    let (service_type, remainder) = request
        .split_once('/')
        .ok_or(SlpError::Parse("service type missing from the predicate"))?;

    let (scope_list, predicate) =
        if remainder.starts_with('/') && !strings_eq(service_type, "directory-agent") {
            (DEFAULT_SCOPE.to_owned(), &remainder[1..])
        } else {
            let (scope, predicate) = remainder
                .split_once('/')
                .ok_or(SlpError::Parse("scope list missing from the predicate"))?;
            (scope.to_owned(), predicate)
        };

    let predicate = predicate.strip_suffix('/').unwrap_or(predicate);

    Ok((
        rest,
        Body::SrvRqst(SrvRqst {
            prlist: Cow::Owned(prlist),
            service_type: Cow::Owned(service_type.to_owned()),
            scope_list: Cow::Owned(scope_list),
            predicate: Cow::Owned(predicate.to_owned()),
            spi: Cow::Borrowed(""),
        }),
    ))
}

/// `SrvReg = url-entry attr-list`
///
/// The service type is the URL prefix up to `:/`; the scope rides in a
/// `SCOPE` attribute when present.
fn srv_reg(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, url_entry) = url_entry(input, charset)?;

    let service_type = match url_entry.url.find(":/") {
        Some(end) => url_entry.url[..end].to_owned(),
        None => return Err(SlpError::Parse("service URL without a type prefix")),
    };

    let (rest, attr_list) = take_string(rest, charset)?;
    let scope_list = scope_from_attrs(&attr_list).unwrap_or_else(|| DEFAULT_SCOPE.to_owned());

    Ok((
        rest,
        Body::SrvReg(SrvReg {
            url_entry,
            service_type: Cow::Owned(service_type),
            scope_list: Cow::Owned(scope_list),
            attr_list: Cow::Owned(attr_list),
            attr_auths: Vec::new(),
        }),
    ))
}

fn scope_from_attrs(attrs: &str) -> Option<String> {
    let position = attrs.to_ascii_lowercase().find("scope")?;

    let rest = attrs[position + 5..]
        .trim_start_matches(|c: char| c.is_ascii_whitespace() || c == '=');
    let end = rest
        .find(|c: char| c.is_ascii_whitespace() || c == ')')
        .unwrap_or(rest.len());

    let scope = &rest[..end];
    (!scope.is_empty()).then(|| scope.to_owned())
}

/// `SrvDeReg = url-len url tag-list` — no scope list in SLPv1.
fn srv_dereg(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, url) = take_string(input, charset)?;
    let (rest, tag_list) = take_string(rest, charset)?;

    Ok((
        rest,
        Body::SrvDeReg(SrvDeReg {
            scope_list: Cow::Borrowed(""),
            url_entry: UrlEntry::new(0, url),
            tag_list: Cow::Owned(tag_list),
        }),
    ))
}

/// `AttrRqst = prlist url scope-list tag-list`
fn attr_rqst(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, prlist) = take_string(input, charset)?;
    let (rest, url) = take_string(rest, charset)?;
    let (rest, scope_list) = take_string(rest, charset)?;
    let (rest, tag_list) = take_string(rest, charset)?;

    let scope_list = if scope_list.is_empty() {
        DEFAULT_SCOPE.to_owned()
    } else {
        scope_list
    };

    Ok((
        rest,
        Body::AttrRqst(AttrRqst {
            prlist: Cow::Owned(prlist),
            url: Cow::Owned(url),
            scope_list: Cow::Owned(scope_list),
            tag_list: Cow::Owned(tag_list),
            spi: Cow::Borrowed(""),
        }),
    ))
}

/// `DAAdvert = error-code url scope-list`
///
/// Decoded so a v2 agent can recognize a v1 directory agent on the wire;
/// the advert carries no timestamp, attributes, or SPIs.
fn da_advert(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, error_code) = be_u16::<_, Error<&[u8]>>(input)
        .map_err(|_| SlpError::Parse("truncated DAAdvert"))?;
    let (rest, url) = take_string(rest, charset)?;
    let (rest, scope_list) = take_string(rest, charset)?;

    Ok((
        rest,
        Body::DaAdvert(DaAdvert {
            error_code: ErrorCode::from_u16(error_code),
            boot_timestamp: 0,
            url: Cow::Owned(url),
            scope_list: Cow::Owned(scope_list),
            attr_list: Cow::Borrowed(""),
            spi_list: Cow::Borrowed(""),
            auths: Vec::new(),
        }),
    ))
}

/// `SrvTypeRqst = prlist naming-authority scope-list`
fn srv_type_rqst(input: &[u8], charset: Charset) -> Result<(&[u8], Body<'static>), SlpError> {
    let (rest, prlist) = take_string(input, charset)?;

    let (rest, na_len) = be_u16::<_, Error<&[u8]>>(rest)
        .map_err(|_| SlpError::Parse("truncated naming authority"))?;
    let (rest, naming_auth) = match na_len {
        0 => (rest, NamingAuthority::Iana),
        0xffff => (rest, NamingAuthority::All),
        na_len => {
            let na_len = usize::from(na_len);
            if na_len > rest.len() {
                return Err(SlpError::Parse("naming authority out of bounds"));
            }
            let name = transcode(charset, &rest[..na_len])?;
            (&rest[na_len..], NamingAuthority::Other(Cow::Owned(name)))
        }
    };

    let (rest, scope_list) = take_string(rest, charset)?;
    let scope_list = if scope_list.is_empty() {
        DEFAULT_SCOPE.to_owned()
    } else {
        scope_list
    };

    Ok((
        rest,
        Body::SrvTypeRqst(SrvTypeRqst {
            prlist: Cow::Owned(prlist),
            naming_auth,
            scope_list: Cow::Owned(scope_list),
        }),
    ))
}
