//! Raw nom parsers for the SLPv2 wire format (RFC 2608, section 8).
//!
//! All integers are network byte order; strings are length-prefixed with an
//! unsigned 16-bit length and must be UTF-8. The PDU length and the
//! extension offset are 24-bit. Parsing is strict: a declared length that
//! disagrees with the buffer, a reserved flag bit, or trailing bytes without
//! the OVERFLOW flag all fail.

use std::borrow::Cow;

use nom::{
    bytes::complete::take,
    error::{Error, ErrorKind},
    multi::{length_count, length_data},
    number::complete::{be_u16, be_u32, be_u8},
    sequence::tuple,
    IResult,
};
use slp_types::{
    core::LanguageTag,
    error::{ErrorCode, SlpError},
    message::{
        AttrRply, AttrRqst, AuthBlock, Body, DaAdvert, Extension, Flags, FunctionId, Header,
        Message, NamingAuthority, SaAdvert, SrvAck, SrvDeReg, SrvReg, SrvRply, SrvRqst,
        SrvTypeRply, SrvTypeRqst, UrlEntry, Version,
    },
};

/// Bytes of a v2 header before the variable-length language tag.
pub(crate) const HEADER_FIXED_LEN: usize = 14;

/// Bound on the extension chain; RFC 2608 documents no maximum, so hostile
/// chains are cut off here.
pub(crate) const MAX_EXTENSIONS: usize = 16;

fn fail<T>(input: &[u8]) -> IResult<&[u8], T> {
    Err(nom::Err::Failure(Error::new(input, ErrorKind::Verify)))
}

/// `u24 = 3OCTET` (big-endian)
pub(crate) fn be_u24(input: &[u8]) -> IResult<&[u8], u32> {
    let (rest, bytes) = take(3usize)(input)?;

    Ok((
        rest,
        u32::from(bytes[0]) << 16 | u32::from(bytes[1]) << 8 | u32::from(bytes[2]),
    ))
}

/// `string = length *OCTET` — a 16-bit length followed by UTF-8 text,
/// borrowed from the input buffer.
pub(crate) fn string16(input: &[u8]) -> IResult<&[u8], Cow<'_, str>> {
    let (rest, bytes) = length_data(be_u16)(input)?;

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok((rest, Cow::Borrowed(text))),
        Err(_) => fail(input),
    }
}

/// `error-code = 2OCTET`
fn error_code(input: &[u8]) -> IResult<&[u8], ErrorCode> {
    let (rest, code) = be_u16(input)?;

    Ok((rest, ErrorCode::from_u16(code)))
}

/// Parse a complete SLPv2 PDU.
pub fn message(input: &[u8]) -> Result<Message<'_>, SlpError> {
    let mut header = tuple((
        be_u8,
        be_u8,
        be_u24,
        be_u16,
        be_u24,
        be_u16,
        length_data(be_u16),
    ));

    let (after_header, (version, function_id, length, flags, ext_offset, xid, lang)) =
        header(input)
            .map_err(|_: nom::Err<Error<&[u8]>>| SlpError::Parse("truncated header"))?;

    if version != 2 {
        return Err(SlpError::Parse("not an SLPv2 PDU"));
    }

    let function_id = FunctionId::try_from(function_id)
        .map_err(|_| SlpError::Parse("function id out of range"))?;

    if length as usize != input.len() {
        return Err(SlpError::Parse("declared length disagrees with the buffer"));
    }

    if flags & Flags::RESERVED != 0 {
        return Err(SlpError::Parse("reserved flag bits set"));
    }
    let flags = Flags::new(flags);

    let ext_offset = ext_offset as usize;
    let header_len = input.len() - after_header.len();
    let lang_tag =
        LanguageTag::try_from(lang).map_err(|_| SlpError::Parse("invalid language tag"))?;

    let body_end = if ext_offset == 0 {
        input.len()
    } else {
        if ext_offset < header_len || ext_offset >= input.len() {
            return Err(SlpError::Parse("extension offset out of bounds"));
        }
        ext_offset
    };

    let (rest, body) = body(function_id, &input[header_len..body_end])
        .map_err(|_| SlpError::Parse("malformed message body"))?;
    if !rest.is_empty() && !flags.overflow() {
        return Err(SlpError::Parse("trailing bytes without the overflow flag"));
    }

    let extensions = if ext_offset == 0 {
        Vec::new()
    } else {
        extensions(input, ext_offset)?
    };

    Ok(Message {
        header: Header {
            version: Version::V2,
            flags,
            xid,
            lang_tag,
        },
        body,
        extensions,
    })
}

fn body(function_id: FunctionId, input: &[u8]) -> IResult<&[u8], Body<'_>> {
    match function_id {
        FunctionId::SrvRqst => srv_rqst(input),
        FunctionId::SrvRply => srv_rply(input),
        FunctionId::SrvReg => srv_reg(input),
        FunctionId::SrvDeReg => srv_dereg(input),
        FunctionId::SrvAck => srv_ack(input),
        FunctionId::AttrRqst => attr_rqst(input),
        FunctionId::AttrRply => attr_rply(input),
        FunctionId::DaAdvert => da_advert(input),
        FunctionId::SrvTypeRqst => srv_type_rqst(input),
        FunctionId::SrvTypeRply => srv_type_rply(input),
        FunctionId::SaAdvert => sa_advert(input),
    }
}

/// ```text
/// SrvRqst = prlist srvtype scope-list predicate spi
/// ```
pub fn srv_rqst(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (prlist, service_type, scope_list, predicate, spi)) =
        tuple((string16, string16, string16, string16, string16))(input)?;

    Ok((
        rest,
        Body::SrvRqst(SrvRqst {
            prlist,
            service_type,
            scope_list,
            predicate,
            spi,
        }),
    ))
}

/// ```text
/// SrvRply = error-code url-entry-count *url-entry
/// ```
pub fn srv_rply(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (error_code, url_entries)) =
        tuple((error_code, length_count(be_u16, url_entry)))(input)?;

    Ok((
        rest,
        Body::SrvRply(SrvRply {
            error_code,
            url_entries,
        }),
    ))
}

/// ```text
/// SrvReg = url-entry srvtype scope-list attr-list auth-count *auth-block
/// ```
pub fn srv_reg(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (url_entry, service_type, scope_list, attr_list, attr_auths)) = tuple((
        url_entry,
        string16,
        string16,
        string16,
        length_count(be_u8, auth_block),
    ))(input)?;

    Ok((
        rest,
        Body::SrvReg(SrvReg {
            url_entry,
            service_type,
            scope_list,
            attr_list,
            attr_auths,
        }),
    ))
}

/// ```text
/// SrvDeReg = scope-list url-entry tag-list
/// ```
pub fn srv_dereg(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (scope_list, url_entry, tag_list)) =
        tuple((string16, url_entry, string16))(input)?;

    Ok((
        rest,
        Body::SrvDeReg(SrvDeReg {
            scope_list,
            url_entry,
            tag_list,
        }),
    ))
}

/// ```text
/// SrvAck = error-code
/// ```
///
/// A header-only PDU is tolerated and reads as an OK acknowledgment.
pub fn srv_ack(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    if input.is_empty() {
        return Ok((
            input,
            Body::SrvAck(SrvAck {
                error_code: ErrorCode::Ok,
            }),
        ));
    }

    let (rest, error_code) = error_code(input)?;

    Ok((rest, Body::SrvAck(SrvAck { error_code })))
}

/// ```text
/// AttrRqst = prlist url scope-list tag-list spi
/// ```
pub fn attr_rqst(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (prlist, url, scope_list, tag_list, spi)) =
        tuple((string16, string16, string16, string16, string16))(input)?;

    Ok((
        rest,
        Body::AttrRqst(AttrRqst {
            prlist,
            url,
            scope_list,
            tag_list,
            spi,
        }),
    ))
}

/// ```text
/// AttrRply = error-code attr-list auth-count *auth-block
/// ```
pub fn attr_rply(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (error_code, attr_list, attr_auths)) =
        tuple((error_code, string16, length_count(be_u8, auth_block)))(input)?;

    Ok((
        rest,
        Body::AttrRply(AttrRply {
            error_code,
            attr_list,
            attr_auths,
        }),
    ))
}

/// ```text
/// DAAdvert = error-code boot-timestamp url scope-list attr-list
///            spi-list auth-count *auth-block
/// ```
pub fn da_advert(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (error_code, boot_timestamp, url, scope_list, attr_list, spi_list, auths)) =
        tuple((
            error_code,
            be_u32,
            string16,
            string16,
            string16,
            string16,
            length_count(be_u8, auth_block),
        ))(input)?;

    Ok((
        rest,
        Body::DaAdvert(DaAdvert {
            error_code,
            boot_timestamp,
            url,
            scope_list,
            attr_list,
            spi_list,
            auths,
        }),
    ))
}

/// ```text
/// SrvTypeRqst = prlist naming-authority scope-list
/// ```
pub fn srv_type_rqst(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (prlist, naming_auth, scope_list)) =
        tuple((string16, naming_authority, string16))(input)?;

    Ok((
        rest,
        Body::SrvTypeRqst(SrvTypeRqst {
            prlist,
            naming_auth,
            scope_list,
        }),
    ))
}

/// ```text
/// naming-authority = length *OCTET
/// ```
///
/// A zero length means IANA; `0xFFFF` means all naming authorities. Neither
/// carries string bytes.
fn naming_authority(input: &[u8]) -> IResult<&[u8], NamingAuthority<'_>> {
    let (rest, length) = be_u16(input)?;

    match length {
        0 => Ok((rest, NamingAuthority::Iana)),
        0xffff => Ok((rest, NamingAuthority::All)),
        length => {
            let (rest, bytes) = take(length)(rest)?;
            match std::str::from_utf8(bytes) {
                Ok(name) => Ok((rest, NamingAuthority::Other(Cow::Borrowed(name)))),
                Err(_) => fail(input),
            }
        }
    }
}

/// ```text
/// SrvTypeRply = error-code srvtype-list
/// ```
pub fn srv_type_rply(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (error_code, srvtype_list)) = tuple((error_code, string16))(input)?;

    Ok((
        rest,
        Body::SrvTypeRply(SrvTypeRply {
            error_code,
            srvtype_list,
        }),
    ))
}

/// ```text
/// SAAdvert = url scope-list attr-list auth-count *auth-block
/// ```
pub fn sa_advert(input: &[u8]) -> IResult<&[u8], Body<'_>> {
    let (rest, (url, scope_list, attr_list, auths)) = tuple((
        string16,
        string16,
        string16,
        length_count(be_u8, auth_block),
    ))(input)?;

    Ok((
        rest,
        Body::SaAdvert(SaAdvert {
            url,
            scope_list,
            attr_list,
            auths,
        }),
    ))
}

/// ```text
/// url-entry = reserved lifetime url-len url auth-count *auth-block
/// ```
pub fn url_entry(input: &[u8]) -> IResult<&[u8], UrlEntry<'_>> {
    let (rest, (reserved, lifetime, url, auths)) = tuple((
        be_u8,
        be_u16,
        string16,
        length_count(be_u8, auth_block),
    ))(input)?;

    Ok((
        rest,
        UrlEntry {
            reserved,
            lifetime,
            url,
            auths,
        },
    ))
}

/// ```text
/// auth-block = bsd length timestamp spi-len spi auth-data
/// ```
///
/// `length` covers the whole block; the auth data fills whatever the fixed
/// fields and the SPI string leave of it.
pub fn auth_block(input: &[u8]) -> IResult<&[u8], AuthBlock<'_>> {
    let (rest, (bsd, length)) = tuple((be_u16, be_u16))(input)?;
    let (rest, timestamp) = be_u32(rest)?;
    let (rest, spi) = string16(rest)?;

    let overhead = 2 + 2 + 4 + 2 + spi.len();
    let data_len = match usize::from(length).checked_sub(overhead) {
        Some(data_len) => data_len,
        None => return fail(input),
    };
    let (rest, data) = take(data_len)(rest)?;

    Ok((
        rest,
        AuthBlock {
            bsd,
            timestamp,
            spi,
            data: Cow::Borrowed(data),
        },
    ))
}

/// Walk the extension chain at the tail of a PDU.
///
/// Offsets must advance strictly forward, which rules out cycles; a node's
/// data runs to the next offset, or to the end of the PDU for the last node.
fn extensions(pdu: &[u8], first: usize) -> Result<Vec<Extension<'_>>, SlpError> {
    let mut out = Vec::new();
    let mut offset = first;

    loop {
        if out.len() == MAX_EXTENSIONS {
            log::debug!("extension chain exceeds {MAX_EXTENSIONS} nodes, rejecting PDU");
            return Err(SlpError::Parse("too many extensions"));
        }

        if offset + 5 > pdu.len() {
            return Err(SlpError::Parse("extension node out of bounds"));
        }

        let id = u16::from_be_bytes([pdu[offset], pdu[offset + 1]]);
        let next = usize::from(pdu[offset + 2]) << 16
            | usize::from(pdu[offset + 3]) << 8
            | usize::from(pdu[offset + 4]);

        let data_end = if next == 0 {
            pdu.len()
        } else {
            if next < offset + 5 || next > pdu.len() {
                log::debug!("extension offset {next} does not advance past {offset}");
                return Err(SlpError::Parse("extension chain must advance"));
            }
            next
        };

        out.push(Extension {
            id,
            data: Cow::Borrowed(&pdu[offset + 5..data_end]),
        });

        if next == 0 {
            return Ok(out);
        }
        offset = next;
    }
}
