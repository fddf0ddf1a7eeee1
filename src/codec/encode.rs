use std::io::{Error as IoError, ErrorKind, Result as IoResult, Write};

use slp_types::{
    error::ErrorCode,
    message::{
        AuthBlock, Body, Extension, Message, NamingAuthority, UrlEntry, Version,
    },
};

use crate::rfc2608::HEADER_FIXED_LEN;

pub trait Encode {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()>;

    fn to_vec(&self) -> IoResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

fn put_u16(writer: &mut impl Write, value: u16) -> IoResult<()> {
    writer.write_all(&value.to_be_bytes())
}

fn put_u24(writer: &mut impl Write, value: u32) -> IoResult<()> {
    writer.write_all(&value.to_be_bytes()[1..])
}

fn put_str16(writer: &mut impl Write, value: &str) -> IoResult<()> {
    let length = u16::try_from(value.len())
        .map_err(|_| IoError::new(ErrorKind::InvalidData, "string field exceeds 65535 bytes"))?;

    put_u16(writer, length)?;
    writer.write_all(value.as_bytes())
}

fn put_count8(writer: &mut impl Write, count: usize) -> IoResult<()> {
    let count = u8::try_from(count)
        .map_err(|_| IoError::new(ErrorKind::InvalidData, "more than 255 blocks"))?;

    writer.write_all(&[count])
}

impl Encode for Message<'_> {
    /// Assemble a complete SLPv2 PDU: header, body, extension chain.
    ///
    /// The total length and the extension offsets are computed here; SLPv1
    /// messages are decoded for compatibility but never encoded.
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        if self.header.version != Version::V2 {
            return Err(IoError::new(
                ErrorKind::InvalidInput,
                "SLPv1 messages are not encoded",
            ));
        }

        let mut body = Vec::new();
        self.body.encode(&mut body)?;

        let lang = self.header.lang_tag.inner();
        let ext_start = HEADER_FIXED_LEN + lang.len() + body.len();

        let mut ext_blob = Vec::new();
        let mut offset = ext_start;
        for (position, extension) in self.extensions.iter().enumerate() {
            let node_len = 5 + extension.data.len();
            let next = if position + 1 == self.extensions.len() {
                0
            } else {
                offset + node_len
            };

            put_u16(&mut ext_blob, extension.id)?;
            put_u24(&mut ext_blob, next as u32)?;
            ext_blob.write_all(&extension.data)?;
            offset += node_len;
        }

        let total = ext_start + ext_blob.len();
        if total > 0xff_ffff {
            return Err(IoError::new(
                ErrorKind::InvalidData,
                "PDU exceeds the 24-bit length field",
            ));
        }

        writer.write_all(&[2, self.body.function_id() as u8])?;
        put_u24(writer, total as u32)?;
        put_u16(writer, self.header.flags.bits())?;
        put_u24(
            writer,
            if self.extensions.is_empty() {
                0
            } else {
                ext_start as u32
            },
        )?;
        put_u16(writer, self.header.xid)?;
        put_str16(writer, lang)?;
        writer.write_all(&body)?;
        writer.write_all(&ext_blob)
    }
}

impl Encode for Body<'_> {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        match self {
            Body::SrvRqst(body) => {
                put_str16(writer, &body.prlist)?;
                put_str16(writer, &body.service_type)?;
                put_str16(writer, &body.scope_list)?;
                put_str16(writer, &body.predicate)?;
                put_str16(writer, &body.spi)
            }
            Body::SrvRply(body) => {
                body.error_code.encode(writer)?;
                let count = u16::try_from(body.url_entries.len()).map_err(|_| {
                    IoError::new(ErrorKind::InvalidData, "more than 65535 URL entries")
                })?;
                put_u16(writer, count)?;
                for entry in &body.url_entries {
                    entry.encode(writer)?;
                }
                Ok(())
            }
            Body::SrvReg(body) => {
                body.url_entry.encode(writer)?;
                put_str16(writer, &body.service_type)?;
                put_str16(writer, &body.scope_list)?;
                put_str16(writer, &body.attr_list)?;
                put_count8(writer, body.attr_auths.len())?;
                for auth in &body.attr_auths {
                    auth.encode(writer)?;
                }
                Ok(())
            }
            Body::SrvDeReg(body) => {
                put_str16(writer, &body.scope_list)?;
                body.url_entry.encode(writer)?;
                put_str16(writer, &body.tag_list)
            }
            Body::SrvAck(body) => body.error_code.encode(writer),
            Body::AttrRqst(body) => {
                put_str16(writer, &body.prlist)?;
                put_str16(writer, &body.url)?;
                put_str16(writer, &body.scope_list)?;
                put_str16(writer, &body.tag_list)?;
                put_str16(writer, &body.spi)
            }
            Body::AttrRply(body) => {
                body.error_code.encode(writer)?;
                put_str16(writer, &body.attr_list)?;
                put_count8(writer, body.attr_auths.len())?;
                for auth in &body.attr_auths {
                    auth.encode(writer)?;
                }
                Ok(())
            }
            Body::DaAdvert(body) => {
                body.error_code.encode(writer)?;
                writer.write_all(&body.boot_timestamp.to_be_bytes())?;
                put_str16(writer, &body.url)?;
                put_str16(writer, &body.scope_list)?;
                put_str16(writer, &body.attr_list)?;
                put_str16(writer, &body.spi_list)?;
                put_count8(writer, body.auths.len())?;
                for auth in &body.auths {
                    auth.encode(writer)?;
                }
                Ok(())
            }
            Body::SrvTypeRqst(body) => {
                put_str16(writer, &body.prlist)?;
                body.naming_auth.encode(writer)?;
                put_str16(writer, &body.scope_list)
            }
            Body::SrvTypeRply(body) => {
                body.error_code.encode(writer)?;
                put_str16(writer, &body.srvtype_list)
            }
            Body::SaAdvert(body) => {
                put_str16(writer, &body.url)?;
                put_str16(writer, &body.scope_list)?;
                put_str16(writer, &body.attr_list)?;
                put_count8(writer, body.auths.len())?;
                for auth in &body.auths {
                    auth.encode(writer)?;
                }
                Ok(())
            }
        }
    }
}

impl Encode for ErrorCode {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        put_u16(writer, self.to_u16())
    }
}

impl Encode for UrlEntry<'_> {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        writer.write_all(&[self.reserved])?;
        put_u16(writer, self.lifetime)?;
        put_str16(writer, &self.url)?;
        put_count8(writer, self.auths.len())?;
        for auth in &self.auths {
            auth.encode(writer)?;
        }
        Ok(())
    }
}

impl Encode for AuthBlock<'_> {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        let length = u16::try_from(2 + 2 + 4 + 2 + self.spi.len() + self.data.len())
            .map_err(|_| IoError::new(ErrorKind::InvalidData, "authentication block too long"))?;

        put_u16(writer, self.bsd)?;
        put_u16(writer, length)?;
        writer.write_all(&self.timestamp.to_be_bytes())?;
        put_str16(writer, &self.spi)?;
        writer.write_all(&self.data)
    }
}

impl Encode for NamingAuthority<'_> {
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        match self {
            NamingAuthority::Iana => put_u16(writer, 0),
            NamingAuthority::All => put_u16(writer, 0xffff),
            NamingAuthority::Other(name) => put_str16(writer, name),
        }
    }
}

impl Encode for Extension<'_> {
    /// A lone extension node with a zero next-offset; chained nodes inside
    /// a PDU are laid out by [`Message::encode`].
    fn encode(&self, writer: &mut impl Write) -> IoResult<()> {
        put_u16(writer, self.id)?;
        put_u24(writer, 0)?;
        writer.write_all(&self.data)
    }
}
