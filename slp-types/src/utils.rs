//! Byte-class predicates shared by the validators and the parsers.

pub mod indicators {
    /// `reserved = "(" / ")" / "," / "\" / "!" / "<" / "=" / ">" / "~" / CTL`
    ///
    /// Reserved characters must be escaped (`\HH`) wherever they occur inside
    /// an attribute tag or value (RFC 2608, section 5.3). The control range
    /// covers 0x01..0x1F and DEL; NUL is not reserved.
    pub fn is_reserved_char(byte: u8) -> bool {
        matches!(
            byte,
            b'(' | b')' | b',' | b'\\' | b'!' | b'<' | b'=' | b'>' | b'~'
        ) || matches!(byte, 0x01..=0x1f)
            || byte == 0x7f
    }

    /// Any character that may appear unescaped inside an attribute value.
    ///
    /// The backslash is excluded here; it is only valid as the introducer of
    /// an escape sequence and the parsers treat it separately.
    pub fn is_value_char(byte: u8) -> bool {
        !is_reserved_char(byte)
    }

    /// `tag-reserved = reserved / "*" / SP / HTAB / CR / LF / "_"`
    ///
    /// Attribute tags forbid the wildcard and whitespace on top of the
    /// reserved set so that tag lists and search filters stay unambiguous.
    pub fn is_tag_char(byte: u8) -> bool {
        !is_reserved_char(byte) && !matches!(byte, b'*' | b' ' | b'\t' | b'\r' | b'\n' | b'_')
    }
}
