//! The attribute store: a typed `(tag, value*)` bundle with a bidirectional
//! string encoding.
//!
//! The wire form follows RFC 2608, section 5.3:
//!
//! ```text
//! attr-list = attribute *("," attribute)
//! attribute = "(" attr-tag "=" attr-val-list ")" / attr-tag
//! attr-val-list = attr-val *("," attr-val)
//! ```
//!
//! Values are typed (boolean, integer, string, opaque) and the type of a
//! parsed value list is inferred value-by-value; all values of one attribute
//! share a type. Every mutation marks the attribute as modified so that a
//! delta serialization can emit only what changed since the last one.

use std::str::FromStr;

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{all_consuming, map},
    multi::separated_list1,
    sequence::{delimited, separated_pair},
    IResult,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slp_types::{
    core::AttrTag,
    error::SlpError,
    utils::indicators::{is_tag_char, is_value_char},
};

use crate::{
    compare::{list_items, strings_eq},
    utils::{escape_attr, escape_opaque, hex_value, unescape_attr},
};

/// The type of an attribute.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AttrType {
    Boolean,
    Integer,
    Keyword,
    String,
    Opaque,
}

/// A single typed attribute value in canonical (unescaped) form.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum AttrValue {
    Bool(bool),
    Int(i32),
    Str(String),
    Opaque(Vec<u8>),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::Bool(_) => AttrType::Boolean,
            AttrValue::Int(_) => AttrType::Integer,
            AttrValue::Str(_) => AttrType::String,
            AttrValue::Opaque(_) => AttrType::Opaque,
        }
    }
}

/// What to do when a tag already holds values.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Policy {
    /// Append to the existing value list; the types must match.
    Add,
    /// Discard the existing list; an implicit type change is permitted.
    Replace,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum AttrKind {
    Keyword,
    List(Vec<AttrValue>),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct Attribute {
    tag: String,
    kind: AttrKind,
    modified: bool,
}

impl Attribute {
    fn attr_type(&self) -> AttrType {
        match &self.kind {
            AttrKind::Keyword => AttrType::Keyword,
            // A list is never empty, so the first value determines the type.
            AttrKind::List(values) => values[0].attr_type(),
        }
    }
}

/// An ordered attribute set bound to a language tag.
///
/// Tags are unique under the case-insensitive comparison; insertion order is
/// preserved across a serialize/parse round-trip. The set is not internally
/// synchronized.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Attributes {
    lang: String,
    attrs: Vec<Attribute>,
}

impl Attributes {
    /// An empty set bound to a language tag.
    pub fn new(lang: impl Into<String>) -> Self {
        Attributes {
            lang: lang.into(),
            attrs: Vec::new(),
        }
    }

    /// Parse a serialized attribute list into a fresh set.
    pub fn parse(lang: impl Into<String>, input: &str) -> Result<Self, SlpError> {
        let mut attrs = Attributes::new(lang);
        attrs.freshen(input)?;
        Ok(attrs)
    }

    /// Merge a serialized attribute list into this set with [`Policy::Add`].
    pub fn freshen(&mut self, input: &str) -> Result<(), SlpError> {
        if input.is_empty() {
            return Ok(());
        }

        let (_, raw_attrs) = all_consuming(attr_list)(input)
            .map_err(|_| SlpError::Parse("malformed attribute list"))?;

        for raw in raw_attrs {
            match raw {
                RawAttr::Keyword(tag) => self.set_keyword(tag)?,
                RawAttr::List { tag, values } => {
                    let values = decode_value_list(&values)?;
                    self.install(tag, values, Policy::Add)?;
                }
            }
        }

        Ok(())
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Yields `(tag, type)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, AttrType)> {
        self.attrs
            .iter()
            .map(|attr| (attr.tag.as_str(), attr.attr_type()))
    }

    fn find_index(&self, tag: &str) -> Option<usize> {
        self.attrs
            .iter()
            .position(|attr| strings_eq(&attr.tag, tag))
    }

    fn get(&self, tag: &str) -> Result<&Attribute, SlpError> {
        self.find_index(tag)
            .map(|index| &self.attrs[index])
            .ok_or(SlpError::UnknownTag)
    }

    /// The type of the attribute stored under `tag`.
    pub fn attr_type(&self, tag: &str) -> Result<AttrType, SlpError> {
        Ok(self.get(tag)?.attr_type())
    }

    /// Booleans hold exactly one value, so setting one always replaces.
    pub fn set_bool(&mut self, tag: &str, value: bool) -> Result<(), SlpError> {
        self.install(tag, vec![AttrValue::Bool(value)], Policy::Replace)
    }

    pub fn set_str(&mut self, tag: &str, value: &str, policy: Policy) -> Result<(), SlpError> {
        self.install(tag, vec![AttrValue::Str(value.into())], policy)
    }

    pub fn set_int(&mut self, tag: &str, value: i32, policy: Policy) -> Result<(), SlpError> {
        self.install(tag, vec![AttrValue::Int(value)], policy)
    }

    pub fn set_opaque(&mut self, tag: &str, value: &[u8], policy: Policy) -> Result<(), SlpError> {
        self.install(tag, vec![AttrValue::Opaque(value.into())], policy)
    }

    /// Register `tag` as a keyword attribute. Idempotent.
    pub fn set_keyword(&mut self, tag: &str) -> Result<(), SlpError> {
        verify_tag(tag)?;

        match self.find_index(tag) {
            Some(index) => {
                let attr = &mut self.attrs[index];
                if attr.kind != AttrKind::Keyword {
                    return Err(SlpError::TypeMismatch);
                }
                attr.modified = true;
            }
            None => self.attrs.push(Attribute {
                tag: tag.into(),
                kind: AttrKind::Keyword,
                modified: true,
            }),
        }

        Ok(())
    }

    /// Split `value` on commas, infer a type per value, and install the list.
    pub fn set_guess(&mut self, tag: &str, value: &str, policy: Policy) -> Result<(), SlpError> {
        let raw_values: Vec<&str> = if value.is_empty() {
            return self.set_keyword(tag);
        } else {
            list_items(value).map(|(_, item)| item).collect()
        };

        let values = decode_value_list(&raw_values)?;
        self.install(tag, values, policy)
    }

    pub fn get_bool(&self, tag: &str) -> Result<bool, SlpError> {
        match &self.get(tag)?.kind {
            AttrKind::List(values) => match values.as_slice() {
                [AttrValue::Bool(value)] => Ok(*value),
                _ => Err(SlpError::TypeMismatch),
            },
            AttrKind::Keyword => Err(SlpError::TypeMismatch),
        }
    }

    pub fn get_int(&self, tag: &str) -> Result<Vec<i32>, SlpError> {
        self.typed_values(tag, |value| match value {
            AttrValue::Int(int) => Some(*int),
            _ => None,
        })
    }

    pub fn get_str(&self, tag: &str) -> Result<Vec<&str>, SlpError> {
        self.typed_values(tag, |value| match value {
            AttrValue::Str(string) => Some(string.as_str()),
            _ => None,
        })
    }

    pub fn get_opaque(&self, tag: &str) -> Result<Vec<&[u8]>, SlpError> {
        self.typed_values(tag, |value| match value {
            AttrValue::Opaque(bytes) => Some(bytes.as_slice()),
            _ => None,
        })
    }

    /// Succeeds exactly when `tag` is registered as a keyword.
    pub fn get_keyword(&self, tag: &str) -> Result<(), SlpError> {
        match self.get(tag)?.kind {
            AttrKind::Keyword => Ok(()),
            AttrKind::List(_) => Err(SlpError::TypeMismatch),
        }
    }

    fn typed_values<'a, T: 'a>(
        &'a self,
        tag: &str,
        project: impl Fn(&'a AttrValue) -> Option<T>,
    ) -> Result<Vec<T>, SlpError> {
        match &self.get(tag)?.kind {
            AttrKind::List(values) => values
                .iter()
                .map(|value| project(value).ok_or(SlpError::TypeMismatch))
                .collect(),
            AttrKind::Keyword => Err(SlpError::TypeMismatch),
        }
    }

    fn install(
        &mut self,
        tag: &str,
        values: Vec<AttrValue>,
        policy: Policy,
    ) -> Result<(), SlpError> {
        verify_tag(tag)?;

        let index = match self.find_index(tag) {
            Some(index) => index,
            None => {
                self.attrs.push(Attribute {
                    tag: tag.into(),
                    kind: AttrKind::List(values),
                    modified: true,
                });
                return Ok(());
            }
        };

        let attr = &mut self.attrs[index];
        match policy {
            Policy::Replace => attr.kind = AttrKind::List(values),
            Policy::Add => match &mut attr.kind {
                AttrKind::Keyword => return Err(SlpError::TypeMismatch),
                AttrKind::List(existing) => {
                    if existing[0].attr_type() != values[0].attr_type() {
                        return Err(SlpError::TypeMismatch);
                    }
                    if values[0].attr_type() == AttrType::Boolean {
                        // Booleans cannot be multivalued; adding replaces.
                        *existing = values;
                    } else {
                        existing.extend(values);
                    }
                }
            },
        }
        attr.modified = true;

        Ok(())
    }

    /// Serialize to the canonical wire form.
    ///
    /// `tags` optionally restricts (and orders) the output to a
    /// comma-separated allowlist; unknown tags are skipped. With `delta`,
    /// only attributes whose modified flag is set are emitted. The modified
    /// flag of every emitted attribute is cleared.
    pub fn serialize(&mut self, tags: Option<&str>, delta: bool) -> String {
        let (rendered, emitted) = self.render(tags, delta);

        for index in emitted {
            self.attrs[index].modified = false;
        }

        rendered
    }

    /// Like [`Attributes::serialize`], but into a caller-owned buffer.
    ///
    /// Returns the number of bytes written. When the buffer is too small the
    /// required size is reported via [`SlpError::BufferOverflow`] and no
    /// modified flag is cleared.
    pub fn serialize_into(
        &mut self,
        buf: &mut [u8],
        tags: Option<&str>,
        delta: bool,
    ) -> Result<usize, SlpError> {
        let (rendered, emitted) = self.render(tags, delta);

        if rendered.len() > buf.len() {
            return Err(SlpError::BufferOverflow {
                needed: rendered.len(),
            });
        }

        buf[..rendered.len()].copy_from_slice(rendered.as_bytes());
        for index in emitted {
            self.attrs[index].modified = false;
        }

        Ok(rendered.len())
    }

    fn render(&self, tags: Option<&str>, delta: bool) -> (String, Vec<usize>) {
        let indices: Vec<usize> = match tags {
            None | Some("") => (0..self.attrs.len()).collect(),
            Some(tags) => list_items(tags)
                .filter_map(|(_, tag)| self.find_index(tag))
                .collect(),
        };

        let mut out = String::new();
        let mut emitted = Vec::new();

        for index in indices {
            let attr = &self.attrs[index];
            if delta && !attr.modified {
                continue;
            }

            if !out.is_empty() {
                out.push(',');
            }
            render_attr(attr, &mut out);
            emitted.push(index);
        }

        (out, emitted)
    }

    /// Clone the subset of attributes whose tag satisfies `keep`, preserving
    /// order. Used to answer tag-filtered attribute requests.
    pub(crate) fn clone_filtered(
        &self,
        mut keep: impl FnMut(&str) -> Result<bool, SlpError>,
    ) -> Result<Attributes, SlpError> {
        let mut out = Attributes::new(self.lang.clone());

        for attr in &self.attrs {
            if keep(&attr.tag)? {
                out.attrs.push(attr.clone());
            }
        }

        Ok(out)
    }
}

fn verify_tag(tag: &str) -> Result<(), SlpError> {
    AttrTag::verify(tag).map_err(|_| SlpError::Parse("invalid attribute tag"))
}

fn render_attr(attr: &Attribute, out: &mut String) {
    let values = match &attr.kind {
        AttrKind::Keyword => {
            out.push_str(&attr.tag);
            return;
        }
        AttrKind::List(values) => values,
    };

    out.push('(');
    out.push_str(&attr.tag);
    out.push('=');
    for (position, value) in values.iter().enumerate() {
        if position > 0 {
            out.push(',');
        }
        match value {
            AttrValue::Bool(true) => out.push_str("true"),
            AttrValue::Bool(false) => out.push_str("false"),
            AttrValue::Int(int) => out.push_str(&int.to_string()),
            AttrValue::Str(string) => out.push_str(&escape_attr(string)),
            AttrValue::Opaque(bytes) => {
                out.push_str(OPAQUE_PREFIX);
                out.push_str(&escape_opaque(bytes));
            }
        }
    }
    out.push(')');
}

// ----- wire grammar -----

const OPAQUE_PREFIX: &str = "\\FF";

#[derive(Debug)]
enum RawAttr<'a> {
    Keyword(&'a str),
    List { tag: &'a str, values: Vec<&'a str> },
}

/// `attr-list = attribute *("," attribute)`
fn attr_list(input: &str) -> IResult<&str, Vec<RawAttr>> {
    separated_list1(char(','), attribute)(input)
}

/// `attribute = "(" attr-tag "=" attr-val-list ")" / attr-tag`
fn attribute(input: &str) -> IResult<&str, RawAttr> {
    alt((
        map(
            delimited(
                char('('),
                separated_pair(attr_tag, char('='), separated_list1(char(','), attr_val)),
                char(')'),
            ),
            |(tag, values)| RawAttr::List { tag, values },
        ),
        map(attr_tag, RawAttr::Keyword),
    ))(input)
}

/// `attr-tag = 1*attr-tag-char`
fn attr_tag(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii() && is_tag_char(c as u8))(input)
}

/// `attr-val = 1*(safe-char / escape)`
///
/// The raw escaped text of one value; escapes are validated and decoded by
/// the type-inference pass.
fn attr_val(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c == '\\' || !c.is_ascii() || is_value_char(c as u8))(input)
}

// ----- type inference -----

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Candidate {
    Opaque,
    Bool(bool),
    Int(i32),
    Str,
}

/// Infer the candidate type of a single raw (still escaped) value.
fn classify(raw: &str) -> Candidate {
    if starts_with_opaque_prefix(raw) {
        return Candidate::Opaque;
    }

    match raw {
        "true" => return Candidate::Bool(true),
        "false" => return Candidate::Bool(false),
        _ => {}
    }

    if raw.bytes().all(|b| b.is_ascii_digit() || b == b'-') {
        if let Ok(int) = i32::from_str(raw) {
            return Candidate::Int(int);
        }
    }

    Candidate::Str
}

fn starts_with_opaque_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();

    bytes.len() >= 3
        && bytes[0] == b'\\'
        && matches!(
            (hex_value(bytes[1]), hex_value(bytes[2])),
            (Some(high), Some(low)) if high << 4 | low == 0xff
        )
}

/// Decode a raw value list into typed values.
///
/// Inference proceeds value-by-value; a lone `true`/`false` is boolean, a
/// list of decimals is integer, a `\FF` first value selects opaque for the
/// entire list, and everything else (including booleans and integers mixed
/// with other values) devolves to string. Mixing opaque and non-opaque
/// values fails.
fn decode_value_list(raw_values: &[&str]) -> Result<Vec<AttrValue>, SlpError> {
    let candidates: Vec<Candidate> = raw_values.iter().map(|raw| classify(raw)).collect();

    let opaque_count = candidates
        .iter()
        .filter(|candidate| **candidate == Candidate::Opaque)
        .count();
    if opaque_count > 0 && opaque_count != candidates.len() {
        return Err(SlpError::Parse("opaque value mixed with other types"));
    }

    if opaque_count > 0 {
        return raw_values.iter().map(|raw| decode_opaque(raw)).collect();
    }

    if let [Candidate::Bool(value)] = candidates.as_slice() {
        return Ok(vec![AttrValue::Bool(*value)]);
    }

    if candidates
        .iter()
        .all(|candidate| matches!(candidate, Candidate::Int(_)))
    {
        return Ok(candidates
            .iter()
            .map(|candidate| match candidate {
                Candidate::Int(int) => AttrValue::Int(*int),
                _ => unreachable!(),
            })
            .collect());
    }

    // Everything else is a string list.
    raw_values.iter().map(|raw| decode_string(raw)).collect()
}

fn decode_string(raw: &str) -> Result<AttrValue, SlpError> {
    let bytes = unescape_attr(raw)?;

    String::from_utf8(bytes)
        .map(AttrValue::Str)
        .map_err(|_| SlpError::Parse("escaped value is not valid UTF-8"))
}

/// `opaque = "\FF" 1*escape`, except that a zero-length payload is accepted
/// (an empty opaque serializes as exactly `\FF`).
fn decode_opaque(raw: &str) -> Result<AttrValue, SlpError> {
    let payload = &raw[OPAQUE_PREFIX.len()..];

    if payload.len() % 3 != 0 {
        return Err(SlpError::Parse("opaque payload must escape every byte"));
    }

    let mut bytes = Vec::with_capacity(payload.len() / 3);
    for chunk in payload.as_bytes().chunks(3) {
        if chunk[0] != b'\\' {
            return Err(SlpError::Parse("opaque payload must escape every byte"));
        }
        match (hex_value(chunk[1]), hex_value(chunk[2])) {
            (Some(high), Some(low)) => bytes.push(high << 4 | low),
            _ => return Err(SlpError::Parse("invalid escape sequence")),
        }
    }

    Ok(AttrValue::Opaque(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_round_trip() {
        let input = "(color=red,green,blue),keyw,(port=8080),(pi=3),(op=\\FF\\01\\02\\03)";
        let mut attrs = Attributes::parse("en", input).unwrap();

        assert_eq!(attrs.serialize(None, false), input);

        // Parse the serialization back and compare the stores themselves.
        let mut again = Attributes::parse("en", input).unwrap();
        assert_eq!(again.serialize(None, false), input);
        assert_eq!(attrs, again);
    }

    #[test]
    fn test_parse_types() {
        let attrs =
            Attributes::parse("en", "(a=true),(b=1,2,3),(c=text),keyw,(d=\\FF\\00)").unwrap();

        assert_eq!(attrs.attr_type("a"), Ok(AttrType::Boolean));
        assert_eq!(attrs.attr_type("b"), Ok(AttrType::Integer));
        assert_eq!(attrs.attr_type("c"), Ok(AttrType::String));
        assert_eq!(attrs.attr_type("keyw"), Ok(AttrType::Keyword));
        assert_eq!(attrs.attr_type("d"), Ok(AttrType::Opaque));
        assert_eq!(attrs.attr_type("missing"), Err(SlpError::UnknownTag));

        assert!(attrs.get_bool("a").unwrap());
        assert_eq!(attrs.get_int("b").unwrap(), vec![1, 2, 3]);
        assert_eq!(attrs.get_str("c").unwrap(), vec!["text"]);
        assert_eq!(attrs.get_keyword("keyw"), Ok(()));
        assert_eq!(attrs.get_opaque("d").unwrap(), vec![&[0u8][..]]);
    }

    #[test]
    fn test_two_booleans_devolve_to_string() {
        let attrs = Attributes::parse("en", "(flag=true,false)").unwrap();

        assert_eq!(attrs.attr_type("flag"), Ok(AttrType::String));
        assert_eq!(attrs.get_str("flag").unwrap(), vec!["true", "false"]);
    }

    #[test]
    fn test_int_and_text_devolve_to_string() {
        let attrs = Attributes::parse("en", "(mixed=17,seventeen)").unwrap();

        assert_eq!(attrs.attr_type("mixed"), Ok(AttrType::String));
    }

    #[test]
    fn test_negative_int_round_trip() {
        let input = "(min=-2147483648)";
        let mut attrs = Attributes::parse("en", input).unwrap();

        assert_eq!(attrs.get_int("min").unwrap(), vec![i32::MIN]);
        assert_eq!(attrs.serialize(None, false), input);
    }

    #[test]
    fn test_dash_inside_number_is_a_string() {
        let attrs = Attributes::parse("en", "(range=1-5)").unwrap();

        assert_eq!(attrs.attr_type("range"), Ok(AttrType::String));
    }

    #[test]
    fn test_empty_opaque() {
        let input = "(blob=\\FF)";
        let mut attrs = Attributes::parse("en", input).unwrap();

        assert_eq!(attrs.get_opaque("blob").unwrap(), vec![&[][..] as &[u8]]);
        assert_eq!(attrs.serialize(None, false), input);
    }

    #[test]
    fn test_opaque_mixed_with_string_fails() {
        assert_eq!(
            Attributes::parse("en", "(x=\\FF\\01,plain)"),
            Err(SlpError::Parse("opaque value mixed with other types"))
        );
    }

    #[test]
    fn test_malformed_lists_fail() {
        for input in [
            "(a=)",
            "(a=1,,2)",
            "(a=1",
            "a=1)",
            "(=1)",
            "(a=1)x",
            "(a b=1)",
            ",",
        ] {
            let got = Attributes::parse("en", input);

            dbg!((input, &got));

            assert!(got.is_err(), "{input:?} must fail");
        }
    }

    #[test]
    fn test_add_policy_appends_and_type_checks() {
        let mut attrs = Attributes::new("en");
        attrs.set_int("x", 1, Policy::Add).unwrap();
        attrs.set_int("x", 2, Policy::Add).unwrap();

        assert_eq!(attrs.get_int("x").unwrap(), vec![1, 2]);
        assert_eq!(
            attrs.set_str("x", "nope", Policy::Add),
            Err(SlpError::TypeMismatch)
        );

        // Replace may change the type.
        attrs.set_str("x", "text", Policy::Replace).unwrap();
        assert_eq!(attrs.attr_type("x"), Ok(AttrType::String));
    }

    #[test]
    fn test_set_bool_replaces() {
        let mut attrs = Attributes::new("en");
        attrs.set_bool("flag", true).unwrap();
        attrs.set_bool("flag", false).unwrap();

        assert!(!attrs.get_bool("flag").unwrap());
    }

    #[test]
    fn test_keyword_is_idempotent() {
        let mut attrs = Attributes::new("en");
        attrs.set_keyword("keyw").unwrap();
        attrs.set_keyword("keyw").unwrap();

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get_keyword("keyw"), Ok(()));
        assert_eq!(attrs.set_str("keyw", "x", Policy::Add), Err(SlpError::TypeMismatch));
    }

    #[test]
    fn test_tags_are_case_insensitive() {
        let mut attrs = Attributes::new("en");
        attrs.set_int("Port", 80, Policy::Add).unwrap();
        attrs.set_int("pORT", 8080, Policy::Add).unwrap();

        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs.get_int("port").unwrap(), vec![80, 8080]);
    }

    #[test]
    fn test_set_guess() {
        let mut attrs = Attributes::new("en");
        attrs.set_guess("ints", "1,2,3", Policy::Replace).unwrap();
        attrs.set_guess("flag", "true", Policy::Replace).unwrap();
        attrs
            .set_guess("words", "alpha,17,beta", Policy::Replace)
            .unwrap();

        assert_eq!(attrs.attr_type("ints"), Ok(AttrType::Integer));
        assert_eq!(attrs.attr_type("flag"), Ok(AttrType::Boolean));
        assert_eq!(attrs.attr_type("words"), Ok(AttrType::String));
    }

    #[test]
    fn test_serialize_tag_filter() {
        let mut attrs = Attributes::parse("en", "(a=1),(b=2),(c=3)").unwrap();

        assert_eq!(attrs.serialize(Some("c,a"), false), "(c=3),(a=1)");
        assert_eq!(attrs.serialize(Some("nope"), false), "");
    }

    #[test]
    fn test_delta_serialization() {
        let mut attrs = Attributes::parse("en", "(a=1),(b=2)").unwrap();

        // Everything is modified right after the parse.
        assert_eq!(attrs.serialize(None, true), "(a=1),(b=2)");
        // The first delta cleared the flags.
        assert_eq!(attrs.serialize(None, true), "");

        attrs.set_int("b", 3, Policy::Replace).unwrap();
        assert_eq!(attrs.serialize(None, true), "(b=3)");
        assert_eq!(attrs.serialize(None, true), "");

        // A full serialization is unaffected by cleared flags.
        assert_eq!(attrs.serialize(None, false), "(a=1),(b=3)");
    }

    #[test]
    fn test_serialize_into_reports_required_size() {
        let mut attrs = Attributes::parse("en", "(a=1),(b=2)").unwrap();
        let rendered = attrs.clone().serialize(None, false);

        let mut small = [0u8; 4];
        assert_eq!(
            attrs.serialize_into(&mut small, None, false),
            Err(SlpError::BufferOverflow {
                needed: rendered.len()
            })
        );

        // The failed call must not clear the delta state.
        assert_eq!(attrs.clone().serialize(None, true), rendered);

        let mut big = vec![0u8; rendered.len()];
        let written = attrs.serialize_into(&mut big, None, false).unwrap();
        assert_eq!(&big[..written], rendered.as_bytes());
    }

    #[test]
    fn test_escaped_string_values() {
        let input = "(path=\\2Ftmp\\2Cshared)";
        let attrs = Attributes::parse("en", input).unwrap();

        assert_eq!(attrs.get_str("path").unwrap(), vec!["/tmp,shared"]);
    }

    #[test]
    fn test_nul_byte_is_not_reserved() {
        // NUL sits outside the reserved control range, so it may appear
        // unescaped in a value and stays unescaped on output.
        let input = "(z=a\u{0}b)";
        let mut attrs = Attributes::parse("en", input).unwrap();

        assert_eq!(attrs.get_str("z").unwrap(), vec!["a\u{0}b"]);
        assert_eq!(attrs.serialize(None, false), input);
    }

    #[test]
    fn test_value_with_leading_escape_is_a_string() {
        let attrs = Attributes::parse("en", "(x=\\2Chello)").unwrap();

        assert_eq!(attrs.attr_type("x"), Ok(AttrType::String));
        assert_eq!(attrs.get_str("x").unwrap(), vec![",hello"]);
    }

    #[test]
    fn test_freshen_merges() {
        let mut attrs = Attributes::parse("en", "(a=1)").unwrap();
        attrs.freshen("(a=2),(b=x)").unwrap();

        assert_eq!(attrs.get_int("a").unwrap(), vec![1, 2]);
        assert_eq!(attrs.get_str("b").unwrap(), vec!["x"]);
    }

    #[test]
    fn test_iter_in_insertion_order() {
        let attrs = Attributes::parse("en", "(z=1),keyw,(a=x)").unwrap();
        let order: Vec<_> = attrs.iter().collect();

        assert_eq!(
            order,
            vec![
                ("z", AttrType::Integer),
                ("keyw", AttrType::Keyword),
                ("a", AttrType::String),
            ]
        );
    }
}
