//! LDAPv3 search filters (RFC 2254 subset) evaluated against attribute sets.
//!
//! ```text
//! filter     = "(" filtercomp ")"
//! filtercomp = and / or / not / item
//! and        = "&" filterlist
//! or         = "|" filterlist
//! not        = "!" filter
//! filterlist = 1*filter
//! item       = attr filtertype value
//! filtertype = "=" / "~=" / ">=" / "<="
//! ```
//!
//! A filter is parsed once into an expression tree and then evaluated;
//! evaluation is strictly left-to-right with short-circuit, and a missing
//! tag folds the LDAP "Undefined" result to `false`.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::char,
    combinator::map,
    IResult,
};
use slp_types::{error::SlpError, utils::indicators::is_tag_char};

use crate::{
    attr::{AttrType, Attributes},
    compare::list_items,
    utils::{hex_value, unescape_attr},
};

/// Parse depth bound; deeper filters fail instead of exhausting the stack.
const MAX_DEPTH: usize = 50;

/// A comparison operator of a filter item.
///
/// The approximate-match operator (`~=`) is collapsed to equality at parse
/// time; RFC 2254 leaves its semantics implementation-defined.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FilterOp {
    Equal,
    GreaterEq,
    LessEq,
    Present,
}

/// A parsed search filter.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Filter<'a> {
    And(Vec<Filter<'a>>),
    Or(Vec<Filter<'a>>),
    Not(Box<Filter<'a>>),
    Item {
        tag: &'a str,
        op: FilterOp,
        /// The right-hand side, still in escaped form.
        value: &'a str,
    },
}

impl<'a> Filter<'a> {
    /// Parse a complete filter string.
    pub fn parse(input: &'a str) -> Result<Self, SlpError> {
        let (rest, filter) =
            filter(input, MAX_DEPTH).map_err(|_| SlpError::Parse("malformed search filter"))?;

        if !rest.is_empty() {
            return Err(SlpError::Parse("trailing input after search filter"));
        }

        Ok(filter)
    }

    /// Evaluate the filter against an attribute set.
    ///
    /// `&` and `|` evaluate children left-to-right and stop at the first
    /// decisive child; later siblings are never consulted.
    pub fn evaluate(&self, attrs: &Attributes) -> Result<bool, SlpError> {
        match self {
            Filter::And(children) => {
                for (position, child) in children.iter().enumerate() {
                    if !child.evaluate(attrs)? {
                        log::trace!("conjunction short-circuits false at child {position}");
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(children) => {
                for (position, child) in children.iter().enumerate() {
                    if child.evaluate(attrs)? {
                        log::trace!("disjunction short-circuits true at child {position}");
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(child) => Ok(!child.evaluate(attrs)?),
            Filter::Item { tag, op, value } => evaluate_item(attrs, tag, *op, value),
        }
    }
}

/// Single-shot predicate test.
///
/// An empty predicate is always true. Any error (malformed attribute list,
/// malformed predicate, trailing input) yields `false`.
pub fn predicate_matches(attr_list: &str, predicate: &str) -> bool {
    if predicate.is_empty() {
        return true;
    }

    let attrs = match Attributes::parse("en", attr_list) {
        Ok(attrs) => attrs,
        Err(_) => return false,
    };

    match Filter::parse(predicate).and_then(|filter| filter.evaluate(&attrs)) {
        Ok(result) => result,
        Err(error) => {
            log::debug!("predicate {predicate:?} did not evaluate: {error}");
            false
        }
    }
}

/// Restrict a serialized attribute list to the tags of a tag-list.
///
/// Tag patterns may contain wildcards (RFC 2608, section 10.4): `*` in a
/// tag-list entry matches any run of characters of a tag name. Used to
/// compose AttrRply bodies.
pub fn filter_attributes(attr_list: &str, tag_list: &str) -> Result<String, SlpError> {
    let attrs = Attributes::parse("en", attr_list)?;

    let mut filtered = attrs.clone_filtered(|tag| {
        for (_, pattern) in list_items(tag_list) {
            if wildcard_match(pattern, tag.as_bytes())? {
                return Ok(true);
            }
        }
        Ok(false)
    })?;

    Ok(filtered.serialize(None, false))
}

// ----- grammar -----

/// `filter = "(" filtercomp ")"`
fn filter(input: &str, depth: usize) -> IResult<&str, Filter> {
    let depth = match depth.checked_sub(1) {
        Some(depth) => depth,
        None => {
            log::debug!("search filter exceeds the recursion bound");
            return Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::TooLarge,
            )));
        }
    };

    let (input, _) = char('(')(input)?;
    let (input, parsed) = filtercomp(input, depth)?;
    let (input, _) = char(')')(input)?;

    Ok((input, parsed))
}

/// `filtercomp = and / or / not / item`
fn filtercomp(input: &str, depth: usize) -> IResult<&str, Filter> {
    match input.chars().next() {
        Some('&') => map(|i| filterlist(i, depth), Filter::And)(&input[1..]),
        Some('|') => map(|i| filterlist(i, depth), Filter::Or)(&input[1..]),
        Some('!') => map(|i| filter(i, depth), |f| Filter::Not(Box::new(f)))(&input[1..]),
        _ => item(input),
    }
}

/// `filterlist = 1*filter`
fn filterlist(input: &str, depth: usize) -> IResult<&str, Vec<Filter>> {
    nom::multi::many1(|i| filter(i, depth))(input)
}

/// `item = attr filtertype value`
///
/// A value of exactly `*` after a bare `=` is the *present* test; any other
/// value containing `*` is a wildcarded equality match. `~=*` stays an
/// equality comparison against the literal value `*`.
fn item(input: &str) -> IResult<&str, Filter> {
    let (input, tag_name) = filter_tag(input)?;
    let (input, (op, bare_equal)) = filtertype(input)?;
    let (input, value) = take_till(|c| c == ')')(input)?;

    let op = match (op, value) {
        (FilterOp::Equal, "*") if bare_equal => FilterOp::Present,
        (op, _) => op,
    };

    Ok((
        input,
        Filter::Item {
            tag: tag_name,
            op,
            value,
        },
    ))
}

/// `attr` — an attribute tag; the operator characters are reserved in tags,
/// so the tag simply ends at the operator.
fn filter_tag(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii() && is_tag_char(c as u8))(input)
}

/// `filtertype = "=" / "~=" / ">=" / "<="`
///
/// Approximate match collapses to equality, but the flag records whether
/// the token was a bare `=`; only that form can denote the present test.
fn filtertype(input: &str) -> IResult<&str, (FilterOp, bool)> {
    alt((
        map(tag("~="), |_| (FilterOp::Equal, false)),
        map(tag(">="), |_| (FilterOp::GreaterEq, false)),
        map(tag("<="), |_| (FilterOp::LessEq, false)),
        map(char('='), |_| (FilterOp::Equal, true)),
    ))(input)
}

// ----- evaluation -----

fn evaluate_item(
    attrs: &Attributes,
    tag: &str,
    op: FilterOp,
    value: &str,
) -> Result<bool, SlpError> {
    let attr_type = match attrs.attr_type(tag) {
        Ok(attr_type) => attr_type,
        // RFC 2251 "Undefined" folds to false.
        Err(SlpError::UnknownTag) => {
            log::trace!("leaf {tag:?}: tag absent, undefined folds to false");
            return Ok(false);
        }
        Err(error) => return Err(error),
    };

    if op == FilterOp::Present {
        log::trace!("leaf {tag:?}: present");
        return Ok(true);
    }

    let matched = match attr_type {
        AttrType::Boolean => bool_item(attrs, tag, op, value),
        AttrType::Integer => int_item(attrs, tag, op, value),
        // A keyword has no value; only the present test can succeed.
        AttrType::Keyword => Ok(false),
        AttrType::String => string_item(attrs, tag, op, value),
        AttrType::Opaque => opaque_item(attrs, tag, op, value),
    }?;
    log::trace!("leaf {tag:?} {op:?} {value:?} against {attr_type:?}: {matched}");

    Ok(matched)
}

fn bool_item(attrs: &Attributes, tag: &str, op: FilterOp, value: &str) -> Result<bool, SlpError> {
    if op != FilterOp::Equal {
        return Ok(false);
    }

    let rhs = match value {
        "true" => true,
        "false" => false,
        _ => return Ok(false),
    };

    Ok(attrs.get_bool(tag)? == rhs)
}

fn int_item(attrs: &Attributes, tag: &str, op: FilterOp, value: &str) -> Result<bool, SlpError> {
    let rhs: i32 = match value.parse() {
        Ok(rhs) => rhs,
        // Comparing an integer attribute with a non-integer.
        Err(_) => return Ok(false),
    };

    let values = attrs.get_int(tag)?;
    Ok(values.into_iter().any(|lhs| match op {
        FilterOp::Equal => lhs == rhs,
        FilterOp::GreaterEq => lhs >= rhs,
        FilterOp::LessEq => lhs <= rhs,
        FilterOp::Present => unreachable!(),
    }))
}

fn string_item(attrs: &Attributes, tag: &str, op: FilterOp, value: &str) -> Result<bool, SlpError> {
    let values = attrs.get_str(tag)?;

    if op == FilterOp::Equal {
        for stored in values {
            if wildcard_match(value, stored.as_bytes())? {
                return Ok(true);
            }
        }
        return Ok(false);
    }

    let rhs = unescape_attr(value)?;
    Ok(values
        .into_iter()
        .any(|stored| ordered_bytes_match(stored.as_bytes(), &rhs, op)))
}

fn opaque_item(attrs: &Attributes, tag: &str, op: FilterOp, value: &str) -> Result<bool, SlpError> {
    // The right-hand side must itself be in opaque form.
    let rhs = match value.as_bytes() {
        [b'\\', high, low, ..]
            if matches!(
                (hex_value(*high), hex_value(*low)),
                (Some(high), Some(low)) if high << 4 | low == 0xff
            ) =>
        {
            unescape_attr(&value[3..])?
        }
        _ => return Ok(false),
    };

    let values = attrs.get_opaque(tag)?;
    Ok(values.into_iter().any(|stored| match op {
        FilterOp::Equal => stored == rhs.as_slice(),
        _ => ordered_bytes_match(stored, &rhs, op),
    }))
}

/// Lexicographic byte comparison truncated to the shorter length: `<=`
/// succeeds when the stored value sorts at or before the right-hand side.
fn ordered_bytes_match(stored: &[u8], rhs: &[u8], op: FilterOp) -> bool {
    let len = stored.len().min(rhs.len());
    let ordering = stored[..len].cmp(&rhs[..len]);

    match op {
        FilterOp::LessEq => ordering.is_le(),
        FilterOp::GreaterEq => ordering.is_ge(),
        FilterOp::Equal | FilterOp::Present => unreachable!(),
    }
}

// ----- wildcard matching -----

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PatternToken {
    Any,
    Byte(u8),
}

/// Decode an escaped pattern into match tokens.
///
/// An unescaped `*` is a wildcard; `\2A` is a literal asterisk (RFC 2254 —
/// escaping exists precisely to make the wildcard literal).
fn pattern_tokens(pattern: &str) -> Result<Vec<PatternToken>, SlpError> {
    let bytes = pattern.as_bytes();
    let mut tokens = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        match bytes[index] {
            b'*' => {
                if tokens.last() != Some(&PatternToken::Any) {
                    tokens.push(PatternToken::Any);
                }
                index += 1;
            }
            b'\\' => {
                let (high, low) = match (bytes.get(index + 1), bytes.get(index + 2)) {
                    (Some(high), Some(low)) => (*high, *low),
                    _ => return Err(SlpError::Parse("truncated escape sequence")),
                };
                match (hex_value(high), hex_value(low)) {
                    (Some(high), Some(low)) => tokens.push(PatternToken::Byte(high << 4 | low)),
                    _ => return Err(SlpError::Parse("invalid escape sequence")),
                }
                index += 3;
            }
            byte => {
                tokens.push(PatternToken::Byte(byte));
                index += 1;
            }
        }
    }

    Ok(tokens)
}

/// Match an escaped pattern against an unescaped value, case-insensitively
/// in the ASCII range. `*` matches any run of bytes, greedily with
/// backtracking.
pub(crate) fn wildcard_match(pattern: &str, value: &[u8]) -> Result<bool, SlpError> {
    let tokens = pattern_tokens(pattern)?;

    let mut token_index = 0;
    let mut value_index = 0;
    let mut backtrack: Option<(usize, usize)> = None;

    while value_index < value.len() {
        match tokens.get(token_index) {
            Some(PatternToken::Byte(byte))
                if byte.eq_ignore_ascii_case(&value[value_index]) =>
            {
                token_index += 1;
                value_index += 1;
            }
            Some(PatternToken::Any) => {
                // Remember the star; try the empty run first.
                backtrack = Some((token_index, value_index));
                token_index += 1;
            }
            _ => match backtrack {
                Some((star_index, star_value)) => {
                    // Extend the last star by one byte and retry.
                    backtrack = Some((star_index, star_value + 1));
                    token_index = star_index + 1;
                    value_index = star_value + 1;
                }
                None => return Ok(false),
            },
        }
    }

    while tokens.get(token_index) == Some(&PatternToken::Any) {
        token_index += 1;
    }

    Ok(token_index == tokens.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(attr_list: &str, predicate: &str) -> Result<bool, SlpError> {
        let attrs = Attributes::parse("en", attr_list).unwrap();
        Filter::parse(predicate)?.evaluate(&attrs)
    }

    #[test]
    fn test_empty_predicate_is_true() {
        assert!(predicate_matches("(x=1)", ""));
        assert!(predicate_matches("", ""));
    }

    #[test]
    fn test_simple_items() {
        let tests = [
            ("(x=5)", "(x=5)", true),
            ("(x=5)", "(x=6)", false),
            ("(x=5)", "(x>=3)", true),
            ("(x=5)", "(x>=5)", true),
            ("(x=5)", "(x>=6)", false),
            ("(x=5)", "(x<=5)", true),
            ("(x=5)", "(x<=4)", false),
            ("(x=5)", "(x~=5)", true),
            ("(x=5)", "(x=*)", true),
            ("(x=5)", "(y=*)", false),
            // `~=*` is an equality test against `*`, never a present test.
            ("(x=5)", "(x~=*)", false),
            ("(flag=true)", "(flag~=*)", false),
            ("keyw", "(keyw~=*)", false),
            ("(x=5)", "(x=five)", false),
            ("(name=printer)", "(name=printer)", true),
            ("(name=printer)", "(name=PRINTER)", true),
            ("(name=printer)", "(name=scanner)", false),
            ("(flag=true)", "(flag=true)", true),
            ("(flag=true)", "(flag=false)", false),
            ("(flag=true)", "(flag>=true)", false),
            ("keyw", "(keyw=*)", true),
            ("keyw", "(keyw=value)", false),
        ];

        for (attrs, predicate, expected) in tests {
            let got = eval(attrs, predicate).unwrap();

            dbg!((attrs, predicate, expected, got));

            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_multivalued_lookup() {
        assert!(eval("(x=1,5,9)", "(x=5)").unwrap());
        assert!(eval("(x=1,5,9)", "(x>=8)").unwrap());
        assert!(!eval("(x=1,5,9)", "(x>=10)").unwrap());
    }

    #[test]
    fn test_boolean_connectives() {
        let attrs = "(x=5),(y=hello world)";
        let tests = [
            ("(&(x>=3)(y=hel*))", true),
            ("(&(x>=3)(y=nope))", false),
            ("(|(x>=9)(y=hel*))", true),
            ("(|(x>=9)(y=nope))", false),
            ("(!(x=5))", false),
            ("(!(x=9))", true),
            ("(&(x>=3)(|(y=nope)(y=*world))(!(x<=2)))", true),
        ];

        for (predicate, expected) in tests {
            let got = eval(attrs, predicate).unwrap();

            dbg!((predicate, expected, got));

            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_short_circuit_suppresses_type_errors() {
        // `z` is absent: the first conjunct is false, and the absent tag in
        // the second conjunct must never surface an error.
        assert!(!predicate_matches("(x=2)", "(&(x>=3)(z=*))"));
        // Same for disjunction: the first decisive child wins.
        assert!(predicate_matches("(x=2)", "(|(x<=3)(z=*))"));
    }

    #[test]
    fn test_string_ordering() {
        assert!(eval("(s=apple)", "(s<=banana)").unwrap());
        assert!(eval("(s=apple)", "(s>=aardvark)").unwrap());
        assert!(!eval("(s=apple)", "(s>=zebra)").unwrap());
        // Truncated to the shorter length, the prefix compares equal.
        assert!(eval("(s=applepie)", "(s<=apple)").unwrap());
    }

    #[test]
    fn test_opaque_comparison() {
        let attrs = "(op=\\FF\\01\\02\\03)";

        assert!(eval(attrs, "(op=\\FF\\01\\02\\03)").unwrap());
        assert!(!eval(attrs, "(op=\\FF\\01\\02)").unwrap());
        assert!(eval(attrs, "(op>=\\FF\\01\\02)").unwrap());
        assert!(eval(attrs, "(op<=\\FF\\09)").unwrap());
        assert!(eval(attrs, "(op=*)").unwrap());
        // A bare string right-hand side cannot match an opaque.
        assert!(!eval(attrs, "(op=raw)").unwrap());
    }

    #[test]
    fn test_wildcards() {
        let tests = [
            ("first*cat", "first dog cat", true),
            ("first*roach*cat", "first roach dog cat cheese", false),
            ("first*roach*cat", "first roach dog cat cheese cat", true),
            ("*", "anything", true),
            ("*", "", true),
            ("a*", "a", true),
            ("*a", "ba", true),
            ("exact", "exact", true),
            ("exact", "EXACT", true),
            ("exact", "exactly", false),
        ];

        for (pattern, value, expected) in tests {
            let got = wildcard_match(pattern, value.as_bytes()).unwrap();

            dbg!((pattern, value, expected, got));

            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_escaped_star_is_literal() {
        assert!(wildcard_match("a\\2Ab", b"a*b").unwrap());
        assert!(!wildcard_match("a\\2Ab", b"axxb").unwrap());
        assert!(eval("(s=a*b)", "(s=a\\2Ab)").unwrap());
        assert!(!eval("(s=axxb)", "(s=a\\2Ab)").unwrap());
    }

    #[test]
    fn test_parse_errors() {
        for predicate in [
            "x=5",
            "(x=5",
            "(x)",
            "(&)",
            "(&x=1)",
            "((x=1))",
            "(x=1)(y=2)",
            "(x=1)trash",
        ] {
            let got = Filter::parse(predicate);

            dbg!((predicate, &got));

            assert!(got.is_err(), "{predicate:?} must fail to parse");
        }
    }

    #[test]
    fn test_recursion_bound() {
        let deep = format!("{}(x=1){}", "(!".repeat(60), ")".repeat(60));
        assert!(Filter::parse(&deep).is_err());

        let shallow = format!("{}(x=1){}", "(!".repeat(40), ")".repeat(40));
        assert!(Filter::parse(&shallow).is_ok());
    }

    #[test]
    fn test_type_mismatch_is_false() {
        // The tag exists with a different type than the comparison implies.
        assert!(!eval("(x=5)", "(x=hello)").unwrap());
        assert!(!eval("(flag=true)", "(flag=1)").unwrap());
        assert!(!eval("keyw", "(keyw>=1)").unwrap());
    }

    #[test]
    fn test_filter_attributes() {
        let attrs = "(color=red),(size=12),keyw,(shade=dark)";

        assert_eq!(filter_attributes(attrs, "color").unwrap(), "(color=red)");
        assert_eq!(
            filter_attributes(attrs, "s*").unwrap(),
            "(size=12),(shade=dark)"
        );
        assert_eq!(filter_attributes(attrs, "keyw,color").unwrap(), "(color=red),keyw");
        assert_eq!(filter_attributes(attrs, "none").unwrap(), "");
        assert_eq!(
            filter_attributes(attrs, "*").unwrap(),
            "(color=red),(size=12),keyw,(shade=dark)"
        );
    }
}
