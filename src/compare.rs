//! String normalization, comparison, and string-list algebra.
//!
//! SLP compares strings in a normalized form (RFC 2608, section 6.4):
//! leading and trailing whitespace stripped, internal whitespace runs folded
//! to a single space, escapes decoded, and case folded with US-ASCII rules.
//! Higher bytes are compared verbatim.

use std::cmp::Ordering;

use slp_types::message::NamingAuthority;

use crate::utils::hex_value;

/// Normalize a string for comparison.
///
/// Escape sequences that are not two valid hex digits are copied verbatim
/// rather than rejected; normalization is used on strings that were already
/// validated elsewhere, or on peer input where a lenient comparison beats a
/// hard failure.
pub fn normalize(value: &str) -> Vec<u8> {
    let trimmed = value.trim_matches(|c: char| c.is_ascii_whitespace());
    let bytes = trimmed.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut index = 0;

    // Unescape first: a `\20` counts as whitespace for the fold below.
    while index < bytes.len() {
        if bytes[index] == b'\\' && index + 2 < bytes.len() {
            if let (Some(high), Some(low)) =
                (hex_value(bytes[index + 1]), hex_value(bytes[index + 2]))
            {
                out.push(high << 4 | low);
                index += 3;
                continue;
            }
        }
        out.push(bytes[index]);
        index += 1;
    }

    let mut folded = Vec::with_capacity(out.len());
    for byte in out {
        if byte.is_ascii_whitespace() {
            if folded.last() != Some(&b' ') {
                folded.push(b' ');
            }
        } else {
            folded.push(byte.to_ascii_lowercase());
        }
    }

    folded
}

/// Compare two strings in normalized form.
///
/// Equal-length strings compare bytewise. Unequal lengths follow the wire
/// convention inherited from existing SLP implementations: the longer string
/// sorts *first* (`Ordering::Less`). Callers that need the conventional
/// order must not rely on the tie-break.
pub fn compare_strings(left: &str, right: &str) -> Ordering {
    let left = normalize(left);
    let right = normalize(right);

    match left.len().cmp(&right.len()) {
        Ordering::Equal => left.cmp(&right),
        Ordering::Less => Ordering::Greater,
        Ordering::Greater => Ordering::Less,
    }
}

pub fn strings_eq(left: &str, right: &str) -> bool {
    compare_strings(left, right) == Ordering::Equal
}

/// Determine whether two service-type strings refer to the same type.
///
/// The leading `service:` is optional on either side. An abstract type
/// matches any of its concrete refinements: a query for `service:foo`
/// matches a registration of `service:foo:bar`, while a concrete query
/// requires an identical concrete registration.
pub fn service_types_match(query: &str, registration: &str) -> bool {
    let query = strip_service_prefix(query);
    let registration = strip_service_prefix(registration);

    if query.contains(':') {
        // Concrete query: the strings must be identical.
        return strings_eq(query, registration);
    }

    match registration.find(':') {
        // Abstract query against a concrete registration: compare against
        // the abstract part only.
        Some(colon) => strings_eq(query, &registration[..colon]),
        None => strings_eq(query, registration),
    }
}

fn strip_service_prefix(srvtype: &str) -> &str {
    if srvtype.len() >= 8 && srvtype[..8].eq_ignore_ascii_case("service:") {
        &srvtype[8..]
    } else {
        srvtype
    }
}

/// Determine whether a service type belongs to a naming authority.
///
/// The authority follows the first `.` of the type name; its absence means
/// IANA.
pub fn naming_auth_matches(srvtype: &str, auth: &NamingAuthority) -> bool {
    let srvtype = strip_service_prefix(srvtype);
    let dot = srvtype.find('.');

    match auth {
        NamingAuthority::All => true,
        NamingAuthority::Iana => dot.is_none(),
        NamingAuthority::Other(name) => match dot {
            Some(dot) => strings_eq(&srvtype[dot + 1..], name.as_ref()),
            None => false,
        },
    }
}

/// Split a comma-separated list into `(byte offset, item)` pairs.
///
/// Commas inside items are escaped (`\2C`) and therefore never appear raw,
/// so every raw comma is a separator. An empty list yields no items.
pub fn list_items(list: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;

    list.split(',').filter_map(move |item| {
        let item_offset = offset;
        offset += item.len() + 1;

        if list.is_empty() {
            None
        } else {
            Some((item_offset, item))
        }
    })
}

/// Locate `item` in a string-list.
///
/// Returns the byte offset of the matching list entry, or `None`. Matching
/// uses the normalized comparison, so `" X "` finds `x`.
pub fn list_contains(list: &str, item: &str) -> Option<usize> {
    list_items(list)
        .find(|(_, candidate)| strings_eq(candidate, item))
        .map(|(offset, _)| offset)
}

/// Count the entries of `list1` that also occur in `list2`.
pub fn list_intersect(list1: &str, list2: &str) -> usize {
    list_items(list1)
        .filter(|(_, item)| list_contains(list2, item).is_some())
        .count()
}

/// Intersect two lists and delete the common entries from `list2`.
///
/// Returns the number of entries removed. The removed span is the matching
/// entry of `list2` itself (plus one adjacent comma), which may differ
/// byte-for-byte from the `list1` spelling that matched it.
pub fn list_intersect_remove(list1: &str, list2: &mut String) -> usize {
    let mut removed = 0;

    for (_, item) in list_items(list1) {
        if let Some(offset) = list_contains(list2, item) {
            let end = list2[offset..]
                .find(',')
                .map(|comma| offset + comma)
                .unwrap_or(list2.len());

            if end < list2.len() {
                // Interior entry: delete its trailing comma too.
                list2.replace_range(offset..end + 1, "");
            } else if offset > 0 {
                // Final entry: delete the comma before it.
                list2.replace_range(offset - 1..end, "");
            } else {
                list2.clear();
            }

            removed += 1;
        }
    }

    removed
}

/// Union of two string-lists.
///
/// Entries of `list2` that are not already in `list1` are appended to it;
/// `list1` is assumed to be duplicate-free.
pub fn list_union(list1: &str, list2: &str) -> String {
    let mut out = String::from(list1);

    for (_, item) in list_items(list2) {
        if list_contains(list1, item).is_none() && list_contains(&out, item).is_none() {
            if !out.is_empty() {
                out.push(',');
            }
            out.push_str(item);
        }
    }

    out
}

/// Test whether every entry of `sublist` occurs in `list`.
///
/// An empty sub-list is not a subset of anything (nor is anything a subset
/// of an empty list).
pub fn list_subset(list: &str, sublist: &str) -> bool {
    if list.is_empty() || sublist.is_empty() {
        return false;
    }

    list_items(sublist).all(|(_, item)| list_contains(list, item).is_some())
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn test_normalize() {
        let tests = [
            ("hello", b"hello".to_vec()),
            ("  hello  ", b"hello".to_vec()),
            ("Hello   World", b"hello world".to_vec()),
            ("a\t \tb", b"a b".to_vec()),
            ("caf\\C3\\A9", "café".as_bytes().to_vec()),
            // Broken escapes are copied verbatim.
            ("a\\zq", b"a\\zq".to_vec()),
            ("", b"".to_vec()),
        ];

        for (test, expected) in tests {
            let got = normalize(test);

            dbg!((test, &expected, &got));

            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_compare_is_case_insensitive() {
        assert_eq!(compare_strings("HELLO", "hello"), Ordering::Equal);
        assert_eq!(compare_strings(" some thing ", "some\tthing"), Ordering::Equal);
    }

    #[test]
    fn test_compare_longer_sorts_first() {
        assert_eq!(compare_strings("abcdef", "abc"), Ordering::Less);
        assert_eq!(compare_strings("abc", "abcdef"), Ordering::Greater);
    }

    #[test]
    fn test_compare_antisymmetry() {
        let values = ["", "a", "b", "abc", "ABC", "  abc  ", "zzz", "za"];

        for left in values {
            for right in values {
                assert_eq!(
                    compare_strings(left, right),
                    compare_strings(right, left).reverse(),
                    "compare({left:?}, {right:?}) must be antisymmetric"
                );
            }
        }
    }

    #[test]
    fn test_service_types_match() {
        let tests = [
            ("service:printer", "service:printer", true),
            ("printer", "service:printer", true),
            ("service:printer", "PRINTER", true),
            // Abstract query matches concrete registration.
            ("service:foo", "service:foo:bar", true),
            // Concrete query requires an identical registration.
            ("service:foo:bar", "service:foo", false),
            ("service:foo:bar", "service:foo:bar", true),
            ("service:foo:bar", "service:foo:baz", false),
            ("service:printer", "service:scanner", false),
        ];

        for (query, registration, expected) in tests {
            let got = service_types_match(query, registration);

            dbg!((query, registration, expected, got));

            assert_eq!(expected, got);
        }
    }

    #[test]
    fn test_naming_auth_matches() {
        let iana = NamingAuthority::Iana;
        let all = NamingAuthority::All;
        let acme = NamingAuthority::Other(Cow::Borrowed("acme"));

        assert!(naming_auth_matches("service:printer", &iana));
        assert!(!naming_auth_matches("service:printer.acme", &iana));
        assert!(naming_auth_matches("service:printer.acme", &all));
        assert!(naming_auth_matches("service:printer", &all));
        assert!(naming_auth_matches("service:printer.acme", &acme));
        assert!(!naming_auth_matches("service:printer.other", &acme));
        assert!(!naming_auth_matches("service:printer", &acme));
    }

    #[test]
    fn test_list_contains_position() {
        let list = "one,two,three";

        assert_eq!(list_contains(list, "one"), Some(0));
        assert_eq!(list_contains(list, "TWO"), Some(4));
        assert_eq!(list_contains(list, "three"), Some(8));
        assert_eq!(list_contains(list, "four"), None);
        assert_eq!(list_contains("", "one"), None);
    }

    #[test]
    fn test_list_intersect() {
        assert_eq!(list_intersect("a,b,c", "b,c,d"), 2);
        assert_eq!(list_intersect("a,b,c", "x,y"), 0);
        assert_eq!(list_intersect("", "a"), 0);
    }

    #[test]
    fn test_list_intersect_remove() {
        let tests = [
            ("b,c", "a,b,c,d", "a,d", 2),
            ("a", "a,b", "b", 1),
            ("b", "a,b", "a", 1),
            ("a", "a", "", 1),
            ("x", "a,b", "a,b", 0),
        ];

        for (list1, list2, expected, expected_count) in tests {
            let mut got = String::from(list2);
            let count = list_intersect_remove(list1, &mut got);

            dbg!((list1, list2, expected, &got));

            assert_eq!(expected, got);
            assert_eq!(expected_count, count);
        }
    }

    #[test]
    fn test_list_union() {
        assert_eq!(list_union("a,b", "b,c"), "a,b,c");
        assert_eq!(list_union("", "a,b"), "a,b");
        assert_eq!(list_union("a", ""), "a");
        assert_eq!(list_union("a", "A"), "a");
    }

    #[test]
    fn test_list_subset() {
        assert!(list_subset("a,b,c", "b"));
        assert!(list_subset("a,b,c", "c,a"));
        assert!(!list_subset("a,b,c", "d"));
        assert!(!list_subset("a,b,c", ""));
        assert!(!list_subset("", "a"));
    }
}
