//! Translation of expected JSON documents carrying placeholder tokens into regular expressions.
//!
//! Two tokens are recognised:
//!
//! * `$$placeholder$$` matches anything at its position, including nothing.
//! * `$$integer$$` matches a run of decimal digits, possibly empty.
//!
//! Tokens may sit inside a JSON string (`"id": "$$placeholder$$"`, `"path": "/notes/$$integer$$"`)
//! or stand in for a whole value (`"id": $$placeholder$$`). Every other character of the
//! canonical expected document has to match literally.

mod matcher;

pub use matcher::{matches, RegexMatcher, StructuralMatcher};

use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

pub const PLACEHOLDER_TOKEN: &str = "$$placeholder$$";
pub const INTEGER_TOKEN: &str = "$$integer$$";

const PLACEHOLDER_FRAGMENT: &str = "(.*?)";
const INTEGER_FRAGMENT: &str = r"\d*?";
const BARE_INTEGER_FRAGMENT: &str = r#"(?:\d+|"\d*")"#;

lazy_static! {
    static ref TOKEN_REGEX: Regex = Regex::new(
        r#""\\u0000bare-(?P<bare>placeholder|integer)"|\$\$(?P<inline>placeholder|integer)\$\$"#
    )
    .unwrap();
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum TokenKind {
    Placeholder,
    Integer,
}

impl TokenKind {
    fn from_name(name: &str) -> Self {
        match name {
            "integer" => TokenKind::Integer,
            _ => TokenKind::Placeholder,
        }
    }

    fn token(self) -> &'static str {
        match self {
            TokenKind::Placeholder => PLACEHOLDER_TOKEN,
            TokenKind::Integer => INTEGER_TOKEN,
        }
    }

    fn bare_sentinel(self) -> &'static str {
        match self {
            TokenKind::Placeholder => "\"\\u0000bare-placeholder\"",
            TokenKind::Integer => "\"\\u0000bare-integer\"",
        }
    }
}

/// Re-encodes a JSON document in the canonical form both sides of a structural match are
/// compared in: compact, keys sorted, non-ASCII characters and slashes left unescaped.
pub fn canonicalize(json: &[u8]) -> Result<String, serde_json::Error> {
    let value: Value = serde_json::from_slice(json)?;
    serde_json::to_string(&value)
}

/// Translates an expected JSON document into the source of a regular expression matching its
/// canonical form. The result is not anchored.
pub fn translate(expected: &str) -> Result<String, Error> {
    let quoted = quote_bare_tokens(expected);
    let canonical = canonicalize(quoted.as_bytes()).map_err(Error::MalformedExpectedBody)?;

    let mut pattern = String::with_capacity(canonical.len() * 2);
    let mut last = 0;

    for captures in TOKEN_REGEX.captures_iter(&canonical) {
        let whole = match captures.get(0) {
            Some(whole) => whole,
            None => continue,
        };
        pattern.push_str(&regex::escape(&canonical[last..whole.start()]));

        let fragment = if let Some(bare) = captures.name("bare") {
            match TokenKind::from_name(bare.as_str()) {
                TokenKind::Placeholder => PLACEHOLDER_FRAGMENT,
                TokenKind::Integer => BARE_INTEGER_FRAGMENT,
            }
        } else if let Some(inline) = captures.name("inline") {
            match TokenKind::from_name(inline.as_str()) {
                TokenKind::Placeholder => PLACEHOLDER_FRAGMENT,
                TokenKind::Integer => INTEGER_FRAGMENT,
            }
        } else {
            continue;
        };
        pattern.push_str(fragment);
        last = whole.end();
    }
    pattern.push_str(&regex::escape(&canonical[last..]));

    Ok(pattern)
}

/// Wraps tokens standing outside JSON strings into string sentinels so the document decodes.
///
/// A sentinel starts with a NUL character, which canonical JSON always writes as `\u0000`, so
/// ordinary expected strings never collide with it.
fn quote_bare_tokens(expected: &str) -> String {
    let mut output = String::with_capacity(expected.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut rest = expected;

    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(kind) = [TokenKind::Placeholder, TokenKind::Integer]
            .iter()
            .copied()
            .find(|kind| rest.starts_with(kind.token()))
        {
            output.push_str(kind.bare_sentinel());
            rest = &rest[kind.token().len()..];
            continue;
        }

        output.push(c);
        rest = &rest[c.len_utf8()..];
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_match(expected: &str, actual: &str) -> bool {
        let regex = Regex::new(&format!("^(?:{})$", translate(expected).unwrap())).unwrap();
        regex.is_match(&canonicalize(actual.as_bytes()).unwrap())
    }

    #[test]
    fn without_tokens_the_pattern_is_the_escaped_canonical_text() {
        let pattern = translate(r#"{ "b": [1, 2.5], "a": "x(y)?" }"#).unwrap();

        assert_eq!(pattern, r#"\{"a":"x\(y\)\?","b":\[1,2\.5\]\}"#);
    }

    #[test]
    fn without_tokens_only_the_same_document_matches() {
        let expected = r#"{"items": [{"name": "a+b"}], "total": 1}"#;

        assert!(full_match(expected, r#"{"total":1,"items":[{"name":"a+b"}]}"#));
        assert!(!full_match(expected, r#"{"total":1,"items":[{"name":"aab"}]}"#));
        assert!(!full_match(expected, r#"{"total":1,"items":[{"name":"a+b"},{}]}"#));
    }

    #[test]
    fn brackets_are_escaped() {
        let pattern = translate("[[]]").unwrap();

        assert_eq!(pattern, r"\[\[\]\]");
    }

    #[test]
    fn quoted_tokens_translate_in_place() {
        let pattern = translate(r#"{"id": "$$placeholder$$", "count": "$$integer$$"}"#).unwrap();

        assert_eq!(pattern, r#"\{"count":"\d*?","id":"(.*?)"\}"#);
    }

    #[test]
    fn bare_tokens_stand_for_whole_values() {
        let pattern = translate(r#"{"id": $$placeholder$$, "count": $$integer$$}"#).unwrap();

        assert_eq!(pattern, r#"\{"count":(?:\d+|"\d*"),"id":(.*?)\}"#);
    }

    #[test]
    fn tokens_can_be_part_of_a_longer_string() {
        let expected = r#"{"location": "/notes/$$integer$$"}"#;

        assert!(full_match(expected, r#"{"location":"/notes/12"}"#));
        assert!(!full_match(expected, r#"{"location":"/notes/x"}"#));
    }

    #[test]
    fn placeholder_matches_any_value_including_empty() {
        let expected = r#"{"value": "$$placeholder$$"}"#;

        assert!(full_match(expected, r#"{"value":""}"#));
        assert!(full_match(expected, r#"{"value":"anything at all"}"#));
        assert!(full_match(r#"{"value": $$placeholder$$}"#, r#"{"value":{"nested":[1,2]}}"#));
        assert!(!full_match(expected, r#"{"other":"x"}"#));
    }

    #[test]
    fn integer_matches_digit_runs_only() {
        let expected = r#"{"n": "$$integer$$"}"#;

        assert!(full_match(expected, r#"{"n":""}"#));
        assert!(full_match(expected, r#"{"n":"0"}"#));
        assert!(full_match(expected, r#"{"n":"42"}"#));
        assert!(!full_match(expected, r#"{"n":"4a"}"#));
    }

    #[test]
    fn bare_integer_matches_numbers_and_digit_strings() {
        let expected = r#"{"n": $$integer$$}"#;

        assert!(full_match(expected, r#"{"n":42}"#));
        assert!(full_match(expected, r#"{"n":"7"}"#));
        assert!(!full_match(expected, r#"{"n":"seven"}"#));
        assert!(!full_match(expected, r#"{"n":-1}"#));
    }

    #[test]
    fn tokens_inside_escaped_strings_are_not_treated_as_bare() {
        let quoted = quote_bare_tokens(r#"{"a": "say \"$$placeholder$$\"", "b": $$integer$$}"#);

        assert_eq!(
            quoted,
            r#"{"a": "say \"$$placeholder$$\"", "b": "\u0000bare-integer"}"#
        );
    }

    #[test]
    fn sentinel_lookalikes_match_literally() {
        let expected = r#"{"note": "$$bare-placeholder$$", "tag": "bare-integer"}"#;

        assert!(full_match(
            expected,
            r#"{"note":"$$bare-placeholder$$","tag":"bare-integer"}"#
        ));
        assert!(!full_match(expected, r#"{"note":"anything","tag":"bare-integer"}"#));
    }

    #[test]
    fn unicode_escapes_are_canonicalized() {
        let expected = r#"{"name": "caf\u00e9", "path": "a\/b"}"#;

        assert!(full_match(expected, r#"{"name":"café","path":"a/b"}"#));
    }

    #[test]
    fn malformed_expected_documents_are_rejected() {
        let result = translate(r#"{"id": }"#);

        assert!(matches!(result, Err(Error::MalformedExpectedBody(_))));
    }
}
