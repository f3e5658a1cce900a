use super::{canonicalize, translate};
use crate::error::Error;
use regex::Regex;
use std::fmt::Debug;

/// Shape-tolerant comparison of an expected JSON pattern with a concrete response body.
pub trait StructuralMatcher: Debug {
    fn matches(&self, expected: &str, actual: &[u8]) -> Result<bool, Error>;
}

/// Matches the canonical actual body against the anchored translation of the expected pattern.
#[derive(Debug, Default, Clone, Copy)]
pub struct RegexMatcher;

impl StructuralMatcher for RegexMatcher {
    fn matches(&self, expected: &str, actual: &[u8]) -> Result<bool, Error> {
        matches(expected, actual)
    }
}

pub fn matches(expected: &str, actual: &[u8]) -> Result<bool, Error> {
    let pattern = Regex::new(&format!("^(?:{})$", translate(expected)?))?;
    let actual = canonicalize(actual).map_err(Error::MalformedActualBody)?;

    Ok(pattern.is_match(&actual))
}
