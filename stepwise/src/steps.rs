//! The step vocabulary scenario authors write against.
//!
//! | Step                                          | Doc string |
//! |-----------------------------------------------|------------|
//! | `I call "<VERB>" "<path>"`                    | no         |
//! | `I call "<VERB>" "<path>" with body:`         | yes        |
//! | `I set the header "<name>" to "<value>"`      | no         |
//! | `the status code should be <integer>`         | no         |
//! | `the response should be`                      | yes        |
//! | `the response should be a JSON like`          | yes        |
//! | `the response should be empty`                | no         |
//! | `the response should be empty object`         | no         |

use crate::{error::Error, scenario_context::ScenarioContext};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

lazy_static! {
    static ref CALL_REGEX: Regex = Regex::new(r#"^I call "([^"]*)" "([^"]*)"$"#).unwrap();
    static ref CALL_WITH_BODY_REGEX: Regex =
        Regex::new(r#"^I call "([^"]*)" "([^"]*)" with body:$"#).unwrap();
    static ref SET_HEADER_REGEX: Regex =
        Regex::new(r#"^I set the header "([^"]*)" to "([^"]*)"$"#).unwrap();
    static ref STATUS_CODE_REGEX: Regex = Regex::new(r"^the status code should be (\d+)$").unwrap();
    static ref RESPONSE_REGEX: Regex = Regex::new(r"^the response should be$").unwrap();
    static ref JSON_LIKE_REGEX: Regex =
        Regex::new(r"^the response should be a JSON like$").unwrap();
    static ref EMPTY_REGEX: Regex = Regex::new(r"^the response should be empty$").unwrap();
    static ref EMPTY_OBJECT_REGEX: Regex =
        Regex::new(r"^the response should be empty object$").unwrap();
}

/// Executes one step against the scenario context. `text` is the step without its keyword.
pub fn execute(
    context: &mut ScenarioContext,
    text: &str,
    doc_string: Option<&str>,
) -> Result<(), Error> {
    let text = text.trim();
    debug!("Step: {}", text);

    if let Some(captures) = CALL_REGEX.captures(text) {
        return context.i_call(&captures[1], &captures[2]);
    }
    if let Some(captures) = CALL_WITH_BODY_REGEX.captures(text) {
        let body = require_doc_string(text, doc_string)?;
        return context.i_call_with_body(&captures[1], &captures[2], Some(body));
    }
    if let Some(captures) = SET_HEADER_REGEX.captures(text) {
        context.set_header(&captures[1], &captures[2]);
        return Ok(());
    }
    if let Some(captures) = STATUS_CODE_REGEX.captures(text) {
        let status_code = captures[1]
            .parse()
            .map_err(|_| Error::UndefinedStep(String::from(text)))?;
        return context.the_status_code_should_be(status_code);
    }
    if RESPONSE_REGEX.is_match(text) {
        return context.the_response_should_be(require_doc_string(text, doc_string)?);
    }
    if JSON_LIKE_REGEX.is_match(text) {
        return context.the_response_should_be_a_json_like(require_doc_string(text, doc_string)?);
    }
    if EMPTY_REGEX.is_match(text) {
        return context.the_response_should_be_empty();
    }
    if EMPTY_OBJECT_REGEX.is_match(text) {
        return context.the_response_should_be_empty_object();
    }

    Err(Error::UndefinedStep(String::from(text)))
}

fn require_doc_string<'a>(text: &str, doc_string: Option<&'a str>) -> Result<&'a str, Error> {
    doc_string.ok_or_else(|| Error::MissingDocString(String::from(text)))
}
