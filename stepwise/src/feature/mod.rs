//! A small Gherkin reader covering what scenario files for this driver use: `Feature`,
//! `Background`, `Scenario` (or `Example`), the step keywords and `"""` doc strings. Outlines and
//! rules are rejected.

mod runner;

pub use runner::{FeatureReport, Runner, ScenarioOutcome, ScenarioResult};

use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use std::{fs, path::Path};

lazy_static! {
    static ref SECTION_REGEX: Regex =
        Regex::new(r"^(?P<keyword>Feature|Background|Scenario|Example):\s*(?P<name>.*)$").unwrap();
    static ref UNSUPPORTED_SECTION_REGEX: Regex =
        Regex::new(r"^(?P<keyword>Scenario Outline|Scenario Template|Examples|Scenarios|Rule):")
            .unwrap();
    static ref STEP_REGEX: Regex =
        Regex::new(r"^(?P<keyword>Given|When|Then|And|But|\*)\s+(?P<text>.+)$").unwrap();
}

const DOC_STRING_DELIMITER: &str = "\"\"\"";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub keyword: String,
    pub text: String,
    pub doc_string: Option<String>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub background: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

impl Feature {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(text: &str) -> Result<Self, Error> {
        let mut name = None;
        let mut background = Vec::new();
        let mut scenarios: Vec<Scenario> = Vec::new();
        let mut in_background = false;
        let mut lines = text.lines().enumerate().map(|(index, line)| (index + 1, line));

        while let Some((number, raw_line)) = lines.next() {
            let line = raw_line.trim();

            if line.is_empty() || line.starts_with('#') || line.starts_with('@') {
                continue;
            }

            if let Some(captures) = SECTION_REGEX.captures(line) {
                let section_name = captures["name"].trim().to_owned();
                match &captures["keyword"] {
                    "Feature" => {
                        if name.is_some() {
                            return Err(invalid(number, "only one Feature is allowed"));
                        }
                        name = Some(section_name);
                    }
                    "Background" => {
                        if !scenarios.is_empty() {
                            return Err(invalid(number, "Background must precede every Scenario"));
                        }
                        in_background = true;
                    }
                    _ => {
                        in_background = false;
                        scenarios.push(Scenario {
                            name: section_name,
                            steps: Vec::new(),
                            line: number,
                        });
                    }
                }
                continue;
            }

            if let Some(captures) = UNSUPPORTED_SECTION_REGEX.captures(line) {
                return Err(invalid(
                    number,
                    &format!("\"{}\" sections are not supported", &captures["keyword"]),
                ));
            }

            if line.starts_with(DOC_STRING_DELIMITER) {
                let indent = indentation(raw_line, raw_line.len());
                let content = read_doc_string(&mut lines, indent, number)?;
                let step = match scenarios.last_mut() {
                    Some(scenario) if !in_background => scenario.steps.last_mut(),
                    _ => background.last_mut(),
                }
                .ok_or_else(|| invalid(number, "doc string without a step"))?;

                if step.doc_string.is_some() {
                    return Err(invalid(number, "a step takes a single doc string"));
                }
                step.doc_string = Some(content);
                continue;
            }

            if let Some(captures) = STEP_REGEX.captures(line) {
                let step = Step {
                    keyword: captures["keyword"].to_owned(),
                    text: captures["text"].trim().to_owned(),
                    doc_string: None,
                    line: number,
                };
                match scenarios.last_mut() {
                    Some(scenario) if !in_background => scenario.steps.push(step),
                    None if in_background => background.push(step),
                    _ => return Err(invalid(number, "step outside of a Scenario or Background")),
                }
                continue;
            }

            // Free text under the Feature line is its description.
            if name.is_none() || !scenarios.is_empty() || in_background {
                return Err(invalid(number, &format!("unexpected line \"{}\"", line)));
            }
        }

        Ok(Feature {
            name: name.ok_or_else(|| invalid(1, "missing Feature"))?,
            background,
            scenarios,
        })
    }
}

fn read_doc_string<'a, I: Iterator<Item = (usize, &'a str)>>(
    lines: &mut I,
    indent: usize,
    opening_line: usize,
) -> Result<String, Error> {
    let mut content = Vec::new();

    for (_, raw_line) in lines {
        if raw_line.trim() == DOC_STRING_DELIMITER {
            return Ok(content.join("\n"));
        }

        content.push(&raw_line[indentation(raw_line, indent)..]);
    }

    Err(invalid(opening_line, "unterminated doc string"))
}

/// Counts the leading spaces and tabs of `line`, up to `limit`. Both are single bytes, so the
/// count is always a char boundary.
fn indentation(line: &str, limit: usize) -> usize {
    line.bytes()
        .take(limit)
        .take_while(|b| *b == b' ' || *b == b'\t')
        .count()
}

fn invalid(line: usize, reason: &str) -> Error {
    Error::InvalidFeature {
        line,
        reason: String::from(reason),
    }
}
