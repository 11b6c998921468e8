use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::models::Kvp;

/// A line that didn't match `- <key>: <value>`.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("Invalid input: {line}. Expecting - <key>: <value>.")]
pub struct KvpError {
    pub line: String,
}

fn kvp_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*-\s*(?P<key>[^:]+):\s*(?P<value>.+)$").expect("valid KVP pattern")
    })
}

pub fn parse_line(line: &str) -> Result<(String, String), KvpError> {
    let line = line.trim_end_matches('\r');
    let caps = kvp_regex().captures(line).ok_or_else(|| KvpError { line: line.to_string() })?;
    let key = caps.name("key").map(|m| m.as_str().trim()).unwrap_or_default();
    let value = caps.name("value").map(|m| m.as_str().trim()).unwrap_or_default();
    if key.is_empty() {
        return Err(KvpError { line: line.to_string() });
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parses `- key: value` lines into a single mapping.
///
/// Blank input is an empty mapping. If any line is malformed, every
/// malformed line is reported and no mapping is produced.
pub fn parse_multi_line_kvp(input: Option<&str>) -> Result<Kvp, Vec<KvpError>> {
    let input = input.map(str::trim).unwrap_or_default();
    if input.is_empty() {
        return Ok(Kvp::new());
    }
    let mut vars = Kvp::new();
    let mut errors = Vec::new();
    for line in input.split('\n') {
        match parse_line(line) {
            Ok((key, value)) => {
                vars.insert(key, value);
            }
            Err(e) => errors.push(e),
        }
    }
    if errors.is_empty() { Ok(vars) } else { Err(errors) }
}

/// Splits comma separated input. Blank input yields no elements.
pub fn parse_list(input: Option<&str>) -> Vec<String> {
    match input.map(str::trim) {
        None | Some("") => vec![],
        Some(input) => input.split(',').map(str::to_string).collect(),
    }
}
