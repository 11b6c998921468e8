use std::{borrow::Cow, path::Path, time::Duration};

use ci_status_core::{Error, Result};
use minijinja::{AutoEscape, Environment};
use serde::Serialize;
use serde_json::Value;
use time::{
    OffsetDateTime,
    format_description::{self, well_known::Rfc3339},
    macros::format_description,
};

const DEFAULT_TEMPLATE: &str = include_str!("../templates/default.json");

pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    // Variables arrive escaped for use inside JSON string literals.
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("date", date);
    env.add_filter("timeago", timeago);
    env.add_filter("first_line", first_line);
    env
}

/// Renders a template file, resolved against the working directory.
pub fn render_file<S>(path: &Path, context: S) -> Result<String>
where S: Serialize {
    let source = std::fs::read_to_string(path).map_err(|e| {
        Error::TemplateRender(format!("Failed to read template {}: {e}", path.display()))
    })?;
    let name = path.display().to_string();
    render_named(&name, &source, context)
}

/// Renders the built-in status message.
pub fn render_default<S>(context: S) -> Result<String>
where S: Serialize {
    render_named("default.json", DEFAULT_TEMPLATE, context)
}

pub fn render_str<S>(source: &str, context: S) -> Result<String>
where S: Serialize {
    render_named("<string>", source, context)
}

fn render_named<S>(name: &str, source: &str, context: S) -> Result<String>
where S: Serialize {
    tracing::debug!("Rendering template {}", name);
    environment()
        .render_named_str(name, source, context)
        .map_err(|e| Error::TemplateRender(format!("{name}: {e:#}")))
}

/// Extracts the `blocks` array from a rendered message.
pub fn parse_blocks(rendered: &str) -> Result<Vec<Value>> {
    let mut message: Value = serde_json::from_str(rendered)
        .map_err(|e| Error::TemplateRender(format!("Rendered message is not valid JSON: {e}")))?;
    match message.get_mut("blocks").map(Value::take) {
        Some(Value::Array(blocks)) => Ok(blocks),
        _ => Err(Error::TemplateRender("Rendered message has no blocks array".to_string())),
    }
}

/// First line of a raw or already escaped string. Escape pairs are kept
/// whole, so `\\n` (an escaped backslash followed by `n`) is not a break.
fn first_line(value: String) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        match c {
            '\n' | '\r' => break,
            '\\' => match chars.next() {
                Some('n') => break,
                Some(next) => {
                    out.push(c);
                    out.push(next);
                }
                None => out.push(c),
            },
            _ => out.push(c),
        }
    }
    out
}

fn timeago(value: String) -> String {
    let Ok(value) = OffsetDateTime::parse(&value, &Rfc3339) else {
        return format!("[invalid {}]", value);
    };
    let Ok(duration) = Duration::try_from(OffsetDateTime::now_utc() - value) else {
        return "[out of range]".to_string();
    };
    timeago::Formatter::new().convert(duration)
}

fn date(value: String, format: Option<String>) -> String {
    let Ok(value) = OffsetDateTime::parse(&value, &Rfc3339) else {
        return format!("[invalid {}]", value);
    };
    let format = if let Some(format) = format.as_deref() {
        match format_description::parse_borrowed::<2>(format) {
            Ok(format) => Cow::Owned(format),
            Err(_) => return format!("[invalid format {}]", format),
        }
    } else {
        Cow::Borrowed(format_description!("[year]-[month]-[day] [hour]:[minute]"))
    };
    value.format(&format).unwrap_or_else(|_| "[invalid]".to_string())
}
