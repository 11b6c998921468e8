use serde_json::Value;

use crate::{
    Error, Result,
    models::{Job, Kvp, SourceContext, TemplateVars, WorkflowContext},
};

pub fn assemble(
    params: Kvp,
    source: SourceContext,
    workflow: WorkflowContext,
    jobs: Vec<Job>,
    status: impl Into<String>,
) -> TemplateVars {
    TemplateVars { status: status.into(), params, workflow, gh: source, jobs }
}

fn map_strings(value: Value, f: &impl Fn(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| map_strings(v, f)).collect()),
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, map_strings(v, f))).collect())
        }
        other => other,
    }
}

/// Replaces every CR/LF sequence in every string with a literal `\n`,
/// keeping the shape of arrays and objects.
pub fn escape_line_breaks(value: Value) -> Value { map_strings(value, &escape_line_breaks_str) }

/// Escapes every string so it can be placed between quotes in a JSON
/// document: backslashes and quotes are escaped, line breaks become `\n`
/// and tabs `\t`.
pub fn escape_json_strings(value: Value) -> Value { map_strings(value, &escape_json_str) }

fn escape_line_breaks_str(s: &str) -> String {
    s.replace("\r\n", "\\n").replace(['\r', '\n'], "\\n")
}

fn escape_json_str(s: &str) -> String {
    // Backslashes first so the ones added below aren't doubled.
    let s = s.replace('\\', "\\\\").replace('"', "\\\"").replace('\t', "\\t");
    escape_line_breaks_str(&s)
}

impl TemplateVars {
    /// The variables as handed to the renderer.
    pub fn to_escaped_value(&self) -> Result<Value> {
        let value = serde_json::to_value(self)
            .map_err(|e| Error::TemplateRender(format!("Failed to serialize variables: {e}")))?;
        Ok(escape_json_strings(value))
    }
}
