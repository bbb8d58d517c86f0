//! Exposition text helpers: escaping, number formatting, name checks.

use std::fmt::Write;

use crate::error::{Result, TallyError};
use crate::metrics::MetricKind;

/// Escape a label value (`\`, `"`, newline).
pub fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

/// Escape help text (`\`, newline).
pub fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a sample value. Integral values print without a fractional part,
/// infinities as `+Inf`/`-Inf`.
pub fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        // f64 Display already drops a trailing ".0".
        v.to_string()
    }
}

/// Write the `# HELP` and `# TYPE` lines of a family.
pub fn write_header(out: &mut String, name: &str, help: &str, kind: MetricKind) {
    let _ = writeln!(out, "# HELP {} {}", name, escape_help(help));
    let _ = writeln!(out, "# TYPE {} {}", name, kind.as_str());
}

/// Join `key="value"` pairs with commas. Empty input yields an empty string.
pub fn label_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

fn is_name_start(c: char, allow_colon: bool) -> bool {
    c.is_ascii_alphabetic() || c == '_' || (allow_colon && c == ':')
}

fn is_name_char(c: char, allow_colon: bool) -> bool {
    is_name_start(c, allow_colon) || c.is_ascii_digit()
}

fn valid_name(name: &str, allow_colon: bool) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if is_name_start(c, allow_colon) => chars.all(|c| is_name_char(c, allow_colon)),
        _ => false,
    }
}

/// Validate a metric family name (`[a-zA-Z_:][a-zA-Z0-9_:]*`).
pub fn check_metric_name(name: &str) -> Result<()> {
    if valid_name(name, true) {
        Ok(())
    } else {
        Err(TallyError::InvalidMetric(format!("invalid metric name: {name:?}")))
    }
}

/// Validate a label name (`[a-zA-Z_][a-zA-Z0-9_]*`, `le` reserved).
pub fn check_label_name(name: &str) -> Result<()> {
    if name == "le" {
        return Err(TallyError::InvalidMetric("label name \"le\" is reserved".into()));
    }
    if valid_name(name, false) {
        Ok(())
    } else {
        Err(TallyError::InvalidMetric(format!("invalid label name: {name:?}")))
    }
}
