//! Log redaction for patient data.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! stdout or the log file. It replaces:
//! - comma-joined patient record lines (10 or more fields)
//! - `Field=value` pairs naming a record field
//! - UUIDs, MRNs and e-mail addresses
//!
//! The record types already keep their values out of `Debug`; this is the
//! fallback for values that reach a format string anyway.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::FIELD_NAMES;

static PATTERNS: OnceLock<RedactionPatterns> = OnceLock::new();

/// Lines longer than this are cut before scanning.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct RedactionRule {
    regex: Regex,
    replacement: &'static str,
}

struct RedactionPatterns {
    set: RegexSet,
    rules: Vec<RedactionRule>,
}

fn max_sanitize_bytes() -> usize {
    std::env::var("NEUROSCREEN_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }
    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn get_patterns() -> &'static RedactionPatterns {
    PATTERNS.get_or_init(|| {
        // Column names and their display labels ("MRI_Delay" / "MRI Delay").
        let field_alternation = FIELD_NAMES
            .iter()
            .flat_map(|f| [f.to_string(), f.replace('_', " ")])
            .map(|f| regex::escape(&f))
            .collect::<Vec<_>>()
            .join("|");

        let rules: Vec<(String, &'static str)> = vec![
            // A raw record: at least 10 comma-separated cells on one line.
            (
                r"[^,\s\[\]{}()=]*(?:,[^,\n\[\]{}()=]*){9,}".to_string(),
                "[REDACTED-RECORD]",
            ),
            // `Field=value`, and `Field: value` when the value is a number,
            // a quoted string or follows the word "Value".
            (
                format!(
                    r"\b(?:{field_alternation})\s*(?:=\s*[^\s,;]+|:\s*(?:[Vv]alue\s+[^\s,;]+|'[^']*'|-?\d[^\s,;]*))"
                ),
                "[REDACTED-FIELD]",
            ),
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}"
                    .to_string(),
                "[REDACTED-UUID]",
            ),
            (r"\bMRN[:\s]?\d{6,10}\b".to_string(), "[REDACTED-MRN]"),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b"
                    .to_string(),
                "[REDACTED-EMAIL]",
            ),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| p.as_str())).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| RedactionRule {
                regex: Regex::new(&pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        RedactionPatterns { set, rules }
    })
}

/// Redact patient data from a string.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.set.matches(prefix).into_iter() {
        let rule = &patterns.rules[idx];
        result = rule.regex.replace_all(&result, rule.replacement).to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// Whether a string would be altered by [`sanitize`].
#[must_use]
pub fn contains_patient_data(input: &str) -> bool {
    let (prefix, _) = truncate_to_char_boundary(input, max_sanitize_bytes());
    get_patterns().set.is_match(prefix)
}

/// A `tracing_subscriber` writer factory that redacts each formatted line
/// before handing it to the inner writer.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

/// Line-buffering writer produced by [`SanitizingMakeWriter`].
pub struct SanitizingWriter<W: std::io::Write> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W: std::io::Write> SanitizingWriter<W> {
    fn write_sanitized(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        let text = String::from_utf8_lossy(bytes);
        self.inner.write_all(sanitize(&text).as_bytes())
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            self.write_sanitized(&line)?;
        }
        Ok(())
    }
}

impl<W: std::io::Write> std::io::Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        if self.buffer.len() > max_sanitize_bytes().saturating_mul(2) {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
            self.inner.write_all(b"\n")?;
            return Ok(buf.len());
        }
        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;
        if !self.buffer.is_empty() {
            let pending = std::mem::take(&mut self.buffer);
            self.write_sanitized(&pending)?;
        }
        self.inner.flush()
    }
}

impl<W: std::io::Write> Drop for SanitizingWriter<W> {
    fn drop(&mut self) {
        let _ = std::io::Write::flush(self);
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            inner: self.inner.make_writer(),
            buffer: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_redacts_record_line() {
        let input = "predicting 0,0.0009,84,99.8,36.0,84.8,38.7,,,49,Right,Female,No,Never Smoked,Negative,Mild Activity,No,10,No,Low-Carb Diet,Good,None now";
        let out = sanitize(input);
        assert!(out.contains("[REDACTED-RECORD]"));
        assert!(!out.contains("Female"));
    }

    #[test]
    fn test_redacts_field_pairs() {
        let out = sanitize("bad value Age=49 in form");
        assert!(out.contains("[REDACTED-FIELD]"));
        assert!(!out.contains("49"));
    }

    #[test]
    fn test_redacts_labelled_values() {
        for line in [
            "Age: Value 150 outside expected range [18, 120]",
            "Gender: 'Other' is not one of Male, Female",
            "Dosage in mg: 250",
        ] {
            let out = sanitize(line);
            assert!(out.contains("[REDACTED-FIELD]"), "{out}");
            assert!(!out.contains("150") && !out.contains("Other") && !out.contains("250"));
        }
    }

    #[test]
    fn test_form_warnings_stay_readable_and_value_free() {
        let mut form = crate::application::PredictionForm::new();
        form.set("Age", "150").expect("set");
        form.set("Gender", "Other").expect("set");
        form.set("MRI_Delay", "999").expect("set");

        let warnings = form.validate();
        assert_eq!(warnings.len(), 3);
        for warning in &warnings {
            let out = sanitize(warning);
            assert!(!out.contains("150") && !out.contains("Other") && !out.contains("999"));
            assert!(!out.contains("[REDACTED-FIELD]"), "{out}");
        }
        assert!(warnings.iter().any(|w| w.starts_with("MRI Delay: outside")));
    }

    #[test]
    fn test_redacts_identifiers() {
        let out = sanitize("id 550e8400-e29b-41d4-a716-446655440000 MRN:12345678");
        assert!(out.contains("[REDACTED-UUID]"));
        assert!(out.contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_leaves_ordinary_lines() {
        let line = "Logistic Regression accuracy: 0.8125 (train=96, test=64)";
        assert!(!contains_patient_data(line));
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_truncates_large_inputs() {
        let out = sanitize_with_limit("abcdefghijklmnopqrstuvwxyz", 8);
        assert!(out.ends_with("[TRUNCATED]"));
        assert!(out.starts_with("abcdefgh"));
    }

    #[test]
    fn test_writer_sanitizes_lines() {
        let sink: Vec<u8> = Vec::new();
        let mut writer = SanitizingWriter {
            inner: sink,
            buffer: Vec::new(),
        };
        writer
            .write_all(b"contact patient@hospital.com\n")
            .expect("write");
        writer.flush().expect("flush");
        let written = String::from_utf8(writer.inner.clone()).expect("utf8");
        assert!(written.contains("[REDACTED-EMAIL]"));
    }
}
