//! Structured fields recovered from free-text observations
//!
//! Entities store everything they know as free text. Indexers encode
//! structured facts as prefixed observations (`"Defined in: <path>"`,
//! `"Line: <n>"`, `"docstring: <text>"`, `"Signature: <text>"`,
//! `"Methods: a, b"`). This module is the only place that knows those
//! prefixes; the view builders consume [`ObservationFields`].

use once_cell::sync::Lazy;
use regex::Regex;

static FILE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:defined in|file path|file):\s*(\S.*?)\s*$").expect("valid regex")
});
static LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*line(?: number)?:\s*(\d+)").expect("valid regex"));
static DOCSTRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^\s*(?:docstring|description):\s*(\S.*?)\s*$").expect("valid regex")
});
static SIGNATURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)^\s*signature:\s*(\S.*?)\s*$").expect("valid regex"));
static METHODS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*methods:\s*(.*?)\s*$").expect("valid regex"));

/// Structured view of an entity's observations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservationFields {
    pub file_path: Option<String>,
    pub line: Option<u32>,
    pub docstring: Option<String>,
    pub signature: Option<String>,
    pub methods: Vec<String>,
    /// Any observation mentions documentation, even in a form we don't parse
    pub has_documentation: bool,
}

impl ObservationFields {
    /// Parse the observations of one entity. The first match wins for
    /// single-valued fields; method lists accumulate.
    pub fn parse<S: AsRef<str>>(observations: &[S]) -> Self {
        let mut fields = Self::default();

        for obs in observations {
            let obs = obs.as_ref();
            let lower = obs.to_lowercase();
            if lower.contains("docstring") || lower.contains("description") {
                fields.has_documentation = true;
            }

            if fields.file_path.is_none() {
                if let Some(caps) = FILE_PATH.captures(obs) {
                    fields.file_path = Some(caps[1].to_string());
                    continue;
                }
            }
            if fields.line.is_none() {
                if let Some(caps) = LINE.captures(obs) {
                    fields.line = caps[1].parse().ok();
                    continue;
                }
            }
            if fields.docstring.is_none() {
                if let Some(caps) = DOCSTRING.captures(obs) {
                    fields.docstring = Some(caps[1].to_string());
                    continue;
                }
            }
            if fields.signature.is_none() {
                if let Some(caps) = SIGNATURE.captures(obs) {
                    fields.signature = Some(caps[1].to_string());
                    continue;
                }
            }
            if let Some(caps) = METHODS.captures(obs) {
                fields.methods.extend(
                    caps[1]
                        .split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(String::from),
                );
            }
        }

        fields
    }

    /// Docstring cut to at most `max_chars` characters, with `...` appended
    /// when cut.
    pub fn docstring_preview(&self, max_chars: usize) -> Option<String> {
        self.docstring.as_ref().map(|doc| {
            if doc.chars().count() <= max_chars {
                doc.clone()
            } else {
                let mut preview: String = doc.chars().take(max_chars).collect();
                preview.push_str("...");
                preview
            }
        })
    }
}

/// Extract just the defining file path, the most common lookup
pub fn defined_in<S: AsRef<str>>(observations: &[S]) -> Option<String> {
    observations
        .iter()
        .find_map(|obs| FILE_PATH.captures(obs.as_ref()).map(|c| c[1].to_string()))
}
