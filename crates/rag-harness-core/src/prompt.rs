//! Reusable prompt templates with `{name}` placeholders.
//!
//! Templates use f-string style substitution: `{name}` is replaced by the
//! value bound to `name`, while `{{` and `}}` produce literal braces.
//! Templates can be built inline or read from their serialized JSON form:
//!
//! ```json
//! {
//!   "_type": "prompt",
//!   "input_variables": ["paper_input", "style_input"],
//!   "template": "Summarize {paper_input} in a {style_input} style.",
//!   "template_format": "f-string"
//! }
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use rag_harness_core::prompt::PromptTemplate;
//!
//! let t = PromptTemplate::from_template("Explain {topic} in {{one}} line.").unwrap();
//! assert_eq!(t.input_variables(), ["topic"]);
//! let values = HashMap::from([("topic".to_string(), "MMR".to_string())]);
//! assert_eq!(t.format(&values).unwrap(), "Explain MMR in {one} line.");
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{RetrievalError, Result};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Var(String),
}

/// A parsed prompt template.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    template: String,
    input_variables: Vec<String>,
    segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct SerializedPrompt {
    #[serde(rename = "_type", default)]
    kind: Option<String>,
    template: String,
    #[serde(default)]
    input_variables: Option<Vec<String>>,
    #[serde(default = "default_template_format")]
    template_format: String,
}

fn default_template_format() -> String {
    "f-string".to_string()
}

impl PromptTemplate {
    /// Parse a template, inferring its variables in order of first use.
    pub fn from_template(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        let segments = parse_segments(&template)?;
        let mut input_variables: Vec<String> = Vec::new();
        for seg in &segments {
            if let Segment::Var(name) = seg {
                if !input_variables.contains(name) {
                    input_variables.push(name.clone());
                }
            }
        }
        Ok(Self {
            template,
            input_variables,
            segments,
        })
    }

    /// Parse the serialized JSON form.
    ///
    /// Declared `input_variables`, when present, must match the
    /// placeholders found in the template.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: SerializedPrompt = serde_json::from_str(json)
            .map_err(|e| RetrievalError::Template(format!("invalid prompt JSON: {}", e)))?;

        if let Some(kind) = raw.kind.as_deref() {
            if kind != "prompt" {
                return Err(RetrievalError::Template(format!(
                    "unsupported prompt type: {}",
                    kind
                )));
            }
        }
        if raw.template_format != "f-string" {
            return Err(RetrievalError::Template(format!(
                "unsupported template format: {}",
                raw.template_format
            )));
        }

        let parsed = Self::from_template(raw.template)?;
        if let Some(declared) = raw.input_variables {
            let mut declared_sorted = declared.clone();
            declared_sorted.sort();
            declared_sorted.dedup();
            let mut found = parsed.input_variables.clone();
            found.sort();
            if declared_sorted != found {
                return Err(RetrievalError::Template(format!(
                    "declared input_variables {:?} do not match template placeholders {:?}",
                    declared, parsed.input_variables
                )));
            }
        }
        Ok(parsed)
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn input_variables(&self) -> &[String] {
        &self.input_variables
    }

    /// Substitute every placeholder. Missing values are an error; extra
    /// values are ignored.
    pub fn format(&self, values: &HashMap<String, String>) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        for seg in &self.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Var(name) => {
                    let value = values.get(name).ok_or_else(|| {
                        RetrievalError::Template(format!("missing value for variable '{}'", name))
                    })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for n in chars.by_ref() {
                    match n {
                        '}' => {
                            closed = true;
                            break;
                        }
                        '{' => {
                            return Err(RetrievalError::Template(
                                "nested '{' inside placeholder".to_string(),
                            ))
                        }
                        other => name.push(other),
                    }
                }
                if !closed {
                    return Err(RetrievalError::Template(
                        "unclosed '{' in template".to_string(),
                    ));
                }
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(RetrievalError::Template(
                        "empty placeholder '{}' in template".to_string(),
                    ));
                }
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Var(name));
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '}' => {
                return Err(RetrievalError::Template(
                    "single '}' encountered in template".to_string(),
                ))
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
