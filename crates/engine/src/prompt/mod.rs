//! Prompt templates and output parsing
//!
//! Provides:
//! - Named-variable templates validated at construction
//! - Rendering with missing-variable detection
//! - Regex-based parsing of structured generator output

use answerforge_common::errors::{EngineError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Regex-based parser turning raw generator output into named fields
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegexOutputParser {
    /// Pattern with one capture group per output key
    pattern: String,

    /// Field names, in capture group order
    output_keys: Vec<String>,
}

impl RegexOutputParser {
    /// Create a parser; fails if the pattern does not compile
    pub fn new(pattern: impl Into<String>, output_keys: &[&str]) -> Result<Self> {
        let pattern = pattern.into();
        Regex::new(&pattern).map_err(|e| EngineError::TemplateInvalid {
            message: format!("invalid parser pattern '{}': {}", pattern, e),
        })?;

        Ok(Self {
            pattern,
            output_keys: output_keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    /// Parse raw output into named fields.
    ///
    /// Fails with ParseError when the pattern does not match; callers fall
    /// back to treating the whole raw text as the unparsed answer.
    pub fn parse(&self, raw: &str) -> Result<HashMap<String, String>> {
        let regex = Regex::new(&self.pattern).map_err(|e| EngineError::Parse {
            message: e.to_string(),
        })?;

        let captures = regex.captures(raw).ok_or_else(|| EngineError::Parse {
            message: format!("output did not match pattern '{}'", self.pattern),
        })?;

        let mut fields = HashMap::new();
        for (i, key) in self.output_keys.iter().enumerate() {
            let value = captures
                .get(i + 1)
                .map(|m| m.as_str().trim().to_string())
                .ok_or_else(|| EngineError::Parse {
                    message: format!("missing capture group for '{}'", key),
                })?;
            fields.insert(key.clone(), value);
        }

        Ok(fields)
    }
}

/// Default parser for outputs of the form `<answer>\nScore: <integer>`
pub fn default_rerank_parser() -> RegexOutputParser {
    RegexOutputParser::new(r"(?s)^(.*)\nScore:\s*(\d+)\s*$", &["answer", "score"])
        .expect("built-in rerank parser pattern is valid")
}

/// A prompt template with named substitution variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptTemplate {
    /// Template text with `{name}` placeholders
    template: String,

    /// Variables that must be supplied at render time
    required_variables: Vec<String>,

    /// Optional parser for the generator's raw output
    output_parser: Option<RegexOutputParser>,
}

impl PromptTemplate {
    /// Create a template.
    ///
    /// Every `{name}` referenced in the template text must appear in
    /// `required_variables`; construction fails otherwise.
    pub fn new(template: impl Into<String>, required_variables: &[&str]) -> Result<Self> {
        let template = template.into();
        let placeholder =
            Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid");

        for captures in placeholder.captures_iter(&template) {
            if let Some(name) = captures.get(1) {
                if !required_variables.contains(&name.as_str()) {
                    return Err(EngineError::TemplateInvalid {
                        message: format!(
                            "template references '{}' which is not a required variable",
                            name.as_str()
                        ),
                    });
                }
            }
        }

        Ok(Self {
            template,
            required_variables: required_variables.iter().map(|v| v.to_string()).collect(),
            output_parser: None,
        })
    }

    /// Attach an output parser
    pub fn with_output_parser(mut self, parser: RegexOutputParser) -> Self {
        self.output_parser = Some(parser);
        self
    }

    /// The variables this template requires
    pub fn required_variables(&self) -> &[String] {
        &self.required_variables
    }

    /// The configured output parser, if any
    pub fn output_parser(&self) -> Option<&RegexOutputParser> {
        self.output_parser.as_ref()
    }

    /// Render the template with the supplied variables.
    ///
    /// Fails with MissingVariable if any required variable is absent.
    pub fn render(&self, variables: &HashMap<String, String>) -> Result<String> {
        let mut rendered = self.template.clone();

        for name in &self.required_variables {
            let value = variables
                .get(name)
                .ok_or_else(|| EngineError::MissingVariable {
                    variable: name.clone(),
                })?;
            rendered = rendered.replace(&format!("{{{}}}", name), value);
        }

        Ok(rendered)
    }
}

/// Build a variable map from name/value pairs
pub fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
