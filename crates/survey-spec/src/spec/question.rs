use std::fmt;

use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_PLACEHOLDER: &str = "Please select or enter an answer";
pub const DEFAULT_PATTERN: &str = ".*";

/// Supported question widgets.
///
/// The set is closed: configurations naming any other tag fail to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    /// Radio group, one option at a time.
    #[serde(alias = "select")]
    SingleSelect,
    /// Checkbox group, any subset of options.
    MultiSelect,
    /// Select box that starts on a placeholder entry.
    Dropdown,
    /// Single-line text field.
    #[serde(alias = "text")]
    ShortText,
    /// Multi-line text area.
    #[serde(alias = "multiline")]
    LongText,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::SingleSelect => "single-select",
            QuestionType::MultiSelect => "multi-select",
            QuestionType::Dropdown => "dropdown",
            QuestionType::ShortText => "short-text",
            QuestionType::LongText => "long-text",
        }
    }

    /// Selection types read their values from `options`.
    pub fn is_selection(&self) -> bool {
        matches!(
            self,
            QuestionType::SingleSelect | QuestionType::MultiSelect | QuestionType::Dropdown
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self, QuestionType::ShortText | QuestionType::LongText)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One survey question as written in the trial configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    /// Prompt markup shown above the control.
    pub prompt: String,
    /// Choices for selection types; ignored by text types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default)]
    pub required: bool,
    /// Response key. Falls back to `Q{index}` when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
    /// Whole-value regular expression checked on non-empty text answers.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Extra markup attributes passed through to the rendered control.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub attributes: String,
}

fn default_placeholder() -> String {
    DEFAULT_PLACEHOLDER.to_string()
}

fn default_pattern() -> String {
    DEFAULT_PATTERN.to_string()
}

impl QuestionSpec {
    pub fn new(kind: QuestionType, prompt: impl Into<String>) -> Self {
        Self {
            kind,
            prompt: prompt.into(),
            options: Vec::new(),
            required: false,
            name: String::new(),
            placeholder: default_placeholder(),
            pattern: default_pattern(),
            attributes: String::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn with_attributes(mut self, attributes: impl Into<String>) -> Self {
        self.attributes = attributes.into();
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Response key for the question at `original_index`.
    pub fn key(&self, original_index: usize) -> String {
        if self.name.is_empty() {
            synthetic_key(original_index)
        } else {
            self.name.clone()
        }
    }

    /// Compiles `pattern` anchored to the whole value, the way form controls apply it.
    pub fn compiled_pattern(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!("^(?:{})$", self.pattern))
    }
}

pub fn synthetic_key(original_index: usize) -> String {
    format!("Q{original_index}")
}
