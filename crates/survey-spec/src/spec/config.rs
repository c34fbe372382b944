use std::collections::{BTreeMap, BTreeSet};

use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::spec::question::{QuestionSpec, synthetic_key};

pub const DEFAULT_BUTTON_LABEL: &str = "Continue";
pub const DEFAULT_REQUIRED_MESSAGE: &str =
    "You must choose at least one response for this question";

/// Parameters for one survey trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrialConfig {
    pub questions: Vec<QuestionSpec>,
    /// Shuffle the display order; response keys are unaffected.
    #[serde(default)]
    pub randomize_question_order: bool,
    /// Raw markup shown above all questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    #[serde(default = "default_button_label")]
    pub button_label: String,
    /// Shown when a submission is blocked by an unanswered required question.
    #[serde(default = "default_required_message")]
    pub required_message: String,
}

fn default_button_label() -> String {
    DEFAULT_BUTTON_LABEL.to_string()
}

fn default_required_message() -> String {
    DEFAULT_REQUIRED_MESSAGE.to_string()
}

/// Reasons a trial configuration is refused before anything is rendered.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse trial configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("question {index} is a selection question without options")]
    MissingOptions { index: usize },
    #[error("question {index} lists option '{option}' more than once")]
    DuplicateOption { index: usize, option: String },
    #[error("question {index} has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        index: usize,
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("questions {first} and {second} both use response key '{key}'")]
    DuplicateKey {
        key: String,
        first: usize,
        second: usize,
    },
}

impl TrialConfig {
    pub fn new(questions: Vec<QuestionSpec>) -> Self {
        Self {
            questions,
            randomize_question_order: false,
            preamble: None,
            button_label: default_button_label(),
            required_message: default_required_message(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Response keys in original question order.
    pub fn keys(&self) -> Vec<String> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, question)| question.key(index))
            .collect()
    }
}

/// Checks a configuration for problems that would otherwise degrade silently.
pub fn validate_config(config: &TrialConfig) -> Result<(), ConfigError> {
    for (index, question) in config.questions.iter().enumerate() {
        if question.kind.is_selection() {
            if question.options.is_empty() {
                return Err(ConfigError::MissingOptions { index });
            }
            let mut seen = BTreeSet::new();
            for option in &question.options {
                if !seen.insert(option.as_str()) {
                    return Err(ConfigError::DuplicateOption {
                        index,
                        option: option.clone(),
                    });
                }
            }
        }

        if question.kind.is_text()
            && let Err(source) = question.compiled_pattern()
        {
            return Err(ConfigError::InvalidPattern {
                index,
                pattern: question.pattern.clone(),
                source,
            });
        }
    }

    // Synthetic keys are claimed up front so an explicit name cannot shadow a
    // later unnamed question.
    let mut owners: BTreeMap<String, usize> = BTreeMap::new();
    for (index, question) in config.questions.iter().enumerate() {
        if question.name.is_empty() {
            owners.insert(synthetic_key(index), index);
        }
    }
    for (index, question) in config.questions.iter().enumerate() {
        if question.name.is_empty() {
            continue;
        }
        if let Some(&other) = owners.get(&question.name) {
            let (first, second) = if other < index {
                (other, index)
            } else {
                (index, other)
            };
            return Err(ConfigError::DuplicateKey {
                key: question.name.clone(),
                first,
                second,
            });
        }
        owners.insert(question.name.clone(), index);
    }

    Ok(())
}

/// JSON Schema describing [`TrialConfig`].
pub fn config_schema() -> Result<Value, serde_json::Error> {
    serde_json::to_value(schema_for!(TrialConfig))
}
