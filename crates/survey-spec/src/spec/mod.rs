pub mod config;
pub mod question;

pub use config::{
    ConfigError, DEFAULT_BUTTON_LABEL, DEFAULT_REQUIRED_MESSAGE, TrialConfig, config_schema,
    validate_config,
};
pub use question::{DEFAULT_PATTERN, DEFAULT_PLACEHOLDER, QuestionSpec, QuestionType, synthetic_key};
