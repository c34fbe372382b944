#![allow(missing_docs)]

pub mod collect;
pub mod order;
pub mod render;
pub mod spec;
pub mod trial;
pub mod validate;
pub mod widget;

pub use collect::{Collection, ResponseRecord, collect};
pub use order::DisplayOrder;
pub use render::{RenderError, RenderProgress, progress, render_html, render_json_ui, render_text};
pub use spec::{
    ConfigError, QuestionSpec, QuestionType, TrialConfig, config_schema, validate_config,
};
pub use trial::{
    PATTERN_MESSAGE, SubmitError, Trial, TrialController, TrialError, TrialResult, TrialState,
    UiEvent,
};
pub use validate::{IssueKind, ValidationIssue, ValidationReport, validate};
pub use widget::{InteractionError, LayoutError, Widget, WidgetHandle, WidgetTree};
