use std::time::{Duration, Instant};

use futures::{Stream, StreamExt};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::collect::{Collection, ResponseRecord, collect};
use crate::order::DisplayOrder;
use crate::spec::{ConfigError, TrialConfig, validate_config};
use crate::validate::{ValidationReport, validate};
use crate::widget::{InteractionError, Widget, WidgetHandle, WidgetTree};

/// Shown when a submission only fails on text patterns.
pub const PATTERN_MESSAGE: &str = "Please match the requested format";

/// Lifecycle of one trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialState {
    /// Set while the page is laid out; [`TrialController::render`] returns after leaving it.
    Rendering,
    AwaitingSubmit,
    Validating,
    Collecting,
    Complete,
}

/// A user-interface event addressed by original question index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    Select { question: usize, option: String },
    Clear { question: usize },
    Check { question: usize, option: String },
    Uncheck { question: usize, option: String },
    Toggle { question: usize, option: String },
    Input { question: usize, text: String },
    Submit,
}

/// The record handed to the host when the trial completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialResult {
    /// Milliseconds from render to the accepted submission.
    pub rt: f64,
    /// JSON object mapping question keys to value lists.
    pub responses: String,
    /// JSON array of original indices in display order.
    pub question_order: String,
}

impl TrialResult {
    pub fn response_record(&self) -> Result<ResponseRecord, serde_json::Error> {
        serde_json::from_str(&self.responses)
    }

    pub fn display_order(&self) -> Result<DisplayOrder, serde_json::Error> {
        serde_json::from_str(&self.question_order)
    }

    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(self)
    }

    pub fn from_cbor(bytes: &[u8]) -> Result<Self, serde_cbor::Error> {
        serde_cbor::from_slice(bytes)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("submission blocked: {} question(s) need attention", .0.issues.len())]
    Invalid(ValidationReport),
    #[error("trial has already produced its result")]
    AlreadyComplete,
    #[error("failed to encode trial result: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum TrialError {
    /// The event source ended before an accepted submission.
    #[error("event source closed before the trial was submitted")]
    Abandoned { last_report: Option<ValidationReport> },
    #[error(transparent)]
    Submit(SubmitError),
}

/// Builds trials from a validated configuration.
#[derive(Debug, Clone)]
pub struct TrialController {
    config: TrialConfig,
    widgets: Vec<Widget>,
}

impl TrialController {
    pub fn new(config: TrialConfig) -> Result<Self, ConfigError> {
        validate_config(&config)?;
        let widgets = config
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                Widget::build(question).map_err(|source| ConfigError::InvalidPattern {
                    index,
                    pattern: question.pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, widgets })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::new(TrialConfig::from_json(json)?)
    }

    pub fn config(&self) -> &TrialConfig {
        &self.config
    }

    /// Lays out the page and starts the clock. The trial waits for submission.
    pub fn render<R>(&self, rng: &mut R) -> Trial
    where
        R: Rng + ?Sized,
    {
        let order = DisplayOrder::generate(
            self.config.questions.len(),
            self.config.randomize_question_order,
            rng,
        );
        let tree = WidgetTree::arrange(&self.config, self.widgets.clone(), &order);
        tracing::info!(
            questions = tree.len(),
            randomized = self.config.randomize_question_order,
            "trial rendered"
        );

        let trial = Trial {
            tree,
            order,
            state: TrialState::Rendering,
            started: Instant::now(),
            finished: None,
        };
        trial.start()
    }
}

/// One rendered survey page awaiting its submission.
#[derive(Debug)]
pub struct Trial {
    tree: WidgetTree,
    order: DisplayOrder,
    state: TrialState,
    started: Instant,
    finished: Option<Duration>,
}

impl Trial {
    fn start(mut self) -> Self {
        self.started = Instant::now();
        self.state = TrialState::AwaitingSubmit;
        self
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn tree(&self) -> &WidgetTree {
        &self.tree
    }

    pub fn order(&self) -> &DisplayOrder {
        &self.order
    }

    /// Time since render; frozen once the trial completes.
    pub fn elapsed(&self) -> Duration {
        self.finished.unwrap_or_else(|| self.started.elapsed())
    }

    /// Current answers without validating, e.g. for progress display.
    pub fn snapshot(&self) -> Collection {
        collect(&self.tree)
    }

    pub fn select(&mut self, question: usize, option: &str) -> Result<(), InteractionError> {
        self.handle(question)?.select(option)
    }

    pub fn clear(&mut self, question: usize) -> Result<(), InteractionError> {
        self.handle(question)?.clear()
    }

    pub fn set_checked(
        &mut self,
        question: usize,
        option: &str,
        checked: bool,
    ) -> Result<(), InteractionError> {
        self.handle(question)?.set_checked(option, checked)
    }

    pub fn toggle(&mut self, question: usize, option: &str) -> Result<(), InteractionError> {
        self.handle(question)?.toggle(option)
    }

    pub fn set_text(&mut self, question: usize, text: impl Into<String>) -> Result<(), InteractionError> {
        self.handle(question)?.set_text(text)
    }

    /// Applies an interaction event. `Submit` is handled by [`Trial::submit`].
    pub fn apply(&mut self, event: &UiEvent) -> Result<(), InteractionError> {
        match event {
            UiEvent::Select { question, option } => self.select(*question, option),
            UiEvent::Clear { question } => self.clear(*question),
            UiEvent::Check { question, option } => self.set_checked(*question, option, true),
            UiEvent::Uncheck { question, option } => self.set_checked(*question, option, false),
            UiEvent::Toggle { question, option } => self.toggle(*question, option),
            UiEvent::Input { question, text } => self.set_text(*question, text.clone()),
            UiEvent::Submit => Ok(()),
        }
    }

    /// Validates and, when every check passes, stops the clock and collects.
    ///
    /// A blocked submission leaves the page up with the failure message set
    /// and the clock still running.
    pub fn submit(&mut self) -> Result<TrialResult, SubmitError> {
        if self.state == TrialState::Complete {
            return Err(SubmitError::AlreadyComplete);
        }

        self.state = TrialState::Validating;
        let report = validate(&self.tree);
        if !report.is_valid() {
            let message = if report.has_missing() {
                self.tree.required_message().to_string()
            } else {
                PATTERN_MESSAGE.to_string()
            };
            tracing::info!(issues = report.issues.len(), "submission blocked");
            self.tree.set_fail_message(Some(message));
            self.state = TrialState::AwaitingSubmit;
            return Err(SubmitError::Invalid(report));
        }

        self.state = TrialState::Collecting;
        let elapsed = self.started.elapsed();
        let collection = collect(&self.tree);
        let encoded = collection
            .responses
            .to_json()
            .and_then(|responses| self.order.to_json().map(|order| (responses, order)));
        let (responses, question_order) = match encoded {
            Ok(encoded) => encoded,
            Err(err) => {
                self.state = TrialState::AwaitingSubmit;
                return Err(SubmitError::Encode(err));
            }
        };

        let result = TrialResult {
            rt: elapsed.as_secs_f64() * 1000.0,
            responses,
            question_order,
        };
        self.finished = Some(elapsed);
        self.tree.clear();
        self.state = TrialState::Complete;
        tracing::info!(
            rt = result.rt,
            answered = collection.answered_count(),
            "trial complete"
        );
        Ok(result)
    }

    /// Drives the trial from a stream of UI events until a submission is accepted.
    ///
    /// Awaiting the next event is the only suspension point. There is no
    /// timeout and no cancellation: dropping the future abandons the trial,
    /// and an exhausted stream resolves to [`TrialError::Abandoned`].
    pub async fn run<S>(mut self, mut events: S) -> Result<TrialResult, TrialError>
    where
        S: Stream<Item = UiEvent> + Unpin,
    {
        let mut last_report = None;
        while let Some(event) = events.next().await {
            if !matches!(event, UiEvent::Submit) {
                if let Err(error) = self.apply(&event) {
                    tracing::warn!(%error, ?event, "ignoring interaction");
                }
                continue;
            }
            match self.submit() {
                Ok(result) => return Ok(result),
                Err(SubmitError::Invalid(report)) => last_report = Some(report),
                Err(other) => return Err(TrialError::Submit(other)),
            }
        }
        tracing::warn!("event source closed while awaiting submission");
        Err(TrialError::Abandoned { last_report })
    }

    fn handle(&mut self, question: usize) -> Result<&mut WidgetHandle, InteractionError> {
        if self.state == TrialState::Complete {
            return Err(InteractionError::Closed);
        }
        self.tree.get_mut(question)
    }
}
