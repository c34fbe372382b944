use regex::Regex;
use thiserror::Error;

use crate::order::DisplayOrder;
use crate::spec::{QuestionSpec, QuestionType, TrialConfig};

/// Errors raised when an interaction cannot be applied to the widget tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InteractionError {
    #[error("no question with original index {0}")]
    UnknownQuestion(usize),
    #[error("question {index} has no option '{option}'")]
    UnknownOption { index: usize, option: String },
    #[error("question {index} is a {actual} question, expected {expected}")]
    WrongWidget {
        index: usize,
        expected: &'static str,
        actual: QuestionType,
    },
    #[error("trial is already complete")]
    Closed,
}

/// Errors raised when a widget tree cannot be laid out.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("display order {order:?} is not a permutation of {questions} question(s)")]
    Order { questions: usize, order: Vec<usize> },
    #[error("question {index} has an invalid pattern: {source}")]
    Pattern {
        index: usize,
        #[source]
        source: regex::Error,
    },
}

/// Radio group: at most one option selected.
#[derive(Debug, Clone)]
pub struct ChoiceGroup {
    options: Vec<String>,
    selected: Option<usize>,
}

impl ChoiceGroup {
    fn new(options: &[String]) -> Self {
        Self {
            options: options.to_vec(),
            selected: None,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.options.get(index))
            .map(String::as_str)
    }

    fn select(&mut self, option: &str) -> bool {
        match self.options.iter().position(|candidate| candidate == option) {
            Some(index) => {
                self.selected = Some(index);
                true
            }
            None => false,
        }
    }
}

/// Select box whose initial entry is a non-selectable placeholder.
#[derive(Debug, Clone)]
pub struct SelectBox {
    placeholder: String,
    choices: ChoiceGroup,
}

impl SelectBox {
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn options(&self) -> &[String] {
        self.choices.options()
    }

    /// `None` while the placeholder entry is showing.
    pub fn selected(&self) -> Option<&str> {
        self.choices.selected()
    }
}

/// Independent checkboxes, one per option.
#[derive(Debug, Clone)]
pub struct CheckboxGroup {
    options: Vec<String>,
    checked: Vec<bool>,
}

impl CheckboxGroup {
    fn new(options: &[String]) -> Self {
        Self {
            options: options.to_vec(),
            checked: vec![false; options.len()],
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_checked(&self, position: usize) -> bool {
        self.checked.get(position).copied().unwrap_or(false)
    }

    /// Checked options in declaration order.
    pub fn checked(&self) -> Vec<String> {
        self.options
            .iter()
            .zip(&self.checked)
            .filter(|(_, checked)| **checked)
            .map(|(option, _)| option.clone())
            .collect()
    }

    fn slot(&mut self, option: &str) -> Option<&mut bool> {
        let position = self.options.iter().position(|candidate| candidate == option)?;
        self.checked.get_mut(position)
    }
}

/// Free-text control with its native constraints.
#[derive(Debug, Clone)]
pub struct TextField {
    text: String,
    placeholder: String,
    pattern_source: String,
    pattern: Regex,
}

impl TextField {
    fn new(spec: &QuestionSpec) -> Result<Self, regex::Error> {
        Ok(Self {
            text: String::new(),
            placeholder: spec.placeholder.clone(),
            pattern_source: spec.pattern.clone(),
            pattern: spec.compiled_pattern()?,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn pattern(&self) -> &str {
        &self.pattern_source
    }

    /// Empty text always satisfies the pattern; emptiness is the required check's job.
    pub fn matches_pattern(&self) -> bool {
        self.text.is_empty() || self.pattern.is_match(&self.text)
    }
}

/// Interactive control for one question.
#[derive(Debug, Clone)]
pub enum Widget {
    SingleSelect(ChoiceGroup),
    MultiSelect(CheckboxGroup),
    Dropdown(SelectBox),
    ShortText(TextField),
    LongText(TextField),
}

impl Widget {
    /// Fails only when a text question's pattern does not compile.
    pub fn build(spec: &QuestionSpec) -> Result<Self, regex::Error> {
        let widget = match spec.kind {
            QuestionType::SingleSelect => Widget::SingleSelect(ChoiceGroup::new(&spec.options)),
            QuestionType::MultiSelect => Widget::MultiSelect(CheckboxGroup::new(&spec.options)),
            QuestionType::Dropdown => Widget::Dropdown(SelectBox {
                placeholder: spec.placeholder.clone(),
                choices: ChoiceGroup::new(&spec.options),
            }),
            QuestionType::ShortText => Widget::ShortText(TextField::new(spec)?),
            QuestionType::LongText => Widget::LongText(TextField::new(spec)?),
        };
        Ok(widget)
    }

    pub fn kind(&self) -> QuestionType {
        match self {
            Widget::SingleSelect(_) => QuestionType::SingleSelect,
            Widget::MultiSelect(_) => QuestionType::MultiSelect,
            Widget::Dropdown(_) => QuestionType::Dropdown,
            Widget::ShortText(_) => QuestionType::ShortText,
            Widget::LongText(_) => QuestionType::LongText,
        }
    }

    /// Current answer; empty when nothing is selected, checked or typed.
    pub fn current_value(&self) -> Vec<String> {
        match self {
            Widget::SingleSelect(group) => group.selected().map(str::to_string).into_iter().collect(),
            Widget::Dropdown(select) => select.selected().map(str::to_string).into_iter().collect(),
            Widget::MultiSelect(group) => group.checked(),
            Widget::ShortText(field) | Widget::LongText(field) => {
                if field.text.is_empty() {
                    Vec::new()
                } else {
                    vec![field.text.clone()]
                }
            }
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            Widget::SingleSelect(group) => group.options(),
            Widget::MultiSelect(group) => group.options(),
            Widget::Dropdown(select) => select.options(),
            Widget::ShortText(_) | Widget::LongText(_) => &[],
        }
    }
}

/// A rendered question: its widget plus the identity it is keyed by.
#[derive(Debug, Clone)]
pub struct WidgetHandle {
    pub original_index: usize,
    pub display_position: usize,
    pub key: String,
    /// Configured name, empty when the key is synthetic.
    pub name: String,
    pub prompt: String,
    pub required: bool,
    pub attributes: String,
    pub widget: Widget,
}

impl WidgetHandle {
    pub fn build(
        spec: &QuestionSpec,
        original_index: usize,
        display_position: usize,
    ) -> Result<Self, regex::Error> {
        Ok(Self::assemble(
            spec,
            original_index,
            display_position,
            Widget::build(spec)?,
        ))
    }

    fn assemble(
        spec: &QuestionSpec,
        original_index: usize,
        display_position: usize,
        widget: Widget,
    ) -> Self {
        Self {
            original_index,
            display_position,
            key: spec.key(original_index),
            name: spec.name.clone(),
            prompt: spec.prompt.clone(),
            required: spec.required,
            attributes: spec.attributes.clone(),
            widget,
        }
    }

    pub fn current_value(&self) -> Vec<String> {
        self.widget.current_value()
    }

    /// Picks one option of a single-select or dropdown question.
    pub fn select(&mut self, option: &str) -> Result<(), InteractionError> {
        let index = self.original_index;
        let group = match &mut self.widget {
            Widget::SingleSelect(group) => group,
            Widget::Dropdown(select) => &mut select.choices,
            other => return Err(wrong_widget(index, "single-select or dropdown", other)),
        };
        if group.select(option) {
            Ok(())
        } else {
            Err(InteractionError::UnknownOption {
                index,
                option: option.to_string(),
            })
        }
    }

    /// Returns a single-select to no selection, or a dropdown to its placeholder.
    pub fn clear(&mut self) -> Result<(), InteractionError> {
        match &mut self.widget {
            Widget::SingleSelect(group) => group.selected = None,
            Widget::Dropdown(select) => select.choices.selected = None,
            other => {
                return Err(wrong_widget(
                    self.original_index,
                    "single-select or dropdown",
                    other,
                ));
            }
        }
        Ok(())
    }

    pub fn set_checked(&mut self, option: &str, checked: bool) -> Result<(), InteractionError> {
        let slot = self.checkbox(option)?;
        *slot = checked;
        Ok(())
    }

    pub fn toggle(&mut self, option: &str) -> Result<(), InteractionError> {
        let slot = self.checkbox(option)?;
        *slot = !*slot;
        Ok(())
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), InteractionError> {
        match &mut self.widget {
            Widget::ShortText(field) | Widget::LongText(field) => {
                field.text = text.into();
                Ok(())
            }
            other => Err(wrong_widget(self.original_index, "text", other)),
        }
    }

    fn checkbox(&mut self, option: &str) -> Result<&mut bool, InteractionError> {
        let index = self.original_index;
        match &mut self.widget {
            Widget::MultiSelect(group) => {
                group
                    .slot(option)
                    .ok_or_else(|| InteractionError::UnknownOption {
                        index,
                        option: option.to_string(),
                    })
            }
            other => Err(wrong_widget(index, "multi-select", other)),
        }
    }
}

fn wrong_widget(index: usize, expected: &'static str, actual: &Widget) -> InteractionError {
    InteractionError::WrongWidget {
        index,
        expected,
        actual: actual.kind(),
    }
}

/// Everything shown on the trial page, owned by one trial.
#[derive(Debug, Clone)]
pub struct WidgetTree {
    preamble: Option<String>,
    handles: Vec<WidgetHandle>,
    positions: Vec<Option<usize>>,
    button_label: String,
    required_message: String,
    fail_message: Option<String>,
}

impl WidgetTree {
    /// Builds one handle per question, laid out in `order`.
    ///
    /// `order` must place every question exactly once.
    pub fn build(config: &TrialConfig, order: &DisplayOrder) -> Result<Self, LayoutError> {
        let questions = config.questions.len();
        if order.len() != questions || !order.is_permutation() {
            return Err(LayoutError::Order {
                questions,
                order: order.as_slice().to_vec(),
            });
        }
        let widgets = config
            .questions
            .iter()
            .enumerate()
            .map(|(index, spec)| {
                Widget::build(spec).map_err(|source| LayoutError::Pattern { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::arrange(config, widgets, order))
    }

    /// Lays out prebuilt widgets, indexed by original index, in `order`.
    /// Callers guarantee `order` is a permutation of the widget indices.
    pub(crate) fn arrange(config: &TrialConfig, widgets: Vec<Widget>, order: &DisplayOrder) -> Self {
        let mut slots = widgets.into_iter().map(Some).collect::<Vec<_>>();
        let mut positions = vec![None; slots.len()];
        let mut handles = Vec::with_capacity(slots.len());
        for (position, &original_index) in order.as_slice().iter().enumerate() {
            let spec = config.questions.get(original_index);
            let widget = slots.get_mut(original_index).and_then(Option::take);
            if let (Some(spec), Some(widget)) = (spec, widget) {
                positions[original_index] = Some(position);
                handles.push(WidgetHandle::assemble(spec, original_index, position, widget));
            }
        }
        debug_assert_eq!(handles.len(), positions.len());

        Self {
            preamble: config.preamble.clone(),
            handles,
            positions,
            button_label: config.button_label.clone(),
            required_message: config.required_message.clone(),
            fail_message: None,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Handles in display order.
    pub fn handles(&self) -> &[WidgetHandle] {
        &self.handles
    }

    /// Handle for the question at `original_index`.
    pub fn get(&self, original_index: usize) -> Option<&WidgetHandle> {
        let position = (*self.positions.get(original_index)?)?;
        self.handles.get(position)
    }

    pub fn get_mut(&mut self, original_index: usize) -> Result<&mut WidgetHandle, InteractionError> {
        self.positions
            .get(original_index)
            .copied()
            .flatten()
            .and_then(|position| self.handles.get_mut(position))
            .ok_or(InteractionError::UnknownQuestion(original_index))
    }

    /// Handles in original question order.
    pub fn in_original_order(&self) -> impl Iterator<Item = &WidgetHandle> {
        self.positions
            .iter()
            .filter_map(|position| position.and_then(|position| self.handles.get(position)))
    }

    pub fn preamble(&self) -> Option<&str> {
        self.preamble.as_deref()
    }

    pub fn button_label(&self) -> &str {
        &self.button_label
    }

    pub fn required_message(&self) -> &str {
        &self.required_message
    }

    /// Message left on the page by the last blocked submission.
    pub fn fail_message(&self) -> Option<&str> {
        self.fail_message.as_deref()
    }

    pub(crate) fn set_fail_message(&mut self, message: Option<String>) {
        self.fail_message = message;
    }

    /// Tears the page down once the trial has produced its result.
    pub(crate) fn clear(&mut self) {
        self.preamble = None;
        self.handles.clear();
        self.positions.clear();
        self.fail_message = None;
    }
}
