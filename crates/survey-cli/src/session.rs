use std::fmt::Write;

use survey_spec::{
    InteractionError, QuestionType, Trial, TrialResult, ValidationReport, Widget, WidgetHandle,
    WidgetTree,
};

/// Controls which bits of state the session prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: question prompts only.
    Clean,
    /// Verbose output: options with numbers, progress, issue details.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// How the final trial record is printed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ResultFormat {
    Json,
    Cbor,
}

/// Prints the page, prompts and the final record for a text session.
pub struct SessionPresenter {
    verbosity: Verbosity,
    header_printed: bool,
}

impl SessionPresenter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            header_printed: false,
        }
    }

    pub fn show_header(&mut self, tree: &WidgetTree) {
        if self.header_printed {
            return;
        }
        if let Some(preamble) = tree.preamble() {
            println!("{}", preamble);
        }
        if self.verbosity.is_verbose() {
            println!("Questions: {}", tree.len());
        }
        self.header_printed = true;
    }

    pub fn show_prompt(&self, prompt: &PromptContext) {
        let mut line = format!("{}/{} {}", prompt.position + 1, prompt.total, prompt.prompt);
        if prompt.required {
            line.push_str(" *");
        }
        if let Some(hint) = prompt.hint() {
            line.push(' ');
            line.push_str(&hint);
        }
        println!("{}", line);
        if self.verbosity.is_verbose() {
            for (number, option) in prompt.options.iter().enumerate() {
                println!("  {}. {}", number + 1, option);
            }
        }
    }

    pub fn show_parse_error(&self, error: &AnswerParseError) {
        eprintln!("Invalid answer: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_blocked(&self, tree: &WidgetTree, report: &ValidationReport) {
        if let Some(message) = tree.fail_message() {
            println!("{}", message);
        }
        if self.verbosity.is_verbose() {
            for issue in &report.issues {
                println!(" - {} ({:?})", issue.key, issue.kind);
            }
        }
    }

    pub fn show_completion(
        &self,
        result: &TrialResult,
        format: ResultFormat,
    ) -> Result<(), Box<dyn std::error::Error>> {
        println!("Done ✅");
        match format {
            ResultFormat::Json => println!("{}", result.to_json_pretty()?),
            ResultFormat::Cbor => println!("{}", encode_hex(&result.to_cbor()?)),
        }
        Ok(())
    }
}

/// Context used to prompt for one question.
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub original_index: usize,
    pub position: usize,
    pub total: usize,
    pub prompt: String,
    pub required: bool,
    pub kind: QuestionType,
    pub options: Vec<String>,
    pub placeholder: Option<String>,
}

impl PromptContext {
    pub fn new(handle: &WidgetHandle, total: usize) -> Self {
        let placeholder = match &handle.widget {
            Widget::ShortText(field) | Widget::LongText(field) => {
                Some(field.placeholder().to_string())
            }
            Widget::Dropdown(select) => Some(select.placeholder().to_string()),
            Widget::SingleSelect(_) | Widget::MultiSelect(_) => None,
        };
        Self {
            original_index: handle.original_index,
            position: handle.display_position,
            total,
            prompt: handle.prompt.clone(),
            required: handle.required,
            kind: handle.widget.kind(),
            options: handle.widget.options().to_vec(),
            placeholder,
        }
    }

    fn hint(&self) -> Option<String> {
        match self.kind {
            QuestionType::SingleSelect | QuestionType::Dropdown => {
                Some(format!("({})", self.options.join("/")))
            }
            QuestionType::MultiSelect => Some(format!(
                "(comma-separated: {})",
                self.options.join(", ")
            )),
            QuestionType::ShortText => self.placeholder.as_ref().map(|text| format!("[{text}]")),
            QuestionType::LongText => Some("(finish with an empty line)".to_string()),
        }
    }
}

/// A parsed answer, ready to apply to one widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Choice(Option<String>),
    Checked(Vec<String>),
    Text(String),
}

/// Error produced when parsing answers from the user.
#[derive(Debug)]
pub struct AnswerParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl AnswerParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Options can be given by text (case-insensitive) or 1-based number.
pub fn parse_answer(prompt: &PromptContext, raw: &str) -> Result<Answer, AnswerParseError> {
    match prompt.kind {
        QuestionType::SingleSelect | QuestionType::Dropdown => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(Answer::Choice(None));
            }
            resolve_option(&prompt.options, raw).map(|option| Answer::Choice(Some(option)))
        }
        QuestionType::MultiSelect => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| resolve_option(&prompt.options, part))
            .collect::<Result<Vec<_>, _>>()
            .map(Answer::Checked),
        QuestionType::ShortText | QuestionType::LongText => {
            Ok(Answer::Text(raw.trim().to_string()))
        }
    }
}

fn resolve_option(options: &[String], raw: &str) -> Result<String, AnswerParseError> {
    if let Ok(number) = raw.parse::<usize>()
        && let Some(option) = number.checked_sub(1).and_then(|index| options.get(index))
    {
        return Ok(option.clone());
    }
    options
        .iter()
        .find(|option| option.eq_ignore_ascii_case(raw))
        .cloned()
        .ok_or_else(|| {
            AnswerParseError::new(
                format!("Choose one of: {}.", options.join(", ")),
                Some(format!("'{}' is not an option or option number", raw)),
            )
        })
}

/// Replaces the widget's state with the parsed answer.
pub fn apply_answer(
    trial: &mut Trial,
    original_index: usize,
    options: &[String],
    answer: &Answer,
) -> Result<(), InteractionError> {
    match answer {
        Answer::Choice(Some(option)) => trial.select(original_index, option),
        Answer::Choice(None) => trial.clear(original_index),
        Answer::Checked(checked) => {
            for option in options {
                trial.set_checked(original_index, option, checked.contains(option))?;
            }
            Ok(())
        }
        Answer::Text(text) => trial.set_text(original_index, text.clone()),
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
