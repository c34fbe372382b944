use serde::Serialize;

use crate::widget::{Widget, WidgetHandle, WidgetTree};

/// Why a question blocks submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Required question without an answer.
    Missing,
    /// Text answer that does not match the question's pattern.
    PatternMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub original_index: usize,
    pub key: String,
    pub kind: IssueKind,
}

/// Outcome of checking the widget tree before a submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn missing(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues
            .iter()
            .filter(|issue| issue.kind == IssueKind::Missing)
    }

    pub fn has_missing(&self) -> bool {
        self.missing().next().is_some()
    }
}

/// Checks required answers and text patterns, in original question order.
pub fn validate(tree: &WidgetTree) -> ValidationReport {
    let mut issues = Vec::new();
    for handle in tree.in_original_order() {
        if let Some(kind) = check(handle) {
            issues.push(ValidationIssue {
                original_index: handle.original_index,
                key: handle.key.clone(),
                kind,
            });
        }
    }
    ValidationReport { issues }
}

fn check(handle: &WidgetHandle) -> Option<IssueKind> {
    match &handle.widget {
        // No checkbox is individually required, so the group is checked as a whole.
        Widget::MultiSelect(group) => {
            (handle.required && group.checked().is_empty()).then_some(IssueKind::Missing)
        }
        Widget::SingleSelect(_) | Widget::Dropdown(_) => {
            (handle.required && handle.current_value().is_empty()).then_some(IssueKind::Missing)
        }
        Widget::ShortText(field) | Widget::LongText(field) => {
            if handle.required && field.text().is_empty() {
                Some(IssueKind::Missing)
            } else if !field.matches_pattern() {
                Some(IssueKind::PatternMismatch)
            } else {
                None
            }
        }
    }
}
