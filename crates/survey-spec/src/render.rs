use handlebars::Handlebars;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::collect::collect;
use crate::widget::{Widget, WidgetHandle, WidgetTree};

/// Prefix shared by every id and class in the HTML view.
pub const HTML_PREFIX: &str = "advanced-survey";

const PAGE_TEMPLATE: &str = r#"<form id="{{prefix}}-form">
{{#if preamble}}  <div id="{{prefix}}-preamble" class="{{prefix}}-preamble">{{{preamble}}}</div>
{{/if}}{{#each questions}}  <div id="{{../prefix}}-{{index}}" data-index="{{index}}" data-name="{{name}}" class="{{../prefix}}-question">
    <p class="{{../prefix}}-prompt">{{{prompt}}}</p>
{{#if is_single}}{{#each options}}    <div class="{{../../prefix}}-option"><label class="{{../../prefix}}-text"><input type="radio" name="{{../input_name}}" value="{{value}}"{{#if checked}} checked{{/if}}{{#if ../required}} required{{/if}} {{{../attributes}}}>{{value}}</label></div>
{{/each}}{{/if}}{{#if is_multi}}{{#each options}}    <div class="{{../../prefix}}-option"><label class="{{../../prefix}}-text"><input type="checkbox" name="{{../input_name}}" value="{{value}}"{{#if checked}} checked{{/if}} {{{../attributes}}}>{{value}}</label></div>
{{/each}}{{/if}}{{#if is_dropdown}}    <select name="{{input_name}}"{{#if required}} required{{/if}} {{{attributes}}}>
      <option value=""{{#unless has_value}} selected{{/unless}}>{{placeholder}}</option>
{{#each options}}      <option value="{{value}}"{{#if checked}} selected{{/if}}>{{value}}</option>
{{/each}}    </select>
{{/if}}{{#if is_short}}    <input type="text" name="{{input_name}}" value="{{text}}" placeholder="{{placeholder}}" pattern="{{pattern}}"{{#if required}} required{{/if}} {{{attributes}}}>
{{/if}}{{#if is_long}}    <textarea name="{{input_name}}" placeholder="{{placeholder}}" pattern="{{pattern}}"{{#if required}} required{{/if}} {{{attributes}}}>{{text}}</textarea>
{{/if}}  </div>
{{/each}}  <div class="fail-message">{{fail_message}}</div>
  <button id="{{prefix}}-next" class="{{prefix}} jspsych-btn">{{button_label}}</button>
</form>
"#;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to render survey markup: {0}")]
    Template(#[from] handlebars::RenderError),
}

/// Progress counters shown alongside the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderProgress {
    pub answered: usize,
    pub total: usize,
}

pub fn progress(tree: &WidgetTree) -> RenderProgress {
    let collection = collect(tree);
    RenderProgress {
        answered: collection.answered_count(),
        total: tree.len(),
    }
}

/// Render the page as a structured JSON-friendly value.
pub fn render_json_ui(tree: &WidgetTree) -> Value {
    let progress = progress(tree);
    let questions = tree
        .handles()
        .iter()
        .map(question_json)
        .collect::<Vec<_>>();

    json!({
        "preamble": tree.preamble(),
        "questions": questions,
        "button_label": tree.button_label(),
        "fail_message": tree.fail_message(),
        "progress": {
            "answered": progress.answered,
            "total": progress.total,
        },
    })
}

fn question_json(handle: &WidgetHandle) -> Value {
    let mut map = Map::new();
    map.insert("original_index".into(), json!(handle.original_index));
    map.insert("position".into(), json!(handle.display_position));
    map.insert("key".into(), Value::String(handle.key.clone()));
    map.insert(
        "type".into(),
        Value::String(handle.widget.kind().as_str().to_string()),
    );
    map.insert("prompt".into(), Value::String(handle.prompt.clone()));
    map.insert("required".into(), Value::Bool(handle.required));
    if !handle.widget.options().is_empty() {
        map.insert("options".into(), json!(handle.widget.options()));
    }
    match &handle.widget {
        Widget::Dropdown(select) => {
            map.insert(
                "placeholder".into(),
                Value::String(select.placeholder().to_string()),
            );
        }
        Widget::ShortText(field) | Widget::LongText(field) => {
            map.insert(
                "placeholder".into(),
                Value::String(field.placeholder().to_string()),
            );
            map.insert("pattern".into(), Value::String(field.pattern().to_string()));
        }
        Widget::SingleSelect(_) | Widget::MultiSelect(_) => {}
    }
    if !handle.attributes.is_empty() {
        map.insert("attributes".into(), Value::String(handle.attributes.clone()));
    }
    map.insert("value".into(), json!(handle.current_value()));
    Value::Object(map)
}

/// Render the page as human-friendly text.
pub fn render_text(tree: &WidgetTree) -> String {
    let mut lines = Vec::new();
    if let Some(preamble) = tree.preamble() {
        lines.push(preamble.to_string());
        lines.push(String::new());
    }

    let total = tree.len();
    for handle in tree.handles() {
        let mut header = format!(
            "{}/{} {}",
            handle.display_position + 1,
            total,
            handle.prompt
        );
        if handle.required {
            header.push_str(" *");
        }
        lines.push(header);

        match &handle.widget {
            Widget::SingleSelect(group) => {
                let selected = group.selected();
                for option in group.options() {
                    let mark = if selected == Some(option.as_str()) { "(x)" } else { "( )" };
                    lines.push(format!("  {mark} {option}"));
                }
            }
            Widget::MultiSelect(group) => {
                for (position, option) in group.options().iter().enumerate() {
                    let mark = if group.is_checked(position) { "[x]" } else { "[ ]" };
                    lines.push(format!("  {mark} {option}"));
                }
            }
            Widget::Dropdown(select) => {
                let shown = select.selected().unwrap_or(select.placeholder());
                lines.push(format!("  <{}> ({})", shown, select.options().join("/")));
            }
            Widget::ShortText(field) | Widget::LongText(field) => {
                if field.text().is_empty() {
                    lines.push(format!("  > {}", field.placeholder()));
                } else {
                    lines.push(format!("  > {}", field.text()));
                }
            }
        }
    }

    if let Some(message) = tree.fail_message() {
        lines.push(String::new());
        lines.push(format!("! {message}"));
    }
    let progress = progress(tree);
    lines.push(String::new());
    lines.push(format!(
        "[{}] ({}/{} answered)",
        tree.button_label(),
        progress.answered,
        progress.total
    ));

    lines.join("\n")
}

/// Render the page as an HTML form fragment.
///
/// Preamble, prompts and extra attributes are raw markup; option text and
/// typed values are escaped. `data-name` is the configured name and stays
/// empty for unnamed questions; `data-index` identifies every question.
pub fn render_html(tree: &WidgetTree) -> Result<String, RenderError> {
    let questions = tree
        .handles()
        .iter()
        .map(|handle| {
            let widget = &handle.widget;
            let value = handle.current_value();
            let options = widget
                .options()
                .iter()
                .map(|option| {
                    json!({
                        "value": option,
                        "checked": value.contains(option),
                    })
                })
                .collect::<Vec<_>>();
            let (placeholder, pattern, text) = match widget {
                Widget::Dropdown(select) => (select.placeholder(), "", ""),
                Widget::ShortText(field) | Widget::LongText(field) => {
                    (field.placeholder(), field.pattern(), field.text())
                }
                Widget::SingleSelect(_) | Widget::MultiSelect(_) => ("", "", ""),
            };
            json!({
                "index": handle.original_index,
                "name": handle.name,
                "input_name": format!("{HTML_PREFIX}-response-{}", handle.original_index),
                "prompt": handle.prompt,
                "required": handle.required,
                "attributes": handle.attributes,
                "is_single": matches!(widget, Widget::SingleSelect(_)),
                "is_multi": matches!(widget, Widget::MultiSelect(_)),
                "is_dropdown": matches!(widget, Widget::Dropdown(_)),
                "is_short": matches!(widget, Widget::ShortText(_)),
                "is_long": matches!(widget, Widget::LongText(_)),
                "options": options,
                "has_value": !value.is_empty(),
                "placeholder": placeholder,
                "pattern": pattern,
                "text": text,
            })
        })
        .collect::<Vec<_>>();

    let data = json!({
        "prefix": HTML_PREFIX,
        "preamble": tree.preamble(),
        "questions": questions,
        "fail_message": tree.fail_message().unwrap_or_default(),
        "button_label": tree.button_label(),
    });

    let registry = Handlebars::new();
    Ok(registry.render_template(PAGE_TEMPLATE, &data)?)
}
