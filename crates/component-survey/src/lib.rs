use futures::{executor::block_on, stream};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::{Value, json};
use thiserror::Error;

use survey_spec::{
    ConfigError, RenderError, SubmitError, Trial, TrialController, TrialError,
    UiEvent, config_schema as spec_config_schema, render_html as spec_render_html,
    render_json_ui as spec_render_json_ui, render_text as spec_render_text,
};

const DEFAULT_CONFIG: &str = include_str!("../../survey-spec/tests/fixtures/demographics.json");

#[derive(Debug, Error)]
enum ComponentError {
    #[error("invalid trial configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to parse events: {0}")]
    EventsParse(#[source] serde_json::Error),
    #[error("json encode error: {0}")]
    JsonEncode(#[source] serde_json::Error),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

fn load_controller(config_json: &str) -> Result<TrialController, ComponentError> {
    let config_json = if config_json.trim().is_empty() {
        DEFAULT_CONFIG
    } else {
        config_json
    };
    Ok(TrialController::from_json(config_json)?)
}

fn render_trial(config_json: &str, seed: Option<u64>) -> Result<Trial, ComponentError> {
    let controller = load_controller(config_json)?;
    let trial = match seed {
        Some(seed) => controller.render(&mut SmallRng::seed_from_u64(seed)),
        None => controller.render(&mut rand::rng()),
    };
    Ok(trial)
}

fn respond(result: Result<Value, ComponentError>) -> String {
    match result {
        Ok(value) => serde_json::to_string(&value).unwrap_or_else(|error| {
            json!({"error": format!("json encode: {}", error)}).to_string()
        }),
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

fn respond_string(result: Result<String, ComponentError>) -> String {
    match result {
        Ok(value) => value,
        Err(err) => json!({ "error": err.to_string() }).to_string(),
    }
}

/// The configuration with every default filled in.
pub fn describe(config_json: &str) -> String {
    respond(load_controller(config_json).and_then(|controller| {
        serde_json::to_value(controller.config()).map_err(ComponentError::JsonEncode)
    }))
}

pub fn config_schema() -> String {
    respond(spec_config_schema().map_err(ComponentError::JsonEncode))
}

pub fn validate_config(config_json: &str) -> String {
    let outcome = match load_controller(config_json) {
        Ok(_) => json!({ "valid": true }),
        Err(err) => json!({ "valid": false, "error": err.to_string() }),
    };
    respond(Ok(outcome))
}

pub fn render_json_ui(config_json: &str, seed: Option<u64>) -> String {
    respond(render_trial(config_json, seed).map(|trial| spec_render_json_ui(trial.tree())))
}

pub fn render_text(config_json: &str, seed: Option<u64>) -> String {
    respond_string(render_trial(config_json, seed).map(|trial| spec_render_text(trial.tree())))
}

pub fn render_html(config_json: &str, seed: Option<u64>) -> String {
    respond_string(
        render_trial(config_json, seed)
            .and_then(|trial| spec_render_html(trial.tree()).map_err(ComponentError::from)),
    )
}

/// Replays a scripted list of UI events against a freshly rendered trial.
pub fn run_events(config_json: &str, events_json: &str, seed: Option<u64>) -> String {
    respond(render_trial(config_json, seed).and_then(|trial| {
        let events: Vec<UiEvent> =
            serde_json::from_str(events_json).map_err(ComponentError::EventsParse)?;
        let order = trial.order().clone();
        match block_on(trial.run(stream::iter(events))) {
            Ok(result) => Ok(json!({
                "status": "complete",
                "trial_data": serde_json::to_value(&result).map_err(ComponentError::JsonEncode)?,
            })),
            Err(TrialError::Abandoned { last_report }) => {
                tracing::debug!("scripted events ended without an accepted submission");
                Ok(json!({
                    "status": "incomplete",
                    "question_order": order.as_slice(),
                    "validation": serde_json::to_value(&last_report)
                        .map_err(ComponentError::JsonEncode)?,
                }))
            }
            Err(TrialError::Submit(err)) => Err(err.into()),
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn describe_fills_defaults() {
        let payload = describe("");
        let config: Value = serde_json::from_str(&payload).expect("valid json");
        assert_eq!(config["button_label"], "Continue");
        assert_eq!(config["questions"][2]["placeholder"], "Please select or enter an answer");
    }

    #[test]
    fn schema_is_json() {
        let schema: Value = serde_json::from_str(&config_schema()).expect("json");
        assert!(schema["properties"]["questions"].is_object());
    }

    #[test]
    fn validate_config_reports_problems() {
        let bad = json!({
            "questions": [{ "type": "dropdown", "prompt": "empty" }]
        });
        let parsed: Value = serde_json::from_str(&validate_config(&bad.to_string())).unwrap();
        assert_eq!(parsed["valid"], false);
        assert!(parsed["error"].as_str().unwrap().contains("without options"));

        let unknown = json!({ "questions": [{ "type": "slider", "prompt": "?" }] });
        let parsed: Value = serde_json::from_str(&validate_config(&unknown.to_string())).unwrap();
        assert_eq!(parsed["valid"], false);

        let parsed: Value = serde_json::from_str(&validate_config(DEFAULT_CONFIG)).unwrap();
        assert_eq!(parsed["valid"], true);
    }

    #[test]
    fn validate_config_uses_default_for_empty_input() {
        let parsed: Value = serde_json::from_str(&validate_config("  ")).unwrap();
        assert_eq!(parsed, json!({ "valid": true }));
    }

    #[test]
    fn render_json_ui_uses_seed() {
        let config = json!({
            "randomize_question_order": true,
            "questions": [
                { "type": "short-text", "prompt": "a" },
                { "type": "short-text", "prompt": "b" },
                { "type": "short-text", "prompt": "c" },
                { "type": "short-text", "prompt": "d" }
            ]
        })
        .to_string();
        let first = render_json_ui(&config, Some(42));
        let second = render_json_ui(&config, Some(42));
        assert_eq!(first, second);
        let ui: Value = serde_json::from_str(&first).unwrap();
        assert_eq!(ui["questions"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn render_errors_are_reported_as_json() {
        let bad = json!({ "questions": [{ "type": "select", "prompt": "?" }] });
        let text = render_text(&bad.to_string(), None);
        let parsed: Value = serde_json::from_str(&text).expect("error json");
        assert!(parsed["error"].as_str().unwrap().contains("without options"));
    }

    #[test]
    fn run_events_completes_survey_without_questions() {
        let events = json!([{ "event": "submit" }]);
        let output = run_events("{\"questions\": []}", &events.to_string(), None);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["status"], "complete");
        assert_eq!(parsed["trial_data"]["responses"], "{}");
        assert_eq!(parsed["trial_data"]["question_order"], "[]");
    }

    #[test]
    fn run_events_completes_trial() {
        let events = json!([
            { "event": "input", "question": 0, "text": "30" },
            { "event": "select", "question": 2, "option": "yes" },
            { "event": "submit" }
        ]);
        let output = run_events("", &events.to_string(), Some(1));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["status"], "complete");
        let responses: Value =
            serde_json::from_str(parsed["trial_data"]["responses"].as_str().unwrap()).unwrap();
        assert_eq!(responses, json!({ "age": ["30"], "colors": [], "Q2": ["yes"] }));
        assert_eq!(parsed["trial_data"]["question_order"], "[0,1,2]");
    }

    #[test]
    fn run_events_reports_incomplete_trial() {
        let events = json!([{ "event": "submit" }]);
        let output = run_events("", &events.to_string(), Some(1));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["status"], "incomplete");
        let issues = parsed["validation"]["issues"].as_array().unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0]["kind"], "missing");
    }

    #[test]
    fn run_events_rejects_malformed_script() {
        let output = run_events("", "[{\"event\": \"teleport\"}]", None);
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert!(parsed["error"].as_str().unwrap().starts_with("failed to parse events"));
    }
}
