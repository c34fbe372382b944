use std::thread;
use std::time::Duration;

use futures::executor::block_on;
use futures::stream;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::{Value, json};

use survey_spec::{
    DisplayOrder, InteractionError, LayoutError, QuestionSpec, QuestionType, SubmitError,
    TrialConfig, TrialController, TrialError, TrialResult, TrialState, UiEvent, WidgetTree,
    collect,
};

fn fixture(name: &str) -> &'static str {
    match name {
        "demographics" => include_str!("../tests/fixtures/demographics.json"),
        "full_page" => include_str!("../tests/fixtures/full_page.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn controller(name: &str) -> TrialController {
    TrialController::from_json(fixture(name)).expect("fixture config")
}

fn responses(result: &TrialResult) -> Value {
    serde_json::from_str(&result.responses).expect("responses json")
}

#[test]
fn collects_the_documented_example() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    assert_eq!(trial.state(), TrialState::AwaitingSubmit);

    trial.set_text(0, "30").unwrap();
    trial.select(2, "yes").unwrap();
    let result = trial.submit().expect("valid submission");

    assert_eq!(
        responses(&result),
        json!({ "age": ["30"], "colors": [], "Q2": ["yes"] })
    );
    assert_eq!(result.question_order, "[0,1,2]");
    assert!(result.rt >= 0.0);
    assert_eq!(trial.state(), TrialState::Complete);
}

#[test]
fn response_keys_follow_original_order() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    trial.set_text(0, "41").unwrap();
    trial.select(2, "no").unwrap();
    let record = trial.submit().unwrap().response_record().unwrap();
    let keys: Vec<_> = record.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(keys, vec!["age", "colors", "Q2"]);
}

fn answer_full_page(trial: &mut survey_spec::Trial) {
    trial.select(0, "right").unwrap();
    trial.set_checked(1, "French", true).unwrap();
    trial.set_checked(1, "English", true).unwrap();
    trial.select(2, "master").unwrap();
    trial.set_text(3, "Austria").unwrap();
    trial.set_text(4, "none").unwrap();
}

#[test]
fn responses_do_not_depend_on_display_order() {
    let expected = json!({
        "hand": ["right"],
        "languages": ["English", "French"],
        "Q2": ["master"],
        "Q3": ["Austria"],
        "comments": ["none"],
    });

    let controller = controller("full_page");
    let mut orders = Vec::new();
    for seed in 0..24 {
        let mut trial = controller.render(&mut SmallRng::seed_from_u64(seed));
        assert!(trial.order().is_permutation());
        orders.push(trial.order().clone());

        answer_full_page(&mut trial);
        let result = trial.submit().expect("submits");
        assert_eq!(responses(&result), expected, "seed {seed}");
        assert_eq!(&result.display_order().unwrap(), orders.last().unwrap());
    }
    orders.sort_by(|a, b| a.as_slice().cmp(b.as_slice()));
    orders.dedup();
    assert!(orders.len() > 1, "shuffling never changed the order");
}

#[test]
fn handles_keep_original_index_at_shuffled_positions() {
    let trial = controller("full_page").render(&mut SmallRng::seed_from_u64(11));
    for (position, handle) in trial.tree().handles().iter().enumerate() {
        assert_eq!(handle.display_position, position);
        assert_eq!(trial.order().as_slice()[position], handle.original_index);
        let same = trial.tree().get(handle.original_index).unwrap();
        assert_eq!(same.key, handle.key);
    }
    assert_eq!(
        trial.tree().get(1).unwrap().widget.kind(),
        QuestionType::MultiSelect
    );
}

#[test]
fn multi_select_reports_checked_options_in_declared_order() {
    let config = TrialConfig::from_value(json!({
        "questions": [{ "type": "multi-select", "prompt": "p", "options": ["a", "b", "c"] }]
    }))
    .unwrap();
    let controller = TrialController::new(config).unwrap();
    let options = ["a", "b", "c"];

    for mask in 0u8..8 {
        let mut trial = controller.render(&mut SmallRng::seed_from_u64(0));
        // Check in reverse so declaration order, not click order, is what shows.
        for (bit, option) in options.iter().enumerate().rev() {
            if mask & (1 << bit) != 0 {
                trial.set_checked(0, option, true).unwrap();
            }
        }
        let expected: Vec<_> = options
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, option)| option.to_string())
            .collect();
        assert_eq!(trial.tree().get(0).unwrap().current_value(), expected);
    }
}

#[test]
fn blocked_submission_keeps_the_trial_open() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    let SubmitError::Invalid(report) = trial.submit().unwrap_err() else {
        panic!("expected validation failure");
    };
    let keys: Vec<_> = report.missing().map(|issue| issue.key.as_str()).collect();
    assert_eq!(keys, vec!["age", "Q2"]);
    assert_eq!(trial.state(), TrialState::AwaitingSubmit);
    assert_eq!(trial.tree().len(), 3);

    thread::sleep(Duration::from_millis(5));
    assert!(trial.elapsed() >= Duration::from_millis(5));

    trial.set_text(0, "30").unwrap();
    trial.select(2, "yes").unwrap();
    let result = trial.submit().unwrap();
    assert!(result.rt >= 5.0);
    assert_eq!(trial.tree().fail_message(), None);
}

#[test]
fn result_is_emitted_exactly_once() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    trial.set_text(0, "30").unwrap();
    trial.select(2, "yes").unwrap();
    trial.submit().unwrap();

    assert!(matches!(trial.submit(), Err(SubmitError::AlreadyComplete)));
    assert_eq!(trial.set_text(0, "31"), Err(InteractionError::Closed));
    assert!(trial.tree().is_empty());

    let frozen = trial.elapsed();
    thread::sleep(Duration::from_millis(2));
    assert_eq!(trial.elapsed(), frozen);
}

#[test]
fn rt_reflects_time_until_submission() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    trial.set_text(0, "30").unwrap();
    trial.select(2, "yes").unwrap();
    thread::sleep(Duration::from_millis(20));
    let result = trial.submit().unwrap();
    assert!(result.rt >= 20.0, "rt was {}", result.rt);
}

#[test]
fn interactions_are_checked_against_the_widget() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    assert_eq!(
        trial.select(2, "maybe"),
        Err(InteractionError::UnknownOption {
            index: 2,
            option: "maybe".into()
        })
    );
    assert!(matches!(
        trial.set_text(1, "red"),
        Err(InteractionError::WrongWidget { index: 1, .. })
    ));
    assert_eq!(trial.toggle(9, "red"), Err(InteractionError::UnknownQuestion(9)));
}

#[test]
fn run_resolves_on_first_valid_submission() {
    let events: Vec<UiEvent> = serde_json::from_value(json!([
        { "event": "submit" },
        { "event": "input", "question": 0, "text": "30" },
        { "event": "select", "question": 2, "option": "nope" },
        { "event": "select", "question": 2, "option": "yes" },
        { "event": "check", "question": 1, "option": "blue" },
        { "event": "submit" },
        { "event": "uncheck", "question": 1, "option": "blue" }
    ]))
    .expect("events");

    let trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    let result = block_on(trial.run(stream::iter(events))).expect("completes");
    assert_eq!(
        responses(&result),
        json!({ "age": ["30"], "colors": ["blue"], "Q2": ["yes"] })
    );
}

#[test]
fn run_reports_abandoned_trial() {
    let events = vec![
        UiEvent::Input {
            question: 0,
            text: "30".into(),
        },
        UiEvent::Submit,
    ];
    let trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    match block_on(trial.run(stream::iter(events))) {
        Err(TrialError::Abandoned { last_report }) => {
            let report = last_report.expect("one blocked submission");
            assert_eq!(report.issues.len(), 1);
            assert_eq!(report.issues[0].key, "Q2");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn run_waits_on_channel_events() {
    let (tx, rx) = futures::channel::mpsc::unbounded();
    tx.unbounded_send(UiEvent::Input {
        question: 0,
        text: "52".into(),
    })
    .unwrap();
    tx.unbounded_send(UiEvent::Select {
        question: 2,
        option: "no".into(),
    })
    .unwrap();
    tx.unbounded_send(UiEvent::Submit).unwrap();

    let trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    let result = block_on(trial.run(rx)).expect("completes");
    assert_eq!(responses(&result)["Q2"], json!(["no"]));
}

#[test]
fn result_encodes_to_cbor() {
    let mut trial = controller("demographics").render(&mut SmallRng::seed_from_u64(0));
    trial.set_text(0, "30").unwrap();
    trial.select(2, "yes").unwrap();
    let result = trial.submit().unwrap();

    let bytes = result.to_cbor().expect("cbor");
    assert_eq!(TrialResult::from_cbor(&bytes).unwrap(), result);
}

fn two_named_questions() -> TrialConfig {
    TrialConfig::new(vec![
        QuestionSpec::new(QuestionType::ShortText, "first").with_name("a"),
        QuestionSpec::new(QuestionType::ShortText, "second").with_name("b"),
    ])
}

#[test]
fn widget_tree_rejects_orders_that_skip_or_repeat_questions() {
    let config = two_named_questions();
    for order in [vec![1], vec![0, 0], vec![0, 1, 2], vec![]] {
        let err = WidgetTree::build(&config, &DisplayOrder::from(order.clone())).unwrap_err();
        assert!(
            matches!(err, LayoutError::Order { questions: 2, .. }),
            "{order:?} gave {err}"
        );
    }
}

#[test]
fn widget_tree_keeps_every_question_under_its_own_key() {
    let config = two_named_questions();
    let mut tree = WidgetTree::build(&config, &DisplayOrder::from(vec![1, 0])).expect("layout");
    assert_eq!(tree.get(0).unwrap().key, "a");
    assert_eq!(tree.get(1).unwrap().key, "b");
    assert_eq!(tree.handles()[0].key, "b");
    assert!(tree.get(2).is_none());

    tree.get_mut(1).unwrap().set_text("second answer").unwrap();
    let collection = collect(&tree);
    let keys: Vec<_> = collection.responses.iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec!["a", "b"]);
    assert_eq!(collection.responses.get("b").unwrap(), ["second answer"]);
    assert_eq!(collection.answered, vec![false, true]);
}

#[test]
fn widget_tree_rejects_uncompilable_pattern() {
    let config = TrialConfig::new(vec![
        QuestionSpec::new(QuestionType::LongText, "ok"),
        QuestionSpec::new(QuestionType::ShortText, "zip").with_pattern("([0-9]"),
    ]);
    let err = WidgetTree::build(&config, &DisplayOrder::identity(2)).unwrap_err();
    assert!(matches!(err, LayoutError::Pattern { index: 1, .. }));
}
