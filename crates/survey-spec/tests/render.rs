use rand::SeedableRng;
use rand::rngs::SmallRng;

use survey_spec::{TrialController, progress, render_html, render_json_ui, render_text};

fn fixture(name: &str) -> &'static str {
    match name {
        "demographics" => include_str!("../tests/fixtures/demographics.json"),
        "full_page" => include_str!("../tests/fixtures/full_page.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

#[test]
fn render_text_lists_questions_and_state() {
    let controller = TrialController::from_json(fixture("demographics")).expect("config");
    let mut trial = controller.render(&mut SmallRng::seed_from_u64(0));
    trial.set_checked(1, "blue", true).unwrap();

    let text = render_text(trial.tree());
    assert!(text.contains("1/3 How old are you? *"));
    assert!(text.contains("[ ] red"));
    assert!(text.contains("[x] blue"));
    assert!(text.contains("<Please select or enter an answer> (yes/no)"));
    assert!(text.contains("[Continue] (1/3 answered)"));
    assert!(!text.contains('!'));

    let _ = trial.submit();
    assert!(render_text(trial.tree()).contains("! You must choose at least one response"));
}

#[test]
fn render_json_ui_exposes_structure() {
    let controller = TrialController::from_json(fixture("full_page")).expect("config");
    let mut trial = controller.render(&mut SmallRng::seed_from_u64(5));
    trial.select(2, "bachelor").unwrap();

    let ui = render_json_ui(trial.tree());
    assert_eq!(ui["button_label"], "Next");
    assert_eq!(ui["progress"]["total"], 5);
    assert_eq!(ui["progress"]["answered"], 1);
    assert!(ui["fail_message"].is_null());

    let questions = ui["questions"].as_array().expect("questions array");
    let order: Vec<_> = questions
        .iter()
        .map(|q| q["original_index"].as_u64().unwrap() as usize)
        .collect();
    assert_eq!(order, trial.order().as_slice());

    let degree = questions
        .iter()
        .find(|q| q["key"] == "Q2")
        .expect("dropdown question");
    assert_eq!(degree["type"], "dropdown");
    assert_eq!(degree["placeholder"], "Choose one");
    assert_eq!(degree["value"][0], "bachelor");

    let country = questions.iter().find(|q| q["key"] == "Q3").unwrap();
    assert_eq!(country["pattern"], ".*");
    assert_eq!(country["attributes"], "autocomplete=\"country-name\"");
}

#[test]
fn render_html_keeps_markup_and_identity() {
    let controller = TrialController::from_json(fixture("full_page")).expect("config");
    let mut trial = controller.render(&mut SmallRng::seed_from_u64(1));
    trial.set_checked(1, "German", true).unwrap();
    trial.set_text(3, "<b>x</b>").unwrap();

    let html = render_html(trial.tree()).expect("html");
    assert!(html.contains("<h2>Background</h2>"));
    assert!(html.contains("<em>Any</em> comments?"));
    assert!(html.contains(r#"data-index="1" data-name="languages""#));
    assert!(html.contains(r#"data-index="2" data-name="""#));
    assert!(html.contains(r#"type="radio" name="advanced-survey-response-0" value="left" required"#));
    assert!(html.contains(r#"value="German" checked"#));
    assert!(html.contains(r#"<option value="" selected>Choose one</option>"#));
    assert!(html.contains(r#"autocomplete="country-name""#));
    assert!(html.contains("&lt;b&gt;x&lt;/b&gt;"));
    assert!(html.contains(">Next</button>"));

    // Display order is the order the containers appear in.
    let positions: Vec<_> = trial
        .order()
        .as_slice()
        .iter()
        .map(|index| {
            html.find(&format!(r#"id="advanced-survey-{index}""#))
                .expect("question container")
        })
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn progress_counts_answered_questions() {
    let controller = TrialController::from_json(fixture("demographics")).expect("config");
    let mut trial = controller.render(&mut SmallRng::seed_from_u64(0));
    assert_eq!(progress(trial.tree()).answered, 0);
    trial.set_text(0, "30").unwrap();
    trial.select(2, "no").unwrap();
    let counted = progress(trial.tree());
    assert_eq!((counted.answered, counted.total), (2, 3));
    assert_eq!(trial.snapshot().answered, vec![true, false, true]);
}
