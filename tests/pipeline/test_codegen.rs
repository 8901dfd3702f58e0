use wizflow::core::codegen::{used_templates, CodeGenerator};
use wizflow::core::document::{ActionStep, ActionType, Trigger, WorkflowDocument};
use wizflow::core::validator::syntax;

fn alert() -> WorkflowDocument {
    WorkflowDocument::new(
        "alert",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::Email)
            .with_param("to", "a@b.com")
            .with_param("subject", "hi")
            .with_param("body", "test")],
    )
}

#[test]
fn identical_documents_generate_identical_scripts() {
    let generator = CodeGenerator::new();
    let first = generator.generate(&alert());
    let second = generator.generate(&alert());

    assert_eq!(first, second);
    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.digest().len(), 64);
}

#[test]
fn round_trip_example_has_one_email_block_with_literal_values() {
    let script = CodeGenerator::new().generate(&alert());

    assert_eq!(script.source.matches("_send_email(variables, to=").count(), 1);
    assert!(script
        .source
        .contains(r#"to="a@b.com", subject="hi", body="test""#));
    assert!(script.modules.contains("smtplib"));
    assert!(syntax::scan(&script.source).is_well_formed());
}

#[test]
fn hostile_values_stay_inside_string_literals() {
    let doc = WorkflowDocument::new(
        "hostile",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::Data)
            .with_param("message", "\"); __import__('os').system('rm -rf /') #\nprint(\"")],
    );
    let script = CodeGenerator::new().generate(&doc);

    let scan = syntax::scan(&script.source);
    assert!(scan.is_well_formed(), "{:?}", scan.issues);
    assert!(script
        .source
        .contains(r#"message="\"); __import__('os').system('rm -rf /') #\nprint(\"""#));
}

#[test]
fn changing_one_parameter_changes_the_digest() {
    let generator = CodeGenerator::new();
    let mut other = alert();
    other.actions[0]
        .parameters
        .insert("to".to_string(), "c@d.com".into());

    assert_ne!(
        generator.generate(&alert()).digest(),
        generator.generate(&other).digest()
    );
}

#[test]
fn unknown_actions_render_as_noops_between_known_ones() {
    let doc = WorkflowDocument::new(
        "mixed",
        Trigger::manual(),
        vec![
            ActionStep::new(ActionType::Data).with_param("message", "first"),
            ActionStep::new(ActionType::Custom("teleport".into())).with_param("to", "mars"),
            ActionStep::new(ActionType::Data).with_param("message", "third"),
        ],
    );
    let script = CodeGenerator::new().generate(&doc);

    assert!(script.source.contains("skipping unrecognized action 2: teleport"));
    assert_eq!(script.source.matches("_log_data(variables, message=").count(), 2);
    assert_eq!(used_templates(&doc).len(), 1);
    assert!(syntax::scan(&script.source).is_well_formed());
}

#[test]
fn missing_required_parameter_generates_none() {
    let doc = WorkflowDocument::new(
        "partial",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::Email).with_param("to", "a@b.com")],
    );
    let script = CodeGenerator::new().generate(&doc);
    assert!(script.source.contains("subject=None"));
    assert!(script.source.contains("body=None"));
}

#[test]
fn aliases_fill_canonical_parameters() {
    let doc = WorkflowDocument::new(
        "aliased",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::Email)
            .with_param("to", "a@b.com")
            .with_param("subject", "hi")
            .with_param("message", "via alias")],
    );
    let script = CodeGenerator::new().generate(&doc);
    assert!(script.source.contains(r#"body="via alias""#));
}

#[test]
fn base_modules_are_always_imported_once() {
    let script = CodeGenerator::new().generate(&alert());
    for module in ["json", "os", "re", "sys"] {
        assert!(script.modules.contains(module));
        assert_eq!(
            script.source.matches(&format!("\nimport {}\n", module)).count(),
            1,
            "{}",
            module
        );
    }
}

#[test]
fn scrape_action_passes_selector_and_stores_scraped_content() {
    let document = WorkflowDocument::from_json_str(
        r#"{"name": "headlines", "actions": [
            {"type": "web_scrape", "config": {"url": "https://example.com/news", "selector": "h2.title"}},
            {"type": "log_message", "parameters": {"message": "{{scraped_content}}"}}
        ]}"#,
    )
    .unwrap();
    let script = CodeGenerator::new().generate(&document);

    assert_eq!(document.actions[0].kind, ActionType::Scrape);
    assert!(script.source.contains(
        r#"_scrape_web(variables, url="https://example.com/news", selector="h2.title", store_as="scraped_content")"#
    ));
    assert!(script.source.contains("bs4.BeautifulSoup("));
    assert!(script.modules.contains("bs4"));
    assert!(script.modules.contains("requests"));
    assert!(syntax::scan(&script.source).is_well_formed());
}

#[test]
fn plain_web_calls_do_not_import_the_html_parser() {
    let document = WorkflowDocument::new(
        "api",
        Trigger::manual(),
        vec![ActionStep::new(ActionType::Web).with_param("url", "https://example.com/api")],
    );
    let script = CodeGenerator::new().generate(&document);

    assert!(!script.modules.contains("bs4"));
    assert!(!script.source.contains("def _scrape_web("));
}
