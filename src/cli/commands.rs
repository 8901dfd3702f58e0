use crate::{
    cli::args::{CheckArgs, CompileArgs, DepsArgs, GenerateArgs, ListArgs, RemoveArgs, RunArgs},
    core::{
        config::{ConfigLoader, ConfigValidator, WizflowConfig},
        document::WorkflowDocument,
        error::{AppError, DefaultErrorReporter, ErrorReporter, PipelineError},
        executor::{ExecutionOutcome, ExecutionResult},
        pipeline::{RunOptions, WorkflowPipeline},
        store::WorkflowStore,
        translator::CommandTranslator,
        types::ErrorCategory,
        validator::ValidationReport,
    },
    Result,
};
use serde_json::json;
use std::path::Path;
use std::process::ExitCode;

const EXIT_FAILURE: u8 = 1;
/// A pipeline stage refused the workflow before anything ran.
const EXIT_REJECTED: u8 = 2;
const EXIT_TIMEOUT: u8 = 124;
const EXIT_LAUNCH_FAILURE: u8 = 127;

fn load_config(root: &Path) -> Result<WizflowConfig> {
    let config = ConfigLoader::load_from_workspace(root)?;
    ConfigValidator::validate(&config)?;
    Ok(config)
}

fn build_pipeline(root: &Path) -> Result<(WizflowConfig, WorkflowPipeline)> {
    let config = load_config(root)?;
    let pipeline = WorkflowPipeline::from_config(root, &config);
    Ok((config, pipeline))
}

/// An existing file path wins over a saved workflow of the same name.
fn load_target(store: &WorkflowStore, target: &str) -> std::result::Result<WorkflowDocument, AppError> {
    let path = Path::new(target);
    if path.is_file() {
        WorkflowDocument::load_from_file(path)
    } else {
        store.load_document(target)
    }
}

fn exit_code_for(result: &ExecutionResult) -> ExitCode {
    match result.outcome {
        ExecutionOutcome::Success => ExitCode::SUCCESS,
        ExecutionOutcome::RuntimeFailure => ExitCode::from(EXIT_FAILURE),
        ExecutionOutcome::Timeout => ExitCode::from(EXIT_TIMEOUT),
        ExecutionOutcome::LaunchFailure => ExitCode::from(EXIT_LAUNCH_FAILURE),
    }
}

fn report_rejection(workflow: &str, error: &PipelineError, as_json: bool) -> Result<ExitCode> {
    if as_json {
        let payload = json!({
            "workflow": workflow,
            "status": "rejected",
            "stage": error.stage(),
            "reasons": error.reasons(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        DefaultErrorReporter::new().report_pipeline_error(error);
    }
    Ok(ExitCode::from(EXIT_REJECTED))
}

fn print_validation(workflow: &str, report: &ValidationReport) {
    if report.issues.is_empty() {
        println!("{}: no issues", workflow);
        return;
    }
    println!("{}: {} issue(s)", workflow, report.issues.len());
    for issue in &report.issues {
        println!("  {:<7} {}", issue.severity.to_string(), issue);
    }
}

pub async fn generate(root: &Path, args: GenerateArgs) -> Result<ExitCode> {
    let (config, pipeline) = build_pipeline(root)?;
    let translator = match CommandTranslator::from_config(&config.translator) {
        Ok(translator) => translator,
        Err(err) => return report_rejection("-", &PipelineError::from(err), false),
    };

    match pipeline
        .generate(&translator, &args.description, args.name.as_deref())
        .await
    {
        Ok(compiled) => {
            print_validation(&compiled.document.name, &compiled.report);
            if let Some(path) = &compiled.script_path {
                println!("Saved {} to {}", compiled.document.name, path.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_rejection(args.name.as_deref().unwrap_or("-"), &err, false),
    }
}

pub async fn compile(root: &Path, args: CompileArgs) -> Result<ExitCode> {
    let (_, pipeline) = build_pipeline(root)?;
    let document = load_target(pipeline.store(), &args.target)?;

    match pipeline.compile(&document) {
        Ok(compiled) => {
            print_validation(&document.name, &compiled.report);
            if let Some(path) = &compiled.script_path {
                println!("Compiled {} to {}", document.name, path.display());
            }
            println!("Digest: {}", compiled.script.digest());
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_rejection(&document.name, &err, false),
    }
}

pub async fn check(root: &Path, args: CheckArgs) -> Result<ExitCode> {
    let (_, pipeline) = build_pipeline(root)?;
    let document = load_target(pipeline.store(), &args.target)?;

    match pipeline.check(&document) {
        Ok(compiled) => {
            if args.json {
                let payload = json!({
                    "workflow": document.name,
                    "status": "passed",
                    "digest": compiled.script.digest(),
                    "modules": compiled.script.modules,
                    "issues": compiled.report.issues,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_validation(&document.name, &compiled.report);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report_rejection(&document.name, &err, args.json),
    }
}

pub async fn deps(root: &Path, args: DepsArgs) -> Result<ExitCode> {
    let (_, pipeline) = build_pipeline(root)?;
    let document = load_target(pipeline.store(), &args.target)?;

    let compiled = match pipeline.check(&document) {
        Ok(compiled) => compiled,
        Err(err) => return report_rejection(&document.name, &err, args.json),
    };
    let mut report = match pipeline.preflight(&compiled.script).await {
        Ok(report) => report,
        Err(err) => return report_rejection(&document.name, &err, args.json),
    };

    let install = if args.install && !report.is_satisfied() {
        let install = pipeline.dependencies().install(&report.missing).await;
        report = match pipeline.preflight(&compiled.script).await {
            Ok(report) => report,
            Err(err) => return report_rejection(&document.name, &err, args.json),
        };
        Some(install)
    } else {
        None
    };

    if args.json {
        let payload = json!({
            "workflow": document.name,
            "available": report.available,
            "missing": report.missing,
            "install": install,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{}: {} module(s) imported", document.name, compiled.script.modules.len());
        for module in &report.available {
            println!("  ok       {}", module);
        }
        for module in &report.missing {
            println!(
                "  missing  {} (package: {})",
                module,
                pipeline.dependencies().package_for(module)
            );
        }
        if let Some(install) = &install {
            for package in &install.installed {
                println!("Installed {}", package);
            }
            for failure in &install.failed {
                println!("Failed to install {}: {}", failure.package, failure.reason);
            }
        } else if !report.is_satisfied() {
            println!("Run `wizflow deps {} --install` to install them.", args.target);
        }
    }

    if report.is_satisfied() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILURE))
    }
}

pub async fn run(root: &Path, args: RunArgs) -> Result<ExitCode> {
    let (_, pipeline) = build_pipeline(root)?;
    let document = load_target(pipeline.store(), &args.target)?;

    let options = RunOptions {
        force: args.force,
        timeout: args.timeout,
        record_file: args.record.clone(),
        trigger_payload: args.payload.clone(),
    };

    let result = match pipeline.run(&document, &options).await {
        Ok(result) => result,
        Err(err) => return report_rejection(&document.name, &err, args.json),
    };

    if args.json {
        let payload = json!({
            "workflow": document.name,
            "status": "executed",
            "result": result,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_execution(&document.name, &result);
    }
    Ok(exit_code_for(&result))
}

fn print_execution(workflow: &str, result: &ExecutionResult) {
    let exit = match (result.exit_code, result.signal) {
        (Some(code), _) => format!("exit {}", code),
        (None, Some(signal)) => format!("signal {}", signal),
        (None, None) => "no exit status".to_string(),
    };
    println!(
        "{}: {} ({}) in {} ms",
        workflow, result.outcome, exit, result.elapsed_ms
    );
    if let Some(message) = &result.message {
        println!("{}", message);
    }
    if !result.stdout.is_empty() {
        println!("--- stdout ---");
        print!("{}", result.stdout);
        if !result.stdout.ends_with('\n') {
            println!();
        }
    }
    if !result.stderr.is_empty() {
        eprintln!("--- stderr ---");
        eprint!("{}", result.stderr);
        if !result.stderr.ends_with('\n') {
            eprintln!();
        }
    }
}

pub async fn list(root: &Path, args: ListArgs) -> Result<ExitCode> {
    let config = load_config(root)?;
    let store = WorkflowStore::new(root.join(&config.storage.workflows_dir));
    let names = store.list()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else if names.is_empty() {
        println!("No saved workflows in {}", store.root().display());
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub async fn remove(root: &Path, args: RemoveArgs) -> Result<ExitCode> {
    let config = load_config(root)?;
    let store = WorkflowStore::new(root.join(&config.storage.workflows_dir));
    if !store.remove(&args.name)? {
        return Err(AppError::new(
            ErrorCategory::StorageError,
            format!("workflow '{}' is not saved", args.name),
        )
        .with_code("WIZ-STORE-002")
        .with_suggestion("run `wizflow list` to see saved workflows")
        .into());
    }
    tracing::info!(workflow = %args.name, "workflow removed");
    println!("Removed {}", args.name);
    Ok(ExitCode::SUCCESS)
}
