pub mod args;
pub mod commands;

pub use args::{CheckArgs, CompileArgs, DepsArgs, GenerateArgs, ListArgs, RemoveArgs, RunArgs};
use crate::core::error::{AppError, DefaultErrorReporter, ErrorReporter};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser, Debug)]
#[command(name = "wizflow")]
#[command(version = crate::VERSION)]
#[command(about = "Compile declarative automation workflows into scripts and run them")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: generate or write a workflow document, check it, resolve dependencies, then run it."
)]
pub struct Args {
    /// Workspace root holding wizflow.toml, workflows/ and workspace/ (default: current directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    #[command(
        about = "Translate a description into a saved workflow",
        long_about = "Generate sends the description to the configured translator command, then validates and saves the resulting document and script.",
        after_help = "Example:\n    wizflow generate \"email me when the nightly report lands\" --name nightly"
    )]
    Generate(GenerateArgs),
    #[command(
        about = "Generate, validate and save the script for a workflow",
        long_about = "Compile loads a document by path or saved name, renders its script, and saves both only when validation passes.",
        after_help = "Example:\n    wizflow compile ./alert.json"
    )]
    Compile(CompileArgs),
    #[command(
        about = "Validate a workflow without writing anything",
        long_about = "Check renders the script in memory and prints every validation issue with its rule code.",
        after_help = "Example:\n    wizflow check alert --json"
    )]
    Check(CheckArgs),
    #[command(
        about = "Report the modules a workflow needs",
        long_about = "Deps probes the interpreter for each imported module. --install runs the configured installer for the missing ones.",
        after_help = "Example:\n    wizflow deps alert --install"
    )]
    Deps(DepsArgs),
    #[command(
        about = "Compile and execute a workflow",
        long_about = "Run compiles the workflow, checks dependencies, and executes the script under a timeout with bounded output capture. Exits 0 only when the script succeeds.",
        after_help = "Example:\n    wizflow run alert --timeout 30s --record calls.jsonl"
    )]
    Run(RunArgs),
    #[command(
        about = "List saved workflows",
        after_help = "Example:\n    wizflow list"
    )]
    List(ListArgs),
    #[command(
        about = "Delete a saved workflow",
        long_about = "Remove deletes the saved document and script for a workflow. Nothing else ever deletes them.",
        after_help = "Example:\n    wizflow remove nightly"
    )]
    Remove(RemoveArgs),
}

impl Command {
    /// Whether the command prints machine-readable output on stdout.
    pub fn wants_json(&self) -> bool {
        match self {
            Command::Check(args) => args.json,
            Command::Deps(args) => args.json,
            Command::Run(args) => args.json,
            Command::List(args) => args.json,
            Command::Generate(_) | Command::Compile(_) | Command::Remove(_) => false,
        }
    }
}

pub async fn run(args: Args) -> crate::Result<ExitCode> {
    let root = match args.root {
        Some(root) => root,
        None => std::env::current_dir()?,
    };
    match args.command {
        Command::Generate(generate_args) => commands::generate(&root, generate_args).await,
        Command::Compile(compile_args) => commands::compile(&root, compile_args).await,
        Command::Check(check_args) => commands::check(&root, check_args).await,
        Command::Deps(deps_args) => commands::deps(&root, deps_args).await,
        Command::Run(run_args) => commands::run(&root, run_args).await,
        Command::List(list_args) => commands::list(&root, list_args).await,
        Command::Remove(remove_args) => commands::remove(&root, remove_args).await,
    }
}

/// The structured error behind a command failure, if any layer carries one.
pub fn app_error(err: &anyhow::Error) -> Option<&AppError> {
    err.chain().find_map(|cause| cause.downcast_ref::<AppError>())
}

/// Print a failed command on stderr, with recovery hints when the cause is
/// an `AppError`.
pub fn report_failure(err: &anyhow::Error) {
    match app_error(err) {
        Some(app_error) => DefaultErrorReporter::new().report_error(app_error),
        None => eprintln!("error: {err:#}"),
    }
}
