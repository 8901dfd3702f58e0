use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Plain-language description of the automation
    #[arg(value_name = "DESCRIPTION")]
    pub description: String,

    /// Save under this name instead of the one the translator picks
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Path to a workflow document, or the name of a saved workflow
    #[arg(value_name = "FILE|NAME")]
    pub target: String,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to a workflow document, or the name of a saved workflow
    #[arg(value_name = "FILE|NAME")]
    pub target: String,

    /// Print the validation report as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DepsArgs {
    /// Path to a workflow document, or the name of a saved workflow
    #[arg(value_name = "FILE|NAME")]
    pub target: String,

    /// Install packages for every missing module with the configured installer
    #[arg(long)]
    pub install: bool,

    /// Print the dependency report as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to a workflow document, or the name of a saved workflow
    #[arg(value_name = "FILE|NAME")]
    pub target: String,

    /// Wall-clock limit for the script, e.g. 30s or 2m (default: executor.timeout_seconds)
    #[arg(long, value_name = "DURATION", value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Execute even when required modules are missing
    #[arg(long)]
    pub force: bool,

    /// Record side effects as JSON lines in FILE instead of performing them
    #[arg(long, value_name = "FILE", help_heading = "Dry Run")]
    pub record: Option<PathBuf>,

    /// JSON trigger payload handed to the script (e.g. the received email)
    #[arg(long, value_name = "JSON", value_parser = parse_payload)]
    pub payload: Option<serde_json::Value>,

    /// Print the execution result as JSON
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Print workflow names as a JSON array
    #[arg(long, help_heading = "Output Options")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Name of the saved workflow to delete
    #[arg(value_name = "NAME")]
    pub name: String,
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    let duration = humantime::parse_duration(value).map_err(|err| err.to_string())?;
    if duration.is_zero() {
        return Err("timeout must be greater than zero".to_string());
    }
    Ok(duration)
}

fn parse_payload(value: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(value).map_err(|err| format!("payload is not valid JSON: {}", err))
}
