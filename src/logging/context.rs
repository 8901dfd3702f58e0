use crate::cli::Args;
use std::env;

/// Execution contexts that influence how logging is routed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionContext {
    /// Human at a terminal reading plain-text command output.
    LocalDev,
    /// Command prints machine-readable JSON on stdout; the console stays quiet.
    MachineOutput,
    /// Invoked by another program (`WIZFLOW_NONINTERACTIVE=1`).
    Automation,
}

impl ExecutionContext {
    /// Returns `true` when console sinks should be disabled.
    pub fn disables_console(self) -> bool {
        matches!(
            self,
            ExecutionContext::MachineOutput | ExecutionContext::Automation
        )
    }
}

/// Derive the active execution context from parsed CLI arguments plus overrides.
pub fn detect_context(args: &Args) -> ExecutionContext {
    if args.command.wants_json() {
        return ExecutionContext::MachineOutput;
    }
    if noninteractive_override_enabled() {
        return ExecutionContext::Automation;
    }
    ExecutionContext::LocalDev
}

fn noninteractive_override_enabled() -> bool {
    env::var("WIZFLOW_NONINTERACTIVE")
        .map(|value| value.trim() == "1")
        .unwrap_or(false)
}
