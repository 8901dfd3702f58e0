use clap::Parser;
use std::process::ExitCode;
use wizflow::cli::{self, Args};

fn main() -> ExitCode {
    let args = Args::parse();

    let _logging = match wizflow::logging::init(&args) {
        Ok(guard) => Some(guard),
        Err(err) => {
            eprintln!("warning: logging disabled: {err:#}");
            None
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("error: failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::run(args)) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            cli::report_failure(&err);
            ExitCode::FAILURE
        }
    }
}
