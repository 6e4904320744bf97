//! Controller entry point: `controller <port> <config>`.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use routectl::controller::Controller;
use routectl::logging::{init_tracing, EventLog};

#[derive(Parser)]
#[command(name = "controller", about = "Centralized routing controller")]
struct Args {
    /// UDP port to listen on.
    port: u16,
    /// Path to the topology config file.
    config: PathBuf,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let log = match EventLog::open("Controller.log") {
        Ok(log) => Arc::new(log),
        Err(e) => {
            tracing::error!(error = %e, "could not open Controller.log");
            return ExitCode::FAILURE;
        }
    };

    let controller = match Controller::bootstrap(args.port, &args.config, log) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "controller bootstrap failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = controller.run() {
        tracing::error!(error = %e, "controller exited");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
