//! Switch entry point:
//! `switch <self_id> <controller_host> <controller_port> [-f <failed_neighbor_id>]`.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use routectl::logging::{init_tracing, EventLog};
use routectl::switch::Switch;

#[derive(Parser)]
#[command(name = "switch", about = "Routing switch agent")]
struct Args {
    /// This switch's id.
    self_id: i32,
    /// Controller hostname or IP.
    controller_host: String,
    /// Controller UDP port.
    controller_port: u16,
    /// Simulate failure of the link to this neighbor id.
    #[arg(short = 'f', long = "failed-neighbor")]
    failed_neighbor: Option<i32>,
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let log = match EventLog::open(format!("switch{}.log", args.self_id)) {
        Ok(log) => Arc::new(log),
        Err(e) => {
            tracing::error!(error = %e, "could not open switch log");
            return ExitCode::FAILURE;
        }
    };

    let switch = match Switch::register(
        args.self_id,
        &args.controller_host,
        args.controller_port,
        args.failed_neighbor,
        log,
    ) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "switch registration failed");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = switch.run() {
        tracing::error!(error = %e, "switch exited");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
