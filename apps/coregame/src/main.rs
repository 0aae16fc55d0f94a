//! CoreGame binary entry point.

use clap::Parser;
use coregame::cli::{self, Cli};
use coregame::{api, config};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    config::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command.server_config() {
        Some(server) => api::serve(server).await.map(|()| String::new()),
        None => cli::run(cli.command),
    };

    match result {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(error = ?err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
