pub mod badge;
pub mod board;
pub mod cli;
pub mod config;
pub mod duration;
pub mod session;
pub mod timer;

use log::{debug, error};

/// CLI entry point: logging, a single-threaded runtime, then the selected command.
pub fn run() {
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,jiratime_lib=info,jira_api=info"),
    )
    .format_timestamp_millis()
    .try_init();

    debug!("Starting jiratime {}", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            error!("Failed to start async runtime: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = runtime.block_on(cli::Cli::menu()) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
