use clap::Parser;
use tracing_subscriber::prelude::*;

fn main() {
    let args = sse_server::Args::parse();

    // Map the LOG_LEVEL variable to an equivalent tracing EnvFilter.
    // Restrict logged modules to the current crate, as debug logging
    // for tonic can be quite verbose.
    let log_level = std::env::var("LOG_LEVEL").unwrap_or("info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::new(format!("sse_server={log_level}"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    // The worker pool serving concurrent calls is fixed at startup.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers)
        .enable_all()
        .build();

    let runtime = match runtime {
        Ok(runtime) => runtime,
        Err(error) => {
            tracing::error!(%error, "couldn't build Tokio runtime");
            std::process::exit(1);
        }
    };

    tracing::info!(%log_level, port = args.port, message = "sse-server started");
    let result = runtime.block_on(sse_server::run(args));

    // Shut down without waiting for lingering blocking tasks to complete.
    runtime.shutdown_background();

    if let Err(error) = result {
        tracing::error!(error = format!("{error:#}"), "sse-server crashed with error");
        std::process::exit(1);
    }
    tracing::info!("sse-server exiting");
}
