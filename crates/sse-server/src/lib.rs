use anyhow::Context;
use std::sync::Arc;
use tokio::signal::unix;

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod model;
pub mod registry;
pub mod script;
pub mod service;

/// Grace period given to in-flight calls once a termination signal arrives.
const SHUTDOWN_GRACE: std::time::Duration = std::time::Duration::from_secs(20);

#[derive(clap::Parser, Debug)]
#[clap(about = "Server-side extension which exposes analytic functions to an analytics host.")]
pub struct Args {
    /// Port on which to listen for calls from the host.
    #[clap(short, long, default_value = "50072")]
    pub port: u16,

    /// Path to the JSON manifest of functions published through GetCapabilities.
    #[clap(short, long, default_value = "funcdefs.json")]
    pub definition_file: String,

    /// Directory holding PEM certificate material (sse_server_key.pem,
    /// sse_server_cert.pem, root_cert.pem). When set, the listener requires
    /// mutually authenticated TLS; otherwise connections are unauthenticated.
    #[clap(long)]
    pub pem_dir: Option<String>,

    /// Directory of model artifacts, loaded once at startup.
    #[clap(short, long, default_value = "models")]
    pub model_dir: String,

    /// Number of worker threads serving concurrent calls.
    #[clap(short, long, default_value = "10")]
    pub workers: usize,
}

pub async fn run(args: Args) -> anyhow::Result<()> {
    let registry = registry::Registry::load(&args.definition_file)
        .with_context(|| format!("loading function manifest {}", args.definition_file))?;
    let registry = Arc::new(registry);

    let models = model::ModelSet::load(&args.model_dir)
        .with_context(|| format!("loading model artifacts from {}", args.model_dir))?;

    let mut dispatcher = dispatch::Dispatcher::new();
    dispatcher.bind(0, Arc::new(model::ModelFunction::new(models)));

    for def in registry.describe() {
        if !dispatcher.is_bound(def.function_id) {
            tracing::warn!(
                function_id = def.function_id,
                name = %def.name,
                "manifest declares a function with no bound handler; calls to it will fail"
            );
        }
    }

    // Script evaluation has no engine wired in this build, which is
    // advertised through the Capabilities allowScript flag.
    let evaluator = script::Evaluator::new(None);
    let connector = service::Connector::new(registry, dispatcher, evaluator);

    let addr = format!("[::]:{}", args.port).parse().unwrap();

    let mut builder = tonic::transport::Server::builder();
    match &args.pem_dir {
        Some(pem_dir) => {
            let tls = config::TlsMaterial::load(pem_dir)
                .with_context(|| format!("loading certificate material from {pem_dir}"))?;
            builder = builder
                .tls_config(tls.into_server_config())
                .context("configuring mutual TLS listener")?;
            tracing::info!(port = args.port, "serving in secure mode");
        }
        None => {
            tracing::info!(port = args.port, "serving in insecure mode");
        }
    }

    // Gracefully exit on either SIGINT (ctrl-c) or SIGTERM.
    let mut sigint = unix::signal(unix::SignalKind::interrupt()).unwrap();
    let mut sigterm = unix::signal(unix::SignalKind::terminate()).unwrap();

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = builder
        .add_service(proto_grpc::sse::connector_server::ConnectorServer::new(
            connector,
        ))
        .serve_with_shutdown(addr, async move {
            _ = stop_rx.await;
        });
    let mut server = tokio::spawn(server);

    tokio::select! {
        _ = sigint.recv() => tracing::info!("caught SIGINT, stopping"),
        _ = sigterm.recv() => tracing::info!("caught SIGTERM, stopping"),
        result = &mut server => {
            return result.expect("server task does not panic").context("server failed");
        }
    }
    _ = stop_tx.send(());

    // The listener stops accepting new calls immediately. In-flight calls
    // get a bounded grace period to complete before the task is torn down.
    match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
        Ok(result) => result.expect("server task does not panic").context("server failed"),
        Err(_) => {
            tracing::warn!("graceful drain timed out, aborting in-flight calls");
            server.abort();
            Ok(())
        }
    }
}
