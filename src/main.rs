use graph_path_server::config::Config;
use graph_path_server::runtime::{Server, ShutdownHandle};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::thread;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        transport = ?config.transport,
        max_connections = config.max_connections,
        io_timeout = config.io_timeout,
        min_vertices = config.limits.min_vertices,
        max_vertices = config.limits.max_vertices,
        min_edges = config.limits.min_edges,
        max_edges = config.limits.max_edges,
        "Starting graph-path-server"
    );

    let server = Server::bind(config)?;
    install_signal_handler(server.shutdown_handle())?;
    server.run()?;

    info!("Server stopped");
    Ok(())
}

/// Translate SIGINT/SIGTERM into a graceful shutdown.
fn install_signal_handler(shutdown: ShutdownHandle) -> std::io::Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                info!(signal, "Received signal, shutting down");
                shutdown.shutdown();
            }
        })?;
    Ok(())
}
