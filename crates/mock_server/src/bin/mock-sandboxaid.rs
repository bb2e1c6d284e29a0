//! Stand-in for `sandboxaid` that follows the embedded launch contract.
//!
//! Reads `SANDBOXAID_HOST`, `SANDBOXAID_PORT`, `SANDBOXAID_SCOPE`,
//! `SANDBOXAID_DELETE_ON_SHUTDOWN` and `SANDBOXAID_DEFAULT_IMAGE`. When the
//! port is `0` the chosen address is announced as one JSON line on stdout.

use std::io::Write;

use sandboxai_core::{types::ServerInfo, DEFAULT_IMAGE};
use sandboxai_mock_server::MockSandboxServer;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout is reserved for the handshake line.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .init();

    let host = env_or("SANDBOXAID_HOST", "127.0.0.1");
    let port = env_or("SANDBOXAID_PORT", "5266");
    let scope = env_or("SANDBOXAID_SCOPE", "default");
    let delete_on_shutdown = std::env::var("SANDBOXAID_DELETE_ON_SHUTDOWN")
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_image = env_or("SANDBOXAID_DEFAULT_IMAGE", DEFAULT_IMAGE);

    let server = MockSandboxServer::with_default_image(default_image);
    let state = server.state();

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    let addr = listener.local_addr()?;
    if port == "0" {
        let info = ServerInfo {
            host: Some(addr.ip().to_string()),
            port: addr.port(),
        };
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", serde_json::to_string(&info)?)?;
        stdout.flush()?;
    }
    tracing::info!(addr = %addr, scope = %scope, "Listening, starting HTTP server");

    server.run(listener, shutdown_signal()).await?;
    tracing::info!("Stopped serving new connections");

    if delete_on_shutdown {
        tracing::info!("Cleanup: ensuring all sandboxes are deleted");
        match state.delete_all() {
            0 => tracing::info!("Cleanup: no sandboxes to delete"),
            total => tracing::info!("Cleanup: done deleting sandboxes (total = {})", total),
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}
