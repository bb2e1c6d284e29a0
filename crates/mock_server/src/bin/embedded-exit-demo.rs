//! Host program that leaves the embedded server to the exit hook.
//!
//! Configured like any SandboxAI application (`SANDBOXAI__EMBEDDED__*`). It
//! installs a fmt subscriber on stderr, prints the server pid on stdout, uses
//! one scoped sandbox and leaves a second one bound, then returns from `main`
//! without stopping the server.

use sandboxai_core::config::SandboxaiConfig;
use sandboxai_embedded::EmbeddedServer;
use sandboxai_sandbox::SandboxBuilder;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,sandboxai::server=debug".into()),
        ))
        .init();

    let config = SandboxaiConfig::load()?;

    SandboxBuilder::from_config(&config)
        .embedded(true)
        .build()?
        .scope(|sb| sb.run_shell_command("echo scoped").map(|_| ()))?;

    let mut leftover = SandboxBuilder::from_config(&config).embedded(true).build()?;
    leftover.run_shell_command("echo leftover")?;

    let pid = EmbeddedServer::global()
        .pid()
        .ok_or_else(|| anyhow::anyhow!("embedded server is not running"))?;
    println!("{}", pid);

    tracing::info!(name = %leftover.name(), "Leaving sandbox to the server");
    Ok(())
}
