//! Pass environment variables to the sandbox.

use sandboxai::{configure_tracing, SandboxBuilder, SandboxaiConfig};

fn main() -> anyhow::Result<()> {
    configure_tracing()?;

    let config = SandboxaiConfig::load()?;
    let mut sandbox = SandboxBuilder::from_config(&config)
        .embedded(config.base_url.is_none())
        .env("FOO", "bar")
        .build()?
        .scoped();

    let cell = sandbox.run_ipython_cell("! echo $FOO")?;
    println!("{}", cell.text().unwrap_or_default());

    let shell = sandbox.run_shell_command("echo $FOO")?;
    println!("{}", shell.text().unwrap_or_default());

    sandbox.close()?;
    Ok(())
}
