//! Defer sandbox creation until the first command, then reuse it.

use sandboxai::{configure_tracing, SandboxBuilder, SandboxaiConfig};

fn main() -> anyhow::Result<()> {
    configure_tracing()?;

    let config = SandboxaiConfig::load()?;
    let mut sandbox = SandboxBuilder::from_config(&config)
        .embedded(config.base_url.is_none())
        .lazy_create(true)
        .build()?;
    println!("before first command: name = {:?}", sandbox.name());

    let result = sandbox.run_shell_command("uname -a; exit 3")?;
    println!("name = {}, return code = {}", sandbox.name(), result.return_code);
    print!("{}", result.text().unwrap_or_default());

    let split = sandbox.run_shell_command_split("echo out; echo err >&2")?;
    if let Some((stdout, stderr)) = split.output.as_split() {
        println!("stdout: {:?}, stderr: {:?}", stdout, stderr);
    }

    sandbox.delete()?;
    Ok(())
}
