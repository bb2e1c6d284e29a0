//! Run one cell in a fresh sandbox.
//!
//! Uses the embedded server unless `SANDBOXAI__BASE_URL` points at a running one.
//!
//! ```sh
//! RUST_LOG=debug cargo run --example basic
//! ```

use sandboxai::{configure_tracing, SandboxBuilder, SandboxaiConfig};

fn main() -> anyhow::Result<()> {
    configure_tracing()?;

    let config = SandboxaiConfig::load()?;
    let sandbox = SandboxBuilder::from_config(&config)
        .embedded(config.base_url.is_none())
        .build()?;

    sandbox.scope(|sb| {
        let result = sb.run_ipython_cell("print('hi')")?;
        println!("{}", result.text().unwrap_or_default());
        Ok(())
    })?;
    Ok(())
}
