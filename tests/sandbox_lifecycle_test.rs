//! Lifecycle tests through the public facade.
//!
//! Covers the testable properties end to end against the mock service:
//! lazy creation, create-once-then-call, scoped deletion on every exit path.

use serde_json::json;
use std::collections::HashMap;

use sandboxai::{
    share, Error, RunIPythonCellTool, Sandbox, SandboxBuilder, SandboxaiConfig, Tool,
};
use sandboxai_mock_server::MockSandboxServer;

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_builder_from_environment_config() {
    let server = MockSandboxServer::new().spawn().unwrap();
    let vars = HashMap::from([
        ("SANDBOXAI__BASE_URL".to_string(), server.base_url().to_string()),
        ("SANDBOXAI__SPACE".to_string(), "ci".to_string()),
        ("SANDBOXAI__IMAGE".to_string(), "img:ci".to_string()),
    ]);
    let config = SandboxaiConfig::load_from_vars(vars).unwrap();

    let sandbox = SandboxBuilder::from_config(&config).build().unwrap();
    assert_eq!(sandbox.space(), "ci");
    assert_eq!(sandbox.image(), "img:ci");
    assert!(server.state().get("ci", sandbox.name()).is_some());
}

#[test]
fn test_no_address_no_embedded_is_rejected() {
    let config = SandboxaiConfig::default();
    let err = SandboxBuilder::from_config(&config).build().unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_lazy_create_then_exactly_one_create() {
    let server = MockSandboxServer::new().spawn().unwrap();
    let mut sandbox = Sandbox::builder()
        .base_url(server.base_url())
        .lazy_create(true)
        .build()
        .unwrap();
    assert_eq!(sandbox.name(), "");

    sandbox.run_ipython_cell("a = 1").unwrap();
    sandbox.run_shell_command("true").unwrap();
    assert_eq!(server.state().created_total(), 1);

    sandbox.delete().unwrap();
    assert_eq!(sandbox.name(), "");
    assert_eq!(server.state().sandbox_count(), 0);
}

#[test]
fn test_scope_deletes_on_both_paths() {
    let server = MockSandboxServer::new().spawn().unwrap();

    Sandbox::connect(server.base_url())
        .unwrap()
        .scope(|sb| sb.run_shell_command("true").map(|_| ()))
        .unwrap();

    let err = Sandbox::connect(server.base_url())
        .unwrap()
        .scope(|sb| {
            sb.run_shell_command("true")?;
            Err::<(), _>(Error::timeout("gave up"))
        })
        .unwrap_err();
    assert!(err.is_timeout());

    assert_eq!(server.state().created_total(), 2);
    assert_eq!(server.state().deleted_total(), 2);
}

#[test]
fn test_tool_through_facade() {
    let server = MockSandboxServer::new().spawn().unwrap();
    let tool = RunIPythonCellTool::new(share(Sandbox::connect(server.base_url()).unwrap()));

    assert_eq!(tool.call(&json!({"cell": "x"})).unwrap(), "x\n");
    assert!(tool.description().contains("ipython"));
}
