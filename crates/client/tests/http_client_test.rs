//! Protocol client tests against the in-process mock service.

use std::time::{Duration, Instant};

use sandboxai_client::HttpClient;
use sandboxai_core::{
    config::ClientConfig,
    traits::SandboxApi,
    types::{CreateSandboxRequest, RunIPythonCellRequest, RunShellCommandRequest, SandboxSpec},
    Error,
};
use sandboxai_mock_server::{MockSandboxServer, RunningMockServer};

// =============================================================================
// Helpers
// =============================================================================

fn setup() -> (RunningMockServer, HttpClient) {
    let server = MockSandboxServer::new().spawn().unwrap();
    let client = HttpClient::new(server.base_url()).unwrap();
    (server, client)
}

fn dead_address() -> String {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    format!("http://127.0.0.1:{}/v1", port)
}

// =============================================================================
// Health
// =============================================================================

#[test]
fn test_health_probe() {
    let (_server, client) = setup();
    assert!(client.check_health());
    client.wait_until_healthy(Duration::from_secs(2)).unwrap();
}

#[test]
fn test_wait_until_healthy_times_out() {
    let config = ClientConfig {
        health_poll_interval_ms: 200,
        ..ClientConfig::default()
    };
    let client = HttpClient::with_config(dead_address(), &config).unwrap();
    assert!(!client.check_health());

    let start = Instant::now();
    let err = client.wait_until_healthy(Duration::from_secs(2)).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(5), "took {:?}", elapsed);
}

#[test]
fn test_wait_until_healthy_bounds_unresponsive_server() {
    // Accepts connections through the backlog but never answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
    let config = ClientConfig {
        health_poll_interval_ms: 200,
        ..ClientConfig::default()
    };
    let client = HttpClient::with_config(base_url, &config).unwrap();

    let start = Instant::now();
    let err = client.wait_until_healthy(Duration::from_secs(2)).unwrap_err();
    let elapsed = start.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed < Duration::from_millis(3500), "took {:?}", elapsed);
    drop(listener);
}

// =============================================================================
// Sandbox Lifecycle
// =============================================================================

#[test]
fn test_create_then_get_round_trips() {
    let (_server, client) = setup();
    let spec = SandboxSpec::new("img:v1").with_env("FOO", "bar");

    let created = client
        .create_sandbox("default", &CreateSandboxRequest::new(spec.clone()))
        .unwrap();
    assert!(!created.name.is_empty());
    assert_eq!(created.space, "default");

    let fetched = client.get_sandbox("default", &created.name).unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.spec, spec);
}

#[test]
fn test_get_after_delete_is_not_found() {
    let (_server, client) = setup();
    let created = client
        .create_sandbox(
            "default",
            &CreateSandboxRequest::new(SandboxSpec::new("img:v1")),
        )
        .unwrap();
    let fetched = client.get_sandbox("default", &created.name).unwrap();
    assert_eq!(fetched.spec.image, "img:v1");

    client.delete_sandbox("default", &created.name).unwrap();

    match client.get_sandbox("default", &created.name).unwrap_err() {
        Error::NotFound { space, name } => {
            assert_eq!(space, "default");
            assert_eq!(name, created.name);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_requested_name_is_used() {
    let (_server, client) = setup();
    let created = client
        .create_sandbox(
            "team-a",
            &CreateSandboxRequest::new(SandboxSpec::new("img")).with_name("box-1"),
        )
        .unwrap();
    assert_eq!(created.name, "box-1");
    assert_eq!(created.space, "team-a");
}

#[test]
fn test_reserved_characters_in_name_round_trip() {
    let (_server, client) = setup();
    let name = "box/1?x#y";
    let created = client
        .create_sandbox(
            "team a",
            &CreateSandboxRequest::new(SandboxSpec::new("img")).with_name(name),
        )
        .unwrap();
    assert_eq!(created.name, name);

    let fetched = client.get_sandbox("team a", name).unwrap();
    assert_eq!(fetched, created);

    let result = client
        .run_shell_command("team a", name, &RunShellCommandRequest::new("echo ok"))
        .unwrap();
    assert_eq!(result.text(), Some("ok\n"));

    client.delete_sandbox("team a", name).unwrap();
    assert!(client.get_sandbox("team a", name).unwrap_err().is_not_found());
}

#[test]
fn test_status_mismatch_carries_detail() {
    let (_server, client) = setup();
    let request = CreateSandboxRequest::new(SandboxSpec::new("img")).with_name("dup");
    client.create_sandbox("default", &request).unwrap();

    match client.create_sandbox("default", &request).unwrap_err() {
        Error::Protocol {
            expected,
            actual,
            detail,
        } => {
            assert_eq!(expected, 201);
            assert_eq!(actual, 409);
            assert!(detail.contains("already exists"), "{detail}");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = client.delete_sandbox("default", "missing").unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol {
            expected: 204,
            actual: 404,
            ..
        }
    ));
}

#[test]
fn test_transport_failure_is_not_protocol_error() {
    let client = HttpClient::new(dead_address()).unwrap();
    let err = client.get_sandbox("default", "x").unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err}");
}

// =============================================================================
// Tool Invocation
// =============================================================================

#[test]
fn test_tool_output_shapes() {
    let (_server, client) = setup();
    let created = client
        .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
        .unwrap();

    let combined = client
        .run_shell_command(
            "default",
            &created.name,
            &RunShellCommandRequest::new("echo out; echo err >&2"),
        )
        .unwrap();
    assert_eq!(combined.text(), Some("out\nerr\n"));

    let split = client
        .run_shell_command(
            "default",
            &created.name,
            &RunShellCommandRequest::new("echo out; echo err >&2").split(),
        )
        .unwrap();
    assert_eq!(split.output.as_split(), Some(("out\n", "err\n")));

    let cell = client
        .run_ipython_cell(
            "default",
            &created.name,
            &RunIPythonCellRequest::new("print(123)").split(),
        )
        .unwrap();
    assert_eq!(cell.output.as_split(), Some(("print(123)\n", "")));
}

#[test]
fn test_exit_code_is_reported() {
    let (_server, client) = setup();
    let created = client
        .create_sandbox("default", &CreateSandboxRequest::new(SandboxSpec::new("img")))
        .unwrap();

    let result = client
        .run_shell_command("default", &created.name, &RunShellCommandRequest::new("exit 7"))
        .unwrap();
    assert_eq!(result.return_code, 7);
    assert_eq!(result.text(), Some(""));
}

#[test]
fn test_tool_on_missing_sandbox() {
    let (_server, client) = setup();
    let err = client
        .run_ipython_cell("default", "ghost", &RunIPythonCellRequest::new("1"))
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Protocol {
            expected: 200,
            actual: 404,
            ..
        }
    ));
}
