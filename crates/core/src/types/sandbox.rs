use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Sandbox Types
// =============================================================================

/// Desired runtime image and environment of a sandbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SandboxSpec {
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<HashMap<String, String>>,
}

impl SandboxSpec {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: None,
        }
    }

    /// Add an environment variable to the spec.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A sandbox as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sandbox {
    pub space: String,
    pub name: String,
    pub spec: SandboxSpec,
}

/// Body of `POST /spaces/{space}/sandboxes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSandboxRequest {
    /// Requested name. The service assigns one when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub spec: SandboxSpec,
}

impl CreateSandboxRequest {
    pub fn new(spec: SandboxSpec) -> Self {
        Self { name: None, spec }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_request_omits_absent_fields() {
        let req = CreateSandboxRequest::new(SandboxSpec::new("img:v1"));
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"spec": {"image": "img:v1"}}));
    }

    #[test]
    fn test_create_request_with_name_and_env() {
        let req = CreateSandboxRequest::new(SandboxSpec::new("img:v1").with_env("FOO", "bar"))
            .with_name("test-name");
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({"name": "test-name", "spec": {"image": "img:v1", "env": {"FOO": "bar"}}})
        );
    }

    #[test]
    fn test_sandbox_decodes_without_env() {
        let sandbox: Sandbox = serde_json::from_value(json!({
            "space": "default",
            "name": "k3v9x",
            "spec": {"image": "img:v1"}
        }))
        .unwrap();
        assert_eq!(sandbox.name, "k3v9x");
        assert!(sandbox.spec.env.is_none());
    }
}
