use serde::{Deserialize, Serialize};

/// Body of `GET /healthz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

/// Error body returned by the service on non-success statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
}

/// Handshake line a freshly spawned server writes to stdout when it picked its own port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: u16,
}

impl ServerInfo {
    /// Base URL of the v1 API served by this server.
    pub fn base_url(&self) -> String {
        format!("http://localhost:{}/v1", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_line() {
        let info: ServerInfo = serde_json::from_str(r#"{"host":"127.0.0.1","port":40123}"#).unwrap();
        assert_eq!(info.port, 40123);
        assert_eq!(info.base_url(), "http://localhost:40123/v1");
    }

    #[test]
    fn test_handshake_requires_port() {
        assert!(serde_json::from_str::<ServerInfo>(r#"{"host":"127.0.0.1"}"#).is_err());
        assert!(serde_json::from_str::<ServerInfo>("Listening on 127.0.0.1:5266").is_err());
    }
}
