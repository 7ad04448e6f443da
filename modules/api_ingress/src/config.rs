use serde::{Deserialize, Serialize};

/// HTTP host configuration (`modules.api_ingress` in the app config)
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ApiIngressConfig {
    /// Socket address to listen on; empty means `server.host:server.port`.
    #[serde(default)]
    pub bind_addr: String,
    #[serde(default)]
    pub enable_docs: bool,
    #[serde(default)]
    pub cors_enabled: bool,
}
