use serde::Deserialize;

/// Coordination-service session parameters
#[derive(Debug, Deserialize, Clone)]
pub struct CoordinationConfig {
    /// Connect endpoint(s) of the coordination service
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,

    /// Session connect timeout (unit: milliseconds)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_in_ms: u64,

    /// Namespace suffix appended below the engine prefix; every topic of
    /// one deployment lives under `/<prefix>/<suffix>`
    #[serde(default = "default_namespace_suffix")]
    pub namespace_suffix: String,
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            connect_timeout_in_ms: default_connect_timeout_ms(),
            namespace_suffix: default_namespace_suffix(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["127.0.0.1:2181".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    3000
}
fn default_namespace_suffix() -> String {
    "default".to_string()
}
