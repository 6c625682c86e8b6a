use serde::Deserialize;

/// Basic retry policy template
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct BackoffPolicy {
    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,

    /// Single operation timeout (unit: milliseconds)
    #[serde(default = "default_op_timeout_ms")]
    pub timeout_ms: u64,

    /// Backoff base (unit: milliseconds)
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Maximum backoff time (unit: milliseconds)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_op_timeout_ms(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Divide strategies by business domain
#[derive(Debug, Deserialize, Clone)]
pub struct RetryPolicies {
    // Session establishment strategy (factory connect)
    #[serde(default)]
    pub session: BackoffPolicy,

    // Marker-node cleanup strategy (best-effort unregister paths)
    #[serde(default)]
    pub cleanup: BackoffPolicy,
}

// Default value implementation
impl Default for RetryPolicies {
    fn default() -> Self {
        Self {
            session: BackoffPolicy {
                max_retries: 3,
                timeout_ms: 3000,
                base_delay_ms: 100,
                max_delay_ms: 5000,
            },
            cleanup: BackoffPolicy {
                max_retries: 2,
                timeout_ms: 500,
                base_delay_ms: 50,
                max_delay_ms: 1000,
            },
        }
    }
}

fn default_max_retries() -> usize {
    3
}
fn default_op_timeout_ms() -> u64 {
    100
}
fn default_base_delay_ms() -> u64 {
    50
}
fn default_max_delay_ms() -> u64 {
    1000
}
