use std::env;

use tracing::warn;

/// Process identity used to derive per-observer marker paths.
///
/// Injectable so tests can pin a deterministic identity.
pub trait HostnameProvider: Send + Sync {
    fn hostname(&self) -> String;
}

/// Default provider backed by the `HOSTNAME` environment variable.
pub struct EnvHostnameProvider;

impl HostnameProvider for EnvHostnameProvider {
    fn hostname(&self) -> String {
        match env::var("HOSTNAME") {
            Ok(hostname) if !hostname.is_empty() => hostname,
            _ => {
                warn!("HOSTNAME is not set; falling back to localhost");
                "localhost".to_string()
            }
        }
    }
}

/// Fixed-identity provider for tests and single-host deployments.
pub struct StaticHostnameProvider(pub String);

impl HostnameProvider for StaticHostnameProvider {
    fn hostname(&self) -> String {
        self.0.clone()
    }
}
