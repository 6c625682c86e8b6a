use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::error;
use tracing::info;

use super::Observable;
use crate::constants::NAMESPACE_PREFIX;
use crate::utils::backoff::task_with_timeout_and_exponential_backoff;
use crate::utils::hostname::EnvHostnameProvider;
use crate::utils::hostname::HostnameProvider;
use crate::CoordinationClient;
use crate::CoordinationError;
use crate::Result;
use crate::Settings;

/// Builds per-topic [`Observable`] instances over one coordination-service
/// session.
///
/// The session is owned by the factory and injected into every observable
/// it creates; there is no global singleton, so multiple independent
/// factories (and their sessions) can coexist in one process.
pub struct ObservableFactory {
    client: Arc<dyn CoordinationClient>,
    settings: Settings,
    namespace: String,
    hostname: String,
}

impl ObservableFactory {
    /// Establishes the session and resolves this process's identity.
    ///
    /// Session establishment is retried under the configured session
    /// backoff policy; exhausting it is fatal for the factory call.
    ///
    /// # Errors
    /// - Returns [`CoordinationError::SessionEstablishFailed`] when the retry budget is spent
    pub async fn connect(client: Arc<dyn CoordinationClient>, settings: Settings) -> Result<Self> {
        Self::connect_with_hostname(client, settings, &EnvHostnameProvider).await
    }

    /// Same as [`connect`](ObservableFactory::connect) with an injectable
    /// identity provider.
    pub async fn connect_with_hostname(
        client: Arc<dyn CoordinationClient>,
        settings: Settings,
        hostname_provider: &dyn HostnameProvider,
    ) -> Result<Self> {
        let policy = settings.retry.session;
        if let Err(e) = task_with_timeout_and_exponential_backoff(
            || {
                let client = client.clone();
                async move { client.ensure_session().await }
            },
            policy,
        )
        .await
        {
            error!("session establishment failed: {}", e);
            return Err(CoordinationError::SessionEstablishFailed {
                retries: policy.max_retries,
            }
            .into());
        }

        let namespace = format!("/{}/{}", NAMESPACE_PREFIX, settings.coordination.namespace_suffix);
        let hostname = hostname_provider.hostname();
        info!("coordination session established under {}", namespace);

        Ok(Self {
            client,
            settings,
            namespace,
            hostname,
        })
    }

    /// Builds an observable bound to `/<namespace>/<topic>`.
    pub async fn create<T>(&self, topic: &str) -> Result<Observable<T>>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        Observable::new(
            self.client.clone(),
            self.settings.notification,
            self.settings.retry.cleanup,
            self.hostname.clone(),
            topic.to_string(),
            format!("{}/{}", self.namespace, topic),
        )
        .await
    }
}
