//! Application state and the backend handle.

use std::future::Future;
use std::sync::Arc;

use ee_client::{EarthEngine, HttpConfig, HttpEarthEngine, ProjectInfo, Result};
use futures::future::{BoxFuture, FutureExt};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Produces a connected, verified backend client.
type Connector = Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn EarthEngine>>> + Send + Sync>;

/// Lazily-initialized backend client shared by all requests.
///
/// The first caller connects; later callers reuse the client. A failed
/// connection is not cached, so the next request tries again.
pub struct BackendHandle {
    connector: Connector,
    client: Mutex<Option<Arc<dyn EarthEngine>>>,
}

impl BackendHandle {
    /// Handle whose clients come from `connect`.
    pub fn new<F, Fut>(connect: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Arc<dyn EarthEngine>>> + Send + 'static,
    {
        Self {
            connector: Box::new(move || connect().boxed()),
            client: Mutex::new(None),
        }
    }

    /// Handle connecting over HTTP with `config`.
    pub fn http(config: HttpConfig) -> Self {
        Self::new(move || {
            let config = config.clone();
            async move {
                let engine = HttpEarthEngine::connect(config).await?;
                Ok(Arc::new(engine) as Arc<dyn EarthEngine>)
            }
        })
    }

    /// Handle over an existing client; `initialize` still runs on first use.
    pub fn with_engine(engine: Arc<dyn EarthEngine>) -> Self {
        Self::new(move || {
            let engine = Arc::clone(&engine);
            async move {
                engine.initialize().await?;
                Ok(engine)
            }
        })
    }

    /// The connected client, connecting first if needed.
    ///
    /// The lock is only held to read or store the slot. Concurrent callers
    /// may each connect; the first client stored wins.
    pub async fn client(&self) -> Result<Arc<dyn EarthEngine>> {
        if let Some(ref client) = *self.client.lock().await {
            return Ok(Arc::clone(client));
        }

        match (self.connector)().await {
            Ok(client) => {
                let mut slot = self.client.lock().await;
                if let Some(ref stored) = *slot {
                    return Ok(Arc::clone(stored));
                }
                info!(project = %client.project_info().project_id, "Backend initialized");
                *slot = Some(Arc::clone(&client));
                Ok(client)
            }
            Err(e) => {
                warn!(error = %e, "Backend initialization failed");
                Err(e)
            }
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.client.lock().await.is_some()
    }

    /// Drop the cached client; the next call reconnects.
    pub async fn reset(&self) {
        self.client.lock().await.take();
    }
}

/// Shared application state.
pub struct AppState {
    /// Backend client handle.
    pub backend: BackendHandle,

    /// Configured backend identity, reported even when the backend is down.
    pub project: ProjectInfo,

    /// Prometheus exporter, when installed.
    pub prometheus: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        backend: BackendHandle,
        project: ProjectInfo,
        prometheus: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            backend,
            project,
            prometheus,
        }
    }

    /// State over an in-process client, without metrics export.
    pub fn with_engine(engine: Arc<dyn EarthEngine>) -> Self {
        let project = engine.project_info();
        Self::new(BackendHandle::with_engine(engine), project, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use test_utils::MockEarthEngine;

    #[tokio::test]
    async fn test_client_initializes_once() {
        let mock = Arc::new(MockEarthEngine::new());
        let handle = BackendHandle::with_engine(mock.clone());
        assert!(!handle.is_initialized().await);

        handle.client().await.unwrap();
        handle.client().await.unwrap();

        assert!(handle.is_initialized().await);
        // initialize ran exactly once
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_initialization_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let handle = BackendHandle::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(ee_client::EeError::initialization("no credentials"))
            }
        });

        assert!(handle.client().await.is_err());
        assert!(handle.client().await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(!handle.is_initialized().await);
    }

    #[tokio::test]
    async fn test_hung_initialization_does_not_block_other_callers() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&attempts);
        let mock: Arc<dyn EarthEngine> = Arc::new(MockEarthEngine::new());
        let handle = Arc::new(BackendHandle::new(move || {
            let engine = Arc::clone(&mock);
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    futures::future::pending::<()>().await;
                }
                Ok(engine)
            }
        }));

        let hung = Arc::clone(&handle);
        let stuck = tokio::spawn(async move { hung.client().await.map(|_| ()) });
        while attempts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = tokio::time::timeout(Duration::from_secs(2), handle.client()).await;
        assert!(matches!(second, Ok(Ok(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert!(handle.is_initialized().await);
        stuck.abort();
    }

    #[test]
    fn test_with_engine_reports_project() {
        let state = AppState::with_engine(Arc::new(MockEarthEngine::new()));
        assert_eq!(state.project.project_id, "test-project");

        let client = tokio_test::block_on(state.backend.client()).unwrap();
        assert_eq!(client.project_info(), state.project);
    }

    #[tokio::test]
    async fn test_reset_forces_reconnect() {
        let mock = Arc::new(MockEarthEngine::new());
        let handle = BackendHandle::with_engine(mock.clone());

        handle.client().await.unwrap();
        handle.reset().await;
        assert!(!handle.is_initialized().await);
        handle.client().await.unwrap();

        assert_eq!(mock.call_count(), 2);
    }
}
