use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::BackendError;

/// One text-generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub user: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Language-model backend used by the stage executors
///
/// Implementations return the generated text or a classified failure. Any
/// provider (HTTP API, local model, test double) can sit behind this trait.
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError>;
}

/// Wraps a backend and fails any call that outlives `limit`
pub struct TimeoutBackend {
    inner: Arc<dyn TextBackend>,
    limit: Duration,
}

impl TimeoutBackend {
    pub fn new(inner: Arc<dyn TextBackend>, limit: Duration) -> Self {
        debug!("Backend timeout set to {:?}", limit);
        Self { inner, limit }
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }
}

#[async_trait]
impl TextBackend for TimeoutBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<String, BackendError> {
        match tokio::time::timeout(self.limit, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Backend call exceeded {:?}", self.limit);
                Err(BackendError::timeout(self.limit))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Reply, ScriptedBackend};
    use super::*;
    use crate::error::BackendErrorKind;

    fn request() -> GenerationRequest {
        GenerationRequest {
            system: "sys".to_string(),
            user: "user".to_string(),
            temperature: 0.3,
            max_tokens: 100,
        }
    }

    #[tokio::test]
    async fn test_timeout_backend_passes_through() {
        let scripted = Arc::new(ScriptedBackend::new());
        scripted.push_text("hello");
        let backend = TimeoutBackend::new(scripted.clone(), Duration::from_secs(5));

        assert_eq!(backend.generate(request()).await.unwrap(), "hello");
        assert_eq!(scripted.call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_backend_fails_slow_calls() {
        let scripted = Arc::new(ScriptedBackend::new());
        scripted.push(Reply::Delayed(Duration::from_secs(30), "late".to_string()));
        let backend = TimeoutBackend::new(scripted, Duration::from_millis(50));

        let err = backend.generate(request()).await.unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::Timeout);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let scripted = ScriptedBackend::new();
        scripted.push(Reply::Fail(BackendErrorKind::RateLimit));
        let err = scripted.generate(request()).await.unwrap_err();
        assert_eq!(err.kind, BackendErrorKind::RateLimit);
    }
}
