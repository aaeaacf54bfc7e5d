//! Post-commit artifact hook.
//!
//! After a definition is committed, derived artifacts (search indexes,
//! embeddings) may need regenerating. That work is delegated to an
//! [`ArtifactHook`] running on a detached task; its failure is logged and
//! counted but never reverts the commit.

use std::sync::Arc;

use async_trait::async_trait;
use cardvault_core::CharacterId;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::ArtifactHookError;
use crate::metrics;

/// Receives committed definitions.
#[async_trait]
pub trait ArtifactHook: Send + Sync + 'static {
    /// Called once per committed definition with its summary text.
    async fn on_definition_committed(
        &self,
        character: CharacterId,
        definition_text: String,
    ) -> Result<(), ArtifactHookError>;
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

#[async_trait]
impl ArtifactHook for NoopHook {
    async fn on_definition_committed(
        &self,
        _character: CharacterId,
        _definition_text: String,
    ) -> Result<(), ArtifactHookError> {
        Ok(())
    }
}

/// Runs the hook on a detached task.
pub(crate) fn spawn(
    hook: Arc<dyn ArtifactHook>,
    character: CharacterId,
    definition_text: String,
) -> JoinHandle<()> {
    let span = tracing::info_span!("artifact_hook", character = %character);
    tokio::spawn(
        async move {
            if let Err(error) = hook.on_definition_committed(character, definition_text).await {
                metrics::record_hook_failure();
                tracing::warn!(%error, "artifact hook failed; committed data kept");
            }
        }
        .instrument(span),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Failing(AtomicU32);

    #[async_trait]
    impl ArtifactHook for Failing {
        async fn on_definition_committed(
            &self,
            _character: CharacterId,
            _definition_text: String,
        ) -> Result<(), ArtifactHookError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ArtifactHookError::new("index offline"))
        }
    }

    #[tokio::test]
    async fn failure_does_not_propagate() {
        let hook = Arc::new(Failing(AtomicU32::new(0)));
        spawn(hook.clone(), CharacterId::generate(), "text".into())
            .await
            .unwrap();
        assert_eq!(hook.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn noop_succeeds() {
        NoopHook
            .on_definition_committed(CharacterId::generate(), String::new())
            .await
            .unwrap();
    }
}
