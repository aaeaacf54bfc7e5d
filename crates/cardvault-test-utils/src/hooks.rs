//! Artifact hooks for tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use cardvault_core::CharacterId;
use cardvault_ingest::{ArtifactHook, ArtifactHookError};
use tokio::sync::Notify;

/// Hook that records each call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingHook {
    calls: Mutex<Vec<(CharacterId, String)>>,
    fail: AtomicBool,
    notify: Notify,
}

impl RecordingHook {
    /// Creates a hook that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent calls fail (after recording them).
    pub fn fail_calls(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Recorded calls, in order.
    pub fn calls(&self) -> Vec<(CharacterId, String)> {
        self.calls.lock().expect("lock").clone()
    }

    /// Waits until at least `count` calls were recorded, up to one second.
    ///
    /// Returns false on timeout.
    pub async fn wait_for_calls(&self, count: usize) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.calls.lock().expect("lock").len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(1), wait).await.is_ok()
    }
}

#[async_trait]
impl ArtifactHook for RecordingHook {
    async fn on_definition_committed(
        &self,
        character: CharacterId,
        definition_text: String,
    ) -> Result<(), ArtifactHookError> {
        self.calls
            .lock()
            .expect("lock")
            .push((character, definition_text));
        self.notify.notify_waiters();
        if self.fail.load(Ordering::SeqCst) {
            return Err(ArtifactHookError::new("injected hook failure"));
        }
        Ok(())
    }
}
