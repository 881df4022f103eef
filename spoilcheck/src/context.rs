//! Shared state threaded through the ordered scenarios.

use spoilcheck_core::http::Client;
use std::sync::Mutex;

/// Explicit context passed into every scenario: the authorized session and
/// the story id captured by the create scenario. Scenarios run one at a
/// time, so the mutex only guards against accidental cross-task reuse.
pub struct Context {
    pub client: Client,
    story_id: Mutex<Option<String>>,
}

impl Context {
    pub fn new(client: Client) -> Context {
        Context {
            client,
            story_id: Mutex::new(None),
        }
    }

    /// Record the id returned by the create scenario for the ones after it.
    pub fn remember_story(&self, id: impl Into<String>) {
        if let Ok(mut guard) = self.story_id.lock() {
            *guard = Some(id.into());
        }
    }

    /// The id captured earlier in the run, if the create scenario managed
    /// to capture one.
    pub fn story_id(&self) -> Option<String> {
        self.story_id.lock().ok().and_then(|guard| guard.clone())
    }
}
