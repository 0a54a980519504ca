use std::sync::Arc;

use carebase_core::{CareCore, CareResult};
use carebase_llm::CareAssistant;

use crate::error::ApiResult;
use crate::realtime::Hub;

/// Shared by every handler and WebSocket connection.
#[derive(Clone)]
pub struct AppState {
    pub core: CareCore,
    pub assistant: Arc<dyn CareAssistant>,
    pub hub: Hub,
}

impl AppState {
    pub fn new(core: CareCore, assistant: Arc<dyn CareAssistant>) -> Self {
        Self {
            core,
            assistant,
            hub: Hub::default(),
        }
    }

    /// Run a core operation on the blocking pool. The database lock is
    /// taken and released inside `f`, never across an `.await`.
    pub async fn run<T, F>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&CareCore) -> CareResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let core = self.core.clone();
        Ok(tokio::task::spawn_blocking(move || f(&core)).await??)
    }
}
