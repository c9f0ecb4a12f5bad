use std::sync::Arc;

use tracing::error;

use inquiry_db::Database;

use crate::error::InquiryError;
use crate::lifecycle::ThreadLifecycle;
use crate::messaging::Messaging;
use crate::slug::SlugGenerator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub lifecycle: ThreadLifecycle,
    pub messaging: Messaging,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, slugs: SlugGenerator) -> AppState {
        Arc::new(Self {
            lifecycle: ThreadLifecycle::new(db.clone(), slugs),
            messaging: Messaging::new(db),
        })
    }
}

/// Run a service call on the blocking pool; SQLite access is synchronous.
pub(crate) async fn run_blocking<F, T>(f: F) -> Result<T, InquiryError>
where
    F: FnOnce() -> Result<T, InquiryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        InquiryError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
