//! Paged history reads
//!
//! Serves `GET /api/messages`: members of a surface read its history newest
//! page first, walking back with the exclusive cursor of the previous page.

use std::sync::Arc;

use crate::backend::error::BackendError;
use crate::backend::middleware::auth::Identity;
use crate::backend::store::MessageStore;
use crate::shared::{AppConfig, Page, PageRequest};

pub struct HistoryService {
    store: Arc<dyn MessageStore>,
    config: Arc<AppConfig>,
}

impl HistoryService {
    pub fn new(store: Arc<dyn MessageStore>, config: Arc<AppConfig>) -> Self {
        Self { store, config }
    }

    pub async fn fetch_page(
        &self,
        identity: Option<Identity>,
        request: PageRequest,
    ) -> Result<Page, BackendError> {
        let identity = identity.ok_or(BackendError::Unauthorized)?;
        if self
            .store
            .membership(&request.surface, identity.profile_id)
            .await?
            .is_none()
        {
            return Err(BackendError::forbidden(format!(
                "Not a member of {}",
                request.surface
            )));
        }

        let limit = self.config.clamp_page_size(request.limit);
        let page = self.store.page(&request.surface, request.cursor, limit).await?;
        tracing::debug!(
            "[History] {} messages from {} (cursor {:?}, more: {})",
            page.items.len(),
            request.surface,
            request.cursor.map(|c| c.to_string()),
            page.next_cursor.is_some()
        );
        Ok(page)
    }
}
