//! Handler types and dependencies

use std::sync::Arc;

use crate::hosting::PhotoHost;
use crate::storage::orders::OrderStore;
use crate::telegram::wizard::media_group::MediaGroupAggregator;
use crate::telegram::wizard::session::SessionStore;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub sessions: Arc<SessionStore>,
    pub media_groups: Arc<MediaGroupAggregator>,
    pub store: Arc<dyn OrderStore>,
    pub photo_host: Arc<dyn PhotoHost>,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        sessions: Arc<SessionStore>,
        media_groups: Arc<MediaGroupAggregator>,
        store: Arc<dyn OrderStore>,
        photo_host: Arc<dyn PhotoHost>,
    ) -> Self {
        Self {
            sessions,
            media_groups,
            store,
            photo_host,
        }
    }
}
