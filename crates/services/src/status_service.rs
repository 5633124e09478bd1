use std::sync::Arc;

use domains::{DomainResult, ServiceRepository, ServiceStatus};
use tracing::{instrument, warn};

#[derive(Clone)]
pub struct StatusService {
    repo: Arc<dyn ServiceRepository>,
}

impl StatusService {
    pub fn new(repo: Arc<dyn ServiceRepository>) -> Self {
        Self { repo }
    }

    pub async fn status(&self) -> DomainResult<ServiceStatus> {
        self.repo.status().await
    }

    /// Drops all users, forums, threads, posts and votes.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> DomainResult<()> {
        self.repo.clear().await?;
        warn!("all forum data cleared");
        Ok(())
    }
}
