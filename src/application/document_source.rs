// Source trait for raw weather documents
use crate::domain::weather::RawDocument;
use async_trait::async_trait;

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch and deserialize the document found at `location`
    async fn fetch(&self, location: &str) -> anyhow::Result<RawDocument>;
}
