// Picks a document source from the shape of the location
use crate::application::document_source::DocumentSource;
use crate::domain::weather::RawDocument;
use crate::infrastructure::file_source::FileDocumentSource;
use crate::infrastructure::http_source::HttpDocumentSource;
use crate::infrastructure::synthetic_source::{self, SyntheticDocumentSource};
use anyhow::Result;
use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Http,
    Synthetic,
    File,
}

impl SourceKind {
    fn of(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            SourceKind::Http
        } else if location.starts_with(synthetic_source::SCHEME) {
            SourceKind::Synthetic
        } else {
            SourceKind::File
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoutingDocumentSource {
    file: FileDocumentSource,
    http: HttpDocumentSource,
    synthetic: SyntheticDocumentSource,
}

impl RoutingDocumentSource {
    pub fn new(sampling_interval_secs: u32) -> Self {
        Self {
            file: FileDocumentSource::new(),
            http: HttpDocumentSource::new(),
            synthetic: SyntheticDocumentSource::new(sampling_interval_secs),
        }
    }
}

#[async_trait]
impl DocumentSource for RoutingDocumentSource {
    async fn fetch(&self, location: &str) -> Result<RawDocument> {
        match SourceKind::of(location) {
            SourceKind::Http => self.http.fetch(location).await,
            SourceKind::Synthetic => self.synthetic.fetch(location).await,
            SourceKind::File => self.file.fetch(location).await,
        }
    }
}
