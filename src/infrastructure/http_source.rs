// HTTP document source
use crate::application::document_source::DocumentSource;
use crate::domain::weather::RawDocument;
use crate::infrastructure::file_source::{parse_document, DocumentFormat};
use anyhow::{Context, Result};
use async_trait::async_trait;

#[derive(Debug, Clone, Default)]
pub struct HttpDocumentSource {
    client: reqwest::Client,
}

impl HttpDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn format_for(url: &str, content_type: Option<&str>) -> DocumentFormat {
        match content_type {
            Some(ct) if ct.contains("json") => DocumentFormat::Json,
            Some(ct) if ct.contains("yaml") => DocumentFormat::Yaml,
            _ => DocumentFormat::from_path(url.split('?').next().unwrap_or(url)),
        }
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch(&self, location: &str) -> Result<RawDocument> {
        let response = self
            .client
            .get(location)
            .header("Accept", "application/yaml, application/json, text/plain")
            .send()
            .await
            .context("Failed to send dataset request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Dataset request failed with status {}: {}", status, body);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let text = response
            .text()
            .await
            .context("Failed to read dataset response body")?;

        parse_document(&text, Self::format_for(location, content_type.as_deref()))
    }
}
