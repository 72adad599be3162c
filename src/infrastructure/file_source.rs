// File-backed document source (YAML or JSON)
use crate::application::document_source::DocumentSource;
use crate::domain::weather::RawDocument;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Yaml,
    Json,
}

impl DocumentFormat {
    pub fn from_path(path: &str) -> Self {
        let lowered = path.to_ascii_lowercase();
        if lowered.ends_with(".json") {
            DocumentFormat::Json
        } else {
            DocumentFormat::Yaml
        }
    }
}

pub fn parse_document(text: &str, format: DocumentFormat) -> Result<RawDocument> {
    match format {
        DocumentFormat::Yaml => serde_yaml::from_str(text).context("Failed to parse YAML document"),
        DocumentFormat::Json => serde_json::from_str(text).context("Failed to parse JSON document"),
    }
}

#[derive(Debug, Clone, Default)]
pub struct FileDocumentSource {
    base_dir: Option<PathBuf>,
}

impl FileDocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Relative locations are resolved against `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    fn resolve(&self, location: &str) -> PathBuf {
        let path = Path::new(location);
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn fetch(&self, location: &str) -> Result<RawDocument> {
        let path = self.resolve(location);
        tracing::debug!(path = %path.display(), "reading dataset file");

        let text = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        parse_document(&text, DocumentFormat::from_path(location))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
temperature:
  unit: dK
  values:
    - { time: "00:00:05", value: 2931.5 }
power:
  unit: MW
  values:
    - { time: "00:00:05", value: "100" }
"#;

    #[test]
    fn test_format_from_path() {
        assert_eq!(DocumentFormat::from_path("assets/data.yml"), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::from_path("DATA.JSON"), DocumentFormat::Json);
    }

    #[tokio::test]
    async fn test_reads_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("data.yml")).unwrap();
        file.write_all(YAML.as_bytes()).unwrap();

        let source = FileDocumentSource::with_base_dir(dir.path());
        let doc = source.fetch("data.yml").await.unwrap();
        assert_eq!(doc.temperature.unwrap().values.unwrap().len(), 1);
        assert_eq!(doc.power.unwrap().unit.as_deref(), Some("MW"));
    }

    #[tokio::test]
    async fn test_reads_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.json");
        std::fs::write(
            &path,
            r#"{"temperature":{"unit":"K","values":[{"time":"00:00:00","value":290}]}}"#,
        )
        .unwrap();

        let doc = FileDocumentSource::new()
            .fetch(path.to_str().unwrap())
            .await
            .unwrap();
        assert!(doc.power.is_none());
        assert_eq!(doc.temperature.unwrap().unit.as_deref(), Some("K"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileDocumentSource::with_base_dir(dir.path());
        let err = source.fetch("nope.yml").await.unwrap_err();
        assert!(err.to_string().contains("nope.yml"));
    }
}
