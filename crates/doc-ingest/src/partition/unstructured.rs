//! Unstructured partition API client

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use super::{ElementCategory, LayoutElement, Partitioner};
use crate::config::PdfConfig;
use crate::error::{Error, Result};

/// Block types whose images the API should return
const IMAGE_BLOCK_TYPES: &str = r#"["Image", "Table"]"#;

#[derive(Debug, Deserialize)]
struct UnstructuredElement {
    #[serde(rename = "type")]
    element_type: String,
    #[serde(default)]
    text: String,
    metadata: Option<UnstructuredMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct UnstructuredMetadata {
    page_number: Option<u32>,
    filename: Option<String>,
    text_as_html: Option<String>,
    image_base64: Option<String>,
    image_mime_type: Option<String>,
}

/// Partitioner backed by the Unstructured HTTP API (`hi_res` strategy)
pub struct UnstructuredPartitioner {
    url: String,
    api_key: Option<String>,
    strategy: String,
    timeout: Duration,
}

impl UnstructuredPartitioner {
    pub fn new(config: &PdfConfig) -> Self {
        Self {
            url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            strategy: config.strategy.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    fn request(&self, path: &Path) -> Result<Vec<UnstructuredElement>> {
        let data = fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());

        let form = reqwest::blocking::multipart::Form::new()
            .part(
                "files",
                reqwest::blocking::multipart::Part::bytes(data).file_name(filename),
            )
            .text("strategy", self.strategy.clone())
            .text("pdf_infer_table_structure", "true")
            .text("extract_image_block_types", IMAGE_BLOCK_TYPES);

        // Must not be built on an async runtime thread.
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let mut request = client.post(&self.url).multipart(form);
        if let Some(ref api_key) = self.api_key {
            request = request.header("unstructured-api-key", api_key);
        }

        let response = request
            .send()
            .map_err(|e| Error::partition(format!("Unstructured API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(Error::partition(format!(
                "Unstructured API error: {} - {}",
                status, body
            )));
        }

        response
            .json()
            .map_err(|e| Error::partition(format!("Failed to parse Unstructured response: {}", e)))
    }
}

/// Convert API elements, writing base64 block images into `image_dir`
fn convert(raw: Vec<UnstructuredElement>, image_dir: &Path) -> Result<Vec<LayoutElement>> {
    let mut elements = Vec::with_capacity(raw.len());
    let mut image_count = 0usize;

    for element in raw {
        let meta = element.metadata.unwrap_or_default();
        let category = ElementCategory::from_label(&element.element_type);

        if let Some(ref payload) = meta.image_base64 {
            image_count += 1;
            let prefix = if category == ElementCategory::Table { "table" } else { "figure" };
            let ext = match meta.image_mime_type.as_deref() {
                Some("image/png") => "png",
                _ => "jpg",
            };
            let name = format!(
                "{}-{}-{}.{}",
                prefix,
                meta.page_number.unwrap_or(0),
                image_count,
                ext
            );
            match BASE64.decode(payload) {
                Ok(bytes) => {
                    fs::create_dir_all(image_dir)?;
                    if let Err(e) = fs::write(image_dir.join(&name), bytes) {
                        tracing::warn!("Failed to write block image {}: {}", name, e);
                    }
                }
                Err(e) => tracing::warn!("Skipping undecodable block image {}: {}", name, e),
            }
        }

        elements.push(LayoutElement {
            category,
            text: element.text,
            page_number: meta.page_number,
            filename: meta.filename,
            text_as_html: meta.text_as_html,
        });
    }

    Ok(elements)
}

impl Partitioner for UnstructuredPartitioner {
    fn partition(&self, path: &Path, image_dir: &Path) -> Result<Vec<LayoutElement>> {
        tracing::debug!("Partitioning {} via {}", path.display(), self.url);
        let raw = self.request(path)?;
        convert(raw, image_dir)
    }

    fn name(&self) -> &'static str {
        "unstructured"
    }
}
