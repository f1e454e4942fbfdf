//! Default source loader: resolves text, file, blob, and URL sources into inputs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};

use attache_core::file_safety::{detect_content_type, is_text_mime, normalize_mime, validate_input};
use attache_core::{AttachmentSource, Error, Input, Result, SourceLoader};

use crate::config::PipelineConfig;

/// Loader for every [`AttachmentSource`] variant.
///
/// Files are read with `tokio::fs`, URLs fetched with `reqwest`. Every payload
/// passes the size and executable checks before it becomes an [`Input`];
/// text-like mime types decode to text, everything else stays binary.
pub struct DefaultSourceLoader {
    client: reqwest::Client,
    max_input_bytes: usize,
}

impl DefaultSourceLoader {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.url_fetch_timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            max_input_bytes: config.max_input_bytes,
        })
    }

    fn load_text(
        &self,
        text_plain: Option<&str>,
        text_html: Option<&str>,
    ) -> Result<Input> {
        let (mime, text) = match (text_html, text_plain) {
            (Some(html), _) if !html.trim().is_empty() => ("text/html", html),
            (_, Some(plain)) if !plain.is_empty() => ("text/plain", plain),
            _ => return Err(Error::Input("No text content to attach".to_string())),
        };
        if text.len() > self.max_input_bytes {
            return Err(self.too_large("Text", text.len() as u64));
        }
        Ok(Input::text(mime, text))
    }

    fn too_large(&self, what: &str, size: u64) -> Error {
        Error::Input(format!(
            "{} of {} bytes exceeds maximum size of {} bytes",
            what, size, self.max_input_bytes
        ))
    }

    async fn load_file(&self, path: &std::path::Path, ref_name: &str) -> Result<Input> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| Error::Input(format!("Failed to read '{}': {}", path.display(), e)))?;
        if metadata.len() > self.max_input_bytes as u64 {
            return Err(self.too_large("File", metadata.len()));
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|e| Error::Input(format!("Failed to read '{}': {}", path.display(), e)))?;
        let name = if ref_name.is_empty() {
            path.to_string_lossy().into_owned()
        } else {
            ref_name.to_string()
        };
        self.finish(&name, data, None)
    }

    async fn load_url(&self, url: &str) -> Result<Input> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| Error::Input(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::Input(format!(
                "Unsupported URL scheme '{}'",
                parsed.scheme()
            )));
        }

        let mut response = self
            .client
            .get(parsed.clone())
            .send()
            .await
            .map_err(|e| Error::Input(format!("Failed to fetch '{}': {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Input(format!(
                "Fetching '{}' returned HTTP {}",
                url, status
            )));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_input_bytes as u64 {
                return Err(self.too_large("Remote document", len));
            }
        }

        let claimed = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(normalize_mime);

        // Chunked responses carry no length up front
        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Input(format!("Failed to read body of '{}': {}", url, e)))?
        {
            if data.len() + chunk.len() > self.max_input_bytes {
                return Err(Error::Input(format!(
                    "Remote document exceeds maximum size of {} bytes",
                    self.max_input_bytes
                )));
            }
            data.extend_from_slice(&chunk);
        }

        let name = parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|s| !s.is_empty())
            .unwrap_or("")
            .to_string();
        self.finish(&name, data, claimed.as_deref())
    }

    /// Validate, detect the mime type, and decode.
    fn finish(&self, name: &str, data: Vec<u8>, claimed: Option<&str>) -> Result<Input> {
        if let Some(reason) = validate_input(name, &data, self.max_input_bytes) {
            warn!(name, reason = %reason, "Rejected input");
            return Err(Error::Input(reason));
        }

        // A declared textual type (e.g. text/html from a server) is more specific
        // than extension guessing, binary claims are still verified.
        let mime = match claimed {
            Some(claim) if is_text_mime(claim) && infer::get(&data).is_none() => claim.to_string(),
            _ => detect_content_type(name, &data, claimed),
        };
        debug!(name, mime_type = %mime, data_size = data.len(), "Detected input type");

        if is_text_mime(&mime) {
            let text = match String::from_utf8(data) {
                Ok(text) => text,
                Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
            };
            Ok(Input::text(mime, text))
        } else {
            Ok(Input::bytes(mime, data))
        }
    }
}

#[async_trait]
impl SourceLoader for DefaultSourceLoader {
    async fn load(&self, source: &AttachmentSource) -> Result<Input> {
        match source {
            AttachmentSource::Text {
                text_plain,
                text_html,
                ..
            } => self.load_text(text_plain.as_deref(), text_html.as_deref()),
            AttachmentSource::File { path, ref_name } => self.load_file(path, ref_name).await,
            AttachmentSource::Blob {
                ref_name,
                mime_type,
                data,
            } => self.finish(ref_name, data.clone(), mime_type.as_deref()),
            AttachmentSource::Url { url, .. } => self.load_url(url).await,
        }
    }
}
