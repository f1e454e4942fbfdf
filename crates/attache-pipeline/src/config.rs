//! Pipeline configuration.
//!
//! Values default to the constants in [`attache_core::defaults`] and can be
//! overridden from `ATTACHE_*` environment variables or with the `with_*`
//! builders.

use attache_core::defaults;
use attache_core::{Error, OutputPartType, Result};
use tracing::warn;

/// Configuration shared by the loader, the catalog, and the reference converters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Output part types the consumer accepts (drives compatibility status).
    pub accepted_output_part_types: Vec<OutputPartType>,
    /// Loaded inputs larger than this fail with an input error.
    pub max_input_bytes: usize,
    /// Size limit for the text converters (text, rich text, PDF text, OCR).
    pub max_text_convert_bytes: usize,
    /// Size limit for passing images through as image parts.
    pub max_image_convert_bytes: usize,
    /// Size limit for rendering PDFs to images.
    pub max_pdf_images_convert_bytes: usize,
    /// Timeout for fetching URL sources.
    pub url_fetch_timeout_secs: u64,
    /// Timeout for each external converter command.
    pub converter_cmd_timeout_secs: u64,
    /// PDFs with more pages than this have their text extracted in batches.
    pub large_pdf_page_threshold: usize,
    /// Pages per `pdftotext` batch for large PDFs.
    pub pdf_batch_pages: usize,
    /// Resolution for PDF page rendering.
    pub pdf_render_dpi: u32,
    /// Maximum number of PDF pages rendered to images.
    pub max_pdf_image_pages: usize,
    /// Tesseract language code.
    pub ocr_language: String,
    /// Capacity of the attachment event bus.
    pub event_bus_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            accepted_output_part_types: defaults::ACCEPTED_OUTPUT_PART_TYPES.to_vec(),
            max_input_bytes: defaults::MAX_INPUT_BYTES,
            max_text_convert_bytes: defaults::MAX_TEXT_CONVERT_BYTES,
            max_image_convert_bytes: defaults::MAX_IMAGE_CONVERT_BYTES,
            max_pdf_images_convert_bytes: defaults::MAX_PDF_IMAGES_CONVERT_BYTES,
            url_fetch_timeout_secs: defaults::URL_FETCH_TIMEOUT_SECS,
            converter_cmd_timeout_secs: defaults::CONVERTER_CMD_TIMEOUT_SECS,
            large_pdf_page_threshold: defaults::LARGE_PDF_PAGE_THRESHOLD,
            pdf_batch_pages: defaults::PDF_BATCH_PAGES,
            pdf_render_dpi: defaults::PDF_RENDER_DPI,
            max_pdf_image_pages: defaults::MAX_PDF_IMAGE_PAGES,
            ocr_language: defaults::OCR_LANGUAGE.to_string(),
            event_bus_capacity: defaults::EVENT_BUS_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ATTACHE_ACCEPTED_PARTS` | `text-block` | Comma-separated accepted output part types |
    /// | `ATTACHE_MAX_INPUT_BYTES` | `52428800` | Max loaded input size |
    /// | `ATTACHE_MAX_TEXT_CONVERT_BYTES` | `10485760` | Text converter size limit |
    /// | `ATTACHE_MAX_IMAGE_CONVERT_BYTES` | `20971520` | Image passthrough size limit |
    /// | `ATTACHE_MAX_PDF_IMAGES_CONVERT_BYTES` | `26214400` | PDF rendering size limit |
    /// | `ATTACHE_URL_TIMEOUT_SECS` | `30` | URL fetch timeout |
    /// | `ATTACHE_CMD_TIMEOUT_SECS` | `60` | External command timeout |
    /// | `ATTACHE_LARGE_PDF_PAGE_THRESHOLD` | `100` | Page count above which PDF text is batched |
    /// | `ATTACHE_PDF_BATCH_PAGES` | `50` | Pages per PDF text batch |
    /// | `ATTACHE_PDF_RENDER_DPI` | `100` | PDF render resolution |
    /// | `ATTACHE_MAX_PDF_IMAGE_PAGES` | `20` | Max rendered PDF pages |
    /// | `ATTACHE_OCR_LANGUAGE` | `eng` | Tesseract language |
    /// | `ATTACHE_EVENT_BUS_CAPACITY` | `256` | Buffered attachment events per subscriber |
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable values fall back
    /// to defaults with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("ATTACHE_ACCEPTED_PARTS") {
            let parsed: std::result::Result<Vec<OutputPartType>, String> = raw
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(types) => config.accepted_output_part_types = types,
                Err(e) => warn!(error = %e, "Ignoring ATTACHE_ACCEPTED_PARTS"),
            }
        }

        let number = |key: &str, current: usize| -> usize {
            match lookup(key).map(|v| v.trim().parse::<usize>()) {
                Some(Ok(v)) => v,
                Some(Err(e)) => {
                    warn!(key, error = %e, "Ignoring unparseable setting");
                    current
                }
                None => current,
            }
        };

        config.max_input_bytes = number("ATTACHE_MAX_INPUT_BYTES", config.max_input_bytes);
        config.max_text_convert_bytes =
            number("ATTACHE_MAX_TEXT_CONVERT_BYTES", config.max_text_convert_bytes);
        config.max_image_convert_bytes =
            number("ATTACHE_MAX_IMAGE_CONVERT_BYTES", config.max_image_convert_bytes);
        config.max_pdf_images_convert_bytes = number(
            "ATTACHE_MAX_PDF_IMAGES_CONVERT_BYTES",
            config.max_pdf_images_convert_bytes,
        );
        config.url_fetch_timeout_secs =
            number("ATTACHE_URL_TIMEOUT_SECS", config.url_fetch_timeout_secs as usize) as u64;
        config.converter_cmd_timeout_secs = number(
            "ATTACHE_CMD_TIMEOUT_SECS",
            config.converter_cmd_timeout_secs as usize,
        ) as u64;
        config.large_pdf_page_threshold = number(
            "ATTACHE_LARGE_PDF_PAGE_THRESHOLD",
            config.large_pdf_page_threshold,
        );
        config.pdf_batch_pages = number("ATTACHE_PDF_BATCH_PAGES", config.pdf_batch_pages);
        config.pdf_render_dpi =
            number("ATTACHE_PDF_RENDER_DPI", config.pdf_render_dpi as usize) as u32;
        config.max_pdf_image_pages =
            number("ATTACHE_MAX_PDF_IMAGE_PAGES", config.max_pdf_image_pages);

        if let Some(lang) = lookup("ATTACHE_OCR_LANGUAGE").filter(|l| !l.trim().is_empty()) {
            config.ocr_language = lang.trim().to_string();
        }
        config.event_bus_capacity =
            number("ATTACHE_EVENT_BUS_CAPACITY", config.event_bus_capacity);

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.max_input_bytes == 0 {
            return Err(Error::Config("max_input_bytes must be positive".to_string()));
        }
        if self.url_fetch_timeout_secs == 0 || self.converter_cmd_timeout_secs == 0 {
            return Err(Error::Config("timeouts must be positive".to_string()));
        }
        if self.pdf_render_dpi == 0 || self.max_pdf_image_pages == 0 {
            return Err(Error::Config(
                "pdf_render_dpi and max_pdf_image_pages must be positive".to_string(),
            ));
        }
        if self.pdf_batch_pages == 0 {
            return Err(Error::Config("pdf_batch_pages must be positive".to_string()));
        }
        if self.event_bus_capacity == 0 {
            return Err(Error::Config("event_bus_capacity must be positive".to_string()));
        }
        if self.ocr_language.is_empty() {
            return Err(Error::Config("ocr_language cannot be empty".to_string()));
        }
        Ok(())
    }

    /// Set the output part types the consumer accepts.
    pub fn with_accepted_output_part_types(mut self, types: Vec<OutputPartType>) -> Self {
        self.accepted_output_part_types = types;
        self
    }

    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    pub fn with_max_text_convert_bytes(mut self, bytes: usize) -> Self {
        self.max_text_convert_bytes = bytes;
        self
    }

    pub fn with_max_image_convert_bytes(mut self, bytes: usize) -> Self {
        self.max_image_convert_bytes = bytes;
        self
    }

    pub fn with_url_fetch_timeout(mut self, secs: u64) -> Self {
        self.url_fetch_timeout_secs = secs;
        self
    }

    pub fn with_converter_cmd_timeout(mut self, secs: u64) -> Self {
        self.converter_cmd_timeout_secs = secs;
        self
    }

    /// Set the page threshold and batch size for large PDF text extraction.
    pub fn with_pdf_batching(mut self, threshold: usize, batch_pages: usize) -> Self {
        self.large_pdf_page_threshold = threshold;
        self.pdf_batch_pages = batch_pages;
        self
    }

    pub fn with_event_bus_capacity(mut self, capacity: usize) -> Self {
        self.event_bus_capacity = capacity;
        self
    }

    pub fn with_ocr_language(mut self, language: impl Into<String>) -> Self {
        self.ocr_language = language.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.accepted_output_part_types,
            vec![OutputPartType::TextBlock]
        );
        assert_eq!(config.max_input_bytes, defaults::MAX_INPUT_BYTES);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("ATTACHE_ACCEPTED_PARTS", "text-block, image-part"),
            ("ATTACHE_MAX_INPUT_BYTES", "1024"),
            ("ATTACHE_URL_TIMEOUT_SECS", "5"),
            ("ATTACHE_OCR_LANGUAGE", "deu"),
            ("ATTACHE_PDF_BATCH_PAGES", "10"),
            ("ATTACHE_LARGE_PDF_PAGE_THRESHOLD", "40"),
            ("ATTACHE_EVENT_BUS_CAPACITY", "32"),
        ]));
        assert_eq!(
            config.accepted_output_part_types,
            vec![OutputPartType::TextBlock, OutputPartType::ImagePart]
        );
        assert_eq!(config.max_input_bytes, 1024);
        assert_eq!(config.url_fetch_timeout_secs, 5);
        assert_eq!(config.ocr_language, "deu");
        assert_eq!(config.pdf_batch_pages, 10);
        assert_eq!(config.large_pdf_page_threshold, 40);
        assert_eq!(config.event_bus_capacity, 32);
    }

    #[test]
    fn test_from_lookup_ignores_garbage() {
        let config = PipelineConfig::from_lookup(lookup_from(&[
            ("ATTACHE_ACCEPTED_PARTS", "text-block,video"),
            ("ATTACHE_MAX_INPUT_BYTES", "lots"),
        ]));
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = PipelineConfig::default().with_max_input_bytes(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = PipelineConfig::default().with_converter_cmd_timeout(0);
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_ocr_language("");
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_pdf_batching(100, 0);
        assert!(config.validate().is_err());

        let config = PipelineConfig::default().with_event_bus_capacity(0);
        assert!(config.validate().is_err());
    }
}
