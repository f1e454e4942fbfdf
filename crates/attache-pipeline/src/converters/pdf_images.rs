//! PdfImages converter: renders PDF pages to PNG with `pdftoppm`.

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::debug;

use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

use super::command::{binary_available, run_cmd_status, write_temp_file};
use super::image::data_url;
use super::pdf_text::ensure_pdf;
use crate::config::PipelineConfig;

/// Converter producing one PNG image part per PDF page.
///
/// Rendering stops after `max_pdf_image_pages` pages.
pub struct PdfImagesConverter {
    timeout_secs: u64,
    dpi: u32,
    max_pages: usize,
}

impl PdfImagesConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            timeout_secs: config.converter_cmd_timeout_secs,
            dpi: config.pdf_render_dpi,
            max_pages: config.max_pdf_image_pages,
        }
    }
}

#[async_trait]
impl OutputConverter for PdfImagesConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::PdfImages
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let data = input.data.as_bytes();
        ensure_pdf(data)?;

        let tmpfile = write_temp_file(data)?;
        let pdf_path = tmpfile.path().to_string_lossy().to_string();

        let img_dir = TempDir::new()
            .map_err(|e| Error::Conversion(format!("Failed to create temp dir: {}", e)))?;
        let img_prefix = img_dir.path().join("page").to_string_lossy().to_string();

        debug!(dpi = self.dpi, max_pages = self.max_pages, "Rendering PDF pages");

        // Rendering is slower than text extraction
        run_cmd_status(
            Command::new("pdftoppm")
                .arg("-png")
                .arg("-r")
                .arg(self.dpi.to_string())
                .arg("-f")
                .arg("1")
                .arg("-l")
                .arg(self.max_pages.to_string())
                .arg(&pdf_path)
                .arg(&img_prefix),
            self.timeout_secs.saturating_mul(3),
        )
        .await?;

        let mut entries = tokio::fs::read_dir(img_dir.path())
            .await
            .map_err(|e| Error::Conversion(format!("Failed to read temp dir: {}", e)))?;
        let mut page_images = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::Conversion(format!("Failed to read dir entry: {}", e)))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("png") {
                page_images.push(path);
            }
        }
        // pdftoppm zero-pads page numbers, so name order is page order
        page_images.sort();
        page_images.truncate(self.max_pages);

        if page_images.is_empty() {
            return Err(Error::Conversion("No pages rendered from PDF".to_string()));
        }

        let mut parts = Vec::with_capacity(page_images.len());
        for path in &page_images {
            let png = tokio::fs::read(path)
                .await
                .map_err(|e| Error::Conversion(format!("Failed to read rendered page: {}", e)))?;
            parts.push(OutputPart::image(data_url("image/png", &png)));
        }
        debug!(pages = parts.len(), "Rendered PDF pages");
        Ok(parts)
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(binary_available("pdftoppm", "-v").await)
    }

    fn name(&self) -> &str {
        "pdf_images"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::pdf_text::tests::HELLO_PDF;
    use attache_core::OutputPartType;

    #[tokio::test]
    async fn test_pdf_images_invalid_pdf() {
        let converter = PdfImagesConverter::new(&PipelineConfig::default());
        let err = converter
            .convert(&Input::bytes("application/pdf", b"GIF89a".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conversion(_)));
    }

    #[tokio::test]
    async fn test_pdf_images_huge_timeout_does_not_overflow() {
        let config = PipelineConfig::default().with_converter_cmd_timeout(u64::MAX / 2);
        assert!(config.validate().is_ok());
        let converter = PdfImagesConverter::new(&config);
        let available = converter.health_check().await.unwrap_or(false);

        let result = converter
            .convert(&Input::bytes("application/pdf", HELLO_PDF.to_vec()))
            .await;
        assert_eq!(result.is_ok(), available, "{:?}", result.err());
    }

    #[tokio::test]
    async fn test_pdf_images_renders_pages() {
        let converter = PdfImagesConverter::new(&PipelineConfig::default());
        if !converter.health_check().await.unwrap_or(false) {
            eprintln!("Skipping test_pdf_images_renders_pages: pdftoppm not installed");
            return;
        }

        let outputs = converter
            .convert(&Input::bytes("application/pdf", HELLO_PDF.to_vec()))
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].part_type(), OutputPartType::ImagePart);
        match &outputs[0] {
            OutputPart::ImagePart { base64_url } => {
                assert!(base64_url.starts_with("data:image/png;base64,"))
            }
            other => panic!("expected image part, got {:?}", other),
        }
    }
}
