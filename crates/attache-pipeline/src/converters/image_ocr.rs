//! ImageOcr converter: recognizes text in images with `tesseract`.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

use super::command::{binary_available, run_cmd_with_timeout, write_temp_file};
use crate::config::PipelineConfig;

pub struct ImageOcrConverter {
    timeout_secs: u64,
    language: String,
}

impl ImageOcrConverter {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            timeout_secs: config.converter_cmd_timeout_secs,
            language: config.ocr_language.clone(),
        }
    }
}

#[async_trait]
impl OutputConverter for ImageOcrConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::ImageOcr
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let data = input.data.as_bytes();
        if data.is_empty() {
            return Err(Error::Conversion("Cannot OCR empty image data".to_string()));
        }

        let tmpfile = write_temp_file(data)?;
        let img_path = tmpfile.path().to_string_lossy().to_string();

        debug!(language = %self.language, data_size = data.len(), "Running OCR");

        // tesseract INPUT stdout -l LANG
        let text = run_cmd_with_timeout(
            Command::new("tesseract")
                .arg(&img_path)
                .arg("stdout")
                .arg("-l")
                .arg(&self.language),
            self.timeout_secs,
        )
        .await?;

        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::Conversion("No text recognized in image".to_string()));
        }
        Ok(vec![OutputPart::text(text)])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(binary_available("tesseract", "--version").await)
    }

    fn name(&self) -> &str {
        "image_ocr"
    }
}
