//! Image converter: wraps image bytes in a base64 data URL.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use attache_core::file_safety::normalize_mime;
use attache_core::{ConverterType, Error, Input, OutputConverter, OutputPart, Result};

pub struct ImageConverter;

/// Encode bytes as a `data:` URL.
pub(crate) fn data_url(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

#[async_trait]
impl OutputConverter for ImageConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::Image
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let mime = normalize_mime(&input.mime_type);
        if !mime.starts_with("image/") {
            return Err(Error::Conversion(format!("'{}' is not an image", mime)));
        }
        if input.data.is_empty() {
            return Err(Error::Conversion("Cannot convert empty image data".to_string()));
        }
        Ok(vec![OutputPart::image(data_url(&mime, input.data.as_bytes()))])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "image"
    }
}
