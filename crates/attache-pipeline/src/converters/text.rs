//! Text converter: passes text-like input through as a single text block.

use async_trait::async_trait;

use attache_core::{ConverterType, Input, OutputConverter, OutputPart, Result};

/// Converter for plain text and other text-like inputs.
///
/// The text is emitted unchanged; binary payloads are decoded lossily.
pub struct TextConverter;

#[async_trait]
impl OutputConverter for TextConverter {
    fn converter_type(&self) -> ConverterType {
        ConverterType::Text
    }

    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>> {
        let text = input.data.to_text_lossy().into_owned();
        Ok(vec![OutputPart::text(text)])
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true) // No external dependencies
    }

    fn name(&self) -> &str {
        "text"
    }
}
