//! Converter catalog: which converters apply to a loaded input.
//!
//! The catalog is a pure function of the input's mime type and size plus the
//! set of converter types the environment can run. Index 0 of the returned
//! list is the default selection.

use std::collections::HashSet;

use attache_core::file_safety::{is_text_mime, normalize_mime};
use attache_core::{Converter, ConverterType, Input};
use tracing::trace;

use crate::config::PipelineConfig;

/// Raster formats the image converters accept directly.
const PASSTHROUGH_IMAGE_MIMES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// Maps inputs to ordered converter lists.
#[derive(Debug, Clone)]
pub struct ConverterCatalog {
    available: HashSet<ConverterType>,
    max_text_convert_bytes: usize,
    max_image_convert_bytes: usize,
    max_pdf_images_convert_bytes: usize,
}

impl ConverterCatalog {
    pub fn new(config: &PipelineConfig, available: HashSet<ConverterType>) -> Self {
        Self {
            available,
            max_text_convert_bytes: config.max_text_convert_bytes,
            max_image_convert_bytes: config.max_image_convert_bytes,
            max_pdf_images_convert_bytes: config.max_pdf_images_convert_bytes,
        }
    }

    /// Replace the set of runnable converter types.
    pub fn set_available(&mut self, available: HashSet<ConverterType>) {
        self.available = available;
    }

    pub fn available(&self) -> &HashSet<ConverterType> {
        &self.available
    }

    /// Compute the converters offered for an input.
    ///
    /// Deterministic: the same input and capability set always yield the same
    /// list. An empty list means the input is unconvertible.
    pub fn compute_converters(&self, input: &Input) -> Vec<Converter> {
        let mime = normalize_mime(&input.mime_type);
        let candidates: Vec<(ConverterType, String)> = if mime == "text/html" {
            vec![
                (ConverterType::RichText, "Text (HTML stripped)".into()),
                (ConverterType::RichTextTable, "Markdown Table".into()),
            ]
        } else if is_text_mime(&mime) {
            vec![(ConverterType::Text, "Text".into())]
        } else if mime == "application/pdf" {
            vec![
                (ConverterType::PdfText, "PDF To Text".into()),
                (ConverterType::PdfImages, "PDF To Images".into()),
            ]
        } else if PASSTHROUGH_IMAGE_MIMES.contains(&mime.as_str()) {
            vec![
                (ConverterType::Image, "Image".into()),
                (ConverterType::ImageOcr, "Image To Text (OCR)".into()),
            ]
        } else if mime.starts_with("audio/") || mime.starts_with("video/") {
            vec![(ConverterType::Unhandled, mime.clone())]
        } else {
            Vec::new()
        };

        let converters: Vec<Converter> = candidates
            .into_iter()
            .map(|(id, name)| {
                let unsupported =
                    id == ConverterType::Unhandled || !self.available.contains(&id);
                let too_large = self
                    .size_limit(id)
                    .is_some_and(|limit| input.data_size > limit);
                Converter {
                    id,
                    name,
                    disabled: unsupported || too_large,
                    unsupported,
                }
            })
            .collect();

        trace!(
            mime_type = %mime,
            data_size = input.data_size,
            converter_count = converters.len(),
            "Computed converters"
        );
        converters
    }

    fn size_limit(&self, id: ConverterType) -> Option<usize> {
        match id {
            ConverterType::Text
            | ConverterType::RichText
            | ConverterType::RichTextTable
            | ConverterType::PdfText
            | ConverterType::ImageOcr => Some(self.max_text_convert_bytes),
            ConverterType::Image => Some(self.max_image_convert_bytes),
            ConverterType::PdfImages => Some(self.max_pdf_images_convert_bytes),
            ConverterType::Unhandled => None,
        }
    }
}

/// Pick the selection after a recompute.
///
/// Keeps the previously selected converter type if it is still listed,
/// otherwise falls back to index 0, or `None` for an empty list.
pub fn reconcile_selection(
    previous: Option<ConverterType>,
    converters: &[Converter],
) -> Option<usize> {
    if converters.is_empty() {
        return None;
    }
    previous
        .and_then(|id| converters.iter().position(|c| c.id == id))
        .or(Some(0))
}
