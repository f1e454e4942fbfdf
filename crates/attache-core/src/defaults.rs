//! Centralized default constants for the attache pipeline.
//!
//! **This module is the single source of truth** for shared default values.
//! Configuration types reference these constants instead of defining their own
//! magic numbers.

use crate::models::OutputPartType;

// =============================================================================
// CONSUMER
// =============================================================================

/// Output part types a consumer accepts when it declares nothing else.
pub const ACCEPTED_OUTPUT_PART_TYPES: &[OutputPartType] = &[OutputPartType::TextBlock];

// =============================================================================
// INPUT LIMITS
// =============================================================================

/// Maximum size of any loaded input (50 MB).
pub const MAX_INPUT_BYTES: usize = 50 * 1024 * 1024;

/// Inputs above this size cannot use the text converters (10 MB).
pub const MAX_TEXT_CONVERT_BYTES: usize = 10 * 1024 * 1024;

/// Images above this size cannot be passed through as image parts (20 MB).
pub const MAX_IMAGE_CONVERT_BYTES: usize = 20 * 1024 * 1024;

/// PDFs above this size cannot be rendered to images (25 MB).
pub const MAX_PDF_IMAGES_CONVERT_BYTES: usize = 25 * 1024 * 1024;

// =============================================================================
// URL SOURCES
// =============================================================================

/// Timeout for fetching a URL source.
pub const URL_FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// EXTERNAL CONVERTERS
// =============================================================================

/// Timeout for a single external command (pdftotext, pdftoppm, tesseract).
pub const CONVERTER_CMD_TIMEOUT_SECS: u64 = 60;

/// Page threshold for batched PDF text extraction.
pub const LARGE_PDF_PAGE_THRESHOLD: usize = 100;

/// Pages per batch for large PDF text extraction.
pub const PDF_BATCH_PAGES: usize = 50;

/// Resolution used when rendering PDF pages to images.
pub const PDF_RENDER_DPI: u32 = 100;

/// Upper bound on pages rendered by the PDF-to-images converter.
pub const MAX_PDF_IMAGE_PAGES: usize = 20;

/// Tesseract language for OCR.
pub const OCR_LANGUAGE: &str = "eng";

// =============================================================================
// EVENTS
// =============================================================================

/// Broadcast buffer for attachment change events.
pub const EVENT_BUS_CAPACITY: usize = 256;
