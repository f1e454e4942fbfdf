//! Reference converter implementations.
//!
//! In-process converters handle text and HTML; PDF and OCR converters shell
//! out to poppler-utils and tesseract under a per-command timeout.

mod command;
pub mod image;
pub mod image_ocr;
pub mod pdf_images;
pub mod pdf_text;
pub mod rich_text;
pub mod text;

pub use image::ImageConverter;
pub use image_ocr::ImageOcrConverter;
pub use pdf_images::PdfImagesConverter;
pub use pdf_text::PdfTextConverter;
pub use rich_text::{RichTextConverter, RichTextTableConverter};
pub use text::TextConverter;
