//! # attache-pipeline
//!
//! Attachment ingestion and conversion pipeline.
//!
//! This crate provides:
//! - Source loading (text, files, in-memory blobs, URLs)
//! - A converter catalog mapping inputs to selectable converters
//! - A converter registry with reference converters (text, HTML, PDF, images)
//! - The attachment collection manager: ordering, selection, conversion
//!   bookkeeping, and inlining
//!
//! ## Example
//!
//! ```ignore
//! use attache_pipeline::{AttachmentManager, PipelineConfig};
//! use attache_core::{AttachmentSource, TextMethod};
//!
//! let manager = AttachmentManager::from_config(PipelineConfig::from_env())?;
//!
//! let id = manager
//!     .add_from_source(AttachmentSource::text(TextMethod::Paste, "hello"))
//!     .await;
//!
//! // Wait until loading and conversion are done
//! manager.settled().await;
//!
//! let text = manager.inline_attachment(id).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod converters;
pub mod inline;
pub mod loader;
pub mod manager;
pub mod registry;

// Re-export core types
pub use attache_core::*;

pub use catalog::{reconcile_selection, ConverterCatalog};
pub use config::PipelineConfig;
pub use converters::{
    ImageConverter, ImageOcrConverter, PdfImagesConverter, PdfTextConverter,
    RichTextConverter, RichTextTableConverter, TextConverter,
};
pub use inline::{clipboard_text, describe_io, inline_text};
pub use loader::DefaultSourceLoader;
pub use manager::{AttachmentManager, InlinedText, MoveDirection};
pub use registry::ConverterRegistry;
