//! # attache-core
//!
//! Core types, traits, and abstractions for the attache ingestion pipeline.
//!
//! This crate provides the foundational data structures (attachments, sources,
//! inputs, converters, output parts) and the trait seams that the pipeline
//! crate plugs loaders and converters into.

pub mod compat;
pub mod defaults;
pub mod error;
pub mod events;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use compat::{all_outputs_supported, unsupported_output_types};
pub use error::{Error, Result};
pub use events::{AttachmentEvent, EventBus, EventEnvelope};
pub use file_safety::{detect_content_type, is_text_mime, normalize_mime, validate_input};
pub use models::*;
pub use traits::*;
