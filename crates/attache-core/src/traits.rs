//! Trait seams the pipeline plugs implementations into.
//!
//! Loaders resolve sources into inputs, converters turn inputs into output
//! parts, and clipboard sinks receive text exposed for inspection.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AttachmentSource, ConverterType, Input, OutputPart};

// =============================================================================
// LOADING
// =============================================================================

/// Resolves a source descriptor into raw input.
///
/// Failures are reported as [`crate::Error::Input`] and stay local to the
/// attachment being loaded.
#[async_trait]
pub trait SourceLoader: Send + Sync {
    /// Load and decode the source.
    async fn load(&self, source: &AttachmentSource) -> Result<Input>;
}

// =============================================================================
// CONVERSION
// =============================================================================

/// Converter implementation for one [`ConverterType`].
///
/// Converters are registered in a `ConverterRegistry` and dispatched on the
/// converter type selected for an attachment. Running the same converter on the
/// same input must yield equivalent outputs.
#[async_trait]
pub trait OutputConverter: Send + Sync {
    /// The converter type this implementation handles.
    fn converter_type(&self) -> ConverterType;

    /// Convert an input into ordered output parts.
    async fn convert(&self, input: &Input) -> Result<Vec<OutputPart>>;

    /// Check whether the converter's external dependencies are available.
    async fn health_check(&self) -> Result<bool>;

    /// Human-readable name of this converter.
    fn name(&self) -> &str;
}

// =============================================================================
// CLIPBOARD
// =============================================================================

/// Receives text copied out of the pipeline (e.g. raw converted output).
pub trait ClipboardSink: Send + Sync {
    /// Copy `text`; `label` describes what was copied for user feedback.
    fn copy(&self, text: &str, label: &str);
}
